use std::io;
use std::path::Path;

use crate::error::PurgeError;
use crate::model::ObjectRef;

/// Cursor into one directory's entry stream.
///
/// A listing starts with [`PaginationToken::Start`] and must keep feeding the
/// returned token back until [`PaginationToken::End`] is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationToken {
    Start,
    Cursor(u64),
    End,
}

/// Raw object type tag as reported by the remote filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Regular,
    Directory,
    Symlink,
    /// Anything else the backend reports (device nodes, sockets, ...),
    /// carried verbatim for diagnostics.
    Other(u32),
}

/// Untranslated attributes of one remote object.
///
/// Optional fields are those a backend may legitimately fail to supply;
/// translation decides which of them are required.
#[derive(Debug, Clone, Default)]
pub struct RawAttributes {
    pub type_tag: Option<TypeTag>,
    pub mode: u32,
    pub owner: u32,
    pub group: u32,
    pub size: Option<u64>,
    pub atime: Option<i64>,
    pub mtime: Option<i64>,
    pub ctime: Option<i64>,
    pub link_count: u64,
}

/// One listing entry: name, child handle, and raw attributes.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub handle: u64,
    pub attrs: RawAttributes,
}

/// One page of a directory listing.
#[derive(Debug)]
pub struct DirPage {
    pub entries: Vec<DirEntry>,
    pub next: PaginationToken,
}

/// Capability set the walker is injected with. Implementations own whatever
/// session or credential state their transport needs; the walker never sees
/// it.
pub trait RemoteFs {
    /// Resolve a local absolute path to the volume + handle of an existing
    /// directory. Fails for missing paths and non-directories.
    fn lookup_root(&self, path: &Path) -> Result<ObjectRef, PurgeError>;

    /// Fetch one page of at most `limit` entries. Errors are fatal to the
    /// run; no retry is attempted. Within one listing sequence an entry is
    /// never yielded twice.
    fn list_page(
        &self,
        dir: &ObjectRef,
        token: PaginationToken,
        limit: usize,
    ) -> Result<DirPage, PurgeError>;

    /// Remove the named entry of `parent`. Failure is recoverable: the
    /// caller counts it and continues.
    fn remove(&self, parent: &ObjectRef, name: &str) -> io::Result<()>;
}
