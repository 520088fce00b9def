use chrono::{DateTime, SecondsFormat, Utc};

/// Null sentinel for [`ObjectRef::handle`].
pub const NULL_HANDLE: u64 = 0;
/// Null sentinel for [`ObjectRef::volume`].
pub const NULL_VOLUME: u64 = 0;

/// Upper bound on a reconstructed absolute path, in bytes.
pub const MAX_PATH_BYTES: usize = 4096;

/// Default number of entries requested per directory listing call.
pub const DEFAULT_PAGE_LIMIT: usize = 60;

/// Identity of one remote filesystem object, compared by value.
///
/// The pair is analogous to a device + inode pair; either field being the
/// null sentinel makes the reference unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub volume: u64,
    pub handle: u64,
}

impl ObjectRef {
    pub fn new(volume: u64, handle: u64) -> Self {
        Self { volume, handle }
    }

    pub fn is_valid(&self) -> bool {
        self.volume != NULL_VOLUME && self.handle != NULL_HANDLE
    }
}

/// Classification of a directory entry after attribute translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Unknown,
}

/// One directory entry in canonical form, produced by attribute translation
/// and dropped after classification.
#[derive(Debug, Clone)]
pub struct EntryRecord {
    pub name: String,
    pub object_ref: ObjectRef,
    pub kind: EntryKind,
    pub size_bytes: u64,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
    pub mode: u32,
    pub owner: u32,
    pub group: u32,
    pub link_count: u64,
}

/// Per-walk configuration, read-only during traversal.
#[derive(Debug, Clone)]
pub struct WalkContext {
    /// Files with both atime and mtime strictly below this are removed.
    pub cutoff: i64,
    /// Classify and count without issuing any removal call.
    pub dry_run: bool,
    /// Emit an `R` audit line per removed file.
    pub log_removed: bool,
    /// Emit a `K` audit line per kept file.
    pub log_kept: bool,
    /// Entries requested per directory listing call.
    pub page_limit: usize,
}

/// Render seconds since the epoch as an RFC 3339 UTC string.
///
/// Out-of-range inputs fall back to the raw second count so log lines are
/// never lost to a formatting failure.
pub fn epoch_to_rfc3339(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|time| time.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| secs.to_string())
}
