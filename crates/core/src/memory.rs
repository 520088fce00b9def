use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::Path;

use crate::error::PurgeError;
use crate::model::ObjectRef;
use crate::remote::{DirEntry, DirPage, PaginationToken, RawAttributes, RemoteFs, TypeTag};

const VOLUME: u64 = 1;
const ROOT_HANDLE: u64 = 1;

/// Deterministic in-memory tree implementing [`RemoteFs`]; the backend the
/// walker is tested against.
///
/// Children list in name order (BTreeMap). A listing snapshots the child
/// list when it starts, so removing already-served entries mid-walk never
/// shifts or repeats later pages, the same stability an open directory
/// stream gives the POSIX adapter. Removal and listing failures can be
/// scripted per path, and remove/list calls are counted so tests can assert
/// dry-run and pagination behavior.
pub struct MemoryFs {
    root_path: String,
    nodes: RefCell<HashMap<u64, Node>>,
    next_handle: Cell<u64>,
    listings: RefCell<HashMap<u64, Listing>>,
    next_cursor: Cell<u64>,
    fail_removals: RefCell<HashSet<String>>,
    broken_listings: RefCell<HashSet<String>>,
    remove_calls: Cell<u64>,
    list_calls: Cell<u64>,
}

#[derive(Debug)]
enum Node {
    Dir {
        path: String,
        children: BTreeMap<String, u64>,
    },
    File {
        size: u64,
        atime: i64,
        mtime: i64,
    },
    Symlink,
    Other,
}

/// One in-progress listing: the snapshot taken at start and the index of
/// the next entry to serve.
struct Listing {
    entries: Vec<(String, u64)>,
    next_index: usize,
}

impl MemoryFs {
    /// Empty tree whose root directory answers to `root_path`.
    pub fn new(root_path: &str) -> Self {
        let root_path = root_path.trim_end_matches('/').to_string();
        let mut nodes = HashMap::new();
        nodes.insert(
            ROOT_HANDLE,
            Node::Dir {
                path: root_path.clone(),
                children: BTreeMap::new(),
            },
        );
        Self {
            root_path,
            nodes: RefCell::new(nodes),
            next_handle: Cell::new(ROOT_HANDLE + 1),
            listings: RefCell::new(HashMap::new()),
            next_cursor: Cell::new(0),
            fail_removals: RefCell::new(HashSet::new()),
            broken_listings: RefCell::new(HashSet::new()),
            remove_calls: Cell::new(0),
            list_calls: Cell::new(0),
        }
    }

    /// Create a directory, creating missing parents along the way.
    pub fn add_dir(&self, path: &str) {
        self.ensure_dir(path);
    }

    pub fn add_file(&self, path: &str, size: u64, atime: i64, mtime: i64) {
        self.add_node(path, Node::File { size, atime, mtime });
    }

    pub fn add_symlink(&self, path: &str) {
        self.add_node(path, Node::Symlink);
    }

    /// An entry of a type the purge does not recognize (socket, device, ...).
    pub fn add_other(&self, path: &str) {
        self.add_node(path, Node::Other);
    }

    /// Make every removal of `path` fail with a permission error.
    pub fn fail_removal_of(&self, path: &str) {
        self.fail_removals.borrow_mut().insert(path.to_string());
    }

    /// Make every listing of the directory at `path` fail.
    pub fn break_listing_of(&self, path: &str) {
        self.broken_listings.borrow_mut().insert(path.to_string());
    }

    /// Number of removal calls issued, including failed ones.
    pub fn remove_calls(&self) -> u64 {
        self.remove_calls.get()
    }

    /// Number of listing pages served.
    pub fn list_calls(&self) -> u64 {
        self.list_calls.get()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.resolve(path).is_some()
    }

    fn add_node(&self, path: &str, node: Node) {
        let (parent, name) = path
            .rsplit_once('/')
            .unwrap_or_else(|| panic!("path {path} has no parent component"));
        let parent_handle = self.ensure_dir(parent);
        let handle = self.alloc_handle();
        let mut nodes = self.nodes.borrow_mut();
        nodes.insert(handle, node);
        match nodes.get_mut(&parent_handle) {
            Some(Node::Dir { children, .. }) => {
                children.insert(name.to_string(), handle);
            }
            _ => panic!("parent of {path} is not a directory"),
        }
    }

    fn ensure_dir(&self, path: &str) -> u64 {
        let rel = self
            .relative(path)
            .unwrap_or_else(|| panic!("path {path} is outside root {}", self.root_path));

        let mut handle = ROOT_HANDLE;
        let mut current = self.root_path.clone();
        for component in rel.split('/').filter(|component| !component.is_empty()) {
            current = format!("{current}/{component}");
            let existing = {
                let nodes = self.nodes.borrow();
                match nodes.get(&handle) {
                    Some(Node::Dir { children, .. }) => children.get(component).copied(),
                    _ => panic!("{current} has a non-directory ancestor"),
                }
            };
            handle = match existing {
                Some(child) => child,
                None => {
                    let child = self.alloc_handle();
                    let mut nodes = self.nodes.borrow_mut();
                    nodes.insert(
                        child,
                        Node::Dir {
                            path: current.clone(),
                            children: BTreeMap::new(),
                        },
                    );
                    match nodes.get_mut(&handle) {
                        Some(Node::Dir { children, .. }) => {
                            children.insert(component.to_string(), child);
                        }
                        _ => unreachable!("parent vetted above"),
                    }
                    child
                }
            };
        }
        handle
    }

    fn relative<'a>(&self, path: &'a str) -> Option<&'a str> {
        if path == self.root_path {
            return Some("");
        }
        path.strip_prefix(&self.root_path)
            .filter(|rest| rest.starts_with('/'))
    }

    fn resolve(&self, path: &str) -> Option<u64> {
        let rel = self.relative(path)?;
        let nodes = self.nodes.borrow();
        let mut handle = ROOT_HANDLE;
        for component in rel.split('/').filter(|component| !component.is_empty()) {
            match nodes.get(&handle) {
                Some(Node::Dir { children, .. }) => handle = *children.get(component)?,
                _ => return None,
            }
        }
        Some(handle)
    }

    fn alloc_handle(&self) -> u64 {
        let handle = self.next_handle.get();
        self.next_handle.set(handle + 1);
        handle
    }

    fn attrs_of(node: &Node) -> RawAttributes {
        match node {
            Node::File { size, atime, mtime } => RawAttributes {
                type_tag: Some(TypeTag::Regular),
                mode: 0o644,
                owner: 0,
                group: 0,
                size: Some(*size),
                atime: Some(*atime),
                mtime: Some(*mtime),
                ctime: Some(*mtime),
                link_count: 1,
            },
            Node::Dir { children, .. } => RawAttributes {
                type_tag: Some(TypeTag::Directory),
                mode: 0o755,
                owner: 0,
                group: 0,
                size: Some(4096),
                atime: Some(0),
                mtime: Some(0),
                ctime: Some(0),
                link_count: children.len() as u64 + 2,
            },
            Node::Symlink => RawAttributes {
                type_tag: Some(TypeTag::Symlink),
                mode: 0o777,
                owner: 0,
                group: 0,
                size: Some(0),
                atime: Some(0),
                mtime: Some(0),
                ctime: Some(0),
                link_count: 1,
            },
            Node::Other => RawAttributes {
                type_tag: Some(TypeTag::Other(0o140_000)),
                mode: 0o644,
                owner: 0,
                group: 0,
                size: Some(0),
                atime: Some(0),
                mtime: Some(0),
                ctime: Some(0),
                link_count: 1,
            },
        }
    }
}

impl RemoteFs for MemoryFs {
    fn lookup_root(&self, path: &Path) -> Result<ObjectRef, PurgeError> {
        let text = path.to_string_lossy();
        if text == self.root_path {
            Ok(ObjectRef::new(VOLUME, ROOT_HANDLE))
        } else {
            Err(PurgeError::Lookup {
                path: text.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such tree"),
            })
        }
    }

    fn list_page(
        &self,
        dir: &ObjectRef,
        token: PaginationToken,
        limit: usize,
    ) -> Result<DirPage, PurgeError> {
        self.list_calls.set(self.list_calls.get() + 1);

        let (cursor, mut listing) = match token {
            PaginationToken::Start => {
                let nodes = self.nodes.borrow();
                let (path, children) = match nodes.get(&dir.handle) {
                    Some(Node::Dir { path, children }) => (path, children),
                    _ => {
                        return Err(PurgeError::Enumeration {
                            path: format!("handle {}", dir.handle),
                            source: io::Error::new(io::ErrorKind::NotFound, "not a directory"),
                        })
                    }
                };
                if self.broken_listings.borrow().contains(path) {
                    return Err(PurgeError::Enumeration {
                        path: path.clone(),
                        source: io::Error::other("simulated enumeration failure"),
                    });
                }
                let entries = children
                    .iter()
                    .map(|(name, handle)| (name.clone(), *handle))
                    .collect();
                let cursor = self.next_cursor.get();
                self.next_cursor.set(cursor + 1);
                (
                    cursor,
                    Listing {
                        entries,
                        next_index: 0,
                    },
                )
            }
            PaginationToken::Cursor(cursor) => {
                let listing = self.listings.borrow_mut().remove(&cursor).ok_or_else(|| {
                    PurgeError::Enumeration {
                        path: format!("handle {}", dir.handle),
                        source: io::Error::new(
                            io::ErrorKind::InvalidInput,
                            "stale or unknown pagination cursor",
                        ),
                    }
                })?;
                (cursor, listing)
            }
            PaginationToken::End => {
                return Ok(DirPage {
                    entries: Vec::new(),
                    next: PaginationToken::End,
                })
            }
        };

        let nodes = self.nodes.borrow();
        let mut entries = Vec::new();
        while entries.len() < limit && listing.next_index < listing.entries.len() {
            let (name, handle) = &listing.entries[listing.next_index];
            listing.next_index += 1;
            let child = nodes
                .get(handle)
                .unwrap_or_else(|| panic!("dangling child handle {handle}"));
            entries.push(DirEntry {
                name: name.clone(),
                handle: *handle,
                attrs: Self::attrs_of(child),
            });
        }

        let next = if listing.next_index >= listing.entries.len() {
            PaginationToken::End
        } else {
            self.listings.borrow_mut().insert(cursor, listing);
            PaginationToken::Cursor(cursor)
        };
        Ok(DirPage { entries, next })
    }

    fn remove(&self, parent: &ObjectRef, name: &str) -> io::Result<()> {
        self.remove_calls.set(self.remove_calls.get() + 1);
        let mut nodes = self.nodes.borrow_mut();

        let full = match nodes.get(&parent.handle) {
            Some(Node::Dir { path, .. }) => format!("{path}/{name}"),
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    "unknown parent directory handle",
                ))
            }
        };
        if self.fail_removals.borrow().contains(&full) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "simulated removal failure",
            ));
        }

        let handle = match nodes.get_mut(&parent.handle) {
            Some(Node::Dir { children, .. }) => children.remove(name).ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "no such entry to remove")
            })?,
            _ => unreachable!("parent vetted above"),
        };
        nodes.remove(&handle);
        Ok(())
    }
}
