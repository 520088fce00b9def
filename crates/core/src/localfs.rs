use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{self, ReadDir};
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use crate::error::PurgeError;
use crate::model::ObjectRef;
use crate::remote::{DirEntry, DirPage, PaginationToken, RawAttributes, RemoteFs, TypeTag};

/// POSIX adapter for purging a kernel-mounted network tree.
///
/// Object identity is `st_dev` + `st_ino`. Each in-progress listing keeps
/// its `ReadDir` iterator open in a cursor table, so entry ordering is
/// stable for the duration of one listing sequence; directory handles map
/// back to paths through a table filled during enumeration.
///
/// Single-threaded, like the walk that drives it.
#[derive(Default)]
pub struct LocalFs {
    dirs: RefCell<HashMap<u64, PathBuf>>,
    listings: RefCell<ListingTable>,
}

#[derive(Default)]
struct ListingTable {
    next_cursor: u64,
    open: HashMap<u64, ReadDir>,
}

impl LocalFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn dir_path(&self, dir: &ObjectRef) -> Result<PathBuf, PurgeError> {
        self.dirs
            .borrow()
            .get(&dir.handle)
            .cloned()
            .ok_or_else(|| PurgeError::Enumeration {
                path: format!("handle {}", dir.handle),
                source: io::Error::new(
                    io::ErrorKind::NotFound,
                    "directory handle was never enumerated",
                ),
            })
    }

    fn dirent_to_entry(
        &self,
        dir_path: &Path,
        dirent: &fs::DirEntry,
    ) -> Result<DirEntry, PurgeError> {
        let name = dirent.file_name().to_string_lossy().to_string();
        let child_path = dir_path.join(dirent.file_name());
        let meta =
            fs::symlink_metadata(&child_path).map_err(|source| PurgeError::Enumeration {
                path: child_path.display().to_string(),
                source,
            })?;

        let file_type = meta.file_type();
        let type_tag = if file_type.is_file() {
            TypeTag::Regular
        } else if file_type.is_dir() {
            TypeTag::Directory
        } else if file_type.is_symlink() {
            TypeTag::Symlink
        } else {
            TypeTag::Other(meta.mode() & 0o170_000)
        };

        if file_type.is_dir() {
            self.dirs.borrow_mut().insert(meta.ino(), child_path);
        }

        Ok(DirEntry {
            name,
            handle: meta.ino(),
            attrs: RawAttributes {
                type_tag: Some(type_tag),
                mode: meta.mode(),
                owner: meta.uid(),
                group: meta.gid(),
                size: Some(meta.len()),
                atime: Some(meta.atime()),
                mtime: Some(meta.mtime()),
                ctime: Some(meta.ctime()),
                link_count: meta.nlink(),
            },
        })
    }
}

impl RemoteFs for LocalFs {
    fn lookup_root(&self, path: &Path) -> Result<ObjectRef, PurgeError> {
        let meta = fs::symlink_metadata(path).map_err(|source| PurgeError::Lookup {
            path: path.display().to_string(),
            source,
        })?;
        if !meta.is_dir() {
            return Err(PurgeError::InvalidRoot {
                path: path.display().to_string(),
                reason: "not a directory".to_string(),
            });
        }

        let object_ref = ObjectRef::new(meta.dev(), meta.ino());
        if !object_ref.is_valid() {
            return Err(PurgeError::InvalidRoot {
                path: path.display().to_string(),
                reason: "filesystem reported a null volume or inode".to_string(),
            });
        }

        self.dirs
            .borrow_mut()
            .insert(meta.ino(), path.to_path_buf());
        Ok(object_ref)
    }

    fn list_page(
        &self,
        dir: &ObjectRef,
        token: PaginationToken,
        limit: usize,
    ) -> Result<DirPage, PurgeError> {
        let dir_path = self.dir_path(dir)?;

        let (cursor, mut iter) = match token {
            PaginationToken::Start => {
                let iter = fs::read_dir(&dir_path).map_err(|source| PurgeError::Enumeration {
                    path: dir_path.display().to_string(),
                    source,
                })?;
                let mut listings = self.listings.borrow_mut();
                let cursor = listings.next_cursor;
                listings.next_cursor += 1;
                (cursor, iter)
            }
            PaginationToken::Cursor(cursor) => {
                let iter = self.listings.borrow_mut().open.remove(&cursor).ok_or_else(|| {
                    PurgeError::Enumeration {
                        path: dir_path.display().to_string(),
                        source: io::Error::new(
                            io::ErrorKind::InvalidInput,
                            "stale or unknown pagination cursor",
                        ),
                    }
                })?;
                (cursor, iter)
            }
            PaginationToken::End => {
                return Ok(DirPage {
                    entries: Vec::new(),
                    next: PaginationToken::End,
                })
            }
        };

        let mut entries = Vec::new();
        while entries.len() < limit {
            match iter.next() {
                None => {
                    return Ok(DirPage {
                        entries,
                        next: PaginationToken::End,
                    })
                }
                Some(Err(source)) => {
                    return Err(PurgeError::Enumeration {
                        path: dir_path.display().to_string(),
                        source,
                    })
                }
                Some(Ok(dirent)) => entries.push(self.dirent_to_entry(&dir_path, &dirent)?),
            }
        }

        self.listings.borrow_mut().open.insert(cursor, iter);
        Ok(DirPage {
            entries,
            next: PaginationToken::Cursor(cursor),
        })
    }

    fn remove(&self, parent: &ObjectRef, name: &str) -> io::Result<()> {
        let parent_path = self
            .dirs
            .borrow()
            .get(&parent.handle)
            .cloned()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "unknown parent directory handle")
            })?;
        fs::remove_file(parent_path.join(name))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::LocalFs;
    use crate::error::PurgeError;
    use crate::remote::{PaginationToken, RemoteFs};

    #[test]
    fn lookup_root_rejects_regular_files() {
        let temp = TempDir::new().expect("tempdir");
        let file = temp.path().join("plain.txt");
        fs::write(&file, b"x").expect("write");

        let local = LocalFs::new();
        let err = local.lookup_root(&file).expect_err("file as root");
        assert!(matches!(err, PurgeError::InvalidRoot { .. }));
    }

    #[test]
    fn lookup_root_reports_missing_paths() {
        let temp = TempDir::new().expect("tempdir");
        let local = LocalFs::new();
        let err = local
            .lookup_root(&temp.path().join("absent"))
            .expect_err("missing root");
        assert!(matches!(err, PurgeError::Lookup { .. }));
    }

    #[test]
    fn listing_pages_until_end_without_duplicates() {
        let temp = TempDir::new().expect("tempdir");
        for i in 0..5 {
            fs::write(temp.path().join(format!("f{i}")), b"x").expect("write");
        }

        let local = LocalFs::new();
        let root = local.lookup_root(temp.path()).expect("root");

        let mut names = Vec::new();
        let mut token = PaginationToken::Start;
        loop {
            let page = local.list_page(&root, token, 2).expect("page");
            names.extend(page.entries.iter().map(|entry| entry.name.clone()));
            match page.next {
                PaginationToken::End => break,
                next => token = next,
            }
        }

        names.sort();
        assert_eq!(names, vec!["f0", "f1", "f2", "f3", "f4"]);
    }
}
