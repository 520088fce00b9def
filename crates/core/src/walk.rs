use std::collections::VecDeque;

use tracing::warn;

use crate::attr::translate;
use crate::audit::AuditLog;
use crate::error::PurgeError;
use crate::model::{EntryKind, ObjectRef, WalkContext, MAX_PATH_BYTES};
use crate::policy::is_removable;
use crate::remote::{DirEntry, PaginationToken, RemoteFs};
use crate::stats::PurgeStats;

/// One in-progress directory: its absolute path, object reference,
/// pagination cursor, and the not-yet-processed remainder of the current
/// page.
struct Frame {
    path: String,
    dir: ObjectRef,
    token: PaginationToken,
    pending: VecDeque<DirEntry>,
}

/// Walk `root` depth-first and purge expired files.
///
/// Entries are processed in listing order and a subdirectory is fully
/// descended before its later siblings, exactly as a recursive walk would.
/// The frames live on an explicit stack, so tree depth is bounded by memory
/// rather than by the thread stack.
///
/// Fatal conditions (enumeration failure, translation failure, invalid
/// reference, oversized path, audit I/O failure) abort the whole walk; a
/// failed removal only feeds the failed-removal counters.
pub fn walk(
    fs: &dyn RemoteFs,
    root_path: &str,
    root: ObjectRef,
    ctx: &WalkContext,
    stats: &mut PurgeStats,
    audit: &mut AuditLog,
) -> Result<(), PurgeError> {
    if !root.is_valid() {
        return Err(PurgeError::InvalidReference {
            path: root_path.to_string(),
        });
    }

    // "/" joins children as "/name"; any other root drops trailing slashes
    // so sibling paths never double a separator.
    let base = if root_path == "/" {
        String::new()
    } else {
        root_path.trim_end_matches('/').to_string()
    };

    let mut frames = vec![Frame {
        path: base,
        dir: root,
        token: PaginationToken::Start,
        pending: VecDeque::new(),
    }];

    while !frames.is_empty() {
        let top = frames.len() - 1;

        if frames[top].pending.is_empty() {
            match frames[top].token {
                PaginationToken::End => {
                    frames.pop();
                }
                token => {
                    let page = fs.list_page(&frames[top].dir, token, ctx.page_limit)?;
                    let frame = &mut frames[top];
                    frame.token = page.next;
                    frame.pending = page.entries.into();
                }
            }
            continue;
        }

        let Some(entry) = frames[top].pending.pop_front() else {
            continue;
        };
        let parent = frames[top].dir;
        let path = join_entry_path(&frames[top].path, &entry.name)?;

        let child_ref = ObjectRef::new(parent.volume, entry.handle);
        let record = translate(&entry.attrs, child_ref, &entry.name, &path)?;

        match record.kind {
            EntryKind::File => {
                if is_removable(&record, ctx.cutoff) {
                    if ctx.log_removed {
                        audit
                            .removed(&path)
                            .map_err(|source| PurgeError::Audit { source })?;
                    }
                    if ctx.dry_run {
                        stats.record_removed(record.size_bytes);
                    } else {
                        match fs.remove(&parent, &entry.name) {
                            Ok(()) => stats.record_removed(record.size_bytes),
                            Err(err) => {
                                stats.record_failed_removal(record.size_bytes);
                                warn!(path = %path, error = %err, "failed to remove file");
                            }
                        }
                    }
                } else {
                    if ctx.log_kept {
                        audit
                            .kept(&path)
                            .map_err(|source| PurgeError::Audit { source })?;
                    }
                    stats.record_kept(record.size_bytes);
                }
            }
            EntryKind::Directory => {
                stats.record_directory();
                frames.push(Frame {
                    path,
                    dir: child_ref,
                    token: PaginationToken::Start,
                    pending: VecDeque::new(),
                });
            }
            EntryKind::Symlink => {
                stats.record_symlink();
            }
            EntryKind::Unknown => {
                stats.record_unknown();
                warn!(path = %path, "unrecognized entry type");
            }
        }
    }

    Ok(())
}

/// Build an entry's absolute path from its parent's. Always a fresh string;
/// never a shared buffer that could leak a previous sibling's suffix.
fn join_entry_path(parent: &str, name: &str) -> Result<String, PurgeError> {
    let path = format!("{parent}/{name}");
    if path.len() > MAX_PATH_BYTES {
        return Err(PurgeError::PathTooLong {
            name: name.to_string(),
            parent: parent.to_string(),
            limit: MAX_PATH_BYTES,
        });
    }
    Ok(path)
}
