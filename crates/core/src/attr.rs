use crate::error::PurgeError;
use crate::model::{EntryKind, EntryRecord, ObjectRef};
use crate::remote::{RawAttributes, TypeTag};

/// Translate raw remote attributes into a canonical [`EntryRecord`].
///
/// `path` is the entry's reconstructed absolute path, used only for error
/// context. Size and timestamps are copied verbatim; an unrecognized type tag
/// becomes [`EntryKind::Unknown`] rather than an error. Regular files and
/// symlinks normalize to link count 1 (the remote filesystem has no hard
/// links); directories carry the backend-reported count.
pub fn translate(
    raw: &RawAttributes,
    object_ref: ObjectRef,
    name: &str,
    path: &str,
) -> Result<EntryRecord, PurgeError> {
    if !object_ref.is_valid() {
        return Err(PurgeError::InvalidReference {
            path: path.to_string(),
        });
    }

    let type_tag = raw.type_tag.ok_or_else(|| missing(path, "type"))?;
    let size_bytes = raw.size.ok_or_else(|| missing(path, "size"))?;
    let atime = raw.atime.ok_or_else(|| missing(path, "atime"))?;
    let mtime = raw.mtime.ok_or_else(|| missing(path, "mtime"))?;
    let ctime = raw.ctime.ok_or_else(|| missing(path, "ctime"))?;

    let kind = match type_tag {
        TypeTag::Regular => EntryKind::File,
        TypeTag::Directory => EntryKind::Directory,
        TypeTag::Symlink => EntryKind::Symlink,
        TypeTag::Other(_) => EntryKind::Unknown,
    };

    let link_count = match kind {
        EntryKind::File | EntryKind::Symlink => 1,
        EntryKind::Directory | EntryKind::Unknown => raw.link_count,
    };

    Ok(EntryRecord {
        name: name.to_string(),
        object_ref,
        kind,
        size_bytes,
        atime,
        mtime,
        ctime,
        mode: raw.mode,
        owner: raw.owner,
        group: raw.group,
        link_count,
    })
}

fn missing(path: &str, field: &'static str) -> PurgeError {
    PurgeError::MissingAttributes {
        path: path.to_string(),
        field,
    }
}
