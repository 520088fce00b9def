use crate::model::EntryRecord;

pub const DAY_SECS: i64 = 24 * 60 * 60;

/// Default retention window: the 30-day policy plus one day of margin,
/// because the remote filesystem suppresses same-day atime updates.
pub const RETENTION_WINDOW_SECS: i64 = 31 * DAY_SECS;

/// Cutoff used when the caller does not supply one.
pub fn default_basis_time(now: i64) -> i64 {
    now - RETENTION_WINDOW_SECS
}

/// Retention decision for a regular file: removable only when both the last
/// read and the last write strictly precede the cutoff. A timestamp equal to
/// the cutoff counts as too recent to remove.
///
/// Defined for [`EntryKind::File`](crate::model::EntryKind::File) entries
/// only; other kinds are filtered out before policy evaluation.
pub fn is_removable(entry: &EntryRecord, cutoff: i64) -> bool {
    debug_assert_eq!(entry.kind, crate::model::EntryKind::File);
    entry.atime < cutoff && entry.mtime < cutoff
}

#[cfg(test)]
mod tests {
    use super::{default_basis_time, is_removable, RETENTION_WINDOW_SECS};
    use crate::model::{EntryKind, EntryRecord, ObjectRef};

    const CUTOFF: i64 = 1_000_000;

    fn file(atime: i64, mtime: i64) -> EntryRecord {
        EntryRecord {
            name: "f".to_string(),
            object_ref: ObjectRef::new(1, 2),
            kind: EntryKind::File,
            size_bytes: 1,
            atime,
            mtime,
            ctime: mtime,
            mode: 0o644,
            owner: 0,
            group: 0,
            link_count: 1,
        }
    }

    #[test]
    fn removable_only_when_both_timestamps_precede_cutoff() {
        assert!(is_removable(&file(CUTOFF - 1, CUTOFF - 1), CUTOFF));
        assert!(!is_removable(&file(CUTOFF + 1, CUTOFF - 1), CUTOFF));
        assert!(!is_removable(&file(CUTOFF - 1, CUTOFF + 1), CUTOFF));
    }

    #[test]
    fn timestamp_equal_to_cutoff_is_kept() {
        assert!(!is_removable(&file(CUTOFF, CUTOFF - 1), CUTOFF));
        assert!(!is_removable(&file(CUTOFF - 1, CUTOFF), CUTOFF));
        assert!(!is_removable(&file(CUTOFF, CUTOFF), CUTOFF));
    }

    #[test]
    fn default_basis_is_thirty_one_days_back() {
        assert_eq!(RETENTION_WINDOW_SECS, 31 * 86_400);
        assert_eq!(default_basis_time(CUTOFF), CUTOFF - 31 * 86_400);
    }
}
