use serde::{Deserialize, Serialize};

/// Counters accumulated across one whole run, by outcome category.
///
/// Monotonically non-decreasing: the walker only ever increments. For every
/// regular file visited exactly one of removed/failed/kept is bumped, so
/// `removed_files + failed_removed_files + kept_files` equals the number of
/// file entries seen (and likewise for bytes).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeStats {
    pub removed_bytes: u64,
    pub removed_files: u64,
    pub failed_removed_bytes: u64,
    pub failed_removed_files: u64,
    pub kept_bytes: u64,
    pub kept_files: u64,
    pub directories: u64,
    pub symlinks: u64,
    pub unknown: u64,
}

impl PurgeStats {
    pub fn record_removed(&mut self, size_bytes: u64) {
        self.removed_files += 1;
        self.removed_bytes = self.removed_bytes.saturating_add(size_bytes);
    }

    pub fn record_failed_removal(&mut self, size_bytes: u64) {
        self.failed_removed_files += 1;
        self.failed_removed_bytes = self.failed_removed_bytes.saturating_add(size_bytes);
    }

    pub fn record_kept(&mut self, size_bytes: u64) {
        self.kept_files += 1;
        self.kept_bytes = self.kept_bytes.saturating_add(size_bytes);
    }

    pub fn record_directory(&mut self) {
        self.directories += 1;
    }

    pub fn record_symlink(&mut self) {
        self.symlinks += 1;
    }

    pub fn record_unknown(&mut self) {
        self.unknown += 1;
    }

    /// Regular-file entries visited so far.
    pub fn files_seen(&self) -> u64 {
        self.removed_files + self.failed_removed_files + self.kept_files
    }

    /// Bytes of all regular-file entries visited so far.
    pub fn bytes_seen(&self) -> u64 {
        self.removed_bytes
            .saturating_add(self.failed_removed_bytes)
            .saturating_add(self.kept_bytes)
    }

    pub fn percent_bytes_removed(&self) -> f64 {
        ratio(self.removed_bytes, self.bytes_seen()) * 100.0
    }

    pub fn percent_files_removed(&self) -> f64 {
        ratio(self.removed_files, self.files_seen()) * 100.0
    }

    pub fn pre_purge_avg_file_size(&self) -> f64 {
        ratio(self.bytes_seen(), self.files_seen())
    }

    pub fn post_purge_avg_file_size(&self) -> f64 {
        ratio(
            self.failed_removed_bytes.saturating_add(self.kept_bytes),
            self.failed_removed_files + self.kept_files,
        )
    }

    pub fn purged_avg_file_size(&self) -> f64 {
        ratio(self.removed_bytes, self.removed_files)
    }

    pub fn derived(&self) -> DerivedMetrics {
        DerivedMetrics {
            percent_bytes_removed: self.percent_bytes_removed(),
            percent_files_removed: self.percent_files_removed(),
            pre_purge_avg_file_size: self.pre_purge_avg_file_size(),
            post_purge_avg_file_size: self.post_purge_avg_file_size(),
            purged_avg_file_size: self.purged_avg_file_size(),
        }
    }
}

/// Summary ratios and averages computed from the raw counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub percent_bytes_removed: f64,
    pub percent_files_removed: f64,
    pub pre_purge_avg_file_size: f64,
    pub post_purge_avg_file_size: f64,
    pub purged_avg_file_size: f64,
}

/// Shared zero-denominator guard for every derived metric.
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
