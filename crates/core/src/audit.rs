use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::PurgeError;
use crate::model::epoch_to_rfc3339;
use crate::stats::PurgeStats;

/// Per-invocation audit log: tab-separated `key<TAB>value` lines, plus one
/// `R`/`K` line per classified file when enabled.
///
/// The header is written before the walk, `R`/`K` lines as entries are
/// classified, and the footer after the walk, including after a fatal
/// abort, so everything accumulated up to that point survives.
pub struct AuditLog {
    out: Box<dyn Write>,
}

impl AuditLog {
    /// Open `<log_dir>/<start_epoch>.log` for appending. One file per
    /// invocation; the parent directory must already exist.
    pub fn create(log_dir: &Path, start_epoch: i64) -> Result<Self, PurgeError> {
        let path = log_dir.join(format!("{start_epoch}.log"));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| PurgeError::AuditOpen {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self {
            out: Box::new(BufWriter::new(file)),
        })
    }

    /// Wrap an arbitrary writer; lets tests capture the log in memory.
    pub fn sink(out: Box<dyn Write>) -> Self {
        Self { out }
    }

    pub fn header(
        &mut self,
        directory: &str,
        dry_run: bool,
        current_time: i64,
        basis_time: i64,
    ) -> io::Result<()> {
        writeln!(self.out, "directory\t{directory}")?;
        writeln!(self.out, "dry_run\t{dry_run}")?;
        writeln!(self.out, "current_time\t{current_time}")?;
        writeln!(self.out, "current_time_str\t{}", epoch_to_rfc3339(current_time))?;
        writeln!(self.out, "removal_basis_time\t{basis_time}")?;
        writeln!(
            self.out,
            "removal_basis_time_str\t{}",
            epoch_to_rfc3339(basis_time)
        )
    }

    pub fn removed(&mut self, path: &str) -> io::Result<()> {
        writeln!(self.out, "R\t{path}")
    }

    pub fn kept(&mut self, path: &str) -> io::Result<()> {
        writeln!(self.out, "K\t{path}")
    }

    pub fn footer(
        &mut self,
        finish_time: i64,
        duration_seconds: i64,
        stats: &PurgeStats,
        success: bool,
    ) -> io::Result<()> {
        writeln!(self.out, "finish_time\t{finish_time}")?;
        writeln!(self.out, "finish_time_str\t{}", epoch_to_rfc3339(finish_time))?;
        writeln!(self.out, "duration_seconds\t{duration_seconds}")?;
        writeln!(self.out, "removed_bytes\t{}", stats.removed_bytes)?;
        writeln!(self.out, "removed_files\t{}", stats.removed_files)?;
        writeln!(self.out, "failed_removed_bytes\t{}", stats.failed_removed_bytes)?;
        writeln!(self.out, "failed_removed_files\t{}", stats.failed_removed_files)?;
        writeln!(self.out, "kept_bytes\t{}", stats.kept_bytes)?;
        writeln!(self.out, "kept_files\t{}", stats.kept_files)?;
        writeln!(self.out, "directories\t{}", stats.directories)?;
        writeln!(self.out, "symlinks\t{}", stats.symlinks)?;
        writeln!(self.out, "unknown\t{}", stats.unknown)?;
        writeln!(
            self.out,
            "percent_bytes_removed\t{:.6}",
            stats.percent_bytes_removed()
        )?;
        writeln!(
            self.out,
            "percent_files_removed\t{:.6}",
            stats.percent_files_removed()
        )?;
        writeln!(
            self.out,
            "pre_purge_avg_file_size\t{:.6}",
            stats.pre_purge_avg_file_size()
        )?;
        writeln!(
            self.out,
            "post_purge_avg_file_size\t{:.6}",
            stats.post_purge_avg_file_size()
        )?;
        writeln!(
            self.out,
            "purged_avg_file_size\t{:.6}",
            stats.purged_avg_file_size()
        )?;
        writeln!(self.out, "purge_success\t{success}")?;
        self.out.flush()
    }
}
