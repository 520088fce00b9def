use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::audit::AuditLog;
use crate::error::PurgeError;
use crate::model::{epoch_to_rfc3339, WalkContext, DEFAULT_PAGE_LIMIT};
use crate::policy::default_basis_time;
use crate::remote::RemoteFs;
use crate::stats::{DerivedMetrics, PurgeStats};
use crate::walk::walk;

pub const REPORT_VERSION: &str = "1.0.0";

/// Default directory receiving one audit log file per invocation.
pub const DEFAULT_LOG_DIR: &str = "/var/log/scratch-purge";

/// Per-invocation configuration.
#[derive(Debug, Clone)]
pub struct PurgeOptions {
    /// Absolute path of the directory tree to purge.
    pub directory: PathBuf,
    /// Directory receiving the audit log; must already exist.
    pub log_dir: PathBuf,
    pub dry_run: bool,
    pub log_removed: bool,
    pub log_kept: bool,
    /// Explicit cutoff in epoch seconds; `None` means start time minus the
    /// default retention window.
    pub removal_basis_time: Option<i64>,
    pub page_limit: usize,
}

impl PurgeOptions {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            dry_run: false,
            log_removed: false,
            log_kept: false,
            removal_basis_time: None,
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

/// End-of-run summary. `success` mirrors the walk result: a fatal abort
/// still produces a report carrying everything counted up to that point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeReport {
    pub report_version: String,
    pub run_id: String,
    pub directory: String,
    pub dry_run: bool,
    pub started_at: i64,
    pub started_at_str: String,
    pub removal_basis_time: i64,
    pub removal_basis_time_str: String,
    pub finished_at: i64,
    pub finished_at_str: String,
    pub duration_seconds: i64,
    pub stats: PurgeStats,
    pub derived: DerivedMetrics,
    pub success: bool,
    pub failure: Option<String>,
}

/// Run one purge: open `<log_dir>/<start>.log`, walk, and report.
///
/// Errors raised before the walk starts (root lookup, log creation) are
/// returned as `Err`; a fatal error *during* the walk yields
/// `Ok(report { success: false, .. })` with the statistics and audit lines
/// accumulated up to the abort.
pub fn run_purge(fs: &dyn RemoteFs, options: &PurgeOptions) -> Result<PurgeReport, PurgeError> {
    let started_at = Utc::now().timestamp();
    let mut audit = AuditLog::create(&options.log_dir, started_at)?;
    run_purge_with_log(fs, options, started_at, &mut audit)
}

/// [`run_purge`] against a caller-supplied audit log and start time.
pub fn run_purge_with_log(
    fs: &dyn RemoteFs,
    options: &PurgeOptions,
    started_at: i64,
    audit: &mut AuditLog,
) -> Result<PurgeReport, PurgeError> {
    let basis = options
        .removal_basis_time
        .unwrap_or_else(|| default_basis_time(started_at));
    let directory = options.directory.to_string_lossy().to_string();

    let root_ref = fs.lookup_root(&options.directory)?;

    audit
        .header(&directory, options.dry_run, started_at, basis)
        .map_err(|source| PurgeError::Audit { source })?;

    info!(
        directory = %directory,
        dry_run = options.dry_run,
        removal_basis_time = basis,
        "starting purge walk"
    );

    let ctx = WalkContext {
        cutoff: basis,
        dry_run: options.dry_run,
        log_removed: options.log_removed,
        log_kept: options.log_kept,
        page_limit: options.page_limit,
    };

    let mut stats = PurgeStats::default();
    let walk_result = walk(fs, &directory, root_ref, &ctx, &mut stats, audit);

    let finished_at = Utc::now().timestamp();
    let duration_seconds = finished_at - started_at;
    let success = walk_result.is_ok();

    audit
        .footer(finished_at, duration_seconds, &stats, success)
        .map_err(|source| PurgeError::Audit { source })?;

    let failure = walk_result.err().map(|err| {
        error!(error = %err, "purge walk aborted");
        err.to_string()
    });

    info!(
        removed_files = stats.removed_files,
        failed_removed_files = stats.failed_removed_files,
        kept_files = stats.kept_files,
        success,
        "purge walk finished"
    );

    Ok(PurgeReport {
        report_version: REPORT_VERSION.to_string(),
        run_id: Uuid::new_v4().to_string(),
        directory,
        dry_run: options.dry_run,
        started_at,
        started_at_str: epoch_to_rfc3339(started_at),
        removal_basis_time: basis,
        removal_basis_time_str: epoch_to_rfc3339(basis),
        finished_at,
        finished_at_str: epoch_to_rfc3339(finished_at),
        duration_seconds,
        derived: stats.derived(),
        stats,
        success,
        failure,
    })
}

/// Write the report as pretty JSON.
pub fn write_report(report: &PurgeReport, path: &Path) -> anyhow::Result<()> {
    let payload =
        serde_json::to_string_pretty(report).context("failed to serialize purge report")?;
    fs::write(path, payload)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    Ok(())
}
