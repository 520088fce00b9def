use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use scratch_purge_core::{run_purge, write_report, LocalFs, PurgeOptions, DEFAULT_LOG_DIR};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "scratch-purge",
    version,
    about = "Remove files from a scratch tree when both access and modify times predate a cutoff."
)]
struct Cli {
    /// Absolute path of the directory tree to purge.
    directory: PathBuf,

    /// Classify and count without removing anything (also: DRY_RUN=1).
    #[arg(long)]
    dry_run: bool,

    /// Directory receiving the per-invocation audit log; must exist.
    #[arg(long, value_name = "DIR", default_value = DEFAULT_LOG_DIR)]
    log_dir: PathBuf,

    /// Write an R audit line for every removed file.
    #[arg(long)]
    log_removed_files: bool,

    /// Write a K audit line for every kept file.
    #[arg(long)]
    log_kept_files: bool,

    /// Cutoff in seconds since the epoch; default is start time minus 31 days.
    #[arg(long, value_name = "EPOCH_SECONDS")]
    removal_basis_time: Option<i64>,

    /// Optional JSON report output file.
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    if !cli.directory.is_absolute() {
        bail!(
            "directory must be an absolute path: {}",
            cli.directory.display()
        );
    }

    let mut options = PurgeOptions::new(&cli.directory);
    options.log_dir = cli.log_dir;
    options.dry_run = cli.dry_run || dry_run_from_env();
    options.log_removed = cli.log_removed_files;
    options.log_kept = cli.log_kept_files;
    options.removal_basis_time = cli.removal_basis_time;

    let local = LocalFs::new();
    let report = run_purge(&local, &options)
        .with_context(|| format!("purge of {} could not start", cli.directory.display()))?;

    println!(
        "Visited {} file(s): {} removed, {} failed, {} kept; {} directories, {} symlinks, {} unknown.",
        report.stats.files_seen(),
        report.stats.removed_files,
        report.stats.failed_removed_files,
        report.stats.kept_files,
        report.stats.directories,
        report.stats.symlinks,
        report.stats.unknown
    );
    println!(
        "Removed {} byte(s), {:.2}% of bytes seen, in {} second(s).",
        report.stats.removed_bytes, report.derived.percent_bytes_removed, report.duration_seconds
    );
    if report.dry_run {
        println!("Dry run: no files were removed.");
    }

    if let Some(path) = &cli.report {
        write_report(&report, path)?;
        println!("Report written to {}", path.display());
    }

    if !report.success {
        bail!(
            "purge walk failed: {}",
            report.failure.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

/// `DRY_RUN=1` forces dry-run; an unset, unparsable, or zero value does not
/// (the historical contract of this knob).
fn dry_run_from_env() -> bool {
    std::env::var("DRY_RUN")
        .ok()
        .and_then(|value| value.trim().parse::<i64>().ok())
        .map(|value| value != 0)
        .unwrap_or(false)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
