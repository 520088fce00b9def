use std::io::Write;
use std::sync::{Arc, Mutex};

use scratch_purge_core::{
    run_purge_with_log, walk, AuditLog, MemoryFs, ObjectRef, PurgeError, PurgeOptions,
    PurgeReport, PurgeStats, WalkContext,
};

const CUTOFF: i64 = 1_000_000;
const STARTED_AT: i64 = 2_000_000;

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

fn options(root: &str) -> PurgeOptions {
    let mut options = PurgeOptions::new(root);
    options.removal_basis_time = Some(CUTOFF);
    options
}

fn run(fs: &MemoryFs, options: &PurgeOptions) -> (PurgeReport, String) {
    let buf = SharedBuf::default();
    let mut audit = AuditLog::sink(Box::new(buf.clone()));
    let report = run_purge_with_log(fs, options, STARTED_AT, &mut audit).expect("run");
    (report, buf.contents())
}

fn two_file_tree() -> MemoryFs {
    let fs = MemoryFs::new("/scratch");
    fs.add_file("/scratch/file1", 100, CUTOFF - 1, CUTOFF - 1);
    fs.add_file("/scratch/file2", 200, CUTOFF + 1, CUTOFF + 1);
    fs.add_dir("/scratch/sub");
    fs
}

#[test]
fn expired_file_is_removed_and_fresh_file_kept() {
    let fs = two_file_tree();
    let (report, _) = run(&fs, &options("/scratch"));

    assert!(report.success);
    assert_eq!(report.stats.removed_files, 1);
    assert_eq!(report.stats.removed_bytes, 100);
    assert_eq!(report.stats.kept_files, 1);
    assert_eq!(report.stats.kept_bytes, 200);
    assert_eq!(report.stats.failed_removed_files, 0);
    assert_eq!(report.stats.directories, 1);
    assert_eq!(report.stats.symlinks, 0);
    assert_eq!(report.stats.unknown, 0);

    assert!(!fs.contains("/scratch/file1"));
    assert!(fs.contains("/scratch/file2"));
    assert!(fs.contains("/scratch/sub"));
}

#[test]
fn removal_failure_is_counted_and_never_fatal() {
    let fs = two_file_tree();
    fs.fail_removal_of("/scratch/file1");
    let (report, _) = run(&fs, &options("/scratch"));

    assert!(report.success, "per-entry removal failure must not abort");
    assert_eq!(report.stats.failed_removed_files, 1);
    assert_eq!(report.stats.failed_removed_bytes, 100);
    assert_eq!(report.stats.removed_files, 0);
    assert_eq!(report.stats.kept_files, 1);
    assert!(fs.contains("/scratch/file1"));
    // Invariant: every file still lands in exactly one outcome bucket.
    assert_eq!(report.stats.files_seen(), 2);
}

#[test]
fn enumeration_failure_aborts_but_preserves_statistics() {
    let fs = MemoryFs::new("/scratch");
    fs.add_file("/scratch/a1", 100, CUTOFF - 1, CUTOFF - 1);
    fs.add_file("/scratch/a2", 200, CUTOFF + 1, CUTOFF + 1);
    fs.add_dir("/scratch/sub");
    fs.break_listing_of("/scratch/sub");

    let (report, log) = run(&fs, &options("/scratch"));

    assert!(!report.success);
    let failure = report.failure.expect("failure recorded");
    assert!(failure.contains("/scratch/sub"), "failure was: {failure}");

    // Files listed before the broken subdirectory are already accounted.
    assert_eq!(report.stats.removed_files, 1);
    assert_eq!(report.stats.kept_files, 1);
    assert_eq!(report.stats.directories, 1);
    assert_eq!(report.stats.files_seen(), 2);

    // The footer is still written, carrying the partial counters.
    assert!(log.contains("removed_bytes\t100"));
    assert!(log.ends_with("purge_success\tfalse\n"));
}

#[test]
fn multi_page_listing_is_consumed_exactly_once() {
    let fs = MemoryFs::new("/scratch");
    for i in 0..7 {
        fs.add_file(&format!("/scratch/f{i}"), 10, CUTOFF - 1, CUTOFF - 1);
    }

    let mut opts = options("/scratch");
    opts.page_limit = 2;
    let (report, _) = run(&fs, &opts);

    assert!(report.success);
    assert_eq!(report.stats.removed_files, 7);
    assert_eq!(report.stats.removed_bytes, 70);
    // 7 entries at 2 per page: 2+2+2+1, and the last page carries the end
    // token, so exactly four listing calls.
    assert_eq!(fs.list_calls(), 4);
}

#[test]
fn dry_run_counts_like_a_real_run_but_calls_nothing() {
    let real_fs = two_file_tree();
    let (real_report, _) = run(&real_fs, &options("/scratch"));

    let dry_fs = two_file_tree();
    let mut dry_opts = options("/scratch");
    dry_opts.dry_run = true;
    let (dry_report, _) = run(&dry_fs, &dry_opts);

    assert_eq!(dry_report.stats, real_report.stats);
    assert_eq!(dry_fs.remove_calls(), 0);
    assert!(dry_fs.contains("/scratch/file1"));

    // A second dry run over the untouched tree reproduces the statistics.
    let (again, _) = run(&dry_fs, &dry_opts);
    assert_eq!(again.stats, dry_report.stats);
    assert_eq!(dry_fs.remove_calls(), 0);
}

#[test]
fn symlinks_and_unrecognized_entries_are_counted_not_removed() {
    let fs = MemoryFs::new("/scratch");
    fs.add_symlink("/scratch/link");
    fs.add_other("/scratch/socket");
    fs.add_file("/scratch/old", 50, CUTOFF - 1, CUTOFF - 1);

    let (report, _) = run(&fs, &options("/scratch"));

    assert!(report.success);
    assert_eq!(report.stats.symlinks, 1);
    assert_eq!(report.stats.unknown, 1);
    assert_eq!(report.stats.removed_files, 1);
    assert!(fs.contains("/scratch/link"));
    assert!(fs.contains("/scratch/socket"));
    // Only the file contributed a removal call.
    assert_eq!(fs.remove_calls(), 1);
}

#[test]
fn audit_lines_interleave_between_header_and_footer() {
    let fs = MemoryFs::new("/scratch");
    fs.add_file("/scratch/a1", 100, CUTOFF - 1, CUTOFF - 1);
    fs.add_file("/scratch/a2", 200, CUTOFF + 1, CUTOFF + 1);

    let mut opts = options("/scratch");
    opts.log_removed = true;
    opts.log_kept = true;
    let (_, log) = run(&fs, &opts);

    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines[0], "directory\t/scratch");
    assert_eq!(lines[6], "R\t/scratch/a1");
    assert_eq!(lines[7], "K\t/scratch/a2");
    assert!(lines[8].starts_with("finish_time\t"));
    assert_eq!(*lines.last().unwrap(), "purge_success\ttrue");
}

#[test]
fn removed_line_is_emitted_even_when_the_removal_then_fails() {
    let fs = MemoryFs::new("/scratch");
    fs.add_file("/scratch/stuck", 100, CUTOFF - 1, CUTOFF - 1);
    fs.fail_removal_of("/scratch/stuck");

    let mut opts = options("/scratch");
    opts.log_removed = true;
    let (report, log) = run(&fs, &opts);

    assert!(log.contains("R\t/scratch/stuck"));
    assert_eq!(report.stats.failed_removed_files, 1);
    assert_eq!(report.stats.removed_files, 0);
}

#[test]
fn deeply_nested_tree_walks_to_completion() {
    let fs = MemoryFs::new("/r");
    let depth = 1900;
    let mut path = String::from("/r");
    for _ in 0..depth {
        path.push_str("/d");
    }
    fs.add_file(&format!("{path}/leaf"), 10, CUTOFF - 1, CUTOFF - 1);

    let (report, _) = run(&fs, &options("/r"));

    assert!(report.success);
    assert_eq!(report.stats.directories, depth);
    assert_eq!(report.stats.removed_files, 1);
}

#[test]
fn unknown_root_path_fails_before_the_walk() {
    let fs = MemoryFs::new("/scratch");
    let buf = SharedBuf::default();
    let mut audit = AuditLog::sink(Box::new(buf.clone()));
    let err = run_purge_with_log(&fs, &options("/elsewhere"), STARTED_AT, &mut audit)
        .expect_err("unknown root");
    assert!(matches!(err, PurgeError::Lookup { .. }));
    // Nothing was written: the failure precedes the header.
    assert!(buf.contents().is_empty());
}

#[test]
fn null_root_reference_short_circuits_the_walk() {
    let fs = MemoryFs::new("/scratch");
    let ctx = WalkContext {
        cutoff: CUTOFF,
        dry_run: false,
        log_removed: false,
        log_kept: false,
        page_limit: 60,
    };
    let mut stats = PurgeStats::default();
    let mut audit = AuditLog::sink(Box::new(std::io::sink()));

    let err = walk(
        &fs,
        "/scratch",
        ObjectRef::new(0, 0),
        &ctx,
        &mut stats,
        &mut audit,
    )
    .expect_err("null ref");
    assert!(matches!(err, PurgeError::InvalidReference { .. }));
    assert_eq!(stats, PurgeStats::default());
}
