pub mod attr;
pub mod audit;
pub mod error;
pub mod localfs;
pub mod memory;
pub mod model;
pub mod policy;
pub mod purge;
pub mod remote;
pub mod stats;
pub mod walk;

pub use attr::translate;
pub use audit::AuditLog;
pub use error::PurgeError;
pub use localfs::LocalFs;
pub use memory::MemoryFs;
pub use model::{
    epoch_to_rfc3339, EntryKind, EntryRecord, ObjectRef, WalkContext, DEFAULT_PAGE_LIMIT,
    MAX_PATH_BYTES,
};
pub use policy::{default_basis_time, is_removable, DAY_SECS, RETENTION_WINDOW_SECS};
pub use purge::{
    run_purge, run_purge_with_log, write_report, PurgeOptions, PurgeReport, DEFAULT_LOG_DIR,
    REPORT_VERSION,
};
pub use remote::{DirEntry, DirPage, PaginationToken, RawAttributes, RemoteFs, TypeTag};
pub use stats::{DerivedMetrics, PurgeStats};
pub use walk::walk;
