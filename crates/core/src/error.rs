use std::io;

use thiserror::Error;

/// Fatal walk errors. Any of these aborts the run; per-entry removal
/// failures are deliberately not represented here because they only feed the
/// failed-removal counters.
#[derive(Debug, Error)]
pub enum PurgeError {
    #[error("invalid object reference for {path}: null volume or handle")]
    InvalidReference { path: String },

    #[error("attributes for {path} are missing required field `{field}`")]
    MissingAttributes { path: String, field: &'static str },

    #[error("directory listing failed for {path}: {source}")]
    Enumeration {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to look up {path}: {source}")]
    Lookup {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot use {path} as a purge root: {reason}")]
    InvalidRoot { path: String, reason: String },

    #[error("path for entry `{name}` under {parent} exceeds {limit} bytes")]
    PathTooLong {
        name: String,
        parent: String,
        limit: usize,
    },

    #[error("could not open audit log {path}: {source}")]
    AuditOpen {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("audit log write failed: {source}")]
    Audit {
        #[source]
        source: io::Error,
    },
}
