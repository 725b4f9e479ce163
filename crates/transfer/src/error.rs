//! Error types for sessions, resolution and whole-sync failures.
//!
//! Per-unit faults never appear here: the worker folds them into
//! [`TransferOutcome::Failure`](crate::TransferOutcome::Failure).

/// Errors reported by a [`RemoteSession`](crate::RemoteSession) implementation.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no such file: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("session closed")]
    Closed,
}

impl SessionError {
    /// Returns `true` if the error means the path does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Errors produced while expanding a source path into transfer units.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("remote path not found: {0}")]
    NotFound(String),

    #[error("failed to stat {path}: {source}")]
    Stat {
        path: String,
        #[source]
        source: SessionError,
    },

    #[error("failed to list {path}: {source}")]
    List {
        path: String,
        #[source]
        source: SessionError,
    },

    #[error("local I/O error on {path}: {source}")]
    LocalIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Underlying cause of a destination-create failure: an [`std::io::Error`]
/// for a local directory, a [`SessionError`] for a remote one.
pub type DestinationCause = Box<dyn std::error::Error + Send + Sync>;

/// Errors that abort a whole sync call. No report is produced.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("failed to create destination directory {path}: {source}")]
    DestinationCreate {
        path: String,
        #[source]
        source: DestinationCause,
    },
}
