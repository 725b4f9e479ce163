//! File and directory synchronization over a remote session.
//!
//! The scheduler resolves a source path into transfer units, runs each
//! unit through a worker (sequentially or on a bounded task pool) and
//! aggregates the per-unit outcomes into a [`TransferReport`].
//!
//! # Pipeline
//!
//! 1. **Resolve**: stat the source, list one directory level
//! 2. **Prepare**: create the destination directory for directory syncs
//! 3. **Dispatch**: hand every unit to a worker
//! 4. **Collect**: record each result exactly once

pub mod error;
pub mod resolver;
pub mod scheduler;
pub mod session;
pub mod timing;
pub mod types;
mod validation;
pub mod worker;

#[cfg(test)]
mod testing;

pub use error::{DestinationCause, ResolveError, SessionError, SyncError};
pub use resolver::{Resolution, resolve};
pub use scheduler::{CANCELLED, SyncOptions, TransferScheduler, default_pool_size};
pub use session::{
    EntryKind, RemoteMetadata, RemoteReader, RemoteSession, RemoteWriter, SessionFuture,
    ensure_remote_dir, join_remote,
};
pub use timing::{observe, timed};
pub use types::{
    ConcurrencyMode, PathKind, SyncEvent, SyncPhase, TransferDirection, TransferOutcome,
    TransferReport, TransferResult, TransferUnit, UnitKind,
};
pub use validation::{InvalidEntryName, validate_entry_name};
pub use worker::execute;
