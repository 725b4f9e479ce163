//! Data model shared by the resolver, the worker and the scheduler.

use std::fmt;

/// Which side holds the source of a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferDirection {
    /// Local source, remote destination.
    Upload,
    /// Remote source, local destination.
    Download,
}

impl TransferDirection {
    /// Past-tense verb used in success lines ("Uploaded", "Downloaded").
    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Upload => "Uploaded",
            Self::Download => "Downloaded",
        }
    }

    /// Progressive verb used in failure lines ("uploading", "downloading").
    pub fn progressive(self) -> &'static str {
        match self {
            Self::Upload => "uploading",
            Self::Download => "downloading",
        }
    }
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upload => f.write_str("upload"),
            Self::Download => f.write_str("download"),
        }
    }
}

/// Dispatch policy for the units of one sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConcurrencyMode {
    /// One unit at a time, in resolution order.
    Sequential,
    /// All units submitted to a bounded task pool.
    #[default]
    ThreadPool,
}

/// Kind of a transfer unit. Units are always leaf files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    File,
}

/// Kind of a source path, resolved once by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    File,
    Directory,
}

/// One file-level transfer job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransferUnit {
    /// Path on the source side (remote for downloads, local for uploads).
    pub source: String,
    /// Path on the destination side.
    pub dest: String,
    pub kind: UnitKind,
}

impl TransferUnit {
    /// Creates a file unit.
    pub fn file(source: impl Into<String>, dest: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
            kind: UnitKind::File,
        }
    }
}

/// Outcome of one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The destination holds the source content.
    Success { bytes: u64 },
    /// The transfer failed; the reason is human-readable.
    Failure(String),
}

/// Result of executing one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    pub unit: TransferUnit,
    pub outcome: TransferOutcome,
}

impl TransferResult {
    pub fn success(unit: TransferUnit, bytes: u64) -> Self {
        Self {
            unit,
            outcome: TransferOutcome::Success { bytes },
        }
    }

    pub fn failure(unit: TransferUnit, reason: impl Into<String>) -> Self {
        Self {
            unit,
            outcome: TransferOutcome::Failure(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, TransferOutcome::Success { .. })
    }

    /// Formats the per-unit report line for the given direction.
    ///
    /// - `Downloaded: {source} to {dest}`
    /// - `Error downloading {source}: {reason}`
    pub fn describe(&self, direction: TransferDirection) -> String {
        match &self.outcome {
            TransferOutcome::Success { .. } => format!(
                "{}: {} to {}",
                direction.past_tense(),
                self.unit.source,
                self.unit.dest
            ),
            TransferOutcome::Failure(reason) => format!(
                "Error {} {}: {}",
                direction.progressive(),
                self.unit.source,
                reason
            ),
        }
    }
}

/// Aggregated outcome of one sync call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferReport {
    /// Units that completed, in arrival order.
    pub succeeded: Vec<TransferUnit>,
    /// Units that failed with their reasons, in arrival order.
    pub failed: Vec<(TransferUnit, String)>,
    /// Total bytes written by successful units.
    pub bytes_transferred: u64,
}

impl TransferReport {
    /// Appends one result to the matching sequence.
    pub fn record(&mut self, result: TransferResult) {
        match result.outcome {
            TransferOutcome::Success { bytes } => {
                self.bytes_transferred += bytes;
                self.succeeded.push(result.unit);
            }
            TransferOutcome::Failure(reason) => self.failed.push((result.unit, reason)),
        }
    }

    /// Number of units accounted for.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Returns `true` when no unit failed (an empty report counts).
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// One-line summary printed after a sync.
    pub fn summary(&self) -> String {
        format!(
            "{} succeeded, {} failed ({} bytes)",
            self.succeeded.len(),
            self.failed.len(),
            self.bytes_transferred
        )
    }
}

/// Scheduler state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Resolving,
    Dispatching,
    Collecting,
    Done,
}

/// Event emitted by the scheduler while a sync runs.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// The scheduler entered a new phase.
    Phase(SyncPhase),
    /// A unit finished and was recorded in the report.
    UnitFinished {
        direction: TransferDirection,
        result: TransferResult,
    },
}
