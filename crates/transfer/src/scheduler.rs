//! Transfer scheduler.
//!
//! Drives one sync through `Resolving -> Dispatching -> Collecting -> Done`,
//! records every unit's result exactly once and emits [`SyncEvent`]s as it
//! goes.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::{DestinationCause, SyncError};
use crate::resolver::{Resolution, resolve};
use crate::session::{RemoteSession, ensure_remote_dir};
use crate::types::{
    ConcurrencyMode, SyncEvent, SyncPhase, TransferDirection, TransferReport, TransferResult,
    TransferUnit,
};
use crate::worker::execute;

/// Failure reason recorded for units skipped after cancellation.
pub const CANCELLED: &str = "cancelled";

/// Returns the default worker pool size: twice the available parallelism, at least 2.
pub fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_mul(2)
        .max(2)
}

/// Scheduler tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Maximum number of workers running at once in [`ConcurrencyMode::ThreadPool`].
    pub pool_size: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
        }
    }
}

/// Runs syncs over one shared remote session.
pub struct TransferScheduler {
    session: Arc<dyn RemoteSession>,
    options: SyncOptions,
    events_tx: Option<mpsc::UnboundedSender<SyncEvent>>,
    phase: Mutex<SyncPhase>,
    cancel: CancellationToken,
}

impl TransferScheduler {
    /// Creates a scheduler with default options.
    pub fn new(session: Arc<dyn RemoteSession>) -> Self {
        Self::with_options(session, SyncOptions::default())
    }

    pub fn with_options(session: Arc<dyn RemoteSession>, options: SyncOptions) -> Self {
        Self {
            session,
            options,
            events_tx: None,
            phase: Mutex::new(SyncPhase::Idle),
            cancel: CancellationToken::new(),
        }
    }

    /// Opens the event channel and returns its receiver. Can only be called once.
    ///
    /// Events are only produced once a receiver exists; nothing emitted
    /// before this call is replayed.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<SyncEvent>> {
        if self.events_tx.is_some() {
            return None;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.events_tx = Some(tx);
        Some(rx)
    }

    /// Current phase. `Idle` before the first sync and after a failed one.
    pub fn phase(&self) -> SyncPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cancellation token. Units not yet started when it fires
    /// are recorded as failed with reason [`CANCELLED`].
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Synchronizes `source` to `dest`.
    ///
    /// Only whole-sync setup failures are returned as errors: an unresolvable
    /// remote source or a destination directory that cannot be created.
    /// Every per-unit fault ends up in [`TransferReport::failed`]. After a
    /// setup failure the scheduler is back in [`SyncPhase::Idle`].
    pub async fn sync(
        &self,
        direction: TransferDirection,
        source: &str,
        dest: &str,
        mode: ConcurrencyMode,
    ) -> Result<TransferReport, SyncError> {
        self.enter(SyncPhase::Resolving);
        let resolution = match self.setup(direction, source, dest).await {
            Ok(resolution) => resolution,
            Err(e) => {
                self.enter(SyncPhase::Idle);
                return Err(e);
            }
        };

        let units = resolution.into_units();
        info!(
            %direction,
            source,
            dest,
            units = units.len(),
            ?mode,
            "dispatching units"
        );

        self.enter(SyncPhase::Dispatching);
        let report = match mode {
            ConcurrencyMode::Sequential => self.run_sequential(direction, units).await,
            ConcurrencyMode::ThreadPool => self.run_pool(direction, units).await,
        };
        self.enter(SyncPhase::Done);

        info!(
            %direction,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            bytes = report.bytes_transferred,
            "sync finished"
        );
        Ok(report)
    }

    async fn setup(
        &self,
        direction: TransferDirection,
        source: &str,
        dest: &str,
    ) -> Result<Resolution, SyncError> {
        let resolution = resolve(self.session.as_ref(), direction, source, dest)
            .await
            .inspect_err(|e| error!(%direction, source, error = %e, "resolution failed"))?;

        if let Resolution::Directory(_) = resolution {
            self.prepare_destination(direction, dest).await?;
        }
        Ok(resolution)
    }

    async fn prepare_destination(
        &self,
        direction: TransferDirection,
        dest: &str,
    ) -> Result<(), SyncError> {
        let created: Result<(), DestinationCause> = match direction {
            TransferDirection::Download => tokio::fs::create_dir_all(dest)
                .await
                .map_err(Into::into),
            TransferDirection::Upload => ensure_remote_dir(self.session.as_ref(), dest)
                .await
                .map_err(Into::into),
        };

        created.map_err(|source| {
            error!(%direction, dest, error = %source, "cannot create destination directory");
            SyncError::DestinationCreate {
                path: dest.to_string(),
                source,
            }
        })?;
        debug!(%direction, dest, "destination directory ready");
        Ok(())
    }

    /// Dispatches and collects in lockstep on the calling task.
    async fn run_sequential(
        &self,
        direction: TransferDirection,
        units: Vec<TransferUnit>,
    ) -> TransferReport {
        self.enter(SyncPhase::Collecting);
        let mut report = TransferReport::default();
        for unit in units {
            let result = if self.cancel.is_cancelled() {
                TransferResult::failure(unit, CANCELLED)
            } else {
                execute(self.session.as_ref(), direction, &unit).await
            };
            self.record(&mut report, direction, result);
        }
        report
    }

    /// Submits every unit to a `JoinSet` bounded by a semaphore, then drains it.
    ///
    /// The set is dropped on return, which aborts anything still queued.
    async fn run_pool(&self, direction: TransferDirection, units: Vec<TransferUnit>) -> TransferReport {
        let permits = Arc::new(Semaphore::new(self.options.pool_size.max(1)));
        let mut workers = JoinSet::new();

        for (index, unit) in units.iter().cloned().enumerate() {
            let session = Arc::clone(&self.session);
            let permits = Arc::clone(&permits);
            let cancel = self.cancel.clone();

            workers.spawn(async move {
                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    permit = permits.acquire_owned() => permit.ok(),
                };
                let result = match permit {
                    Some(_permit) if !cancel.is_cancelled() => {
                        execute(session.as_ref(), direction, &unit).await
                    }
                    _ => TransferResult::failure(unit, CANCELLED),
                };
                (index, result)
            });
        }
        self.enter(SyncPhase::Collecting);

        let mut report = TransferReport::default();
        let mut recorded = vec![false; units.len()];
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((index, result)) => {
                    recorded[index] = true;
                    self.record(&mut report, direction, result);
                }
                Err(e) => error!(%direction, error = %e, "worker task failed"),
            }
        }

        // A panicked worker never returned its result; account for it here.
        for (unit, done) in units.into_iter().zip(recorded) {
            if !done {
                let result = TransferResult::failure(unit, "worker task failed");
                self.record(&mut report, direction, result);
            }
        }
        report
    }

    fn record(&self, report: &mut TransferReport, direction: TransferDirection, result: TransferResult) {
        if self.events_tx.is_some() {
            self.emit(SyncEvent::UnitFinished {
                direction,
                result: result.clone(),
            });
        }
        report.record(result);
    }

    fn enter(&self, phase: SyncPhase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
        self.emit(SyncEvent::Phase(phase));
    }

    fn emit(&self, event: SyncEvent) {
        if let Some(tx) = &self.events_tx {
            // A dropped receiver discards events.
            let _ = tx.send(event);
        }
    }
}
