//! Run orchestration: connect, sync, print, close.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use capysync_sftp::{ConnectOptions, SftpRemote};
use capysync_transfer::{
    RemoteSession, SyncEvent, SyncOptions, TransferScheduler, default_pool_size, observe,
};
use tracing::{info, warn};

use crate::config::Config;
use crate::prompt::SyncRequest;

/// Final state of a run, mapped onto the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every unit transferred (or there was nothing to do).
    Success,
    /// At least one unit failed.
    PartialFailure,
    /// The prompts received an unusable answer.
    InvalidInput,
    /// Connection or authentication failed.
    ConnectFailed,
    /// Resolution or destination creation failed.
    SyncFailed,
}

impl RunStatus {
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::PartialFailure => 1,
            Self::InvalidInput => 2,
            Self::ConnectFailed => 3,
            Self::SyncFailed => 4,
        }
    }
}

impl From<RunStatus> for ExitCode {
    fn from(status: RunStatus) -> Self {
        ExitCode::from(status.code())
    }
}

/// Connects to the server and runs the requested sync.
pub async fn run(config: &Config, request: SyncRequest) -> anyhow::Result<RunStatus> {
    let mut options = ConnectOptions::new(&request.host, request.port, &request.username)
        .with_password(&request.password);
    options.allowed_fingerprints = config.allowed_fingerprints.clone();
    options.inactivity_timeout = Some(Duration::from_secs(config.inactivity_timeout));

    let remote = match SftpRemote::connect(&options).await {
        Ok(remote) => remote,
        Err(e) => {
            eprintln!("Error connecting to SFTP server: {e}");
            return Ok(RunStatus::ConnectFailed);
        }
    };
    let session: Arc<dyn RemoteSession> = Arc::new(remote);

    let sync_options = SyncOptions {
        pool_size: config.pool_size.unwrap_or_else(default_pool_size),
    };
    run_session(session, sync_options, &request, std::io::stdout()).await
}

/// Runs the sync and closes the session, whether or not the run failed.
pub async fn run_session<W>(
    session: Arc<dyn RemoteSession>,
    options: SyncOptions,
    request: &SyncRequest,
    out: W,
) -> anyhow::Result<RunStatus>
where
    W: Write + Send + 'static,
{
    let outcome = run_sync(Arc::clone(&session), options, request, out).await;
    if let Err(e) = session.close().await {
        warn!(error = %e, "failed to close session cleanly");
    }
    outcome
}

/// Runs one sync over an open session, printing per-unit lines to `out`
/// as units complete, then the summary.
pub async fn run_sync<W>(
    session: Arc<dyn RemoteSession>,
    options: SyncOptions,
    request: &SyncRequest,
    out: W,
) -> anyhow::Result<RunStatus>
where
    W: Write + Send + 'static,
{
    let mut scheduler = TransferScheduler::with_options(session, options);
    let mut events = scheduler
        .take_events()
        .ok_or_else(|| anyhow::anyhow!("scheduler events already taken"))?;

    let printer = tokio::spawn(async move {
        let mut out = out;
        let mut write_failed = false;
        while let Some(event) = events.recv().await {
            if let SyncEvent::UnitFinished { direction, result } = event {
                if let Err(e) = writeln!(out, "{}", result.describe(direction)) {
                    if !write_failed {
                        warn!(error = %e, "cannot write report line, further lines are dropped");
                        write_failed = true;
                    }
                }
            }
        }
        out
    });

    let cancel = scheduler.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, skipping units not yet started");
            cancel.cancel();
        }
    });

    let (source, dest) = request.endpoints();
    let (result, elapsed) = observe(
        "sync",
        scheduler.sync(request.direction, source, dest, request.mode),
    )
    .await;
    interrupt.abort();

    // Dropping the scheduler closes the event channel and lets the printer finish.
    drop(scheduler);
    let mut out = printer.await?;

    let status = match result {
        Ok(report) => {
            writeln!(out, "{}", report.summary())?;
            writeln!(out, "Execution time: {:.6} seconds", elapsed.as_secs_f64())?;
            info!(
                direction = %request.direction,
                total = report.total(),
                failed = report.failed.len(),
                "run complete"
            );
            if report.is_success() {
                RunStatus::Success
            } else {
                RunStatus::PartialFailure
            }
        }
        Err(e) => {
            writeln!(
                out,
                "Error {} {source}: {e}",
                request.direction.progressive()
            )?;
            RunStatus::SyncFailed
        }
    };
    out.flush()?;
    Ok(status)
}
