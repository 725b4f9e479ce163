//! Single-unit transfer.
//!
//! [`execute`] never returns an error: every fault is folded into a
//! [`TransferOutcome::Failure`](crate::TransferOutcome::Failure) so one unit
//! cannot abort its siblings.

use std::path::Path;

use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::SessionError;
use crate::session::RemoteSession;
use crate::types::{TransferDirection, TransferResult, TransferUnit};

/// Transfers one unit in the given direction.
pub async fn execute(
    session: &dyn RemoteSession,
    direction: TransferDirection,
    unit: &TransferUnit,
) -> TransferResult {
    let outcome = match direction {
        TransferDirection::Download => download(session, unit).await,
        TransferDirection::Upload => upload(session, unit).await,
    };

    match outcome {
        Ok(bytes) => {
            debug!(%direction, source = %unit.source, dest = %unit.dest, bytes, "unit transferred");
            TransferResult::success(unit.clone(), bytes)
        }
        Err(reason) => {
            warn!(%direction, source = %unit.source, %reason, "unit failed");
            TransferResult::failure(unit.clone(), reason)
        }
    }
}

async fn download(session: &dyn RemoteSession, unit: &TransferUnit) -> Result<u64, String> {
    // Open the remote side first so an unreadable source leaves no local file.
    let mut reader = session
        .read_file(&unit.source)
        .await
        .map_err(|e| reason(&e))?;

    let local = Path::new(&unit.dest);
    let mut file = tokio::fs::File::create(local)
        .await
        .map_err(|e| e.to_string())?;

    let copied = async {
        let n = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;
        Ok::<_, std::io::Error>(n)
    }
    .await;

    match copied {
        Ok(n) => Ok(n),
        Err(e) => {
            drop(file);
            if let Err(rm) = tokio::fs::remove_file(local).await {
                debug!(path = %unit.dest, error = %rm, "could not remove partial file");
            }
            Err(e.to_string())
        }
    }
}

async fn upload(session: &dyn RemoteSession, unit: &TransferUnit) -> Result<u64, String> {
    let local = Path::new(&unit.source);
    let meta = tokio::fs::metadata(local)
        .await
        .map_err(|e| e.to_string())?;
    if meta.is_dir() {
        return Err("is a directory".into());
    }

    let mut file = tokio::fs::File::open(local)
        .await
        .map_err(|e| e.to_string())?;
    let mut writer = session
        .write_file(&unit.dest)
        .await
        .map_err(|e| reason(&e))?;

    let n = tokio::io::copy(&mut file, &mut writer)
        .await
        .map_err(|e| e.to_string())?;
    writer.shutdown().await.map_err(|e| e.to_string())?;
    Ok(n)
}

/// Human-readable reason for a session fault.
fn reason(err: &SessionError) -> String {
    match err {
        SessionError::NotFound(_) => "no such file".into(),
        SessionError::PermissionDenied(_) => "permission denied".into(),
        other => other.to_string(),
    }
}
