//! Execution-time observer for arbitrary async operations.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{error, info};

/// Awaits `fut` and returns its output together with the elapsed wall-clock time.
pub async fn timed<F: Future>(fut: F) -> (F::Output, Duration) {
    let start = Instant::now();
    let output = fut.await;
    (output, start.elapsed())
}

/// Awaits a fallible operation, logging its duration on success and the
/// error on failure. The result is passed through unchanged.
pub async fn observe<F, T, E>(operation: &str, fut: F) -> (Result<T, E>, Duration)
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    let (result, elapsed) = timed(fut).await;
    match &result {
        Ok(_) => info!(
            operation,
            elapsed_secs = elapsed.as_secs_f64(),
            "operation completed"
        ),
        Err(e) => error!(operation, error = %e, "operation failed"),
    }
    (result, elapsed)
}
