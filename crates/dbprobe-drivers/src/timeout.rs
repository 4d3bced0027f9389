//! Deadline and cancellation enforcement for database operations
//!
//! Every probe step races its future against the configured timeout and the
//! caller's [`CancellationToken`]. The losing future is dropped, which releases
//! any checked-out connection and aborts in-flight client I/O.

use std::future::Future;
use std::time::Duration;

use dbprobe_core::{BoxError, OperationError};
use tokio_util::sync::CancellationToken;

/// Run `fut` until it completes, `limit` elapses, or `ctx` is cancelled.
pub async fn deadline<F, T>(
    ctx: &CancellationToken,
    limit: Duration,
    fut: F,
) -> Result<T, OperationError>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(OperationError::Cancelled),
        res = tokio::time::timeout(limit, fut) => res.map_err(|_| OperationError::TimedOut(limit)),
    }
}

/// [`deadline`] for fallible client calls, folding the client error in
pub async fn bounded<F, T, E>(
    ctx: &CancellationToken,
    limit: Duration,
    fut: F,
) -> Result<T, OperationError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<BoxError>,
{
    deadline(ctx, limit, fut)
        .await?
        .map_err(OperationError::backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_success() {
        let ctx = CancellationToken::new();
        let value = bounded(&ctx, Duration::from_secs(1), async {
            Ok::<_, BoxError>(42)
        })
        .await
        .unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_bounded_backend_error() {
        let ctx = CancellationToken::new();
        let err = bounded(&ctx, Duration::from_secs(1), async {
            Err::<(), _>("connection reset")
        })
        .await
        .unwrap_err();
        assert!(matches!(err, OperationError::Backend(_)));
        assert_eq!(err.to_string(), "connection reset");
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_timeout() {
        let ctx = CancellationToken::new();
        let err = deadline(&ctx, Duration::from_millis(100), std::future::pending::<()>())
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::TimedOut(d) if d == Duration::from_millis(100)));
    }

    #[tokio::test]
    async fn test_cancellation_wins() {
        let ctx = CancellationToken::new();
        ctx.cancel();
        let err = deadline(&ctx, Duration::from_secs(60), std::future::pending::<()>())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancellation_during_wait() {
        let ctx = CancellationToken::new();
        let trigger = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let err = deadline(&ctx, Duration::from_secs(60), std::future::pending::<()>())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
