use std::future::Future;
use std::time::Duration;

use vigil_core::RemoteError;

use crate::error::{Stage, SyncError};

/// Race `operation` against `deadline`.
///
/// The deadline timer lives inside the returned future, so it is released
/// when the operation wins, when it fails, when the deadline fires, and when
/// the caller drops the future early. On timeout the operation itself is
/// dropped too.
///
/// # Errors
///
/// `SyncError::Timeout` if the deadline passes first, `SyncError::Remote` if
/// the operation fails.
pub async fn with_deadline<T, F>(
    operation: F,
    deadline: Duration,
    stage: Stage,
) -> Result<T, SyncError>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    match tokio::time::timeout(deadline, operation).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(SyncError::Remote { stage, source }),
        Err(_elapsed) => Err(SyncError::Timeout {
            stage,
            after: deadline,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn returns_value_when_operation_wins() {
        let result = with_deadline(
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, RemoteError>(7)
            },
            Duration::from_millis(8_000),
            Stage::Identity,
        )
        .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_with_stage_and_duration() {
        let started = tokio::time::Instant::now();
        let result = with_deadline(
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, RemoteError>(())
            },
            Duration::from_millis(8_000),
            Stage::Profile,
        )
        .await;

        let error = result.unwrap_err();
        assert!(matches!(
            error,
            SyncError::Timeout {
                stage: Stage::Profile,
                after
            } if after == Duration::from_millis(8_000)
        ));
        assert_eq!(started.elapsed(), Duration::from_millis(8_000));
    }

    #[tokio::test(start_paused = true)]
    async fn operation_failure_is_remote_error() {
        let result = with_deadline(
            async { Err::<(), _>(RemoteError::Malformed("bad json".into())) },
            Duration::from_millis(8_000),
            Stage::Profile,
        )
        .await;
        assert!(matches!(
            result,
            Err(SyncError::Remote {
                stage: Stage::Profile,
                source: RemoteError::Malformed(_)
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_operation_is_dropped() {
        let dropped = Arc::new(AtomicBool::new(false));
        let flag = DropFlag(Arc::clone(&dropped));
        let result = with_deadline(
            async move {
                let _flag = flag;
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, RemoteError>(())
            },
            Duration::from_millis(10),
            Stage::Identity,
        )
        .await;
        assert!(result.is_err());
        assert!(dropped.load(Ordering::SeqCst));
    }
}
