//! Time budget for subtests.

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

use crate::error::{Result, SpeedError};

/// Run `op`, giving up after `deadline`.
///
/// On expiry the operation future is dropped, which cancels whatever I/O it
/// had in flight, and [`SpeedError::DeadlineExceeded`] is returned.
pub async fn with_deadline<F, T>(deadline: Duration, op: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    // timeout returns Ok(inner_result) or Err(Elapsed)
    match timeout(deadline, op).await {
        Ok(inner) => inner,
        Err(_elapsed) => Err(SpeedError::DeadlineExceeded(deadline)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use tokio::time::{Instant, sleep};

    use super::*;

    struct SetOnDrop(Arc<AtomicBool>);

    impl Drop for SetOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_operation_times_out() {
        let start = Instant::now();
        let res: Result<()> = with_deadline(Duration::from_secs(5), async {
            sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;

        assert!(matches!(res, Err(SpeedError::DeadlineExceeded(d)) if d == Duration::from_secs(5)));
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn never_completing_operation_times_out() {
        let start = Instant::now();
        let res: Result<()> =
            with_deadline(Duration::from_millis(250), std::future::pending()).await;

        assert!(res.unwrap_err().is_deadline());
        assert_eq!(start.elapsed(), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_operation_is_cancelled() {
        let dropped = Arc::new(AtomicBool::new(false));
        let guard = SetOnDrop(dropped.clone());

        let res: Result<()> = with_deadline(Duration::from_secs(1), async move {
            let _guard = guard;
            sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;

        assert!(res.is_err());
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn fast_operation_passes_through() {
        let ok = with_deadline(Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err: Result<()> = with_deadline(Duration::from_secs(1), async {
            Err(SpeedError::UnexpectedReply("nope".into()))
        })
        .await;
        assert!(matches!(err, Err(SpeedError::UnexpectedReply(_))));
    }
}
