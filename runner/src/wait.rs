/*!

A generic "wait until a predicate holds" utility. The coordinator uses it for
job-status polling; it works for any remote state observation that must be
polled, bounded by a timeout, and interruptible by a cancellation signal.

!*/

use std::fmt::{Debug, Display, Formatter};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

/// The `Error` type for [`wait_until`]. A predicate failure passes the predicate's error through,
/// preserving its type.
#[derive(Debug)]
pub enum WaitError<E>
where
    E: Debug + Display + Send + Sync + 'static,
{
    /// The predicate did not hold within the allowed duration.
    TimedOut { duration: Duration },
    /// The cancellation token was triggered while waiting.
    Canceled,
    /// The predicate itself failed.
    Predicate(E),
}

impl<E> std::error::Error for WaitError<E> where E: Debug + Display + Send + Sync + 'static {}

impl<E> Display for WaitError<E>
where
    E: Debug + Display + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitError::TimedOut { duration } => {
                write!(f, "condition did not hold within {:?}", duration)
            }
            WaitError::Canceled => write!(f, "wait was canceled"),
            WaitError::Predicate(e) => write!(f, "error while checking condition: {}", e),
        }
    }
}

/// Polls `predicate` every `interval` until it returns `Ok(true)`, the `timeout` elapses, or
/// `cancel` is triggered. The predicate is always checked at least once, and the timeout is
/// checked before sleeping so that a wait never overshoots its deadline by a whole interval.
pub async fn wait_until<F, Fut, E>(
    interval: Duration,
    timeout: Duration,
    cancel: &CancellationToken,
    mut predicate: F,
) -> Result<(), WaitError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: Debug + Display + Send + Sync + 'static,
{
    let deadline = Instant::now() + timeout;
    loop {
        if predicate().await.map_err(WaitError::Predicate)? {
            return Ok(());
        }
        if Instant::now() + interval > deadline {
            return Err(WaitError::TimedOut { duration: timeout });
        }
        tokio::select! {
            _ = cancel.cancelled() => return Err(WaitError::Canceled),
            _ = sleep(interval) => {}
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::Cell;

    const TICK: Duration = Duration::from_millis(5);

    #[tokio::test]
    async fn immediate_success() {
        let result: Result<(), WaitError<String>> = wait_until(
            TICK,
            Duration::from_millis(50),
            &CancellationToken::new(),
            || async { Ok(true) },
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn success_after_a_few_polls() {
        let count = Cell::new(0u32);
        let result: Result<(), WaitError<String>> = wait_until(
            TICK,
            Duration::from_secs(5),
            &CancellationToken::new(),
            || {
                count.set(count.get() + 1);
                let done = count.get() >= 3;
                async move { Ok(done) }
            },
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(count.get(), 3);
    }

    #[tokio::test]
    async fn never_true_times_out() {
        let result: Result<(), WaitError<String>> = wait_until(
            TICK,
            Duration::from_millis(25),
            &CancellationToken::new(),
            || async { Ok(false) },
        )
        .await;
        assert!(matches!(result, Err(WaitError::TimedOut { .. })));
    }

    #[tokio::test]
    async fn predicate_error_propagates() {
        let result: Result<(), WaitError<String>> = wait_until(
            TICK,
            Duration::from_millis(50),
            &CancellationToken::new(),
            || async { Err("boom".to_string()) },
        )
        .await;
        match result {
            Err(WaitError::Predicate(e)) => assert_eq!(e, "boom"),
            other => panic!("expected Predicate error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn cancellation_interrupts_the_wait() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result: Result<(), WaitError<String>> =
            wait_until(TICK, Duration::from_secs(60), &cancel, || async {
                Ok(false)
            })
            .await;
        assert!(matches!(result, Err(WaitError::Canceled)));
    }
}
