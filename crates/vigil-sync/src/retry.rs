//! Bounded self-healing retry.
//!
//! Each failure doubles the delay before the next automatic attempt, up to a
//! cap. After `max_attempts` consecutive failures nothing more is armed until
//! a success or an explicit [`RetryScheduler::reset`].

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::FailureKind;

/// What `on_failure` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// A retry timer was armed; `attempt` is the consecutive failure count.
    Armed { attempt: u32, delay: Duration },
    /// The failure cap is reached; automatic retries are suspended.
    Suspended { failures: u32 },
}

/// Snapshot of the scheduler for observers and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryStatus {
    pub consecutive_failures: u32,
    pub next_allowed_at: Option<Instant>,
    pub last_failure: Option<FailureKind>,
    /// A retry timer is waiting to fire.
    pub armed: bool,
}

#[derive(Debug, Default)]
struct RetryState {
    consecutive_failures: u32,
    next_allowed_at: Option<Instant>,
    last_failure: Option<FailureKind>,
    timer: Option<JoinHandle<()>>,
}

impl RetryState {
    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

#[derive(Debug)]
pub struct RetryScheduler {
    base: Duration,
    cap: Duration,
    max_attempts: u32,
    state: Mutex<RetryState>,
}

impl RetryScheduler {
    #[must_use]
    pub fn new(base: Duration, cap: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            cap,
            max_attempts,
            state: Mutex::new(RetryState::default()),
        }
    }

    /// `min(cap, base * 2^(failures - 1))`.
    #[must_use]
    pub fn backoff(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(31);
        self.base.saturating_mul(1_u32 << exponent).min(self.cap)
    }

    /// Record a failure and, unless the cap is reached, arm `retry` to run
    /// after the backoff delay. Any previously armed timer is replaced.
    ///
    /// `retry` should only hand work off (e.g. spawn a load) and return; the
    /// timer task may be aborted by a later `on_success` or `reset`.
    pub fn on_failure<F>(&self, kind: FailureKind, retry: F) -> RetryDecision
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut state = self.lock();
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        state.last_failure = Some(kind);
        state.disarm();

        let failures = state.consecutive_failures;
        if failures >= self.max_attempts {
            state.next_allowed_at = None;
            return RetryDecision::Suspended { failures };
        }

        let delay = self.backoff(failures);
        state.next_allowed_at = Some(Instant::now() + delay);
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            retry.await;
        }));
        RetryDecision::Armed {
            attempt: failures,
            delay,
        }
    }

    /// Clear the failure count and disarm any timer. Returns whether there was
    /// anything to clear.
    pub fn on_success(&self) -> bool {
        let mut state = self.lock();
        let was_failing = state.consecutive_failures > 0 || state.timer.is_some();
        state.consecutive_failures = 0;
        state.next_allowed_at = None;
        state.last_failure = None;
        state.disarm();
        was_failing
    }

    /// Same as a success: a qualifying event lifts any suspension.
    pub fn reset(&self) -> bool {
        self.on_success()
    }

    /// Disarm the timer but keep the failure count (teardown).
    pub fn disarm(&self) {
        self.lock().disarm();
    }

    #[must_use]
    pub fn status(&self) -> RetryStatus {
        let state = self.lock();
        RetryStatus {
            consecutive_failures: state.consecutive_failures,
            next_allowed_at: state.next_allowed_at,
            last_failure: state.last_failure,
            armed: state.timer.as_ref().is_some_and(|timer| !timer.is_finished()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RetryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scheduler() -> RetryScheduler {
        RetryScheduler::new(Duration::from_secs(1), Duration::from_secs(8), 3)
    }

    fn counting(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let retry = RetryScheduler::new(Duration::from_secs(1), Duration::from_secs(8), 10);
        assert_eq!(retry.backoff(1), Duration::from_secs(1));
        assert_eq!(retry.backoff(2), Duration::from_secs(2));
        assert_eq!(retry.backoff(3), Duration::from_secs(4));
        assert_eq!(retry.backoff(4), Duration::from_secs(8));
        assert_eq!(retry.backoff(5), Duration::from_secs(8));
        assert_eq!(retry.backoff(u32::MAX), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn first_failure_arms_base_delay() {
        let retry = scheduler();
        let fired = Arc::new(AtomicUsize::new(0));

        let decision = retry.on_failure(FailureKind::Timeout, counting(&fired));
        assert_eq!(
            decision,
            RetryDecision::Armed {
                attempt: 1,
                delay: Duration::from_secs(1)
            }
        );
        let status = retry.status();
        assert!(status.armed);
        assert_eq!(status.last_failure, Some(FailureKind::Timeout));
        assert_eq!(
            status.next_allowed_at,
            Some(Instant::now() + Duration::from_secs(1))
        );

        tokio::time::sleep(Duration::from_millis(1_010)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!retry.status().armed);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_previous_timer() {
        let retry = scheduler();
        let fired = Arc::new(AtomicUsize::new(0));

        retry.on_failure(FailureKind::Remote, counting(&fired));
        retry.on_failure(FailureKind::Remote, counting(&fired));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn suspends_at_max_attempts() {
        let retry = scheduler();
        let fired = Arc::new(AtomicUsize::new(0));

        retry.on_failure(FailureKind::Timeout, counting(&fired));
        retry.on_failure(FailureKind::Timeout, counting(&fired));
        let decision = retry.on_failure(FailureKind::Timeout, counting(&fired));
        assert_eq!(decision, RetryDecision::Suspended { failures: 3 });

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        let status = retry.status();
        assert_eq!(status.consecutive_failures, 3);
        assert!(!status.armed);
        assert_eq!(status.next_allowed_at, None);
    }

    #[tokio::test(start_paused = true)]
    async fn success_resets_and_disarms() {
        let retry = scheduler();
        let fired = Arc::new(AtomicUsize::new(0));

        retry.on_failure(FailureKind::Remote, counting(&fired));
        assert!(retry.on_success());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        let status = retry.status();
        assert_eq!(status.consecutive_failures, 0);
        assert!(!status.armed);
        assert!(!retry.on_success());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_lifts_suspension() {
        let retry = scheduler();
        let fired = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            retry.on_failure(FailureKind::Timeout, counting(&fired));
        }
        assert!(retry.reset());

        let decision = retry.on_failure(FailureKind::Timeout, counting(&fired));
        assert_eq!(
            decision,
            RetryDecision::Armed {
                attempt: 1,
                delay: Duration::from_secs(1)
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn disarm_keeps_failure_count() {
        let retry = scheduler();
        let fired = Arc::new(AtomicUsize::new(0));
        retry.on_failure(FailureKind::Remote, counting(&fired));
        retry.disarm();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(retry.status().consecutive_failures, 1);
    }
}
