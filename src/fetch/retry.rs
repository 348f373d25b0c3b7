//! Bounded exponential backoff with full jitter
//!
//! Wraps a single network attempt and re-runs it on retryable failures,
//! sleeping a random delay in `[0, base * 2^attempt]` between attempts.
//! Cancellation is honoured before every attempt and during every sleep.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::Failure;

/// Retries allowed after the first attempt
pub const MAX_RETRIES: u32 = 3;

/// Backoff cap for the first retry, in milliseconds
pub const BASE_DELAY_MS: u64 = 500;

/// Retry limits for one call of [`RetryPolicy::run`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts are `max_retries + 1`
    pub max_retries: u32,
    /// Backoff cap for the first retry
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_delay: Duration::from_millis(BASE_DELAY_MS),
        }
    }
}

/// Progress of one retrier call
#[derive(Debug)]
struct RetryState {
    attempt: u32,
    last_error: Option<Failure>,
}

impl RetryPolicy {
    /// Creates a policy with explicit limits
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Upper bound of the backoff before retry number `attempt + 1`
    pub fn backoff_cap(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Draws the full-jitter delay for the given attempt
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let cap_ms = u64::try_from(self.backoff_cap(attempt).as_millis()).unwrap_or(u64::MAX);
        if cap_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=cap_ms))
    }

    /// Runs `operation` until it succeeds, fails fatally, or retries run out.
    ///
    /// Attempts are strictly sequential. A failure is propagated without delay
    /// when it is not retryable, when `token` has been cancelled (reported as
    /// [`Failure::Cancelled`]), or when it came from the last allowed attempt.
    ///
    /// # Returns
    /// * `Ok(T)` - The first successful attempt
    /// * `Err(Failure)` - The last failure observed
    pub async fn run<T, F, Fut>(&self, token: &CancellationToken, mut operation: F) -> Result<T, Failure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Failure>>,
    {
        let mut state = RetryState {
            attempt: 0,
            last_error: None,
        };

        loop {
            if token.is_cancelled() {
                return Err(Failure::Cancelled);
            }

            let failure = match operation().await {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };

            if token.is_cancelled() {
                return Err(Failure::Cancelled);
            }
            if !failure.is_retryable() || state.attempt >= self.max_retries {
                debug!(attempt = state.attempt, error = %failure, "Giving up on request");
                return Err(failure);
            }

            let delay = self.backoff_delay(state.attempt);
            warn!(
                attempt = state.attempt + 1,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "Request failed, retrying"
            );
            state.last_error = Some(failure);

            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(last_error = ?state.last_error, "Cancelled during backoff");
                    return Err(Failure::Cancelled);
                }
                _ = tokio::time::sleep(delay) => {}
            }

            state.attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn counting_failure(
        calls: &Arc<AtomicU32>,
        failure: Failure,
    ) -> impl FnMut() -> std::future::Ready<Result<(), Failure>> {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Err(failure.clone()))
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_backoff_cap_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_cap(0), Duration::from_millis(500));
        assert_eq!(policy.backoff_cap(1), Duration::from_millis(1000));
        assert_eq!(policy.backoff_cap(2), Duration::from_millis(2000));
    }

    #[test]
    fn test_backoff_delay_within_cap() {
        let policy = RetryPolicy::default();
        for attempt in 0..3 {
            for _ in 0..50 {
                assert!(policy.backoff_delay(attempt) <= policy.backoff_cap(attempt));
            }
        }
    }

    #[test]
    fn test_backoff_cap_saturates() {
        let policy = RetryPolicy::new(3, Duration::from_millis(500));
        assert!(policy.backoff_cap(64) >= policy.backoff_cap(10));
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let token = CancellationToken::new();
        let result = RetryPolicy::default()
            .run(&token, || async { Ok::<_, Failure>(7) })
            .await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_failure_attempted_max_retries_plus_one() {
        let calls = Arc::new(AtomicU32::new(0));
        let token = CancellationToken::new();

        let result = RetryPolicy::default()
            .run(&token, counting_failure(&calls, Failure::from_status(503)))
            .await;

        assert_eq!(result, Err(Failure::from_status(503)));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_failure_short_circuits_without_delay() {
        let calls = Arc::new(AtomicU32::new(0));
        let token = CancellationToken::new();
        let started = Instant::now();

        let result = RetryPolicy::default()
            .run(&token, counting_failure(&calls, Failure::from_status(404)))
            .await;

        assert_eq!(result, Err(Failure::from_status(404)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let token = CancellationToken::new();
        let counter = Arc::clone(&calls);

        let result = RetryPolicy::default()
            .run(&token, move || {
                let call = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call < 2 {
                        Err(Failure::transient("connection reset"))
                    } else {
                        Ok("page")
                    }
                }
            })
            .await;

        assert_eq!(result, Ok("page"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_backoff_bounded_by_caps() {
        let calls = Arc::new(AtomicU32::new(0));
        let token = CancellationToken::new();
        let policy = RetryPolicy::default();
        let started = Instant::now();

        let _ = policy
            .run(&token, counting_failure(&calls, Failure::from_status(500)))
            .await;

        let max_total = policy.backoff_cap(0) + policy.backoff_cap(1) + policy.backoff_cap(2);
        assert!(started.elapsed() <= max_total);
    }

    #[tokio::test]
    async fn test_already_cancelled_token_skips_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let token = CancellationToken::new();
        token.cancel();

        let result = RetryPolicy::default()
            .run(&token, counting_failure(&calls, Failure::from_status(503)))
            .await;

        assert_eq!(result, Err(Failure::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_aborts_backoff_sleep() {
        let calls = Arc::new(AtomicU32::new(0));
        let token = CancellationToken::new();
        let policy = RetryPolicy::new(3, Duration::from_secs(3600));

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let started = Instant::now();
        let result = policy
            .run(&token, counting_failure(&calls, Failure::from_status(503)))
            .await;

        assert_eq!(result, Err(Failure::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_failure_after_cancel_is_reported_as_cancelled() {
        let token = CancellationToken::new();
        let inner = token.clone();

        let result: Result<(), Failure> = RetryPolicy::default()
            .run(&token, move || {
                inner.cancel();
                std::future::ready(Err(Failure::from_status(500)))
            })
            .await;

        assert_eq!(result, Err(Failure::Cancelled));
    }
}
