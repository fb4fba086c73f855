//! Retry helper for transient service failures, with exponential backoff
//! and jitter so parallel downloads never hammer the service in lockstep.

use std::future::Future;
use std::time::Duration;

use rand::Rng as _;
use tracing::warn;

/// Verdict from the error classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    Retry,
    Abort,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay before the given retry (0-indexed):
    /// `min(base * 2^retry, max) + jitter(0..base)`.
    fn delay_for(&self, retry: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(2u32.saturating_pow(retry));
        let capped = exp.min(self.max_delay);
        let jitter = if self.base_delay.is_zero() {
            Duration::ZERO
        } else {
            rand::thread_rng().gen_range(Duration::ZERO..self.base_delay)
        };
        capped + jitter
    }
}

/// Runs `run` until it succeeds, the classifier says `Abort`, or the retry
/// budget is spent. The final error is returned as-is.
pub async fn retry_with_backoff<T, E, F, Fut, C>(
    policy: RetryPolicy,
    operation: &str,
    mut run: F,
    classify: C,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> RetryAction,
    E: std::fmt::Display,
{
    let mut attempt: u32 = 0;
    loop {
        match run().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt >= policy.max_retries || classify(&e) == RetryAction::Abort {
                    return Err(e);
                }
                let delay = policy.delay_for(attempt);
                warn!(
                    "{operation} failed (attempt {} of {}): {e}; retrying in {:.1}s",
                    attempt + 1,
                    policy.max_retries + 1,
                    delay.as_secs_f64()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn returns_first_success() {
        let result: Result<i32, String> =
            retry_with_backoff(fast(), "op", || async { Ok(42) }, |_| RetryAction::Retry).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<i32, String> = retry_with_backoff(
            fast(),
            "op",
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("transient".to_string())
                } else {
                    Ok(7)
                }
            },
            |_| RetryAction::Retry,
        )
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn abort_stops_after_the_first_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<i32, String> = retry_with_backoff(
            fast(),
            "op",
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("fatal".to_string())
            },
            |_| RetryAction::Abort,
        )
        .await;
        assert_eq!(result.unwrap_err(), "fatal");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_the_retry_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<i32, String> = retry_with_backoff(
            fast(),
            "op",
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("still failing".to_string())
            },
            |_| RetryAction::Retry,
        )
        .await;
        assert_eq!(result.unwrap_err(), "still failing");
        // 1 initial attempt + 2 retries.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn delay_grows_exponentially_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(25),
        };
        let first = policy.delay_for(0).as_millis();
        assert!((10..20).contains(&first), "first delay was {first}ms");

        let second = policy.delay_for(1).as_millis();
        assert!((20..30).contains(&second), "second delay was {second}ms");

        let capped = policy.delay_for(5).as_millis();
        assert!((25..35).contains(&capped), "capped delay was {capped}ms");
    }

    #[test]
    fn zero_base_delay_stays_zero() {
        let policy = RetryPolicy {
            max_retries: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::from_secs(60),
        };
        assert_eq!(policy.delay_for(0), Duration::ZERO);
    }
}
