//! Bounded exponential-backoff retry wrapper.
//!
//! Policy is data, not code: the wrapper owns no provider logic, it just
//! re-invokes a closure while [`UpstreamError::is_retryable`] holds and the
//! attempt budget lasts.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::UpstreamError;

/// Retry policy: attempts and backoff shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first (default 3)
    pub max_attempts: u32,
    /// First backoff delay (default 1 s)
    pub base_delay: Duration,
    /// Backoff ceiling (default 10 s)
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    #[inline]
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry `n` (1-based): `min(base · 2^(n−1), max)`.
    #[must_use = "returns the backoff delay"]
    pub fn backoff_delay(&self, retry_number: u32) -> Duration {
        let factor = 2_u32.saturating_pow(retry_number.saturating_sub(1));
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// Run `operation` with this policy. The closure receives the 1-based
    /// attempt number.
    ///
    /// # Errors
    ///
    /// Returns the last error when all attempts are exhausted, or the first
    /// non-retryable error immediately.
    pub async fn run<T, F, Fut>(&self, label: &str, operation: F) -> Result<T, UpstreamError>
    where
        F: Fn(u32) -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        label,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying upstream call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
        }
    }

    #[test]
    fn test_backoff_shape() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(4));
        assert_eq!(policy.backoff_delay(4), Duration::from_secs(8));
        // Capped at the ceiling
        assert_eq!(policy.backoff_delay(5), Duration::from_secs(10));
        assert_eq!(policy.backoff_delay(10), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = fast_policy()
            .run("test", |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(UpstreamError::Timeout)
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy()
            .run("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(UpstreamError::Timeout) }
            })
            .await;
        assert!(matches!(result, Err(UpstreamError::Timeout)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy()
            .run("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(UpstreamError::Status {
                        status: 400,
                        body: "bad request".into(),
                    })
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
