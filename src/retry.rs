//! Exponential backoff for calls to third-party services.
use std::future::Future;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, the first call included.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delays slept between attempts: `base`, `2 * base`, `4 * base`, ... capped at `max_delay`.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let base_ms = self.base_delay.as_millis() as u64;

        // ExponentialBackoff yields `factor * 2^n` starting at n = 1, the base delay comes first
        std::iter::once(self.base_delay.min(self.max_delay))
            .chain(
                ExponentialBackoff::from_millis(2)
                    .factor(base_ms)
                    .max_delay(self.max_delay),
            )
            .take(self.max_attempts.saturating_sub(1) as usize)
    }
}

/// Runs `operation` until it succeeds, the error is not retryable or the policy runs
/// out of attempts. The last error is returned in the latter cases.
pub async fn retry_with_backoff<T, E, Op, Fut, C>(
    policy: &RetryPolicy,
    operation: Op,
    is_retryable: C,
) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: FnMut(&E) -> bool,
{
    RetryIf::spawn(policy.delays(), operation, is_retryable).await
}
