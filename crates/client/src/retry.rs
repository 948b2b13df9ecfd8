//! Bounded exponential-backoff retry for rate-limited remote calls.
//!
//! Only errors that report throttling are retried. Anything else fails
//! fast on the first occurrence and is handed back unchanged, so callers
//! always see the original error kind.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Classifies an error as a rate-limit response.
pub trait RateLimited {
    fn is_rate_limited(&self) -> bool;
}

/// Tunable parameters for the backoff strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Fixed delay added to every backoff.
    pub base_delay: Duration,
    /// Unit that is doubled per attempt (one second in production).
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            ..Default::default()
        }
    }

    /// Wait before retrying after the given (1-based) failed attempt:
    /// `2^attempt * backoff_unit + base_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.backoff_unit
            .checked_mul(factor)
            .and_then(|backoff| backoff.checked_add(self.base_delay))
            .unwrap_or(Duration::MAX)
    }

    /// Run `action`, retrying while it fails with a rate-limit error and
    /// attempts remain.
    ///
    /// When the attempt budget is spent the last error is returned as is.
    pub async fn execute<F, Fut, T, E>(&self, mut action: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RateLimited + Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match action().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_rate_limited() && attempt < max_attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Rate limit hit, backing off before retry",
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    if err.is_rate_limited() {
                        tracing::warn!(attempt, error = %err, "Rate limit persisted after all attempts");
                    }
                    return Err(err);
                }
            }
        }
    }
}
