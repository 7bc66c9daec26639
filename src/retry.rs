//! Retry with linear backoff, shared by login and postbacks.

use std::time::Duration;

use futures::future::BoxFuture;
use tokio::time::sleep;
use tracing::warn;

use crate::error::AurionError;

/// Hook run between attempts. The session rotates its egress proxy here.
pub trait RetryHook {
    fn before_retry(&mut self, next_attempt: u32) -> Result<(), AurionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            step: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, step: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            step,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the `attempt`-th failure (1-based): `attempt × step`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.step * attempt
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. Non-retryable errors are returned as-is;
    /// exhaustion is reported through `exhausted(attempts, last_error)`.
    pub async fn run<S, T, F>(
        &self,
        target: &mut S,
        label: &str,
        mut op: F,
        exhausted: fn(u32, AurionError) -> AurionError,
    ) -> Result<T, AurionError>
    where
        S: RetryHook + Send,
        F: FnMut(&mut S) -> BoxFuture<'_, Result<T, AurionError>> + Send,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match op(target).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !err.is_retryable() {
                return Err(err);
            }
            if attempt >= self.max_attempts {
                return Err(exhausted(attempt, err));
            }

            let delay = self.backoff(attempt);
            warn!(
                operation = label,
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "attempt failed, retrying"
            );
            sleep(delay).await;
            target.before_retry(attempt + 1)?;
        }
    }
}
