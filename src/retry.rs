//! Bounded retry for backend calls.
//!
//! Each attempt runs under the policy timeout. Transient failures are retried
//! with exponential backoff until the retry budget is spent; permanent
//! failures return immediately.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::debug;

use crate::error::BackendError;

const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Timeout and retry budget for one kind of backend call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total attempts = retries + 1)
    pub retries: u32,
    /// Upper bound on a single attempt
    pub timeout: Duration,
    /// Delay before the first retry; doubles per retry up to 5s
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            timeout: Duration::from_secs(30),
            backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Policy that makes exactly one attempt
    pub fn no_retry(timeout: Duration) -> Self {
        Self {
            retries: 0,
            timeout,
            backoff: Duration::ZERO,
        }
    }

    fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.min(16)).unwrap_or(u32::MAX);
        self.backoff.saturating_mul(factor).min(MAX_BACKOFF)
    }

    /// Run `call` until it succeeds, fails permanently, or the budget runs out.
    ///
    /// Returns the last error when every attempt failed.
    pub async fn run<T, F, Fut>(&self, backend: &'static str, mut call: F) -> Result<T, BackendError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let mut attempt = 0u32;
        loop {
            let outcome = match timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(BackendError::Timeout {
                    backend,
                    millis: self.timeout.as_millis() as u64,
                }),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.retries => {
                    let delay = self.delay_for(attempt);
                    attempt += 1;
                    debug!(
                        backend,
                        attempt,
                        retries = self.retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying backend call"
                    );
                    sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
