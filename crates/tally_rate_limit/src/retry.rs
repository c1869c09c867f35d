//! Constant-delay retry of rate-limited attempts.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tally_error::RetryableError;
use tokio_retry2::strategy::FixedInterval;
use tokio_retry2::{Retry, RetryError};
use tracing::{debug, warn};

/// Decides whether and when a failed attempt is resubmitted.
///
/// Retryable errors are resubmitted after a fixed delay, at most
/// `max_retries` times, so a persistently failing call makes
/// `max_retries + 1` attempts before its last error is returned. Errors that
/// are not retryable are returned after the first attempt.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tally_rate_limit::RetryPolicy;
///
/// let policy = RetryPolicy::new(Duration::from_millis(1000), 3);
/// let delays: Vec<_> = policy.strategy().collect();
/// assert_eq!(delays, vec![Duration::from_millis(1000); 3]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    delay: Duration,
    max_retries: usize,
}

impl RetryPolicy {
    /// Create a policy with a constant `delay` between attempts.
    pub fn new(delay: Duration, max_retries: usize) -> Self {
        Self { delay, max_retries }
    }

    /// Policy that never resubmits.
    pub fn never() -> Self {
        Self::new(Duration::ZERO, 0)
    }

    /// Delay inserted before each resubmission.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Resubmissions allowed after the first attempt.
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Backoff schedule: one constant delay per allowed resubmission.
    pub fn strategy(&self) -> std::iter::Take<FixedInterval> {
        FixedInterval::new(self.delay).take(self.max_retries)
    }

    /// Whether a failure of the 1-based `attempt` will be resubmitted.
    pub fn will_retry<E: RetryableError>(&self, attempt: usize, error: &E) -> bool {
        error.is_retryable() && attempt <= self.max_retries
    }

    /// Execute an operation, resubmitting it while it fails with a retryable
    /// error and the retry budget lasts.
    ///
    /// The operation receives the 1-based attempt number. Each attempt is a
    /// fresh call to `operation`, so admission performed inside it is redone
    /// for every resubmission.
    ///
    /// ```rust,ignore
    /// let value = policy
    ///     .execute(|attempt| async move { api.call(attempt).await })
    ///     .await?;
    /// ```
    pub async fn execute<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryableError + Display,
    {
        let policy = *self;
        let mut attempt = 0usize;

        Retry::spawn(self.strategy(), || {
            attempt += 1;
            let current = attempt;
            let fut = operation(current);
            async move {
                match fut.await {
                    Ok(value) => {
                        debug!(attempt = current, "Attempt succeeded");
                        Ok(value)
                    }
                    Err(e) if policy.will_retry(current, &e) => {
                        warn!(attempt = current, error = %e, "Rate limited, will retry");
                        Err(RetryError::Transient {
                            err: e,
                            retry_after: None,
                        })
                    }
                    Err(e) if e.is_retryable() => {
                        warn!(attempt = current, error = %e, "Rate limited, retries exhausted");
                        Err(RetryError::Permanent(e))
                    }
                    Err(e) => {
                        warn!(attempt = current, error = %e, "Permanent error, failing immediately");
                        Err(RetryError::Permanent(e))
                    }
                }
            }
        })
        .await
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000), 3)
    }
}
