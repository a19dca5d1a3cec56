//! # Backoff Retries
//!
//! Up to `max_attempts` tries of one operation. Before retry `n` (1-based) the
//! loop sleeps `n * step`; with the defaults that is 4s, 8s, 12s and 16s over
//! five attempts. The first attempt never waits and a success returns at once.

use std::error::Error as StdError;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

/// Boxed error of the last failed attempt.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// A request could not be delivered within the retry budget.
#[derive(Debug, Error)]
#[error("request failed after {attempts} attempts: {source}")]
pub struct TransportError {
    /// Number of attempts made.
    pub attempts: u32,
    /// Error of the final attempt.
    #[source]
    pub source: BoxError,
}

/// # Retry Policy
///
/// Linear backoff with a fixed attempt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    step: Duration,
}

impl Default for RetryPolicy {
    /// 5 attempts, 4 second step.
    fn default() -> Self {
        Self {
            max_attempts: 5,
            step: Duration::from_secs(4),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy. `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32, step: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            step,
        }
    }

    /// A single attempt, no retries.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Total attempts including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay slept before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.step * retry
    }

    /// Runs `op` until it succeeds or the attempt budget is spent.
    ///
    /// Every `Err` returned by `op` counts as a retryable failure. Callers
    /// decide what is retryable by what they return as `Err`.
    pub async fn retry<T, E, F, Fut>(&self, mut op: F) -> Result<T, TransportError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        let mut attempts = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempts += 1;
                    let source: BoxError = e.into();
                    if attempts >= self.max_attempts {
                        return Err(TransportError { attempts, source });
                    }

                    let delay = self.delay_for(attempts);
                    warn!(
                        attempt = attempts,
                        delay_secs = delay.as_secs_f64(),
                        error = %source,
                        "request failed, retrying"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
