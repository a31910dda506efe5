//! Retry policy for remote operations
//!
//! Wraps any async remote call with bounded retry, exponential backoff,
//! a per-attempt deadline, and cooperative cancellation.

use super::backoff::{BackoffConfig, BackoffStrategy, ExponentialBackoff};
use super::{ErrorClass, classify_error};
use crate::error::{RemoteError, RemoteResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Configuration for retry behavior
///
/// `max_retries` counts retries, not invocations: a ceiling of 3 allows
/// at most 4 calls to the wrapped operation.
///
/// # Example
/// ```
/// use tether_core::recovery::RetryConfig;
/// use std::time::Duration;
///
/// let config = RetryConfig::default()
///     .with_max_retries(5)
///     .with_base_delay(Duration::from_millis(200))
///     .with_max_delay(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retry ceiling
    pub max_retries: u32,
    /// Delay before the first retry
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    /// Cap on any single delay
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Backoff multiplier
    pub backoff_multiplier: f64,
    /// Deadline for a single invocation of the wrapped operation
    #[serde(with = "humantime_serde")]
    pub attempt_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            backoff_multiplier: 2.0,
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Create a new RetryConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that never retries
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Set the retry ceiling
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Set the delay before the first retry
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the maximum delay between retries
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the backoff multiplier
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Set the per-attempt deadline
    pub fn with_attempt_timeout(mut self, deadline: Duration) -> Self {
        self.attempt_timeout = deadline;
        self
    }

    /// Convert to BackoffConfig for use with backoff strategies
    pub fn to_backoff_config(&self) -> BackoffConfig {
        BackoffConfig {
            initial_delay: self.base_delay,
            max_delay: self.max_delay,
            multiplier: self.backoff_multiplier,
        }
    }

    /// Create an ExponentialBackoff from this config
    pub fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::with_config(self.to_backoff_config())
    }
}

/// Outcome of the retry decision for one failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait for the given delay, then invoke again
    RetryAfter(Duration),
    /// Give up and return the error to the caller
    Propagate,
}

/// Per-operation retry bookkeeping
///
/// Lives only for the duration of one [`RetryPolicy::execute`] call.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Retries performed so far
    pub attempt: u32,
    pub max_retries: u32,
    pub base_delay: Duration,
    pub last_error: Option<RemoteError>,
}

impl RetryContext {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            attempt: 0,
            max_retries: config.max_retries,
            base_delay: config.base_delay,
            last_error: None,
        }
    }

    /// Whether the ceiling has been reached
    pub fn exhausted(&self) -> bool {
        self.attempt >= self.max_retries
    }
}

/// Retry policy for remote operations
///
/// Stateless between calls; every [`execute`](Self::execute) owns its own
/// [`RetryContext`], so one policy may be shared by concurrent callers.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    backoff: ExponentialBackoff,
}

impl RetryPolicy {
    /// Create a new retry policy with default config
    pub fn new() -> Self {
        Self::with_config(RetryConfig::default())
    }

    /// Create a new retry policy with custom config
    pub fn with_config(config: RetryConfig) -> Self {
        let backoff = config.create_backoff();
        Self { config, backoff }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Decide what to do after a failure, given how many retries already ran
    pub fn decide(&self, error: &RemoteError, attempt: u32) -> RetryDecision {
        if classify_error(error) == ErrorClass::Permanent {
            return RetryDecision::Propagate;
        }
        if attempt >= self.config.max_retries {
            return RetryDecision::Propagate;
        }
        RetryDecision::RetryAfter(self.backoff.delay_for_attempt(attempt))
    }

    /// Execute an operation with retries
    ///
    /// Returns [`RemoteError::Cancelled`] as soon as `cancel` fires, whether
    /// the operation is in flight or the policy is waiting out a delay.
    pub async fn execute<T, F, Fut>(
        &self,
        operation: &str,
        mut call: F,
        cancel: &CancellationToken,
    ) -> RemoteResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
    {
        let mut context = RetryContext::new(&self.config);

        loop {
            if cancel.is_cancelled() {
                return Err(RemoteError::Cancelled);
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RemoteError::Cancelled),
                result = timeout(self.config.attempt_timeout, call()) => match result {
                    Ok(outcome) => outcome,
                    Err(_) => Err(RemoteError::timeout(format!(
                        "{operation} exceeded {}ms",
                        self.config.attempt_timeout.as_millis()
                    ))),
                },
            };

            let error = match outcome {
                Ok(value) => {
                    if context.attempt > 0 {
                        debug!(operation, retries = context.attempt, "Operation recovered after retry");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            match self.decide(&error, context.attempt) {
                RetryDecision::Propagate => {
                    if error.is_retryable() {
                        warn!(
                            operation,
                            retries = context.attempt,
                            error = %error,
                            "Retry ceiling reached"
                        );
                    } else if !error.is_cancelled() {
                        debug!(operation, error = %error, "Not retrying fatal error");
                    }
                    return Err(error);
                }
                RetryDecision::RetryAfter(delay) => {
                    context.attempt += 1;
                    warn!(
                        operation,
                        attempt = context.attempt,
                        max_retries = context.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying after transient failure"
                    );
                    context.last_error = Some(error);

                    tokio::select! {
                        _ = cancel.cancelled() => return Err(RemoteError::Cancelled),
                        _ = sleep(delay) => {}
                    }
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}
