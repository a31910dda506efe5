//! Error recovery for remote calls
//!
//! This module provides:
//! - Error classification (transient vs permanent) from [`ErrorKind`]
//! - Backoff strategies
//! - A retry policy that wraps any async operation with bounded retry
//! - A circuit breaker that fails fast while the server keeps failing

pub mod backoff;
pub mod circuit_breaker;
pub mod retry;

pub use backoff::{BackoffConfig, BackoffStrategy, ConstantBackoff, ExponentialBackoff};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
pub use retry::{RetryConfig, RetryContext, RetryDecision, RetryPolicy};

use crate::error::{ErrorKind, RemoteError};

/// Error classification for recovery decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Transient errors that may succeed on retry
    Transient,
    /// Permanent errors that will not succeed on retry
    Permanent,
}

/// Classify a remote error by its tag
pub fn classify_error(error: &RemoteError) -> ErrorClass {
    match error.kind() {
        ErrorKind::Connection | ErrorKind::Timeout => ErrorClass::Transient,
        ErrorKind::Server => match error.status() {
            Some(status) if status >= 500 => ErrorClass::Transient,
            _ => ErrorClass::Permanent,
        },
        ErrorKind::Auth
        | ErrorKind::InvalidRequest
        | ErrorKind::Protocol
        | ErrorKind::Cancelled
        | ErrorKind::CircuitOpen => ErrorClass::Permanent,
    }
}
