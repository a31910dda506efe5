//! Circuit breaker for record operations
//!
//! After `failure_threshold` consecutive transient failures the circuit
//! opens and calls fail fast with [`RemoteError::CircuitOpen`] without
//! reaching the server. Once `reset_timeout` has elapsed the circuit
//! half-opens and admits a limited number of trial calls: enough
//! successes close it again, any transient failure reopens it.

use super::{ErrorClass, classify_error};
use crate::error::{RemoteError, RemoteResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls flow normally
    Closed,
    /// Calls are rejected
    Open,
    /// A limited number of trial calls are admitted
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half_open"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    pub enabled: bool,
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// Half-open successes that close the circuit
    pub success_threshold: u32,
    /// Time spent open before trial calls are admitted
    #[serde(with = "humantime_serde")]
    pub reset_timeout: Duration,
    /// Concurrent trial calls while half-open
    pub half_open_max_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 5,
            success_threshold: 1,
            reset_timeout: Duration::from_secs(60),
            half_open_max_requests: 1,
        }
    }
}

/// Counters exposed for diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerStats {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub total_calls: u64,
    pub total_failures: u64,
    pub total_rejected: u64,
}

struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    opened_at: Option<Instant>,
    half_open_in_flight: u32,
    total_calls: u64,
    total_failures: u64,
    total_rejected: u64,
}

/// Guards the record operations of one server
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, CircuitBreakerConfig::default())
    }

    pub fn with_config(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                opened_at: None,
                half_open_in_flight: 0,
                total_calls: 0,
                total_failures: 0,
                total_rejected: 0,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state, half-opening an expired open circuit
    pub fn state(&self) -> CircuitState {
        let mut state = self.state.lock();
        self.expire_open(&mut state);
        state.state
    }

    /// Run `operation` under the breaker
    ///
    /// An open circuit rejects without polling `operation`. Transient
    /// failures count against the circuit; successes and permanent errors
    /// (the server answered) count for it; cancellation counts for neither.
    pub async fn call<T, Fut>(&self, operation: Fut) -> RemoteResult<T>
    where
        Fut: Future<Output = RemoteResult<T>>,
    {
        let mut permit = self.acquire()?;
        let result = operation.await;
        permit.settle(&result);
        result
    }

    /// Admit one call or reject with [`RemoteError::CircuitOpen`]
    pub fn acquire(&self) -> RemoteResult<Permit<'_>> {
        if !self.config.enabled {
            return Ok(Permit::new(self, false));
        }

        let mut state = self.state.lock();
        self.expire_open(&mut state);
        match state.state {
            CircuitState::Closed => Ok(Permit::new(self, false)),
            CircuitState::HalfOpen if state.half_open_in_flight < self.config.half_open_max_requests => {
                state.half_open_in_flight += 1;
                Ok(Permit::new(self, true))
            }
            CircuitState::HalfOpen => {
                state.total_rejected += 1;
                Err(RemoteError::circuit_open(format!(
                    "{} is half-open, trial call already in flight",
                    self.name
                )))
            }
            CircuitState::Open => {
                state.total_rejected += 1;
                let remaining = state
                    .opened_at
                    .map(|opened| self.config.reset_timeout.saturating_sub(opened.elapsed()))
                    .unwrap_or_default();
                Err(RemoteError::circuit_open(format!(
                    "{} is failing, next trial in {}s",
                    self.name,
                    remaining.as_secs()
                )))
            }
        }
    }

    pub fn record_success(&self) {
        self.on_success(false);
    }

    pub fn record_failure(&self) {
        self.on_failure(false);
    }

    pub fn stats(&self) -> CircuitBreakerStats {
        let mut state = self.state.lock();
        self.expire_open(&mut state);
        CircuitBreakerStats {
            name: self.name.clone(),
            state: state.state,
            failure_count: state.failure_count,
            success_count: state.success_count,
            total_calls: state.total_calls,
            total_failures: state.total_failures,
            total_rejected: state.total_rejected,
        }
    }

    /// Close the circuit and clear its counters
    pub fn reset(&self) {
        let mut state = self.state.lock();
        if state.state != CircuitState::Closed {
            info!(component = %self.name, "Circuit breaker reset");
        }
        self.transition_to_closed(&mut state);
    }

    /// Open the circuit regardless of counters
    pub fn trip(&self) {
        let mut state = self.state.lock();
        self.transition_to_open(&mut state);
    }

    fn on_success(&self, half_open_permit: bool) {
        let mut state = self.state.lock();
        state.total_calls += 1;
        if half_open_permit {
            state.half_open_in_flight = state.half_open_in_flight.saturating_sub(1);
        }
        match state.state {
            CircuitState::Closed => state.failure_count = 0,
            CircuitState::HalfOpen => {
                state.success_count += 1;
                if state.success_count >= self.config.success_threshold {
                    self.transition_to_closed(&mut state);
                }
            }
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self, half_open_permit: bool) {
        let mut state = self.state.lock();
        state.total_calls += 1;
        state.total_failures += 1;
        if half_open_permit {
            state.half_open_in_flight = state.half_open_in_flight.saturating_sub(1);
        }
        match state.state {
            CircuitState::Closed => {
                state.failure_count += 1;
                if state.failure_count >= self.config.failure_threshold {
                    self.transition_to_open(&mut state);
                }
            }
            CircuitState::HalfOpen => self.transition_to_open(&mut state),
            CircuitState::Open => {}
        }
    }

    fn release(&self, half_open_permit: bool) {
        if half_open_permit {
            let mut state = self.state.lock();
            state.half_open_in_flight = state.half_open_in_flight.saturating_sub(1);
        }
    }

    fn expire_open(&self, state: &mut BreakerState) {
        if state.state != CircuitState::Open {
            return;
        }
        let expired = state
            .opened_at
            .is_some_and(|opened| opened.elapsed() >= self.config.reset_timeout);
        if expired {
            state.state = CircuitState::HalfOpen;
            state.success_count = 0;
            state.half_open_in_flight = 0;
            info!(component = %self.name, "Circuit breaker half-open, admitting trial calls");
        }
    }

    fn transition_to_open(&self, state: &mut BreakerState) {
        warn!(
            component = %self.name,
            failures = state.failure_count,
            reset_timeout = ?self.config.reset_timeout,
            "Circuit breaker opened"
        );
        state.state = CircuitState::Open;
        state.opened_at = Some(Instant::now());
        state.success_count = 0;
        state.half_open_in_flight = 0;
    }

    fn transition_to_closed(&self, state: &mut BreakerState) {
        if state.state == CircuitState::HalfOpen {
            info!(component = %self.name, "Circuit breaker closed");
        }
        state.state = CircuitState::Closed;
        state.failure_count = 0;
        state.success_count = 0;
        state.opened_at = None;
        state.half_open_in_flight = 0;
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &self.state.lock().state)
            .finish()
    }
}

/// Admission to one call; frees its half-open slot if dropped unsettled
#[derive(Debug)]
pub struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    half_open: bool,
    settled: bool,
}

impl<'a> Permit<'a> {
    fn new(breaker: &'a CircuitBreaker, half_open: bool) -> Self {
        Self {
            breaker,
            half_open,
            settled: false,
        }
    }

    /// Count `result` for or against the circuit
    pub fn settle<T>(&mut self, result: &RemoteResult<T>) {
        if self.settled {
            return;
        }
        self.settled = true;
        if !self.breaker.config.enabled {
            return;
        }
        match result {
            Ok(_) => self.breaker.on_success(self.half_open),
            Err(error) if error.is_cancelled() => self.breaker.release(self.half_open),
            Err(error) => match classify_error(error) {
                ErrorClass::Transient => self.breaker.on_failure(self.half_open),
                ErrorClass::Permanent => {
                    debug!(component = %self.breaker.name, error = %error, "Permanent error does not trip the circuit");
                    self.breaker.on_success(self.half_open)
                }
            },
        }
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.release(self.half_open);
        }
    }
}
