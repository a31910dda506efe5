//! Configuration validation

use super::model::TetherConfig;
use crate::error::{TetherError, TetherResult};
use reqwest::Url;
use std::time::Duration;

impl TetherConfig {
    /// Check cross-field constraints the type system cannot express
    pub fn validate(&self) -> TetherResult<()> {
        if self.server.name.trim().is_empty() {
            return Err(TetherError::config("server.name must not be empty"));
        }

        let url = Url::parse(&self.server.url).map_err(|e| {
            TetherError::config_with_context(
                format!("server.url is not a valid URL: {}", e),
                format!("Validating '{}'", self.server.url),
            )
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(TetherError::config(format!(
                "server.url must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.history.capacity == 0 {
            return Err(TetherError::config("history.capacity must be at least 1"));
        }

        if self.health.interval.is_zero() {
            return Err(TetherError::config("health.interval must be greater than zero"));
        }

        if self.retry.base_delay > self.retry.max_delay {
            return Err(TetherError::config(format!(
                "retry.base_delay ({:?}) exceeds retry.max_delay ({:?})",
                self.retry.base_delay, self.retry.max_delay
            )));
        }
        if self.retry.backoff_multiplier.is_nan() || self.retry.backoff_multiplier < 1.0 {
            return Err(TetherError::config("retry.backoff_multiplier must be at least 1.0"));
        }
        if self.retry.attempt_timeout == Duration::ZERO {
            return Err(TetherError::config("retry.attempt_timeout must be greater than zero"));
        }

        let breaker = &self.circuit_breaker;
        if breaker.failure_threshold == 0
            || breaker.success_threshold == 0
            || breaker.half_open_max_requests == 0
        {
            return Err(TetherError::config(
                "circuit_breaker thresholds and half_open_max_requests must be at least 1",
            ));
        }

        if self.reconnect.delay > self.reconnect.max_delay {
            return Err(TetherError::config(format!(
                "reconnect.delay ({:?}) exceeds reconnect.max_delay ({:?})",
                self.reconnect.delay, self.reconnect.max_delay
            )));
        }

        Ok(())
    }
}
