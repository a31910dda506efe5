//! Configuration data model

use super::logging_config::LoggingConfig;
use crate::recovery::{
    BackoffConfig, BackoffStrategy, CircuitBreakerConfig, ConstantBackoff, ExponentialBackoff,
    RetryConfig,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Top-level configuration
///
/// Every section is defaulted, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TetherConfig {
    pub server: ServerConfig,
    pub http: HttpConfig,
    pub retry: RetryConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub health: HealthConfig,
    pub reconnect: ReconnectConfig,
    pub auth: AuthConfig,
    pub history: HistoryConfig,
    pub logging: LoggingConfig,
}

impl TetherConfig {
    /// Configuration for a server at `url` with every other setting defaulted
    pub fn for_server(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            server: ServerConfig {
                name: name.into(),
                url: url.into(),
            },
            ..Default::default()
        }
    }
}

/// Identity of the remote integration server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    /// Base URL; also the target of the reachability probe
    pub url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "zoho-crm".to_string(),
            url: "http://localhost:3001".to_string(),
        }
    }
}

/// HTTP transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Deadline for a whole request, including the body
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Sent as `Authorization: Bearer <token>`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// Extra headers sent with every request
    pub headers: HashMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            api_token: None,
            headers: HashMap::new(),
        }
    }
}

/// Health probing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Time between probes while connected
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Keep the connection up when the server reports `degraded`
    pub accept_degraded: bool,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            accept_degraded: false,
        }
    }
}

/// Delay schedule between supervisor reconnect attempts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconnectBackoff {
    /// Same delay before every attempt
    #[default]
    Fixed,
    /// Delay doubles per attempt, capped at `max_delay`
    Exponential,
}

/// Auto-reconnect supervisor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub enabled: bool,
    /// Attempt ceiling before the supervisor gives up
    pub max_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
    pub backoff: ReconnectBackoff,
    /// Cap for exponential backoff
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 5,
            delay: Duration::from_secs(5),
            backoff: ReconnectBackoff::Fixed,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl ReconnectConfig {
    /// Build the delay schedule this config describes
    pub fn strategy(&self) -> Box<dyn BackoffStrategy> {
        match self.backoff {
            ReconnectBackoff::Fixed => Box::new(ConstantBackoff::new(self.delay)),
            ReconnectBackoff::Exponential => Box::new(ExponentialBackoff::with_config(
                BackoffConfig::with_initial_delay(self.delay).max_delay(self.max_delay),
            )),
        }
    }
}

/// OAuth token tracking settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Refresh the token in the background when it nears expiry
    pub auto_refresh: bool,
    #[serde(with = "humantime_serde")]
    pub refresh_window: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            auto_refresh: true,
            refresh_window: Duration::from_secs(60),
        }
    }
}

/// Connection event history settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: 10 }
    }
}
