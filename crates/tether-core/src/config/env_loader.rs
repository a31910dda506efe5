//! Environment variable overrides
//!
//! Only variables that are set override the current configuration:
//!
//! | variable | field |
//! |---|---|
//! | `TETHER_SERVER_NAME` | `server.name` |
//! | `TETHER_SERVER_URL` | `server.url` |
//! | `TETHER_API_TOKEN` | `http.api_token` |
//! | `TETHER_MAX_RETRIES` | `retry.max_retries` |
//! | `TETHER_HEALTH_INTERVAL` | `health.interval` (humantime, e.g. `30s`) |
//! | `TETHER_RECONNECT_ATTEMPTS` | `reconnect.max_attempts` |
//! | `TETHER_LOG_LEVEL` | `logging.level` |

use super::model::TetherConfig;
use crate::error::{TetherError, TetherResult};
use std::env;
use std::str::FromStr;

/// Apply overrides from the process environment
pub fn apply_env(config: &mut TetherConfig) -> TetherResult<()> {
    apply_env_with(config, |key| env::var(key).ok())
}

/// Apply overrides using `lookup` in place of the process environment
pub fn apply_env_with<F>(config: &mut TetherConfig, lookup: F) -> TetherResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(name) = lookup("TETHER_SERVER_NAME") {
        config.server.name = name;
    }
    if let Some(url) = lookup("TETHER_SERVER_URL") {
        config.server.url = url;
    }
    if let Some(token) = lookup("TETHER_API_TOKEN") {
        config.http.api_token = Some(token).filter(|t| !t.is_empty());
    }
    if let Some(raw) = lookup("TETHER_MAX_RETRIES") {
        config.retry.max_retries = parse_number("TETHER_MAX_RETRIES", &raw)?;
    }
    if let Some(raw) = lookup("TETHER_HEALTH_INTERVAL") {
        config.health.interval = humantime_serde::re::humantime::parse_duration(raw.trim())
            .map_err(|e| TetherError::config(format!("Invalid TETHER_HEALTH_INTERVAL value: {}", e)))?;
    }
    if let Some(raw) = lookup("TETHER_RECONNECT_ATTEMPTS") {
        config.reconnect.max_attempts = parse_number("TETHER_RECONNECT_ATTEMPTS", &raw)?;
    }
    if let Some(level) = lookup("TETHER_LOG_LEVEL") {
        config.logging.level = level;
    }
    Ok(())
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> TetherResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| TetherError::config(format!("Invalid {} value: '{}'", key, raw)))
}
