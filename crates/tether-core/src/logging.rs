//! Tracing subscriber setup

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{TetherError, TetherResult};
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber described by `config`
///
/// `RUST_LOG` wins over `config.level` when set. Returns an error rather
/// than panicking if a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> TetherResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_filter(&config.level)?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target);

    let installed = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|e| TetherError::Logging(e.to_string()))
}

/// Parse a filter directive such as `info` or `tether_core=debug,reqwest=warn`
pub fn build_filter(directives: &str) -> TetherResult<EnvFilter> {
    EnvFilter::try_new(directives)
        .map_err(|e| TetherError::Logging(format!("Invalid log filter '{}': {}", directives, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter() {
        assert!(build_filter("info").is_ok());
        assert!(build_filter("tether_core=debug,reqwest=warn").is_ok());
        assert!(matches!(
            build_filter("tether_core=loudest"),
            Err(TetherError::Logging(_))
        ));
    }

    #[test]
    fn test_second_init_is_an_error_not_a_panic() {
        let config = LoggingConfig {
            format: LogFormat::Compact,
            ..Default::default()
        };
        // Another test may have installed a subscriber first; either way the
        // second call must fail cleanly.
        let _ = init(&config);
        assert!(init(&config).is_err());
    }
}
