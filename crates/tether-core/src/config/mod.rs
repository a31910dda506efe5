//! Configuration
//!
//! [`TetherConfig`] is assembled by [`ConfigLoader`] from defaults, a
//! TOML/YAML/JSON file, and `TETHER_*` environment variables, then
//! validated.

pub mod env_loader;
pub mod file_loader;
pub mod loader;
pub mod logging_config;
pub mod model;
mod validation;

pub use loader::{ConfigLoader, ConfigSource};
pub use logging_config::{LogFormat, LoggingConfig};
pub use model::{
    AuthConfig, HealthConfig, HistoryConfig, HttpConfig, ReconnectBackoff, ReconnectConfig,
    ServerConfig, TetherConfig,
};
