//! Layered configuration loader

use super::env_loader;
use super::file_loader;
use super::model::TetherConfig;
use crate::error::TetherResult;
use std::path::{Path, PathBuf};

/// Source of configuration data
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Built-in defaults
    Default,
    /// A TOML, YAML, or JSON file; a missing file yields defaults
    File(PathBuf),
    /// `TETHER_*` environment variable overrides
    Environment,
}

/// Configuration loader with support for multiple sources
///
/// Sources apply in the order they were added. `Default` and `File`
/// replace the configuration built so far; `Environment` overrides
/// individual fields of it. The result is validated once at the end.
///
/// # Example
/// ```no_run
/// use tether_core::config::ConfigLoader;
///
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_file("tether.toml")
///     .with_env()
///     .load()?;
/// # Ok::<(), tether_core::TetherError>(())
/// ```
pub struct ConfigLoader {
    sources: Vec<ConfigSource>,
}

impl ConfigLoader {
    /// Create a new config loader
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Add a configuration source
    pub fn add_source(mut self, source: ConfigSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Add a file source
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Self {
        self.add_source(ConfigSource::File(path.as_ref().to_path_buf()))
    }

    /// Add environment variables source
    pub fn with_env(self) -> Self {
        self.add_source(ConfigSource::Environment)
    }

    /// Add default configuration source
    pub fn with_defaults(self) -> Self {
        self.add_source(ConfigSource::Default)
    }

    /// Load configuration from all sources
    pub fn load(self) -> TetherResult<TetherConfig> {
        self.load_with_env(|key| std::env::var(key).ok())
    }

    /// Load configuration, resolving environment variables through `lookup`
    pub fn load_with_env<F>(self, lookup: F) -> TetherResult<TetherConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = TetherConfig::default();

        for source in &self.sources {
            match source {
                ConfigSource::Default => {
                    tracing::debug!("Loading default config");
                    config = TetherConfig::default();
                }
                ConfigSource::File(path) => {
                    tracing::debug!("Loading config from file: {}", path.display());
                    config = file_loader::load_from_file(path)?;
                }
                ConfigSource::Environment => {
                    tracing::debug!("Applying environment overrides");
                    env_loader::apply_env_with(&mut config, &lookup)?;
                }
            }
        }

        config.validate()?;
        tracing::debug!(server = %config.server.name, url = %config.server.url, "Configuration loaded");
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_env_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tether.toml");
        fs::write(
            &path,
            "[server]\nurl = \"http://file-host:3001\"\n[health]\ninterval = \"10s\"\n",
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_defaults()
            .with_file(&path)
            .with_env()
            .load_with_env(|key| match key {
                "TETHER_SERVER_URL" => Some("http://env-host:3001".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.server.url, "http://env-host:3001");
        assert_eq!(config.health.interval, Duration::from_secs(10));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = ConfigLoader::new()
            .with_defaults()
            .with_file("/nonexistent/tether.toml")
            .load_with_env(|_| None)
            .unwrap();

        assert_eq!(config, TetherConfig::default());
    }

    #[test]
    fn test_invalid_result_rejected() {
        let result = ConfigLoader::new()
            .with_env()
            .load_with_env(|key| (key == "TETHER_SERVER_URL").then(|| "not-a-url".to_string()));

        assert!(result.is_err());
    }
}
