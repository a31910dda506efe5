//! File-based configuration loading

use super::model::TetherConfig;
use crate::error::{TetherError, TetherResult};
use std::fs;
use std::path::Path;

/// Load configuration from a file
///
/// Supports JSON, TOML, and YAML formats based on file extension.
/// Returns default config if file doesn't exist.
pub fn load_from_file(path: &Path) -> TetherResult<TetherConfig> {
    if !path.exists() {
        tracing::debug!("Config file {} not found, using defaults", path.display());
        return Ok(TetherConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|e| {
        TetherError::config_with_context(
            format!("Failed to read config file: {}", e),
            format!("Reading configuration from '{}'", path.display()),
        )
    })?;

    let config = match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::from_str(&content)
            .map_err(|e| TetherError::parse("TOML", format!("{}: {}", path.display(), e)))?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
            .map_err(|e| TetherError::parse("YAML", format!("{}: {}", path.display(), e)))?,
        _ => serde_json::from_str(&content)
            .map_err(|e| TetherError::parse("JSON", format!("{}: {}", path.display(), e)))?,
    };

    Ok(config)
}
