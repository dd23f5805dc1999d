//! Config file discovery.
//!
//! The relay reads ~/.tolk/relay/config.yaml unless `--config` points elsewhere.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tolk_relay::RelayConfig;

/// Default base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".tolk";
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Application directory under the base dir.
pub const APP_NAME: &str = "relay";

/// Returns ~/.tolk/{app_name}.
pub fn default_config_dir(app_name: &str) -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR).join(app_name))
}

pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir(APP_NAME).map(|dir| dir.join(DEFAULT_CONFIG_FILE))
}

/// Loads `custom` if given, else the default file if it exists, else defaults.
pub fn load_config(custom: Option<&Path>) -> Result<RelayConfig> {
    if let Some(path) = custom {
        return RelayConfig::load(path).with_context(|| format!("load config {}", path.display()));
    }
    match default_config_path() {
        Some(path) if path.exists() => {
            RelayConfig::load(&path).with_context(|| format!("load config {}", path.display()))
        }
        _ => {
            tracing::warn!("no config file found, using defaults");
            Ok(RelayConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with(".tolk/relay/config.yaml"));
        }
    }

    #[test]
    fn test_missing_custom_path_fails() {
        let err = load_config(Some(Path::new("/nonexistent/tolk.yaml"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tolk.yaml"));
    }
}
