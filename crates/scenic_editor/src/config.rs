//! Editor configuration, loadable from TOML by the host.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level editor configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub history: HistoryConfig,
}

/// Undo/redo history tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Milliseconds within which matching updates coalesce into one entry.
    pub coalesce_window_ms: u64,
    /// Maximum undo depth; `None` keeps everything.
    pub capacity: Option<usize>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            coalesce_window_ms: 500,
            capacity: None,
        }
    }
}

impl EditorConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.history.coalesce_window_ms, 500);
        assert_eq!(config.history.capacity, None);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = EditorConfig::from_toml_str(
            "[history]\ncoalesce_window_ms = 250\n",
        )
        .unwrap();
        assert_eq!(config.history.coalesce_window_ms, 250);
        assert_eq!(config.history.capacity, None);

        let config = EditorConfig::from_toml_str("").unwrap();
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn test_capacity_parses() {
        let config = EditorConfig::from_toml_str("[history]\ncapacity = 100\n").unwrap();
        assert_eq!(config.history.capacity, Some(100));
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        assert!(EditorConfig::from_toml_str("history = [").is_err());
    }
}
