//! Configuration loader

use std::path::Path;

use agentdesk_utils::{config_file, AgentdeskError, Result};
use tracing::debug;

use super::AppConfig;
use crate::navigation::Keymap;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from default location
    pub fn load() -> Result<AppConfig> {
        let path = config_file();
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Ok(AppConfig::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<AppConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| AgentdeskError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    /// Parse configuration from string
    pub fn parse(content: &str, path: &Path) -> Result<AppConfig> {
        toml::from_str(content).map_err(|e| AgentdeskError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Validate configuration
    pub fn validate(config: &AppConfig) -> Result<()> {
        if config.terminal.default_cols == 0 || config.terminal.default_rows == 0 {
            return Err(AgentdeskError::config(
                "default_cols and default_rows must be at least 1",
            ));
        }

        if config.terminal.output_buffer_bytes == 0 {
            return Err(AgentdeskError::config(
                "output_buffer_bytes must be at least 1",
            ));
        }

        Keymap::from_config(&config.keybindings)?;

        Ok(())
    }

    /// Load and validate
    pub fn load_and_validate() -> Result<AppConfig> {
        let config = Self::load()?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load and validate from a specific path
    pub fn load_and_validate_path(path: &Path) -> Result<AppConfig> {
        let config = Self::load_from_path(path)?;
        Self::validate(&config)?;
        Ok(config)
    }
}
