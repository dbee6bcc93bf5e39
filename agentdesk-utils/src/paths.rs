//! Path utilities for agentdesk
//!
//! Handles XDG Base Directory specification compliance for config
//! and state directories.

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Application identifier for XDG directories
const APP_NAME: &str = "agentdesk";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME)
}

/// Get the configuration directory
///
/// Location: `$XDG_CONFIG_HOME/agentdesk` or `~/.config/agentdesk`
pub fn config_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(fallback_config_dir)
}

/// Get the main configuration file path
///
/// Location: `$XDG_CONFIG_HOME/agentdesk/config.toml`
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Get the state directory
///
/// Location: `$XDG_STATE_HOME/agentdesk` or `~/.local/state/agentdesk`
pub fn state_dir() -> PathBuf {
    project_dirs()
        .and_then(|p| p.state_dir().map(|d| d.to_path_buf()))
        .unwrap_or_else(fallback_state_dir)
}

/// Get the log directory
///
/// Location: `$XDG_STATE_HOME/agentdesk/log`
pub fn log_dir() -> PathBuf {
    state_dir().join("log")
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

// Fallback implementations when ProjectDirs is unavailable

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

fn fallback_config_dir() -> PathBuf {
    home_dir().join(".config").join(APP_NAME)
}

fn fallback_state_dir() -> PathBuf {
    home_dir().join(".local").join("state").join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_file_in_config_dir() {
        let file = config_file();
        assert!(file.starts_with(config_dir()));
        assert_eq!(file.file_name().unwrap().to_str().unwrap(), "config.toml");
    }

    #[test]
    fn test_dirs_contain_app_name() {
        for path in [config_dir(), state_dir(), log_dir()] {
            assert!(
                path.to_string_lossy().contains(APP_NAME),
                "{} should contain {}",
                path.display(),
                APP_NAME
            );
        }
    }

    #[test]
    fn test_log_dir_is_under_state() {
        let log = log_dir();
        assert!(log.starts_with(state_dir()));
        assert_eq!(log.file_name().unwrap().to_str().unwrap(), "log");
    }

    #[test]
    fn test_ensure_dir_nested() {
        let temp = tempdir().unwrap();
        let nested = temp.path().join("a").join("b").join("c");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());

        // Second call is a no-op
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_fallbacks_under_home() {
        let home = home_dir();
        assert!(fallback_config_dir().starts_with(&home));
        assert!(fallback_state_dir().starts_with(&home));
    }
}
