//! Error types for agentdesk
//!
//! Provides a unified error type used across all agentdesk crates.

use std::path::PathBuf;

/// Main error type for agentdesk operations
#[derive(Debug, thiserror::Error)]
pub enum AgentdeskError {
    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    // === Session / Pane Errors ===

    #[error("Unknown session: {0}")]
    UnknownSession(String),

    #[error("Unknown pane: {0}")]
    UnknownPane(String),

    #[error("Duplicate session id: {0}")]
    DuplicateId(String),

    // === Backend Errors ===

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Failed to spawn process: {0}")]
    ProcessSpawn(String),

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AgentdeskError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this error is retryable
    ///
    /// Only backend-side failures qualify. Whether to actually retry is the
    /// caller's decision; nothing in the core retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::ProcessSpawn(_))
    }

    /// Check if this error is a programmer error (bad id handed to the core)
    pub fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownSession(_) | Self::UnknownPane(_) | Self::DuplicateId(_)
        )
    }
}

/// Result type alias using AgentdeskError
pub type Result<T> = std::result::Result<T, AgentdeskError>;
