use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// One event on a session's backend stream
///
/// The session is implied by the channel the event arrives on. Serialized
/// with a `type` tag (`data`, `exited`, `error`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendEvent {
    /// Output bytes from the session's program
    Data { data: Bytes },
    /// The program exited; the code is informational only
    Exited {
        #[serde(rename = "exitCode")]
        exit_code: Option<i32>,
    },
    /// The backend failed while driving the session
    Error { message: String },
}

impl BackendEvent {
    pub fn data(data: impl Into<Bytes>) -> Self {
        BackendEvent::Data { data: data.into() }
    }

    pub fn exited(exit_code: Option<i32>) -> Self {
        BackendEvent::Exited { exit_code }
    }

    pub fn error(message: impl Into<String>) -> Self {
        BackendEvent::Error {
            message: message.into(),
        }
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            BackendEvent::Data { .. } => "data",
            BackendEvent::Exited { .. } => "exited",
            BackendEvent::Error { .. } => "error",
        }
    }
}

/// Acknowledgement of a successful session creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BackendAck {
    /// Process id of the spawned program, when the backend knows it
    pub pid: Option<u32>,
}
