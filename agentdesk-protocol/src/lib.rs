//! agentdesk-protocol: Shared data model for agentdesk
//!
//! Defines the identifiers, session descriptions, status values, backend
//! event shapes and pane tree snapshots exchanged between the core and
//! its collaborators (backends, renderers, the CLI).

pub mod types;

// Re-export main types at crate root
pub use types::{
    clamp_ratio, BackendAck, BackendEvent, CliTool, PaneId, PaneNode, ParseToolError,
    SessionConfig, SessionId, SessionStatus, SplitDirection, DEFAULT_COLS, DEFAULT_ROWS,
    DEFAULT_SPLIT_RATIO, MAX_SPLIT_RATIO, MIN_SPLIT_RATIO,
};
