//! agentdesk-core: Control plane for a multi-session terminal workstation
//!
//! Tracks interactive command sessions, arranges them in a binary tree of
//! panes, routes each session's backend events into that state, and maps
//! keyboard commands onto it.

pub mod backend;
pub mod config;
pub mod navigation;
pub mod pane;
pub mod router;
pub mod session;
pub mod usage;
pub mod workstation;

pub use backend::{MemoryBackend, PtyBackend, SessionBackend};
pub use config::{AppConfig, ConfigHandle, ConfigLoader};
pub use navigation::{CycleDirection, Keymap, NavCommand, NavOutcome, NavigationController};
pub use pane::{PaneLeaf, PaneTree, SharedLayout};
pub use router::{EventRouter, EventSender, OutputBuffers, OutputSink};
pub use session::{Session, SessionRegistry, SharedRegistry, StatusSummary};
pub use usage::{extract_token_usage, TokenUsage, UsageLedger, UsageTotals};
pub use workstation::Workstation;
