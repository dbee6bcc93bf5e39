//! Session backends
//!
//! A backend spawns and drives the program behind a session. The core
//! only needs the [`SessionBackend`] contract: create a session wired to
//! an event channel, then write, resize and stop it by id.

mod memory;
mod pty;

pub use memory::MemoryBackend;
pub use pty::PtyBackend;

use agentdesk_protocol::{BackendAck, SessionConfig, SessionId};
use agentdesk_utils::Result;

use crate::router::EventSender;

/// Contract the core requires of whatever runs session programs
///
/// `create` is a one-shot request; everything the program produces
/// afterwards arrives on `events`. `stop` only requests termination and
/// the session's `Exited` event follows later.
pub trait SessionBackend: Send + Sync {
    fn create(&self, config: &SessionConfig, events: EventSender) -> Result<BackendAck>;

    fn write(&self, session_id: SessionId, data: &[u8]) -> Result<()>;

    fn resize(&self, session_id: SessionId, cols: u16, rows: u16) -> Result<()>;

    fn stop(&self, session_id: SessionId) -> Result<()>;
}
