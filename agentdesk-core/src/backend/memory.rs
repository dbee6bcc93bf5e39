//! In-memory backend for tests and headless embedding

use std::collections::HashMap;

use agentdesk_protocol::{BackendAck, BackendEvent, SessionConfig, SessionId};
use agentdesk_utils::{AgentdeskError, Result};
use parking_lot::Mutex;

use super::SessionBackend;
use crate::router::EventSender;

const FIRST_PID: u32 = 1000;

#[derive(Debug, Default)]
struct MemoryState {
    senders: HashMap<SessionId, EventSender>,
    creates: Vec<SessionId>,
    writes: Vec<(SessionId, Vec<u8>)>,
    resizes: Vec<(SessionId, u16, u16)>,
    stops: Vec<SessionId>,
    fail_creates: Vec<String>,
    next_pid: u32,
}

/// Backend that runs nothing
///
/// Records every call, lets the caller inject events on a session's
/// channel, and can be told to fail upcoming `create` calls. `stop`
/// answers with `Exited { exit_code: Some(0) }`.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `create` fail with `message`
    ///
    /// Calls queue up; each failure is used once.
    pub fn fail_next_create(&self, message: impl Into<String>) {
        self.state.lock().fail_creates.push(message.into());
    }

    /// Push an event onto a session's channel
    ///
    /// Returns false if the session was never created or its channel is gone.
    pub fn emit(&self, session_id: SessionId, event: BackendEvent) -> bool {
        self.state
            .lock()
            .senders
            .get(&session_id)
            .map_or(false, |sender| sender.send(event))
    }

    /// Number of `create` calls made for a session, failed ones included
    pub fn create_count(&self, session_id: SessionId) -> usize {
        self.state
            .lock()
            .creates
            .iter()
            .filter(|id| **id == session_id)
            .count()
    }

    /// All bytes written to a session, concatenated
    pub fn written(&self, session_id: SessionId) -> Vec<u8> {
        self.state
            .lock()
            .writes
            .iter()
            .filter(|(id, _)| *id == session_id)
            .flat_map(|(_, data)| data.iter().copied())
            .collect()
    }

    pub fn resizes(&self) -> Vec<(SessionId, u16, u16)> {
        self.state.lock().resizes.clone()
    }

    pub fn stops(&self) -> Vec<SessionId> {
        self.state.lock().stops.clone()
    }

    /// Sender currently registered for a session
    pub fn sender(&self, session_id: SessionId) -> Option<EventSender> {
        self.state.lock().senders.get(&session_id).cloned()
    }

    fn require(state: &MemoryState, session_id: SessionId) -> Result<()> {
        if state.senders.contains_key(&session_id) {
            Ok(())
        } else {
            Err(AgentdeskError::UnknownSession(session_id.to_string()))
        }
    }
}

impl SessionBackend for MemoryBackend {
    fn create(&self, config: &SessionConfig, events: EventSender) -> Result<BackendAck> {
        let mut state = self.state.lock();
        state.creates.push(config.id);

        if !state.fail_creates.is_empty() {
            let message = state.fail_creates.remove(0);
            return Err(AgentdeskError::Backend(message));
        }

        state.next_pid = state.next_pid.max(FIRST_PID) + 1;
        let pid = state.next_pid;
        state.senders.insert(config.id, events);
        Ok(BackendAck { pid: Some(pid) })
    }

    fn write(&self, session_id: SessionId, data: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        Self::require(&state, session_id)?;
        state.writes.push((session_id, data.to_vec()));
        Ok(())
    }

    fn resize(&self, session_id: SessionId, cols: u16, rows: u16) -> Result<()> {
        let mut state = self.state.lock();
        Self::require(&state, session_id)?;
        state.resizes.push((session_id, cols, rows));
        Ok(())
    }

    fn stop(&self, session_id: SessionId) -> Result<()> {
        let mut state = self.state.lock();
        state.stops.push(session_id);
        match state.senders.remove(&session_id) {
            Some(sender) => {
                sender.send(BackendEvent::exited(Some(0)));
                Ok(())
            }
            None => Err(AgentdeskError::UnknownSession(session_id.to_string())),
        }
    }
}
