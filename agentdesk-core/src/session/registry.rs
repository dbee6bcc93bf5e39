use std::collections::HashMap;

use agentdesk_protocol::{SessionConfig, SessionId, SessionStatus};
use agentdesk_utils::{AgentdeskError, Result};
use tracing::debug;

use super::Session;

/// Status bar counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusSummary {
    /// Sessions that are Running or Working
    pub live: usize,
    pub total: usize,
}

/// The authoritative set of sessions
///
/// Sessions are kept in insertion order; that order drives listings and
/// session cycling. Operations on a missing id are no-ops except where a
/// missing id is a caller bug (`add_session` collisions, `set_active`).
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
    /// Insertion order of session ids
    order: Vec<SessionId>,
    active_session_id: Option<SessionId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session in `Starting` status
    ///
    /// The first session added to an empty registry becomes active.
    pub fn add_session(&mut self, config: SessionConfig) -> Result<SessionId> {
        let id = config.id;
        if self.sessions.contains_key(&id) {
            return Err(AgentdeskError::DuplicateId(id.to_string()));
        }

        self.sessions.insert(id, Session::new(config));
        self.order.push(id);

        if self.active_session_id.is_none() {
            self.active_session_id = Some(id);
        }

        Ok(id)
    }

    /// Remove a session; absent ids are ignored
    ///
    /// If the removed session was active, the first remaining session in
    /// insertion order becomes active.
    pub fn remove_session(&mut self, id: SessionId) -> Option<Session> {
        let session = self.sessions.remove(&id)?;
        self.order.retain(|existing| *existing != id);

        if self.active_session_id == Some(id) {
            self.active_session_id = self.order.first().copied();
        }

        Some(session)
    }

    /// Set a session's status. Returns false if the session is gone.
    pub fn update_status(&mut self, id: SessionId, status: SessionStatus) -> bool {
        match self.sessions.get_mut(&id) {
            Some(session) => {
                session.set_status(status);
                true
            }
            None => {
                debug!(session_id = %id, status = status.label(), "status update for missing session");
                false
            }
        }
    }

    /// Stamp `last_activity` with the current time
    pub fn update_activity(&mut self, id: SessionId) -> bool {
        match self.sessions.get_mut(&id) {
            Some(session) => {
                session.touch();
                true
            }
            None => false,
        }
    }

    /// Record the pid the backend reported for a session
    pub fn set_pid(&mut self, id: SessionId, pid: u32) -> bool {
        match self.sessions.get_mut(&id) {
            Some(session) => {
                session.set_pid(pid);
                true
            }
            None => false,
        }
    }

    pub fn set_active(&mut self, id: SessionId) -> Result<()> {
        if !self.sessions.contains_key(&id) {
            return Err(AgentdeskError::UnknownSession(id.to_string()));
        }
        self.active_session_id = Some(id);
        Ok(())
    }

    pub fn active_session_id(&self) -> Option<SessionId> {
        self.active_session_id
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.active_session_id.and_then(|id| self.sessions.get(&id))
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Sessions in insertion order
    pub fn list(&self) -> Vec<(SessionId, &Session)> {
        self.iter().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SessionId, &Session)> + '_ {
        self.order
            .iter()
            .filter_map(move |id| self.sessions.get(id).map(|session| (*id, session)))
    }

    /// Session ids in insertion order
    pub fn ids(&self) -> &[SessionId] {
        &self.order
    }

    /// Position of a session in insertion order
    pub fn position(&self, id: SessionId) -> Option<usize> {
        self.order.iter().position(|existing| *existing == id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn summary(&self) -> StatusSummary {
        StatusSummary {
            live: self
                .sessions
                .values()
                .filter(|session| session.status().is_live())
                .count(),
            total: self.sessions.len(),
        }
    }
}
