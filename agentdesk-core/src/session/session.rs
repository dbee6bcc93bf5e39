use std::sync::Arc;

use agentdesk_protocol::{SessionConfig, SessionId, SessionStatus};
use chrono::{DateTime, Utc};

/// A tracked session
///
/// Owned by [`SessionRegistry`](super::SessionRegistry); callers only ever
/// see clones or shared references. The config is shared between clones
/// since it never changes after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    config: Arc<SessionConfig>,
    status: SessionStatus,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    pid: Option<u32>,
}

impl Session {
    /// Create a session in `Starting` status, stamped now
    pub(crate) fn new(config: SessionConfig) -> Self {
        let now = Utc::now();
        Self {
            config: Arc::new(config),
            status: SessionStatus::Starting,
            created_at: now,
            last_activity: now,
            pid: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.config.id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub(crate) fn set_status(&mut self, status: SessionStatus) {
        self.status = status;
    }

    pub(crate) fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    pub(crate) fn set_pid(&mut self, pid: u32) {
        self.pid = Some(pid);
    }
}
