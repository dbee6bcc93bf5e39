use std::sync::Arc;

use agentdesk_protocol::{SessionConfig, SessionId, SessionStatus};
use agentdesk_utils::Result;
use arc_swap::{ArcSwap, Guard};

use super::{Session, SessionRegistry, StatusSummary};

/// Registry shared between the coordination context and router tasks
///
/// Every mutation clones the current registry, applies the operation and
/// swaps the whole value in. Readers hold an `Arc` snapshot and never see
/// a partially applied change.
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<ArcSwap<SessionRegistry>>,
}

impl SharedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current registry value
    pub fn snapshot(&self) -> Arc<SessionRegistry> {
        self.inner.load_full()
    }

    /// Apply `f` to a copy of the registry and publish the result
    ///
    /// If another writer published first, `f` runs again on the newer
    /// value, so it must not have side effects outside the registry.
    pub fn update<R>(&self, mut f: impl FnMut(&mut SessionRegistry) -> R) -> R {
        let mut current = self.inner.load_full();
        loop {
            let mut next = SessionRegistry::clone(&current);
            let result = f(&mut next);

            let previous = self.inner.compare_and_swap(&current, Arc::new(next));
            if Arc::ptr_eq(&*previous, &current) {
                return result;
            }
            current = Guard::into_inner(previous);
        }
    }

    pub fn add_session(&self, config: SessionConfig) -> Result<SessionId> {
        self.update(|registry| registry.add_session(config.clone()))
    }

    pub fn remove_session(&self, id: SessionId) -> Option<Session> {
        self.update(|registry| registry.remove_session(id))
    }

    pub fn update_status(&self, id: SessionId, status: SessionStatus) -> bool {
        self.update(|registry| registry.update_status(id, status.clone()))
    }

    pub fn update_activity(&self, id: SessionId) -> bool {
        self.update(|registry| registry.update_activity(id))
    }

    pub fn set_pid(&self, id: SessionId, pid: u32) -> bool {
        self.update(|registry| registry.set_pid(id, pid))
    }

    pub fn set_active(&self, id: SessionId) -> Result<()> {
        self.update(|registry| registry.set_active(id))
    }

    pub fn get(&self, id: SessionId) -> Option<Session> {
        self.inner.load().get(id).cloned()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.inner.load().contains(id)
    }

    pub fn active_session_id(&self) -> Option<SessionId> {
        self.inner.load().active_session_id()
    }

    /// Owned copy of the session list, in insertion order
    pub fn list(&self) -> Vec<(SessionId, Session)> {
        self.inner
            .load()
            .iter()
            .map(|(id, session)| (id, session.clone()))
            .collect()
    }

    pub fn summary(&self) -> StatusSummary {
        self.inner.load().summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentdesk_protocol::CliTool;

    #[test]
    fn test_snapshot_is_isolated_from_later_updates() {
        let shared = SharedRegistry::new();
        let id = shared
            .add_session(SessionConfig::new("a", CliTool::Codex))
            .unwrap();

        let before = shared.snapshot();
        shared.update_status(id, SessionStatus::Running);

        assert_eq!(before.get(id).unwrap().status(), &SessionStatus::Starting);
        assert_eq!(shared.get(id).unwrap().status(), &SessionStatus::Running);
    }

    #[test]
    fn test_update_returns_closure_result() {
        let shared = SharedRegistry::new();
        let len = shared.update(|registry| {
            registry
                .add_session(SessionConfig::new("a", CliTool::Aider))
                .unwrap();
            registry.len()
        });
        assert_eq!(len, 1);
        assert_eq!(shared.list().len(), 1);
    }

    #[test]
    fn test_duplicate_through_shared() {
        let shared = SharedRegistry::new();
        let config = SessionConfig::new("a", CliTool::Aider);
        shared.add_session(config.clone()).unwrap();
        assert!(shared.add_session(config).is_err());
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let shared = SharedRegistry::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    for j in 0..25 {
                        shared
                            .add_session(SessionConfig::new(format!("{}-{}", i, j), CliTool::Custom))
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = shared.snapshot();
        assert_eq!(snapshot.len(), 200);
        assert_eq!(snapshot.ids().len(), 200);
        assert!(snapshot.active_session_id().is_some());
    }
}
