//! Coordination of sessions, layout and backend
//!
//! `Workstation` is the single place user actions enter the core. It owns
//! the shared registry and layout, the event router and the backend, and
//! applies each action as whole-value updates of that state.

use std::sync::Arc;

use agentdesk_protocol::{CliTool, PaneId, SessionConfig, SessionId, SessionStatus};
use agentdesk_utils::{AgentdeskError, Result};
use crossterm::event::KeyEvent;
use tracing::{debug, info, warn};

use crate::backend::SessionBackend;
use crate::config::{AppConfig, ConfigHandle};
use crate::navigation::{Keymap, NavCommand, NavOutcome, NavigationController};
use crate::pane::{PaneTree, SharedLayout};
use crate::router::{EventRouter, OutputSink};
use crate::session::{Session, SharedRegistry, StatusSummary};
use crate::usage::UsageTotals;

/// The control plane of one workstation window
pub struct Workstation {
    backend: Arc<dyn SessionBackend>,
    config: ConfigHandle,
    registry: SharedRegistry,
    layout: SharedLayout,
    router: EventRouter,
    output: Arc<dyn OutputSink>,
    navigation: NavigationController,
    keymap: Keymap,
}

impl std::fmt::Debug for Workstation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workstation")
            .field("sessions", &self.registry.snapshot().len())
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}

impl Workstation {
    /// Create a workstation; must be called inside a tokio runtime
    ///
    /// Fails if the configured key bindings do not parse.
    pub fn new(
        backend: Arc<dyn SessionBackend>,
        config: ConfigHandle,
        output: Arc<dyn OutputSink>,
    ) -> Result<Self> {
        let keymap = Keymap::from_config(&config.load().keybindings)?;
        let registry = SharedRegistry::new();
        let layout = SharedLayout::new(PaneTree::new());
        let router = EventRouter::new(registry.clone(), Arc::clone(&output))?;
        let navigation = NavigationController::new(registry.clone(), layout.clone());

        Ok(Self {
            backend,
            config,
            registry,
            layout,
            router,
            output,
            navigation,
            keymap,
        })
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn layout(&self) -> &SharedLayout {
        &self.layout
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    pub fn config(&self) -> Arc<AppConfig> {
        self.config.load_full()
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    /// Launch description for `tool` using the current configuration
    pub fn session_config(&self, tool: CliTool, name: impl Into<String>) -> SessionConfig {
        self.config.load().session_config(tool, name)
    }

    // ==================== Session Lifecycle ====================

    /// Register a session and start it on the backend
    ///
    /// An empty active pane picks up the new session. A failed `create`
    /// leaves the session in `Error` status and still returns its id; only
    /// a duplicate id is an error here.
    pub fn launch(&self, config: SessionConfig) -> Result<SessionId> {
        let id = self.registry.add_session(config.clone())?;
        info!(session_id = %id, name = %config.name, tool = %config.tool, "launching session");

        self.layout.update(|tree| {
            let active = tree.active_leaf();
            if active.session_id.is_none() {
                tree.set_pane_session(active.id, Some(id))
            } else {
                tree.clone()
            }
        });

        self.start(&config);
        Ok(id)
    }

    /// Start an errored session again with a fresh channel
    ///
    /// Returns false, doing nothing, unless the session is in `Error`.
    pub fn retry(&self, id: SessionId) -> Result<bool> {
        let session = self
            .registry
            .get(id)
            .ok_or_else(|| AgentdeskError::UnknownSession(id.to_string()))?;

        if !session.status().is_error() {
            debug!(session_id = %id, status = session.status().label(), "retry skipped");
            return Ok(false);
        }

        info!(session_id = %id, "retrying session");
        self.router.discard(id);
        self.registry.update_status(id, SessionStatus::Starting);
        self.start(session.config());
        Ok(true)
    }

    fn start(&self, config: &SessionConfig) {
        let id = config.id;
        let events = self.router.channel(id);

        match self.backend.create(config, events) {
            Ok(ack) => {
                // Events may already have moved the session past Starting.
                self.registry.update(|registry| {
                    let starting = registry
                        .get(id)
                        .map_or(false, |session| *session.status() == SessionStatus::Starting);
                    if starting {
                        registry.update_status(id, SessionStatus::Running);
                    }
                    if let Some(pid) = ack.pid {
                        registry.set_pid(id, pid);
                    }
                });
                debug!(session_id = %id, pid = ?ack.pid, "backend acknowledged session");
            }
            Err(e) => {
                warn!(session_id = %id, error = %e, "backend failed to create session");
                self.registry
                    .update_status(id, SessionStatus::error(e.to_string()));
            }
        }
    }

    /// Ask the backend to stop a session
    ///
    /// The status changes when the backend's `Exited` event arrives.
    pub fn stop(&self, id: SessionId) -> Result<()> {
        if !self.registry.contains(id) {
            return Err(AgentdeskError::UnknownSession(id.to_string()));
        }
        self.backend.stop(id).map_err(|e| {
            warn!(session_id = %id, error = %e, "stop failed");
            e
        })
    }

    /// Forget a session
    ///
    /// The backend is asked to stop the session whatever its status, so it
    /// can release anything still held for it; failures are only logged.
    /// Panes keep the id and resolve to empty from now on.
    pub fn remove(&self, id: SessionId) -> Option<Session> {
        let removed = self.registry.remove_session(id)?;

        if let Err(e) = self.backend.stop(id) {
            debug!(session_id = %id, error = %e, "stop during removal failed");
        }
        self.router.discard(id);
        self.output.discard(id);
        self.router.usage().discard(id);

        info!(session_id = %id, "session removed");
        Some(removed)
    }

    /// Send input to a session's program
    pub fn write(&self, id: SessionId, data: &[u8]) -> Result<()> {
        self.backend.write(id, data).map_err(|e| {
            warn!(session_id = %id, error = %e, "write failed");
            e
        })
    }

    pub fn resize(&self, id: SessionId, cols: u16, rows: u16) -> Result<()> {
        self.backend.resize(id, cols, rows).map_err(|e| {
            warn!(session_id = %id, cols, rows, error = %e, "resize failed");
            e
        })
    }

    /// Stop every session that has not stopped yet and close all channels
    pub fn shutdown(&self) {
        for (id, session) in self.registry.list() {
            if !session.status().is_stopped() && !session.status().is_error() {
                if let Err(e) = self.backend.stop(id) {
                    debug!(session_id = %id, error = %e, "stop during shutdown failed");
                }
            }
        }
        self.router.shutdown();
    }

    // ==================== Queries ====================

    /// Session shown in a pane, or `None` for empty and stale panes
    pub fn resolve_pane(&self, pane_id: PaneId) -> Option<Session> {
        self.layout
            .load()
            .session_of(pane_id)
            .and_then(|id| self.registry.get(id))
    }

    /// Session shown in the active pane
    pub fn active_pane_session(&self) -> Option<Session> {
        self.resolve_pane(self.layout.load().active_pane_id())
    }

    pub fn summary(&self) -> StatusSummary {
        self.registry.summary()
    }

    /// Token usage reported so far in a session's output
    pub fn usage(&self, id: SessionId) -> Option<UsageTotals> {
        self.router.usage().totals(id)
    }

    // ==================== Navigation ====================

    pub fn dispatch(&self, command: NavCommand) -> NavOutcome {
        self.navigation.dispatch(command)
    }

    /// Run the command bound to a key, if any
    pub fn handle_key(&self, event: &KeyEvent) -> Option<NavOutcome> {
        self.keymap
            .lookup(event)
            .map(|command| self.dispatch(command))
    }
}

impl Drop for Workstation {
    fn drop(&mut self) {
        self.router.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::config::new_config_handle;
    use crate::router::OutputBuffers;

    fn workstation() -> (Workstation, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let station = Workstation::new(
            backend.clone(),
            new_config_handle(),
            Arc::new(OutputBuffers::default()),
        )
        .unwrap();
        (station, backend)
    }

    #[tokio::test]
    async fn test_launch_sets_running_and_pid() {
        let (station, _) = workstation();
        let id = station
            .launch(station.session_config(CliTool::Codex, "main"))
            .unwrap();

        let session = station.registry().get(id).unwrap();
        assert_eq!(session.status(), &SessionStatus::Running);
        assert!(session.pid().is_some());
    }

    #[tokio::test]
    async fn test_launch_binds_empty_active_pane_only() {
        let (station, _) = workstation();
        let first = station
            .launch(station.session_config(CliTool::Codex, "a"))
            .unwrap();
        station
            .launch(station.session_config(CliTool::Codex, "b"))
            .unwrap();

        assert_eq!(station.active_pane_session().unwrap().id(), first);
    }

    #[tokio::test]
    async fn test_launch_duplicate_fails() {
        let (station, _) = workstation();
        let config = station.session_config(CliTool::Aider, "a");
        station.launch(config.clone()).unwrap();
        assert!(matches!(
            station.launch(config),
            Err(AgentdeskError::DuplicateId(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_create_sets_error() {
        let (station, backend) = workstation();
        backend.fail_next_create("no such binary");
        let id = station
            .launch(station.session_config(CliTool::Cline, "a"))
            .unwrap();

        assert_eq!(
            station.registry().get(id).unwrap().status(),
            &SessionStatus::error("Backend error: no such binary")
        );
    }

    #[tokio::test]
    async fn test_retry_only_from_error() {
        let (station, backend) = workstation();
        let id = station
            .launch(station.session_config(CliTool::Cline, "a"))
            .unwrap();

        assert!(!station.retry(id).unwrap());
        assert_eq!(backend.create_count(id), 1);
        assert!(station.retry(SessionId::new()).is_err());
    }

    #[tokio::test]
    async fn test_stop_unknown_session_fails() {
        let (station, _) = workstation();
        assert!(matches!(
            station.stop(SessionId::new()),
            Err(AgentdeskError::UnknownSession(_))
        ));
    }
}
