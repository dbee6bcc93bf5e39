//! Per-session backend event routing
//!
//! Each session gets one unbounded channel and one tokio task draining
//! it in arrival order. Tasks never wait on each other, so a stalled
//! session cannot hold up another session's events.
//!
//! Events are turned into registry updates:
//! - `Data` appends to the session's output, stamps activity and feeds
//!   complete lines to the usage ledger
//! - `Exited` marks the session `Stopped` (the exit code is only logged)
//! - `Error` marks the session `Error { message }`
//!
//! Events for sessions no longer in the registry are dropped. Output or
//! usage written while a session is being removed is discarded again.

mod output;

pub use output::{OutputBuffers, OutputSink, DEFAULT_OUTPUT_BUFFER_BYTES};

use std::sync::Arc;

use agentdesk_protocol::{BackendEvent, SessionId, SessionStatus};
use agentdesk_utils::{AgentdeskError, Result};
use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::session::SharedRegistry;
use crate::usage::{extract_token_usage, UsageLedger};

/// Longest unterminated line kept for usage scanning
const MAX_PENDING_LINE_BYTES: usize = 16 * 1024;

/// Sending half of a session's event channel
///
/// Cheap to clone and usable from plain threads; backends hold one per
/// session they drive.
#[derive(Debug, Clone)]
pub struct EventSender {
    session_id: SessionId,
    tx: mpsc::UnboundedSender<BackendEvent>,
}

impl EventSender {
    /// A sender with its receiver, not attached to any router
    pub fn pair(session_id: SessionId) -> (Self, mpsc::UnboundedReceiver<BackendEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { session_id, tx }, rx)
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Queue an event. Returns false once the channel has been discarded.
    pub fn send(&self, event: BackendEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// A live channel and the task draining it
#[derive(Debug)]
struct Route {
    sender: EventSender,
    cancel_token: CancellationToken,
    join_handle: JoinHandle<()>,
}

impl Route {
    fn cancel(&self) {
        self.cancel_token.cancel();
    }
}

/// Demultiplexes backend events into registry and output updates
pub struct EventRouter {
    routes: DashMap<SessionId, Route>,
    registry: SharedRegistry,
    output: Arc<dyn OutputSink>,
    usage: Arc<UsageLedger>,
    runtime: Handle,
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("routes", &self.routes.len())
            .finish_non_exhaustive()
    }
}

impl EventRouter {
    /// Create a router whose tasks run on the current tokio runtime
    pub fn new(registry: SharedRegistry, output: Arc<dyn OutputSink>) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| AgentdeskError::internal(format!("event router needs a tokio runtime: {}", e)))?;
        Ok(Self::with_runtime(registry, output, runtime))
    }

    pub fn with_runtime(
        registry: SharedRegistry,
        output: Arc<dyn OutputSink>,
        runtime: Handle,
    ) -> Self {
        Self {
            routes: DashMap::new(),
            registry,
            output,
            usage: Arc::new(UsageLedger::new()),
            runtime,
        }
    }

    /// Token usage seen in each session's output
    pub fn usage(&self) -> &Arc<UsageLedger> {
        &self.usage
    }

    /// Sender for a session's channel, creating the channel on first use
    ///
    /// An existing channel is always reused; only [`discard`](Self::discard)
    /// makes room for a new one.
    pub fn channel(&self, session_id: SessionId) -> EventSender {
        self.routes
            .entry(session_id)
            .or_insert_with(|| self.open(session_id))
            .sender
            .clone()
    }

    fn open(&self, session_id: SessionId) -> Route {
        let (sender, rx) = EventSender::pair(session_id);
        let cancel_token = CancellationToken::new();

        let task = RouteTask {
            session_id,
            rx,
            registry: self.registry.clone(),
            output: Arc::clone(&self.output),
            usage: Arc::clone(&self.usage),
            cancel_token: cancel_token.clone(),
            pending: String::new(),
        };
        let join_handle = self.runtime.spawn(task.run());

        debug!(session_id = %session_id, "event channel opened");
        Route {
            sender,
            cancel_token,
            join_handle,
        }
    }

    pub fn has_channel(&self, session_id: SessionId) -> bool {
        self.routes.contains_key(&session_id)
    }

    pub fn channel_count(&self) -> usize {
        self.routes.len()
    }

    /// Stop a session's task and drop its channel
    ///
    /// Events still queued are not processed. Returns false if the session
    /// had no channel.
    pub fn discard(&self, session_id: SessionId) -> bool {
        match self.routes.remove(&session_id) {
            Some((_, route)) => {
                route.cancel();
                debug!(session_id = %session_id, "event channel discarded");
                true
            }
            None => false,
        }
    }

    /// Discard a channel and wait for its task to finish
    pub async fn close(&self, session_id: SessionId) {
        if let Some((_, route)) = self.routes.remove(&session_id) {
            route.cancel();
            let _ = route.join_handle.await;
        }
    }

    /// Discard every channel
    pub fn shutdown(&self) {
        let ids: Vec<SessionId> = self.routes.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            self.discard(id);
        }
    }
}

impl Drop for EventRouter {
    fn drop(&mut self) {
        for entry in self.routes.iter() {
            entry.value().cancel();
        }
    }
}

/// Drains one session's channel
struct RouteTask {
    session_id: SessionId,
    rx: mpsc::UnboundedReceiver<BackendEvent>,
    registry: SharedRegistry,
    output: Arc<dyn OutputSink>,
    usage: Arc<UsageLedger>,
    cancel_token: CancellationToken,
    /// Output after the last newline, not yet scanned for usage
    pending: String,
}

impl RouteTask {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                _ = self.cancel_token.cancelled() => {
                    trace!(session_id = %self.session_id, "route task cancelled");
                    break;
                }

                event = self.rx.recv() => match event {
                    Some(event) => self.handle(event),
                    None => break,
                },
            }
        }
    }

    fn handle(&mut self, event: BackendEvent) {
        let id = self.session_id;
        trace!(session_id = %id, kind = event.kind(), "routing event");

        let applied = match event {
            BackendEvent::Data { data } => {
                let applied = self.registry.update_activity(id);
                if applied {
                    self.output.append(id, &data);
                    self.scan_usage(&data);
                    self.release_if_removed();
                }
                applied
            }
            BackendEvent::Exited { exit_code } => {
                self.flush_usage();
                let applied = self.registry.update_status(id, SessionStatus::Stopped);
                if applied {
                    info!(session_id = %id, exit_code = ?exit_code, "session exited");
                }
                applied
            }
            BackendEvent::Error { message } => {
                warn!(session_id = %id, error = %message, "backend reported error");
                self.registry.update_status(id, SessionStatus::Error { message })
            }
        };

        if !applied {
            debug!(session_id = %id, "dropping event for removed session");
        }
    }

    /// Scan the complete lines of `data` for usage reports
    fn scan_usage(&mut self, data: &[u8]) {
        let clean = strip_ansi_escapes::strip(data);
        self.pending.push_str(&String::from_utf8_lossy(&clean));

        match self.pending.rfind('\n') {
            Some(end) => {
                let complete: String = self.pending.drain(..=end).collect();
                self.record_usage(&complete);
            }
            None if self.pending.len() > MAX_PENDING_LINE_BYTES => self.pending.clear(),
            None => {}
        }
    }

    /// Scan whatever is left once the session ends
    fn flush_usage(&mut self) {
        let rest = std::mem::take(&mut self.pending);
        if self.registry.contains(self.session_id) {
            self.record_usage(&rest);
        }
    }

    fn record_usage(&self, text: &str) {
        let reports = extract_token_usage(text);
        if !reports.is_empty() {
            debug!(session_id = %self.session_id, reports = reports.len(), "token usage reported");
            self.usage.record(self.session_id, &reports);
        }
    }

    /// Undo writes that raced with the session's removal
    fn release_if_removed(&self) {
        if !self.registry.contains(self.session_id) {
            self.output.discard(self.session_id);
            self.usage.discard(self.session_id);
        }
    }
}
