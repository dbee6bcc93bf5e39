//! Per-session output storage

use std::collections::HashMap;

use agentdesk_protocol::SessionId;
use parking_lot::Mutex;

use crate::config::TerminalConfig;

/// Default cap on buffered bytes per session (1 MiB)
pub const DEFAULT_OUTPUT_BUFFER_BYTES: usize = 1024 * 1024;

/// Destination for session output bytes
///
/// Called from router tasks; implementations must not block for long.
pub trait OutputSink: Send + Sync {
    /// Append bytes produced by a session
    fn append(&self, session_id: SessionId, data: &[u8]);

    /// Forget everything held for a session
    fn discard(&self, _session_id: SessionId) {}
}

/// Capped in-memory byte buffers, one per session
///
/// When a buffer exceeds its cap the oldest bytes are dropped.
#[derive(Debug)]
pub struct OutputBuffers {
    buffers: Mutex<HashMap<SessionId, Vec<u8>>>,
    max_bytes: usize,
}

impl Default for OutputBuffers {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_BUFFER_BYTES)
    }
}

impl OutputBuffers {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            buffers: Mutex::new(HashMap::new()),
            max_bytes: max_bytes.max(1),
        }
    }

    /// Buffers capped at the configured `output_buffer_bytes`
    pub fn from_config(config: &TerminalConfig) -> Self {
        Self::new(config.output_buffer_bytes)
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Copy of the buffered output for a session
    pub fn contents(&self, session_id: SessionId) -> Vec<u8> {
        self.buffers
            .lock()
            .get(&session_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Buffered output as (lossy) text
    pub fn text(&self, session_id: SessionId) -> String {
        String::from_utf8_lossy(&self.contents(session_id)).into_owned()
    }

    /// Drain the buffered output for a session
    pub fn take(&self, session_id: SessionId) -> Vec<u8> {
        self.buffers
            .lock()
            .get_mut(&session_id)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    pub fn len(&self, session_id: SessionId) -> usize {
        self.buffers.lock().get(&session_id).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, session_id: SessionId) -> bool {
        self.len(session_id) == 0
    }
}

impl OutputSink for OutputBuffers {
    fn append(&self, session_id: SessionId, data: &[u8]) {
        let mut buffers = self.buffers.lock();
        let buffer = buffers.entry(session_id).or_default();
        buffer.extend_from_slice(data);

        if buffer.len() > self.max_bytes {
            let excess = buffer.len() - self.max_bytes;
            buffer.drain(..excess);
        }
    }

    fn discard(&self, session_id: SessionId) {
        self.buffers.lock().remove(&session_id);
    }
}
