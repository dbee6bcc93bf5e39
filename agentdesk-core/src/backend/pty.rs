//! portable-pty backend

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use agentdesk_protocol::{BackendAck, BackendEvent, SessionConfig, SessionId};
use agentdesk_utils::{AgentdeskError, Result};
use parking_lot::Mutex;
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use tracing::{debug, info, warn};

use super::SessionBackend;
use crate::router::EventSender;

/// Read buffer size for PTY reads
const READ_BUFFER_SIZE: usize = 4096;

/// How long a child may outlive its PTY's EOF before it is killed
const REAP_GRACE: Duration = Duration::from_secs(2);

const REAP_POLL_INTERVAL: Duration = Duration::from_millis(10);

type SharedChild = Arc<Mutex<Box<dyn Child + Send + Sync>>>;
type HandleMap = Arc<Mutex<HashMap<SessionId, PtyHandle>>>;

/// A running PTY and its child
struct PtyHandle {
    /// Distinguishes a recreated session's handle from the one it replaced
    generation: u64,
    master: Mutex<Box<dyn MasterPty + Send>>,
    child: SharedChild,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl PtyHandle {
    fn write_all(&self, data: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock();
        writer
            .write_all(data)
            .and_then(|_| writer.flush())
            .map_err(|e| AgentdeskError::backend(format!("Write failed: {}", e)))
    }

    fn resize(&self, cols: u16, rows: u16) -> Result<()> {
        self.master
            .lock()
            .resize(pty_size(cols, rows))
            .map_err(|e| AgentdeskError::backend(format!("Resize failed: {}", e)))
    }

    fn kill(&self) -> Result<()> {
        self.child
            .lock()
            .kill()
            .map_err(|e| AgentdeskError::backend(format!("Kill failed: {}", e)))
    }
}

fn pty_size(cols: u16, rows: u16) -> PtySize {
    PtySize {
        rows: rows.max(1),
        cols: cols.max(1),
        pixel_width: 0,
        pixel_height: 0,
    }
}

/// Runs each session in its own pseudo-terminal
///
/// A reader thread per session forwards output as `Data` chunks of up to
/// 4 KiB. At end of stream it drops the session's handle, reaps the child
/// and sends `Exited`; a failed read sends `Error` instead.
#[derive(Default)]
pub struct PtyBackend {
    handles: HandleMap,
    next_generation: AtomicU64,
}

impl std::fmt::Debug for PtyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyBackend")
            .field("sessions", &self.handles.lock().len())
            .finish()
    }
}

impl PtyBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions whose process has not finished
    pub fn count(&self) -> usize {
        self.handles.lock().len()
    }

    pub fn contains(&self, session_id: SessionId) -> bool {
        self.handles.lock().contains_key(&session_id)
    }

    /// Kill every child
    pub fn kill_all(&self) {
        let drained: Vec<(SessionId, PtyHandle)> = self.handles.lock().drain().collect();
        for (session_id, handle) in drained {
            if let Err(e) = handle.kill() {
                debug!(session_id = %session_id, error = %e, "kill during shutdown failed");
            }
        }
    }

    fn with_handle<T>(&self, session_id: SessionId, f: impl FnOnce(&PtyHandle) -> Result<T>) -> Result<T> {
        let handles = self.handles.lock();
        let handle = handles
            .get(&session_id)
            .ok_or_else(|| AgentdeskError::UnknownSession(session_id.to_string()))?;
        f(handle)
    }
}

impl SessionBackend for PtyBackend {
    fn create(&self, config: &SessionConfig, events: EventSender) -> Result<BackendAck> {
        if config.command.trim().is_empty() {
            return Err(AgentdeskError::ProcessSpawn(format!(
                "no command configured for {}",
                config.tool
            )));
        }

        let pair = native_pty_system()
            .openpty(pty_size(config.cols, config.rows))
            .map_err(|e| AgentdeskError::backend(format!("Failed to open PTY: {}", e)))?;

        let mut cmd = CommandBuilder::new(&config.command);
        cmd.args(&config.args);
        if config.working_dir.exists() {
            cmd.cwd(&config.working_dir);
        }
        for (key, value) in &config.env_vars {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| AgentdeskError::ProcessSpawn(format!("{}: {}", config.command, e)))?;
        drop(pair.slave);

        let pid = child.process_id();

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| AgentdeskError::backend(format!("Failed to clone reader: {}", e)))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| AgentdeskError::backend(format!("Failed to get writer: {}", e)))?;

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let child: SharedChild = Arc::new(Mutex::new(child));
        let handle = PtyHandle {
            generation,
            master: Mutex::new(pair.master),
            child: Arc::clone(&child),
            writer: Mutex::new(writer),
        };

        // Registered before the reader starts so a fast exit can release it.
        let previous = self.handles.lock().insert(config.id, handle);
        if let Some(previous) = previous {
            warn!(session_id = %config.id, "replacing existing PTY for session");
            if let Err(e) = previous.kill() {
                debug!(session_id = %config.id, error = %e, "kill of replaced PTY failed");
            }
        }

        let release = Release {
            handles: Arc::clone(&self.handles),
            session_id: config.id,
            generation,
        };
        if let Err(e) = spawn_reader(reader, Arc::clone(&child), events, release) {
            if let Some(handle) = self.handles.lock().remove(&config.id) {
                if let Err(kill_err) = handle.kill() {
                    debug!(session_id = %config.id, error = %kill_err, "kill after reader failure failed");
                }
            }
            return Err(e);
        }

        info!(
            session_id = %config.id,
            command = %config.command,
            pid = ?pid,
            "spawned session process"
        );
        Ok(BackendAck { pid })
    }

    fn write(&self, session_id: SessionId, data: &[u8]) -> Result<()> {
        self.with_handle(session_id, |handle| handle.write_all(data))
    }

    fn resize(&self, session_id: SessionId, cols: u16, rows: u16) -> Result<()> {
        self.with_handle(session_id, |handle| handle.resize(cols, rows))
    }

    fn stop(&self, session_id: SessionId) -> Result<()> {
        let handle = self
            .handles
            .lock()
            .remove(&session_id)
            .ok_or_else(|| AgentdeskError::UnknownSession(session_id.to_string()))?;
        debug!(session_id = %session_id, "killing session process");
        handle.kill()
    }
}

impl Drop for PtyBackend {
    fn drop(&mut self) {
        self.kill_all();
    }
}

/// Drops a session's handle once its reader finishes
///
/// A handle that was replaced by a newer `create` for the same id is left
/// alone.
struct Release {
    handles: HandleMap,
    session_id: SessionId,
    generation: u64,
}

impl Release {
    fn run(self) {
        let released = {
            let mut handles = self.handles.lock();
            let owned = handles
                .get(&self.session_id)
                .map_or(false, |handle| handle.generation == self.generation);
            if owned {
                handles.remove(&self.session_id)
            } else {
                None
            }
        };
        if released.is_some() {
            debug!(session_id = %self.session_id, "released PTY handle");
        }
    }
}

/// Wait for the child to exit, killing it if it outlives the grace period
fn reap(child: &Mutex<Box<dyn Child + Send + Sync>>, session_id: SessionId) -> Option<i32> {
    let deadline = Instant::now() + REAP_GRACE;
    loop {
        let status = child.lock().try_wait();
        match status {
            Ok(Some(status)) => return Some(status.exit_code() as i32),
            Ok(None) if Instant::now() < deadline => thread::sleep(REAP_POLL_INTERVAL),
            Ok(None) => {
                let mut child = child.lock();
                if let Err(e) = child.kill() {
                    debug!(session_id = %session_id, error = %e, "kill of lingering child failed");
                }
                return child.wait().ok().map(|status| status.exit_code() as i32);
            }
            Err(e) => {
                debug!(session_id = %session_id, error = %e, "wait on child failed");
                return None;
            }
        }
    }
}

/// Forward PTY output to the session's channel until EOF or a read error
fn spawn_reader(
    mut reader: Box<dyn Read + Send>,
    child: SharedChild,
    events: EventSender,
    release: Release,
) -> Result<()> {
    let session_id = events.session_id();
    thread::Builder::new()
        .name(format!("pty-reader-{}", session_id))
        .spawn(move || {
            let mut buf = [0u8; READ_BUFFER_SIZE];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => {
                        release.run();
                        let exit_code = reap(&child, session_id);
                        debug!(session_id = %session_id, exit_code = ?exit_code, "PTY EOF");
                        events.send(BackendEvent::exited(exit_code));
                        break;
                    }
                    Ok(n) => {
                        if !events.send(BackendEvent::data(buf[..n].to_vec())) {
                            debug!(session_id = %session_id, "event channel closed, stopping reader");
                            break;
                        }
                    }
                    Err(e) => {
                        release.run();
                        if let Err(kill_err) = child.lock().kill() {
                            debug!(session_id = %session_id, error = %kill_err, "kill after read error failed");
                        }
                        reap(&child, session_id);
                        events.send(BackendEvent::error(format!("Read error: {}", e)));
                        break;
                    }
                }
            }
        })
        .map(|_| ())
        .map_err(|e| AgentdeskError::backend(format!("Failed to start reader thread: {}", e)))
}
