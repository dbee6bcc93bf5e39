//! End-to-end workstation flows, mostly against the in-memory backend

use std::sync::Arc;
use std::time::Duration;

use agentdesk_core::config::{config_handle, new_config_handle};
use agentdesk_core::{
    AppConfig, CycleDirection, MemoryBackend, NavCommand, NavOutcome, OutputBuffers, PtyBackend,
    Workstation,
};
use agentdesk_protocol::{
    BackendEvent, CliTool, SessionConfig, SessionId, SessionStatus, SplitDirection,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

struct Harness {
    station: Workstation,
    backend: Arc<MemoryBackend>,
    output: Arc<OutputBuffers>,
}

fn harness() -> Harness {
    let mut config = AppConfig::default();
    config.terminal.output_buffer_bytes = 1024;
    let output = Arc::new(OutputBuffers::from_config(&config.terminal));
    let backend = Arc::new(MemoryBackend::new());
    let station = Workstation::new(backend.clone(), config_handle(config), output.clone()).unwrap();
    Harness {
        station,
        backend,
        output,
    }
}

impl Harness {
    fn launch(&self, name: &str) -> SessionId {
        self.station
            .launch(self.station.session_config(CliTool::ClaudeCode, name))
            .unwrap()
    }

    fn status(&self, id: SessionId) -> Option<SessionStatus> {
        self.station.registry().get(id).map(|s| s.status().clone())
    }
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

// ==================== Lifecycle Tests ====================

#[tokio::test]
async fn test_output_then_exit_in_order() {
    let h = harness();
    let id = h.launch("main");

    h.backend.emit(id, BackendEvent::data(&b"hello "[..]));
    h.backend.emit(id, BackendEvent::data(&b"world"[..]));
    h.backend.emit(id, BackendEvent::exited(Some(0)));

    wait_for(|| h.status(id) == Some(SessionStatus::Stopped)).await;
    assert_eq!(h.output.text(id), "hello world");
}

#[tokio::test]
async fn test_backend_error_event_marks_session() {
    let h = harness();
    let id = h.launch("main");

    h.backend.emit(id, BackendEvent::error("Read error: broken pipe"));

    wait_for(|| h.status(id) == Some(SessionStatus::error("Read error: broken pipe"))).await;
    assert_eq!(h.station.summary().live, 0);
}

#[tokio::test]
async fn test_stop_goes_through_exited_event() {
    let h = harness();
    let id = h.launch("main");

    h.station.stop(id).unwrap();

    wait_for(|| h.status(id) == Some(SessionStatus::Stopped)).await;
    assert_eq!(h.backend.stops(), vec![id]);
}

#[tokio::test]
async fn test_retry_after_failed_create() {
    let h = harness();
    h.backend.fail_next_create("spawn refused");
    let id = h.launch("flaky");
    assert!(h.status(id).unwrap().is_error());

    assert!(h.station.retry(id).unwrap());
    assert_eq!(h.status(id), Some(SessionStatus::Running));
    assert_eq!(h.backend.create_count(id), 2);

    h.backend.emit(id, BackendEvent::data(&b"up"[..]));
    wait_for(|| h.output.text(id) == "up").await;
}

#[tokio::test]
async fn test_remove_drops_late_events_and_output() {
    let h = harness();
    let id = h.launch("gone");
    let sender = h.backend.sender(id).unwrap();

    h.backend.emit(id, BackendEvent::data(&b"before"[..]));
    wait_for(|| h.output.text(id) == "before").await;

    let removed = h.station.remove(id).unwrap();
    assert_eq!(removed.id(), id);
    assert!(h.output.is_empty(id));

    sender.send(BackendEvent::data(&b"after"[..]));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(h.status(id).is_none());
    assert!(h.output.is_empty(id));
    assert!(!h.station.router().has_channel(id));
}

#[cfg(unix)]
#[tokio::test]
async fn test_remove_after_exit_releases_pty() {
    let backend = Arc::new(PtyBackend::new());
    let station = Workstation::new(
        backend.clone(),
        new_config_handle(),
        Arc::new(OutputBuffers::default()),
    )
    .unwrap();

    let id = station
        .launch(SessionConfig::new("true", CliTool::Custom).with_command("true"))
        .unwrap();
    wait_for(|| station.registry().get(id).map_or(false, |s| s.status().is_stopped())).await;

    assert!(station.remove(id).is_some());
    assert_eq!(backend.count(), 0);
}

#[tokio::test]
async fn test_output_capped_by_config() {
    let h = harness();
    let id = h.launch("chatty");

    for _ in 0..20 {
        h.backend.emit(id, BackendEvent::data(vec![b'x'; 100]));
    }
    h.backend.emit(id, BackendEvent::exited(Some(0)));

    wait_for(|| h.status(id) == Some(SessionStatus::Stopped)).await;
    assert_eq!(h.output.len(id), 1024);
}

#[tokio::test]
async fn test_usage_tracked_until_removal() {
    let h = harness();
    let id = h.launch("main");

    h.backend.emit(
        id,
        BackendEvent::data(&b"Total cost: $0.42\nTotal input tokens: 1,200\n"[..]),
    );
    wait_for(|| h.station.usage(id).is_some()).await;
    let usage = h.station.usage(id).unwrap();
    assert_eq!(usage.cost_usd, 0.42);
    assert_eq!(usage.input_tokens, 1_200);

    h.station.remove(id);
    assert!(h.station.usage(id).is_none());
}

#[tokio::test]
async fn test_removed_session_leaves_stale_pane_empty() {
    let h = harness();
    let id = h.launch("main");
    let pane = h.station.layout().load().active_pane_id();
    assert_eq!(h.station.resolve_pane(pane).unwrap().id(), id);

    h.station.remove(id);

    assert_eq!(h.station.layout().load().session_of(pane), Some(id));
    assert!(h.station.resolve_pane(pane).is_none());
}

#[tokio::test]
async fn test_write_and_resize_reach_backend() {
    let h = harness();
    let id = h.launch("main");

    h.station.write(id, b"ls\n").unwrap();
    h.station.resize(id, 100, 40).unwrap();

    assert_eq!(h.backend.written(id), b"ls\n".to_vec());
    assert_eq!(h.backend.resizes(), vec![(id, 100, 40)]);
    assert!(h.station.write(SessionId::new(), b"x").is_err());
}

#[tokio::test]
async fn test_sessions_do_not_block_each_other() {
    let h = harness();
    let a = h.launch("a");
    let b = h.launch("b");

    for _ in 0..100 {
        h.backend.emit(a, BackendEvent::data(&b"a"[..]));
    }
    h.backend.emit(b, BackendEvent::exited(Some(1)));

    wait_for(|| h.status(b) == Some(SessionStatus::Stopped)).await;
    wait_for(|| h.output.len(a) == 100).await;
    assert_eq!(h.status(a), Some(SessionStatus::Running));
}

// ==================== Navigation Tests ====================

#[tokio::test]
async fn test_keys_drive_navigation() {
    let h = harness();
    let a = h.launch("a");
    let b = h.launch("b");

    let next = KeyEvent::new(KeyCode::Tab, KeyModifiers::CONTROL);
    assert_eq!(h.station.handle_key(&next), Some(NavOutcome::SessionActivated(b)));
    assert_eq!(h.station.active_pane_session().unwrap().id(), b);

    let jump = KeyEvent::new(KeyCode::Char('1'), KeyModifiers::CONTROL);
    assert_eq!(h.station.handle_key(&jump), Some(NavOutcome::SessionActivated(a)));

    let unbound = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
    assert_eq!(h.station.handle_key(&unbound), None);
}

#[tokio::test]
async fn test_split_focus_and_cycle_binds_new_pane() {
    let h = harness();
    let a = h.launch("a");
    let b = h.launch("b");

    assert_eq!(
        h.station.dispatch(NavCommand::Split(SplitDirection::Vertical)),
        NavOutcome::LayoutChanged
    );
    assert_eq!(h.station.dispatch(NavCommand::FocusPane(1)), NavOutcome::LayoutChanged);
    assert!(h.station.active_pane_session().is_none());

    h.station
        .dispatch(NavCommand::CycleSession(CycleDirection::Forward));

    let tree = h.station.layout().load();
    let bound: Vec<_> = tree.leaves().iter().map(|leaf| leaf.session_id).collect();
    assert_eq!(bound, vec![Some(a), Some(b)]);
}

// ==================== Configuration Tests ====================

#[tokio::test]
async fn test_configured_tool_override_is_used() {
    let mut config = AppConfig::default();
    config.tools.codex.command = Some("/opt/codex/bin/codex".into());
    config.tools.codex.args = vec!["--quiet".into()];
    config.terminal.default_cols = 90;

    let station = Workstation::new(
        Arc::new(MemoryBackend::new()),
        config_handle(config),
        Arc::new(OutputBuffers::default()),
    )
    .unwrap();

    let session = station.session_config(CliTool::Codex, "c");
    assert_eq!(session.command, "/opt/codex/bin/codex");
    assert_eq!(session.args, vec!["--quiet".to_string()]);
    assert_eq!(session.cols, 90);
}

#[tokio::test]
async fn test_conflicting_keybindings_rejected() {
    let mut config = AppConfig::default();
    config.keybindings.close_pane = config.keybindings.new_session.clone();

    let result = Workstation::new(
        Arc::new(MemoryBackend::new()),
        config_handle(config),
        Arc::new(OutputBuffers::default()),
    );
    assert!(result.is_err());
}
