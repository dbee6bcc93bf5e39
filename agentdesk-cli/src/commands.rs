//! Command implementations

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use agentdesk_core::config::{config_handle, DEFAULT_CONFIG_TOML};
use agentdesk_core::{AppConfig, ConfigLoader, OutputSink, PtyBackend, Workstation};
use agentdesk_protocol::{CliTool, SessionConfig, SessionId, SessionStatus};
use agentdesk_utils::{AgentdeskError, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::cli::Command;

/// How often the foreground loop checks session status
const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Execute a parsed command, returning the process exit code
pub async fn execute(command: Command, config_path: Option<&Path>) -> Result<i32> {
    match command {
        Command::Run {
            tool,
            name,
            cwd,
            cols,
            rows,
            command,
        } => {
            let config = load_config(config_path)?;
            let name = name.unwrap_or_else(|| tool.label().to_string());
            let mut session = config.session_config(tool, name);
            apply_overrides(&mut session, cwd.as_deref(), cols, rows, command);
            run(config, session).await
        }
        Command::Tools => {
            let config = load_config(config_path)?;
            print!("{}", tools_table(&config));
            Ok(0)
        }
        Command::Config { default } => {
            print!("{}", config_text(default, config_path)?);
            Ok(0)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => ConfigLoader::load_and_validate_path(path),
        None => ConfigLoader::load_and_validate(),
    }
}

fn apply_overrides(
    session: &mut SessionConfig,
    cwd: Option<&Path>,
    cols: Option<u16>,
    rows: Option<u16>,
    command: Vec<String>,
) {
    if let Some(dir) = cwd {
        session.working_dir = dir.to_path_buf();
    }
    if let Some(cols) = cols {
        session.cols = cols;
    }
    if let Some(rows) = rows {
        session.rows = rows;
    }

    let mut command = command.into_iter();
    if let Some(program) = command.next() {
        session.command = program;
        session.args = command.collect();
    }
}

fn tools_table(config: &AppConfig) -> String {
    let mut out = String::new();
    for tool in CliTool::ALL {
        let session = config.session_config(tool, "");
        let mut line = session.command.clone();
        for arg in &session.args {
            line.push(' ');
            line.push_str(arg);
        }
        if line.is_empty() {
            line.push_str("(none)");
        }
        out.push_str(&format!("{:<12} {}\n", tool.label(), line));
    }
    out
}

/// The commented default template, or the loaded config rendered as TOML
fn config_text(default: bool, config_path: Option<&Path>) -> Result<String> {
    if default {
        return Ok(DEFAULT_CONFIG_TOML.to_string());
    }
    render_config(&load_config(config_path)?)
}

fn render_config(config: &AppConfig) -> Result<String> {
    toml::to_string_pretty(config)
        .map_err(|e| AgentdeskError::config(format!("failed to render config: {}", e)))
}

// ==================== Foreground Session ====================

/// Writes session output straight to stdout
struct StdoutSink;

impl OutputSink for StdoutSink {
    fn append(&self, session_id: SessionId, data: &[u8]) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout.write_all(data).and_then(|_| stdout.flush()) {
            debug!(session_id = %session_id, error = %e, "stdout write failed");
        }
    }
}

async fn run(config: AppConfig, session: SessionConfig) -> Result<i32> {
    let station = Workstation::new(
        Arc::new(PtyBackend::new()),
        config_handle(config),
        Arc::new(StdoutSink),
    )?;

    let id = station.launch(session)?;
    info!(session_id = %id, "foreground session started");

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut ticker = tokio::time::interval(STATUS_POLL_INTERVAL);

    let code = loop {
        tokio::select! {
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(mut line)) => {
                    line.push('\n');
                    if let Err(e) = station.write(id, line.as_bytes()) {
                        debug!(error = %e, "input dropped");
                    }
                }
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!(error = %e, "stdin read failed");
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                if let Err(e) = station.stop(id) {
                    debug!(error = %e, "stop on interrupt failed");
                }
            }
            _ = ticker.tick() => {
                match station.registry().get(id).map(|s| s.status().clone()) {
                    Some(SessionStatus::Stopped) | None => break 0,
                    Some(status @ SessionStatus::Error { .. }) => {
                        eprintln!("agentdesk: {}", status);
                        break 1;
                    }
                    Some(_) => {}
                }
            }
        }
    };

    station.shutdown();
    Ok(code)
}
