//! Configuration schema structs

use std::collections::HashMap;
use std::path::PathBuf;

use agentdesk_protocol::{CliTool, SessionConfig, DEFAULT_COLS, DEFAULT_ROWS};
use serde::{Deserialize, Serialize};

use crate::router::DEFAULT_OUTPUT_BUFFER_BYTES;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub terminal: TerminalConfig,
    pub tools: ToolsConfig,
    pub keybindings: KeybindingConfig,
}

impl AppConfig {
    /// Launch description for `tool`, filled from configured defaults
    ///
    /// Command and args come from the tool's override when set, else the
    /// tool's built-in command. `Custom` falls back to the default shell.
    pub fn session_config(&self, tool: CliTool, name: impl Into<String>) -> SessionConfig {
        let overrides = self.tools.get(tool);

        let command = match (&overrides.command, tool) {
            (Some(command), _) => command.clone(),
            (None, CliTool::Custom) => self.general.default_shell.clone().unwrap_or_default(),
            (None, _) => tool.default_command().to_string(),
        };

        let mut config = SessionConfig::new(name, tool)
            .with_command(command)
            .with_args(overrides.args.iter().cloned())
            .with_size(self.terminal.default_cols, self.terminal.default_rows);

        if let Some(dir) = &self.general.default_working_dir {
            config = config.with_working_dir(dir.clone());
        }
        for (key, value) in &overrides.env {
            config = config.with_env(key.clone(), value.clone());
        }

        config
    }
}

/// General settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Command for `Custom` sessions that name none
    pub default_shell: Option<String>,
    /// Working directory for new sessions
    pub default_working_dir: Option<PathBuf>,
}

/// Terminal defaults for new sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub default_cols: u16,
    pub default_rows: u16,
    /// Per-session output buffer cap in bytes; oldest bytes go first
    pub output_buffer_bytes: usize,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            default_cols: DEFAULT_COLS,
            default_rows: DEFAULT_ROWS,
            output_buffer_bytes: DEFAULT_OUTPUT_BUFFER_BYTES,
        }
    }
}

/// Per-tool launch overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Replaces the tool's built-in command
    pub command: Option<String>,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

/// Overrides for every tool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub claude_code: ToolConfig,
    pub codex: ToolConfig,
    pub aider: ToolConfig,
    pub cline: ToolConfig,
    pub custom: ToolConfig,
}

impl ToolsConfig {
    pub fn get(&self, tool: CliTool) -> &ToolConfig {
        match tool {
            CliTool::ClaudeCode => &self.claude_code,
            CliTool::Codex => &self.codex,
            CliTool::Aider => &self.aider,
            CliTool::Cline => &self.cline,
            CliTool::Custom => &self.custom,
        }
    }
}

/// Navigation key bindings
///
/// Bindings are `Mod-Mod-Key` strings (`+` also separates). An empty
/// string disables the binding. The two digit modifiers apply to keys
/// `1` through `9`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeybindingConfig {
    pub new_session: String,
    pub next_session: String,
    pub prev_session: String,
    pub split_horizontal: String,
    pub split_vertical: String,
    pub close_pane: String,
    /// Modifiers held with a digit to jump to the Nth session
    pub jump_to_session: String,
    /// Modifiers held with a digit to focus the Nth pane
    pub focus_pane: String,
}

impl Default for KeybindingConfig {
    fn default() -> Self {
        Self {
            new_session: "Ctrl-N".into(),
            next_session: "Ctrl-Tab".into(),
            prev_session: "Ctrl-Shift-Tab".into(),
            split_horizontal: "Ctrl-Shift-D".into(),
            split_vertical: "Ctrl-Shift-E".into(),
            close_pane: "Ctrl-Shift-W".into(),
            jump_to_session: "Ctrl".into(),
            focus_pane: "Alt".into(),
        }
    }
}
