use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

/// Default terminal width for new sessions
pub const DEFAULT_COLS: u16 = 120;

/// Default terminal height for new sessions
pub const DEFAULT_ROWS: u16 = 30;

// ==================== Session Id ====================

/// Opaque session identifier, generated once and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// ==================== CLI Tool ====================

/// Interactive tool a session runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CliTool {
    ClaudeCode,
    Codex,
    Aider,
    Cline,
    Custom,
}

/// Error returned when a tool name cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tool: {0}")]
pub struct ParseToolError(pub String);

impl CliTool {
    /// Every known tool, in display order
    pub const ALL: [CliTool; 5] = [
        CliTool::ClaudeCode,
        CliTool::Codex,
        CliTool::Aider,
        CliTool::Cline,
        CliTool::Custom,
    ];

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            CliTool::ClaudeCode => "Claude Code",
            CliTool::Codex => "Codex",
            CliTool::Aider => "Aider",
            CliTool::Cline => "Cline",
            CliTool::Custom => "Custom",
        }
    }

    /// Built-in command for the tool. `Custom` has none; the caller supplies it.
    pub fn default_command(&self) -> &'static str {
        match self {
            CliTool::ClaudeCode => "claude",
            CliTool::Codex => "codex",
            CliTool::Aider => "aider",
            CliTool::Cline => "cline",
            CliTool::Custom => "",
        }
    }
}

impl fmt::Display for CliTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CliTool {
    type Err = ParseToolError;

    /// Accepts the variant name, the label, or a kebab/snake-case spelling
    /// (`ClaudeCode`, `Claude Code`, `claude-code`, `claude_code`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "claudecode" | "claude" => Ok(CliTool::ClaudeCode),
            "codex" => Ok(CliTool::Codex),
            "aider" => Ok(CliTool::Aider),
            "cline" => Ok(CliTool::Cline),
            "custom" => Ok(CliTool::Custom),
            _ => Err(ParseToolError(s.to_string())),
        }
    }
}

// ==================== Session Config ====================

/// Immutable launch description of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub id: SessionId,
    pub name: String,
    pub tool: CliTool,
    pub command: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub env_vars: HashMap<String, String>,
    pub cols: u16,
    pub rows: u16,
}

impl SessionConfig {
    /// Create a config for a tool using its built-in command and default size
    pub fn new(name: impl Into<String>, tool: CliTool) -> Self {
        Self {
            id: SessionId::new(),
            name: name.into(),
            tool,
            command: tool.default_command().to_string(),
            args: Vec::new(),
            working_dir: PathBuf::from("."),
            env_vars: HashMap::new(),
            cols: DEFAULT_COLS,
            rows: DEFAULT_ROWS,
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Set the terminal size. Zero dimensions are raised to 1.
    pub fn with_size(mut self, cols: u16, rows: u16) -> Self {
        self.cols = cols.max(1);
        self.rows = rows.max(1);
        self
    }
}

// ==================== Session Status ====================

/// Lifecycle status of a session
///
/// The registry does not enforce transitions; once `Stopped` the session is
/// not expected to run again under the same id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionStatus {
    #[default]
    Starting,
    Running,
    Idle,
    Working,
    Error {
        message: String,
    },
    Stopped,
}

impl SessionStatus {
    pub fn error(message: impl Into<String>) -> Self {
        SessionStatus::Error {
            message: message.into(),
        }
    }

    /// Running or Working; what the status bar counts as active
    pub fn is_live(&self) -> bool {
        matches!(self, SessionStatus::Running | SessionStatus::Working)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, SessionStatus::Stopped)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SessionStatus::Error { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::Starting => "Starting",
            SessionStatus::Running => "Running",
            SessionStatus::Idle => "Idle",
            SessionStatus::Working => "Working",
            SessionStatus::Error { .. } => "Error",
            SessionStatus::Stopped => "Stopped",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Error { message } => write!(f, "Error: {}", message),
            other => f.write_str(other.label()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== SessionId Tests ====================

    #[test]
    fn test_session_id_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn test_session_id_parse_roundtrip() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<SessionId>().is_err());
    }

    #[test]
    fn test_session_id_serializes_as_plain_string() {
        let id = SessionId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }

    // ==================== CliTool Tests ====================

    #[test]
    fn test_tool_labels() {
        assert_eq!(CliTool::ClaudeCode.label(), "Claude Code");
        assert_eq!(CliTool::Custom.to_string(), "Custom");
    }

    #[test]
    fn test_tool_default_commands() {
        assert_eq!(CliTool::ClaudeCode.default_command(), "claude");
        assert_eq!(CliTool::Codex.default_command(), "codex");
        assert_eq!(CliTool::Aider.default_command(), "aider");
        assert_eq!(CliTool::Cline.default_command(), "cline");
        assert_eq!(CliTool::Custom.default_command(), "");
    }

    #[test]
    fn test_tool_from_str_spellings() {
        for input in ["ClaudeCode", "Claude Code", "claude-code", "claude_code", "claude"] {
            assert_eq!(input.parse::<CliTool>().unwrap(), CliTool::ClaudeCode, "{}", input);
        }
        assert_eq!("AIDER".parse::<CliTool>().unwrap(), CliTool::Aider);
        assert_eq!(
            "vim".parse::<CliTool>().unwrap_err(),
            ParseToolError("vim".to_string())
        );
    }

    // ==================== SessionConfig Tests ====================

    #[test]
    fn test_config_new_uses_tool_defaults() {
        let config = SessionConfig::new("main", CliTool::Codex);
        assert_eq!(config.command, "codex");
        assert!(config.args.is_empty());
        assert_eq!((config.cols, config.rows), (DEFAULT_COLS, DEFAULT_ROWS));
    }

    #[test]
    fn test_config_builders() {
        let config = SessionConfig::new("custom", CliTool::Custom)
            .with_command("bash")
            .with_arg("-l")
            .with_args(["-c", "ls"])
            .with_working_dir("/tmp")
            .with_env("TERM", "xterm-256color")
            .with_size(0, 40);

        assert_eq!(config.command, "bash");
        assert_eq!(config.args, vec!["-l", "-c", "ls"]);
        assert_eq!(config.working_dir, PathBuf::from("/tmp"));
        assert_eq!(config.env_vars.get("TERM").map(String::as_str), Some("xterm-256color"));
        assert_eq!((config.cols, config.rows), (1, 40));
    }

    #[test]
    fn test_config_serializes_camel_case() {
        let config = SessionConfig::new("a", CliTool::Aider).with_env("K", "V");
        let value = serde_json::to_value(&config).unwrap();
        assert!(value.get("workingDir").is_some());
        assert!(value.get("envVars").is_some());
        assert_eq!(value["tool"], "Aider");
    }

    // ==================== SessionStatus Tests ====================

    #[test]
    fn test_status_default_is_starting() {
        assert_eq!(SessionStatus::default(), SessionStatus::Starting);
    }

    #[test]
    fn test_status_predicates() {
        assert!(SessionStatus::Running.is_live());
        assert!(SessionStatus::Working.is_live());
        assert!(!SessionStatus::Idle.is_live());
        assert!(!SessionStatus::Starting.is_live());
        assert!(SessionStatus::Stopped.is_stopped());
        assert!(SessionStatus::error("boom").is_error());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SessionStatus::Idle.to_string(), "Idle");
        assert_eq!(SessionStatus::error("spawn failed").to_string(), "Error: spawn failed");
    }

    #[test]
    fn test_status_tagged_json() {
        let json = serde_json::to_value(SessionStatus::error("bad")).unwrap();
        assert_eq!(json["type"], "Error");
        assert_eq!(json["message"], "bad");

        let parsed: SessionStatus = serde_json::from_str(r#"{"type":"Stopped"}"#).unwrap();
        assert_eq!(parsed, SessionStatus::Stopped);
    }
}
