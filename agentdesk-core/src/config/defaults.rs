//! Default configuration values
//!
//! Printed by `agentdesk config --default` and kept in step with the
//! `Default` impls in the schema.

/// Default configuration as TOML
pub const DEFAULT_CONFIG_TOML: &str = r##"
# agentdesk configuration

[general]
# default_shell = "/bin/bash"
# default_working_dir = "~/projects"

[terminal]
default_cols = 120
default_rows = 30
output_buffer_bytes = 1048576

# Per-tool overrides; omitted fields use the built-in command.
[tools.claude_code]
# command = "claude"
# args = []

[tools.codex]
[tools.aider]
[tools.cline]
[tools.custom]

[keybindings]
new_session = "Ctrl-N"
next_session = "Ctrl-Tab"
prev_session = "Ctrl-Shift-Tab"
split_horizontal = "Ctrl-Shift-D"
split_vertical = "Ctrl-Shift-E"
close_pane = "Ctrl-Shift-W"
jump_to_session = "Ctrl"
focus_pane = "Alt"
"##;
