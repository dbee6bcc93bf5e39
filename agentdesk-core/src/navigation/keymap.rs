//! Key bindings for navigation commands
//!
//! Binding strings look like `"Ctrl-Shift-D"` or `"Alt+1"`: any number of
//! modifiers followed by one key, separated by `-` or `+`.

use std::collections::HashMap;
use std::fmt;

use agentdesk_protocol::SplitDirection;
use agentdesk_utils::{AgentdeskError, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::{CycleDirection, NavCommand};
use crate::config::KeybindingConfig;

/// Error type for binding parse failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid key binding '{binding}': {reason}")]
pub struct ParseBindingError {
    pub binding: String,
    pub reason: String,
}

impl ParseBindingError {
    fn new(binding: &str, reason: impl Into<String>) -> Self {
        Self {
            binding: binding.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<ParseBindingError> for AgentdeskError {
    fn from(err: ParseBindingError) -> Self {
        AgentdeskError::Config(err.to_string())
    }
}

const RELEVANT_MODIFIERS: KeyModifiers = KeyModifiers::CONTROL
    .union(KeyModifiers::ALT)
    .union(KeyModifiers::SHIFT)
    .union(KeyModifiers::SUPER);

/// A key plus modifiers, normalized so that equivalent spellings compare equal
///
/// Letters are stored lowercase with Shift kept as a modifier, and
/// Shift-Tab is stored as `BackTab` without Shift, which is how terminals
/// report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    code: KeyCode,
    modifiers: KeyModifiers,
}

impl KeyBinding {
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        let mut modifiers = modifiers & RELEVANT_MODIFIERS;
        let code = match code {
            KeyCode::Tab if modifiers.contains(KeyModifiers::SHIFT) => {
                modifiers.remove(KeyModifiers::SHIFT);
                KeyCode::BackTab
            }
            KeyCode::BackTab => {
                modifiers.remove(KeyModifiers::SHIFT);
                KeyCode::BackTab
            }
            KeyCode::Char(c) if c.is_ascii_uppercase() => {
                modifiers.insert(KeyModifiers::SHIFT);
                KeyCode::Char(c.to_ascii_lowercase())
            }
            other => other,
        };
        Self { code, modifiers }
    }

    pub fn from_event(event: &KeyEvent) -> Self {
        Self::new(event.code, event.modifiers)
    }

    pub fn code(&self) -> KeyCode {
        self.code
    }

    pub fn modifiers(&self) -> KeyModifiers {
        self.modifiers
    }
}

impl fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, name) in [
            (KeyModifiers::CONTROL, "Ctrl"),
            (KeyModifiers::ALT, "Alt"),
            (KeyModifiers::SHIFT, "Shift"),
            (KeyModifiers::SUPER, "Super"),
        ] {
            if self.modifiers.contains(flag) {
                write!(f, "{}-", name)?;
            }
        }
        match self.code {
            KeyCode::Char(' ') => f.write_str("Space"),
            KeyCode::Char(c) => write!(f, "{}", c.to_ascii_uppercase()),
            KeyCode::F(n) => write!(f, "F{}", n),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Parse a binding such as `"Ctrl-Shift-D"`
pub fn parse_binding(s: &str) -> std::result::Result<KeyBinding, ParseBindingError> {
    let parts = split_parts(s)?;
    let Some((key, modifier_parts)) = parts.split_last() else {
        return Err(ParseBindingError::new(s, "empty binding"));
    };

    let mut modifiers = KeyModifiers::NONE;
    for part in modifier_parts {
        modifiers |= parse_modifier(part)
            .ok_or_else(|| ParseBindingError::new(s, format!("unknown modifier '{}'", part)))?;
    }

    if parse_modifier(key).is_some() {
        return Err(ParseBindingError::new(s, "ends with a modifier, no key given"));
    }
    let code =
        parse_key(key).ok_or_else(|| ParseBindingError::new(s, format!("unknown key '{}'", key)))?;

    Ok(KeyBinding::new(code, modifiers))
}

/// Parse a modifier-only string such as `"Ctrl"` or `"Ctrl-Alt"`
pub fn parse_modifiers(s: &str) -> std::result::Result<KeyModifiers, ParseBindingError> {
    let mut modifiers = KeyModifiers::NONE;
    for part in split_parts(s)? {
        modifiers |= parse_modifier(part)
            .ok_or_else(|| ParseBindingError::new(s, format!("unknown modifier '{}'", part)))?;
    }
    Ok(modifiers)
}

fn split_parts(s: &str) -> std::result::Result<Vec<&str>, ParseBindingError> {
    let parts: Vec<&str> = s.split(['-', '+']).map(str::trim).collect();
    if parts.iter().any(|part| part.is_empty()) {
        return Err(ParseBindingError::new(s, "empty component"));
    }
    Ok(parts)
}

fn parse_modifier(s: &str) -> Option<KeyModifiers> {
    match s.to_ascii_lowercase().as_str() {
        "ctrl" | "control" => Some(KeyModifiers::CONTROL),
        "alt" | "option" | "meta" => Some(KeyModifiers::ALT),
        "shift" => Some(KeyModifiers::SHIFT),
        "super" | "cmd" | "command" | "win" => Some(KeyModifiers::SUPER),
        _ => None,
    }
}

fn parse_key(s: &str) -> Option<KeyCode> {
    let lower = s.to_ascii_lowercase();
    let code = match lower.as_str() {
        "tab" => KeyCode::Tab,
        "backtab" => KeyCode::BackTab,
        "enter" | "return" => KeyCode::Enter,
        "esc" | "escape" => KeyCode::Esc,
        "space" => KeyCode::Char(' '),
        "backspace" => KeyCode::Backspace,
        "delete" | "del" => KeyCode::Delete,
        "insert" | "ins" => KeyCode::Insert,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" | "pgup" => KeyCode::PageUp,
        "pagedown" | "pgdn" => KeyCode::PageDown,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "minus" => KeyCode::Char('-'),
        "plus" => KeyCode::Char('+'),
        _ => {
            if let Some(n) = lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
                return (1..=12).contains(&n).then_some(KeyCode::F(n));
            }
            let mut chars = s.chars();
            return match (chars.next(), chars.next()) {
                (Some(c), None) => Some(KeyCode::Char(c)),
                _ => None,
            };
        }
    };
    Some(code)
}

/// Lookup table from keys to navigation commands
#[derive(Debug, Clone, PartialEq)]
pub struct Keymap {
    bindings: HashMap<KeyBinding, NavCommand>,
}

impl Default for Keymap {
    fn default() -> Self {
        let ctrl = KeyModifiers::CONTROL;
        let ctrl_shift = KeyModifiers::CONTROL | KeyModifiers::SHIFT;

        let mut keymap = Self::empty();
        keymap.bind(KeyBinding::new(KeyCode::Char('n'), ctrl), NavCommand::NewSession);
        keymap.bind(
            KeyBinding::new(KeyCode::Tab, ctrl),
            NavCommand::CycleSession(CycleDirection::Forward),
        );
        keymap.bind(
            KeyBinding::new(KeyCode::BackTab, ctrl),
            NavCommand::CycleSession(CycleDirection::Backward),
        );
        keymap.bind(
            KeyBinding::new(KeyCode::Char('d'), ctrl_shift),
            NavCommand::Split(SplitDirection::Horizontal),
        );
        keymap.bind(
            KeyBinding::new(KeyCode::Char('e'), ctrl_shift),
            NavCommand::Split(SplitDirection::Vertical),
        );
        keymap.bind(
            KeyBinding::new(KeyCode::Char('w'), ctrl_shift),
            NavCommand::CloseActivePane,
        );
        keymap.bind_digits(ctrl, NavCommand::JumpToSession);
        keymap.bind_digits(KeyModifiers::ALT, NavCommand::FocusPane);
        keymap
    }
}

impl Keymap {
    pub fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Build a keymap from configured binding strings
    ///
    /// Empty strings leave a command unbound. Two commands on the same key
    /// is an error.
    pub fn from_config(config: &KeybindingConfig) -> Result<Self> {
        let mut keymap = Self::empty();

        let singles = [
            (&config.new_session, NavCommand::NewSession),
            (
                &config.next_session,
                NavCommand::CycleSession(CycleDirection::Forward),
            ),
            (
                &config.prev_session,
                NavCommand::CycleSession(CycleDirection::Backward),
            ),
            (
                &config.split_horizontal,
                NavCommand::Split(SplitDirection::Horizontal),
            ),
            (
                &config.split_vertical,
                NavCommand::Split(SplitDirection::Vertical),
            ),
            (&config.close_pane, NavCommand::CloseActivePane),
        ];
        for (text, command) in singles {
            if text.trim().is_empty() {
                continue;
            }
            keymap.bind_unique(parse_binding(text)?, command)?;
        }

        let digit_groups: [(&String, fn(usize) -> NavCommand); 2] = [
            (&config.jump_to_session, NavCommand::JumpToSession),
            (&config.focus_pane, NavCommand::FocusPane),
        ];
        for (text, command) in digit_groups {
            if text.trim().is_empty() {
                continue;
            }
            let modifiers = parse_modifiers(text)?;
            for (index, digit) in ('1'..='9').enumerate() {
                keymap.bind_unique(KeyBinding::new(KeyCode::Char(digit), modifiers), command(index))?;
            }
        }

        Ok(keymap)
    }

    /// Bind a key, replacing any previous command on it
    pub fn bind(&mut self, binding: KeyBinding, command: NavCommand) -> Option<NavCommand> {
        self.bindings.insert(binding, command)
    }

    fn bind_unique(&mut self, binding: KeyBinding, command: NavCommand) -> Result<()> {
        match self.bindings.get(&binding) {
            Some(existing) if *existing != command => Err(AgentdeskError::config(format!(
                "key {} is bound to both {:?} and {:?}",
                binding, existing, command
            ))),
            _ => {
                self.bindings.insert(binding, command);
                Ok(())
            }
        }
    }

    fn bind_digits(&mut self, modifiers: KeyModifiers, command: fn(usize) -> NavCommand) {
        for (index, digit) in ('1'..='9').enumerate() {
            self.bind(KeyBinding::new(KeyCode::Char(digit), modifiers), command(index));
        }
    }

    /// Command for a key press; releases never match
    pub fn lookup(&self, event: &KeyEvent) -> Option<NavCommand> {
        if event.kind == KeyEventKind::Release {
            return None;
        }
        self.bindings.get(&KeyBinding::from_event(event)).copied()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
