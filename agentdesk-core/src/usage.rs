//! Token usage reported in tool output
//!
//! Claude Code prints cumulative totals (`Total cost: $1.23`, `Total input
//! tokens: 12345`); Aider prints one line per exchange (`Tokens: 12.3k sent,
//! 4.5k received. Cost: $0.04 message, ...`). Both are recognised in plain
//! text with ANSI escapes already removed.

use agentdesk_protocol::{CliTool, SessionId};
use dashmap::DashMap;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CLAUDE_COST_REGEX: Regex =
        Regex::new(r"(?i)(?:total|session) cost:\s*\$(\d+(?:\.\d+)?)").unwrap();
    static ref CLAUDE_INPUT_REGEX: Regex = Regex::new(
        r"(?i)input tokens:\s*(\d[\d,]*(?:\.\d+)?[km]?)|(\d[\d,]*(?:\.\d+)?[km]?)\s*input"
    )
    .unwrap();
    static ref CLAUDE_OUTPUT_REGEX: Regex = Regex::new(
        r"(?i)output tokens:\s*(\d[\d,]*(?:\.\d+)?[km]?)|(\d[\d,]*(?:\.\d+)?[km]?)\s*output"
    )
    .unwrap();
    static ref AIDER_REGEX: Regex = Regex::new(
        r"(?i)tokens:\s*(\d[\d,]*(?:\.\d+)?[km]?)\s+sent,\s*(\d[\d,]*(?:\.\d+)?[km]?)\s+received\.?\s*cost:\s*\$(\d+(?:\.\d+)?)"
    )
    .unwrap();
}

/// One usage report found in session output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenUsage {
    pub tool: CliTool,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    /// Figures are session totals rather than one exchange
    pub cumulative: bool,
}

/// Every usage report recognised in `text`
pub fn extract_token_usage(text: &str) -> Vec<TokenUsage> {
    let mut reports = Vec::new();
    if let Some(usage) = parse_claude_code(text) {
        reports.push(usage);
    }
    reports.extend(parse_aider(text));
    reports
}

fn parse_claude_code(text: &str) -> Option<TokenUsage> {
    let cost = CLAUDE_COST_REGEX
        .captures(text)
        .and_then(|caps| caps[1].parse::<f64>().ok())?;

    Some(TokenUsage {
        tool: CliTool::ClaudeCode,
        input_tokens: first_count(&CLAUDE_INPUT_REGEX, text).unwrap_or(0),
        output_tokens: first_count(&CLAUDE_OUTPUT_REGEX, text).unwrap_or(0),
        cost_usd: cost,
        cumulative: true,
    })
}

fn parse_aider(text: &str) -> Vec<TokenUsage> {
    AIDER_REGEX
        .captures_iter(text)
        .filter_map(|caps| {
            Some(TokenUsage {
                tool: CliTool::Aider,
                input_tokens: parse_token_count(&caps[1])?,
                output_tokens: parse_token_count(&caps[2])?,
                cost_usd: caps[3].parse().ok()?,
                cumulative: false,
            })
        })
        .collect()
}

/// Count from whichever alternative of `regex` matched first
fn first_count(regex: &Regex, text: &str) -> Option<u64> {
    let caps = regex.captures(text)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| parse_token_count(m.as_str()))
}

/// Parse counts like `12345`, `12,345`, `12K` or `12.3k`
pub fn parse_token_count(text: &str) -> Option<u64> {
    let lower = text.trim().to_lowercase().replace(',', "");
    let (number, multiplier) = match lower.chars().last()? {
        'k' => (&lower[..lower.len() - 1], 1_000.0),
        'm' => (&lower[..lower.len() - 1], 1_000_000.0),
        _ => (lower.as_str(), 1.0),
    };
    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some((value * multiplier).round() as u64)
}

/// Usage accumulated for one session
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UsageTotals {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    /// Reports folded into these totals
    pub reports: u32,
}

impl UsageTotals {
    /// Fold in a report; cumulative reports replace the running figures
    pub fn apply(&mut self, usage: &TokenUsage) {
        if usage.cumulative {
            self.input_tokens = usage.input_tokens;
            self.output_tokens = usage.output_tokens;
            self.cost_usd = usage.cost_usd;
        } else {
            self.input_tokens += usage.input_tokens;
            self.output_tokens += usage.output_tokens;
            self.cost_usd += usage.cost_usd;
        }
        self.reports += 1;
    }
}

/// Per-session usage totals, fed by the event router
#[derive(Debug, Default)]
pub struct UsageLedger {
    totals: DashMap<SessionId, UsageTotals>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, session_id: SessionId, reports: &[TokenUsage]) {
        if reports.is_empty() {
            return;
        }
        let mut totals = self.totals.entry(session_id).or_default();
        for usage in reports {
            totals.apply(usage);
        }
    }

    pub fn totals(&self, session_id: SessionId) -> Option<UsageTotals> {
        self.totals.get(&session_id).map(|entry| *entry)
    }

    pub fn discard(&self, session_id: SessionId) -> bool {
        self.totals.remove(&session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}
