//! CLI argument parsing

use std::path::PathBuf;

use agentdesk_protocol::CliTool;
use clap::{Parser, Subcommand};

/// Run and inspect agentdesk sessions
#[derive(Parser, Debug)]
#[command(name = "agentdesk")]
#[command(about = "Multi-session terminal workstation for AI coding tools")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to the XDG config location)
    #[arg(long, env = "AGENTDESK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one session in the foreground, forwarding stdin lines to it
    Run {
        /// Tool to launch (claude-code, codex, aider, cline, custom)
        #[arg(short, long, default_value = "claude-code", value_parser = parse_tool)]
        tool: CliTool,

        /// Session name
        #[arg(short, long)]
        name: Option<String>,

        /// Working directory
        #[arg(short = 'c', long)]
        cwd: Option<PathBuf>,

        /// Terminal columns
        #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
        cols: Option<u16>,

        /// Terminal rows
        #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
        rows: Option<u16>,

        /// Command to run instead of the tool's configured one
        #[arg(last = true)]
        command: Vec<String>,
    },

    /// List known tools and the command each one launches
    Tools,

    /// Print the effective configuration as TOML
    Config {
        /// Print the commented default template instead of the loaded file
        #[arg(long)]
        default: bool,
    },
}

fn parse_tool(s: &str) -> Result<CliTool, String> {
    s.parse().map_err(|e: agentdesk_protocol::ParseToolError| e.to_string())
}
