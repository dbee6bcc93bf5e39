//! agentdesk: command-line driver for the workstation core
//!
//! Runs a single session in the foreground on a real PTY and prints the
//! tool table and effective configuration.

mod cli;
mod commands;

use agentdesk_utils::{init_logging_with_config, LogConfig};
use clap::Parser;
use cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Session output owns stdout; logs go to the state directory.
    if let Err(e) = init_logging_with_config(LogConfig::cli()) {
        eprintln!("agentdesk: logging disabled: {}", e);
    }

    let exit_code = match commands::execute(cli.command, cli.config.as_deref()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("agentdesk: {}", e);
            1
        }
    };

    std::process::exit(exit_code);
}
