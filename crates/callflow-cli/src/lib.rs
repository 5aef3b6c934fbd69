//! # Callflow CLI
//!
//! Validates, summarizes and migrates flow documents on disk. The `callflow`
//! binary is a thin wrapper around [`run`].

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;

use std::io::Write;

pub use cli::{Cli, Command};
pub use config::{CliConfig, OutputFormat};

/// Execute a parsed command line against loaded configuration
pub fn run(cli: &Cli, config: CliConfig, out: &mut dyn Write) -> anyhow::Result<bool> {
    let config = cli.apply(config);
    commands::execute(&cli.command, &config, out)
}
