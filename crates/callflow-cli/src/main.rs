use anyhow::{Context, Result};
use callflow_cli::{commands, logging, Cli, CliConfig};
use clap::Parser;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::warn;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let (loaded, ignored) = CliConfig::load();
    let config = cli.apply(loaded);

    logging::init_logging(&config).context("Failed to initialize logging")?;
    for message in ignored {
        warn!("{}", message);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let passed = commands::execute(&cli.command, &config, &mut out)?;
    out.flush()?;

    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
