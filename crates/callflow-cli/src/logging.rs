//! Logging setup for the CLI.
//!
//! Logs go to stderr so command output on stdout stays machine-readable.

use anyhow::Context;
use std::io;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::CliConfig;

/// Initialize the global tracing subscriber
pub fn init_logging(config: &CliConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    let json_layer = config.log_json.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(io::stderr)
    });
    let text_layer = (!config.log_json).then(|| {
        fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(io::stderr)
    });

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer);

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global default subscriber")?;

    debug!(
        log_format = if config.log_json { "json" } else { "text" },
        "Logging initialized"
    );
    Ok(())
}
