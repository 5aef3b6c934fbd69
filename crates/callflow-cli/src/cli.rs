use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{CliConfig, OutputFormat};

/// Lint, summarize and migrate voice agent flow documents
#[derive(Debug, Parser)]
#[command(name = "callflow", author, version, about, long_about = None)]
pub struct Cli {
    /// Result format (overrides CALLFLOW_OUTPUT)
    #[arg(long, global = true, value_enum)]
    pub format: Option<OutputFormat>,

    /// Treat validation warnings as failures (overrides CALLFLOW_STRICT)
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log filter used when RUST_LOG is unset (overrides CALLFLOW_LOG_FILTER)
    #[arg(long, global = true)]
    pub log_filter: Option<String>,

    /// Emit logs as JSON (overrides CALLFLOW_LOG_JSON)
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate one or more flow documents
    Validate {
        /// Flow documents (.json, .yaml or .yml)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the conversation outline of a flow
    Summarize {
        /// Flow document
        file: PathBuf,
    },

    /// Rewrite a flow document in the current shape
    Migrate {
        /// Flow document to migrate
        file: PathBuf,

        /// Where to write the result; stdout when omitted
        #[arg(short = 'o', long = "out")]
        out: Option<PathBuf>,
    },

    /// List every node kind
    Kinds,
}

impl Cli {
    /// Apply command-line overrides on top of loaded configuration
    pub fn apply(&self, mut config: CliConfig) -> CliConfig {
        if let Some(format) = self.format {
            config.output = format;
        }
        if self.strict {
            config.strict = true;
        }
        if let Some(filter) = &self.log_filter {
            config.log_filter = filter.clone();
        }
        if self.log_json {
            config.log_json = true;
        }
        config
    }
}
