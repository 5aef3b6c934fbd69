//! Configuration for the callflow CLI
//!
//! Values come from the environment first; command-line flags override them.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;

/// How command results are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => f.write_str("text"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Tracing filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,

    /// Result format on stdout
    #[serde(default)]
    pub output: OutputFormat,

    /// Treat validation warnings as failures
    #[serde(default)]
    pub strict: bool,
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            log_json: false,
            output: OutputFormat::default(),
            strict: false,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl CliConfig {
    /// Load configuration from environment variables.
    ///
    /// Unparsable values are ignored. Their descriptions are returned so they
    /// can be logged once logging is up.
    pub fn load() -> (Self, Vec<String>) {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> (Self, Vec<String>) {
        let mut config = Self::default();
        let mut ignored = Vec::new();

        if let Some(filter) = lookup("CALLFLOW_LOG_FILTER") {
            if !filter.trim().is_empty() {
                config.log_filter = filter;
            }
        }

        if let Some(json) = lookup("CALLFLOW_LOG_JSON") {
            match parse_flag(&json) {
                Some(json) => config.log_json = json,
                None => ignored.push(format!("Invalid CALLFLOW_LOG_JSON value: {}", json)),
            }
        }

        if let Some(output) = lookup("CALLFLOW_OUTPUT") {
            match output.parse::<OutputFormat>() {
                Ok(output) => config.output = output,
                Err(_) => ignored.push(format!("Invalid CALLFLOW_OUTPUT value: {}", output)),
            }
        }

        if let Some(strict) = lookup("CALLFLOW_STRICT") {
            match parse_flag(&strict) {
                Some(strict) => config.strict = strict,
                None => ignored.push(format!("Invalid CALLFLOW_STRICT value: {}", strict)),
            }
        }

        (config, ignored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> (CliConfig, Vec<String>) {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CliConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let (config, ignored) = load(&[]);
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.log_filter, "warn");
        assert!(ignored.is_empty());
    }

    #[test]
    fn test_environment_overrides() {
        let (config, ignored) = load(&[
            ("CALLFLOW_LOG_FILTER", "debug"),
            ("CALLFLOW_LOG_JSON", "true"),
            ("CALLFLOW_OUTPUT", "JSON"),
            ("CALLFLOW_STRICT", "1"),
        ]);
        assert_eq!(
            config,
            CliConfig {
                log_filter: "debug".to_string(),
                log_json: true,
                output: OutputFormat::Json,
                strict: true,
            }
        );
        assert!(ignored.is_empty());
    }

    #[test]
    fn test_invalid_values_are_ignored() {
        let (config, ignored) = load(&[("CALLFLOW_OUTPUT", "xml"), ("CALLFLOW_STRICT", "maybe")]);
        assert_eq!(config.output, OutputFormat::Text);
        assert!(!config.strict);
        assert_eq!(
            ignored,
            vec![
                "Invalid CALLFLOW_OUTPUT value: xml".to_string(),
                "Invalid CALLFLOW_STRICT value: maybe".to_string(),
            ]
        );
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: CliConfig = serde_json::from_str(r#"{ "strict": true }"#).unwrap();
        assert!(config.strict);
        assert_eq!(config.log_filter, "warn");
        assert_eq!(config.output, OutputFormat::Text);
    }
}
