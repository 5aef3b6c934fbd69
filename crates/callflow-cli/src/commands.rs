//! Command implementations.
//!
//! Each command writes its result to `out` and returns whether it succeeded;
//! logs and diagnostics go through `tracing`.

use anyhow::{anyhow, Context, Result};
use callflow_canvas::style_for;
use callflow_graph::summary::outline;
use callflow_graph::{FlowDocument, Format, MigrationReport, NodeKind, ValidationReport};
use serde::Serialize;
use serde_json::json;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::cli::Command;
use crate::config::{CliConfig, OutputFormat};

/// Run `command`, returning `Ok(false)` when it completed but found problems
pub fn execute(command: &Command, config: &CliConfig, out: &mut dyn Write) -> Result<bool> {
    match command {
        Command::Validate { files } => validate(files, config, out),
        Command::Summarize { file } => summarize(file, config, out),
        Command::Migrate { file, out: target } => migrate(file, target.as_deref(), config, out),
        Command::Kinds => kinds(config, out),
    }
}

/// Read and decode a flow document, picking the format from the extension
pub fn load(path: &Path) -> Result<(FlowDocument, MigrationReport)> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    FlowDocument::decode(&text, Format::from_path(path))
        .with_context(|| format!("Failed to load {}", path.display()))
}

#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(flatten)]
    report: Option<ValidationReport>,
}

impl FileReport {
    fn passes(&self, strict: bool) -> bool {
        match &self.report {
            Some(report) => report.valid && !(strict && !report.warnings.is_empty()),
            None => false,
        }
    }
}

fn validate(files: &[PathBuf], config: &CliConfig, out: &mut dyn Write) -> Result<bool> {
    let reports: Vec<FileReport> = files
        .iter()
        .map(|path| {
            let file = path.display().to_string();
            match load(path) {
                Ok((document, _)) => FileReport {
                    file,
                    error: None,
                    report: Some(document.validate()),
                },
                Err(err) => {
                    warn!(file = %file, error = %err, "could not load flow document");
                    FileReport {
                        file,
                        error: Some(format!("{:#}", err)),
                        report: None,
                    }
                }
            }
        })
        .collect();

    let passed = reports.iter().all(|r| r.passes(config.strict));

    match config.output {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &reports)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            for file in &reports {
                match (&file.report, &file.error) {
                    (Some(report), _) => {
                        let verdict = if file.passes(config.strict) { "ok" } else { "invalid" };
                        writeln!(out, "{}: {}", file.file, verdict)?;
                        for issue in &report.issues {
                            writeln!(out, "  error: {}", issue)?;
                        }
                        for warning in &report.warnings {
                            writeln!(out, "  warning: {}", warning)?;
                        }
                    }
                    (None, error) => {
                        writeln!(
                            out,
                            "{}: error: {}",
                            file.file,
                            error.as_deref().unwrap_or("unknown error")
                        )?;
                    }
                }
            }
        }
    }

    Ok(passed)
}

fn summarize(file: &Path, config: &CliConfig, out: &mut dyn Write) -> Result<bool> {
    let (document, _) = load(file)?;
    let text = outline(document.graph())
        .ok_or_else(|| anyhow!("{} has no start node to summarize from", file.display()))?;

    match config.output {
        OutputFormat::Json => {
            let value = json!({ "name": document.name(), "outline": text });
            serde_json::to_writer_pretty(&mut *out, &value)?;
            writeln!(out)?;
        }
        OutputFormat::Text => writeln!(out, "{}", text)?,
    }
    Ok(true)
}

fn migrate(
    file: &Path,
    target: Option<&Path>,
    config: &CliConfig,
    out: &mut dyn Write,
) -> Result<bool> {
    let (document, migration) = load(file)?;
    for node in &migration.nodes {
        info!(node_id = %node.node, from = %node.from, to = %node.to, "migrated node");
    }

    match target {
        Some(target) => {
            let encoded = document.encode(Format::from_path(target))?;
            fs::write(target, encoded)
                .with_context(|| format!("Failed to write {}", target.display()))?;
            match config.output {
                OutputFormat::Json => {
                    let value = json!({
                        "file": file.display().to_string(),
                        "out": target.display().to_string(),
                        "migrated": migration.nodes,
                    });
                    serde_json::to_writer_pretty(&mut *out, &value)?;
                    writeln!(out)?;
                }
                OutputFormat::Text => writeln!(
                    out,
                    "{} -> {}: {} node(s) migrated",
                    file.display(),
                    target.display(),
                    migration.len()
                )?,
            }
        }
        None => {
            let encoded = document.encode(Format::from_path(file))?;
            writeln!(out, "{}", encoded.trim_end())?;
        }
    }
    Ok(true)
}

#[derive(Debug, Serialize)]
struct KindRow {
    kind: NodeKind,
    category: String,
    label: &'static str,
    required: Vec<&'static str>,
    color: &'static str,
}

fn kinds(config: &CliConfig, out: &mut dyn Write) -> Result<bool> {
    let rows: Vec<KindRow> = NodeKind::ALL
        .iter()
        .map(|kind| KindRow {
            kind: *kind,
            category: kind.category().to_string(),
            label: kind.display_name(),
            required: kind.required_fields().collect(),
            color: style_for(*kind).color,
        })
        .collect();

    match config.output {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &rows)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            for row in &rows {
                let required = if row.required.is_empty() {
                    "-".to_string()
                } else {
                    row.required.join(", ")
                };
                writeln!(
                    out,
                    "{:<18} {:<8} {:<20} {}",
                    row.kind.as_str(),
                    row.category,
                    row.label,
                    required
                )?;
            }
        }
    }
    Ok(true)
}
