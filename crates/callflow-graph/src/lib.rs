//! # Callflow Graph
//!
//! The conversation-flow model behind the voice agent builder. A flow is a
//! directed graph of typed nodes (what the agent says, listens for, branches
//! on, and how the call ends); this crate owns that graph, the operations that
//! edit it, the rules that decide whether it is executable, and its stored form.
//!
//! ## Features
//!
//! * Closed node taxonomy with per-kind payload contracts
//! * Mutations that keep the graph referentially intact at all times
//! * Editing sessions with single selection
//! * Deterministic structural validation that reports every issue at once
//! * JSON and YAML flow documents, with one-time migration of legacy node shapes
//!
//! ## Example
//!
//! ```
//! use callflow_graph::{FlowGraph, NodeKind};
//! use serde_json::json;
//!
//! let mut graph = FlowGraph::new();
//! let start = graph.add_node(NodeKind::StartOutbound, "Start", None).unwrap().id().clone();
//! let speak = graph
//!     .add_node(NodeKind::Speak, "Greeting", json!({ "text": "Namaste!" }).as_object().cloned())
//!     .unwrap()
//!     .id()
//!     .clone();
//! let end = graph.add_node(NodeKind::EndCall, "End Call", None).unwrap().id().clone();
//! graph.add_edge(&start, &speak, None).unwrap();
//! graph.add_edge(&speak, &end, None).unwrap();
//!
//! let report = graph.validate();
//! assert!(report.valid);
//! assert!(report.issues.is_empty());
//! ```

mod error;
mod graph;
mod ids;

pub mod document;
pub mod editor;
pub mod migration;
pub mod summary;
pub mod taxonomy;
pub mod validation;

pub use document::{FlowDocument, Format};
pub use editor::{Deleted, FlowEditor, Selection};
pub use error::GraphError;
pub use graph::{Edge, FlowGraph, Node, NodePatch, Position, Snapshot};
pub use ids::{EdgeId, FlowId, NodeId};
pub use migration::MigrationReport;
pub use taxonomy::{FieldSpec, FieldType, NodeCategory, NodeKind, Payload, PayloadProblem};
pub use validation::{validate, ValidationReport};

/// Load a flow document and validate its graph.
///
/// Load failures are errors; validation issues are returned in the report.
///
/// ```
/// use callflow_graph::{load_and_validate, Format};
///
/// let json = r#"{
///     "name": "Lonely start",
///     "canvas": { "nodes": [ { "id": "start-1", "type": "start_outbound", "label": "Start" } ] }
/// }"#;
///
/// let (_, report) = load_and_validate(json, Format::Json).unwrap();
/// assert!(!report.valid);
/// assert_eq!(report.issues, vec!["flow from 'Start' never reaches End Call"]);
/// ```
pub fn load_and_validate(
    text: &str,
    format: Format,
) -> Result<(FlowDocument, ValidationReport), GraphError> {
    let (document, _) = FlowDocument::decode(text, format)?;
    let report = document.validate();
    Ok((document, report))
}

/// Returns a version string for the Callflow Graph crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
