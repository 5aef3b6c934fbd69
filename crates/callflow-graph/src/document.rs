//! Flow documents: metadata plus one graph, and their wire encodings.
//!
//! Loading never trusts the wire format. Every edge goes back through the same
//! integrity checks the mutation operations use, and a document that breaks
//! one is rejected as a whole with [`GraphError::CorruptFlowDocument`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::GraphError;
use crate::graph::{FlowGraph, Node, Position};
use crate::ids::{EdgeId, FlowId, NodeId};
use crate::migration::{self, MigrationReport};
use crate::taxonomy::{NodeKind, Payload};
use crate::validation::ValidationReport;

/// Wire encodings a document can be stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// `.yaml` and `.yml` are YAML; everything else is JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Format::Yaml
            }
            _ => Format::Json,
        }
    }
}

/// Serialized flow document
#[derive(Debug, Serialize, Deserialize)]
pub struct FlowRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "canvas_data")]
    pub canvas: CanvasRecord,
}

fn default_version() -> u32 {
    1
}

/// Serialized graph
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CanvasRecord {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

/// Serialized node
#[derive(Debug, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    /// Kind name; may be a legacy alias or the canvas wrapper type on load
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub data: Payload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Box<RawValue>>,
}

/// Serialized edge
#[derive(Debug, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub id: String,
    pub source: String,
    pub target: String,
    /// Branch key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, rename = "branchKey", skip_serializing)]
    pub branch_key: Option<String>,
    #[serde(default, rename = "sourceHandle", skip_serializing)]
    pub source_handle: Option<String>,
}

impl EdgeRecord {
    fn resolved_branch_key(&self) -> Option<&str> {
        [&self.label, &self.branch_key, &self.source_handle]
            .into_iter()
            .filter_map(|key| key.as_deref())
            .map(str::trim)
            .find(|key| !key.is_empty())
    }
}

/// A named flow and its graph; the unit exchanged with storage and the runtime
#[derive(Debug, Clone, PartialEq)]
pub struct FlowDocument {
    id: FlowId,
    name: String,
    description: String,
    version: u32,
    is_template: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    graph: FlowGraph,
}

fn checked_name(name: impl Into<String>) -> Result<String, GraphError> {
    let name = name.into();
    if name.trim().is_empty() {
        Err(GraphError::EmptyFlowName)
    } else {
        Ok(name)
    }
}

impl FlowDocument {
    /// An empty flow
    pub fn new(name: impl Into<String>) -> Result<Self, GraphError> {
        Self::with_graph(name, FlowGraph::new())
    }

    pub fn with_graph(name: impl Into<String>, graph: FlowGraph) -> Result<Self, GraphError> {
        let now = Utc::now();
        Ok(Self {
            id: FlowId::generate(),
            name: checked_name(name)?,
            description: String::new(),
            version: 1,
            is_template: false,
            created_at: now,
            updated_at: now,
            graph,
        })
    }

    /// The canvas a new flow opens with: Start, a greeting, End Call
    pub fn with_starter_canvas(name: impl Into<String>) -> Result<Self, GraphError> {
        let mut graph = FlowGraph::new();
        let start = graph
            .add_node(NodeKind::StartOutbound, "Start", None)?
            .id()
            .clone();
        let mut greeting = Payload::new();
        greeting.insert(
            "text".to_string(),
            "Namaste! How can I help you today?".into(),
        );
        let speak = graph
            .add_node(NodeKind::Speak, "Greeting", Some(greeting))?
            .id()
            .clone();
        let mut closing = Payload::new();
        closing.insert("closing_message".to_string(), "Thank you for calling!".into());
        let end = graph
            .add_node(NodeKind::EndCall, "End Call", Some(closing))?
            .id()
            .clone();
        graph.add_edge(&start, &speak, None)?;
        graph.add_edge(&speak, &end, None)?;

        Self::with_graph(name, graph)
    }

    pub fn id(&self) -> &FlowId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn is_template(&self) -> bool {
        self.is_template
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn graph(&self) -> &FlowGraph {
        &self.graph
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }

    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), GraphError> {
        self.name = checked_name(name)?;
        self.touch();
        Ok(())
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.touch();
    }

    pub fn set_template(&mut self, is_template: bool) {
        self.is_template = is_template;
        self.touch();
    }

    /// Swap in an edited graph, e.g. the result of a closed editing session
    pub fn replace_graph(&mut self, graph: FlowGraph) {
        self.graph = graph;
        self.touch();
    }

    /// Apply a batch of graph edits atomically.
    ///
    /// `edit` works on a copy; the document only changes when it returns `Ok`.
    pub fn edit_graph<T, F>(&mut self, edit: F) -> Result<T, GraphError>
    where
        F: FnOnce(&mut FlowGraph) -> Result<T, GraphError>,
    {
        let mut draft = self.graph.clone();
        let out = edit(&mut draft)?;
        self.graph = draft;
        self.touch();
        Ok(out)
    }

    pub fn validate(&self) -> ValidationReport {
        self.graph.validate()
    }

    /// The graph, if it is safe for the call runtime to execute
    pub fn executable_graph(&self) -> Result<&FlowGraph, ValidationReport> {
        let report = self.validate();
        if report.valid {
            Ok(&self.graph)
        } else {
            Err(report)
        }
    }

    /// A fresh, non-template copy named "<name> (Copy)"
    pub fn duplicate(&self) -> Self {
        let now = Utc::now();
        Self {
            id: FlowId::generate(),
            name: format!("{} (Copy)", self.name),
            description: self.description.clone(),
            version: 1,
            is_template: false,
            created_at: now,
            updated_at: now,
            graph: self.graph.clone(),
        }
    }

    /// A new flow based on this one, usually a template
    pub fn instantiate(&self, name: impl Into<String>) -> Result<Self, GraphError> {
        let mut flow = Self::with_graph(name, self.graph.clone())?;
        flow.description = format!("Based on template: {}", self.name);
        Ok(flow)
    }

    pub fn to_record(&self) -> FlowRecord {
        let nodes = self
            .graph
            .iter_nodes()
            .map(|node| NodeRecord {
                id: node.id().to_string(),
                kind: node.kind().as_str().to_string(),
                label: Some(node.label().to_string()),
                data: node.payload().clone(),
                position: node.position().map(|p| p.raw().to_owned()),
            })
            .collect();
        let edges = self
            .graph
            .iter_edges()
            .map(|edge| EdgeRecord {
                id: edge.id().to_string(),
                source: edge.source().to_string(),
                target: edge.target().to_string(),
                label: edge.branch_key().map(str::to_string),
                branch_key: None,
                source_handle: None,
            })
            .collect();

        FlowRecord {
            id: Some(self.id.to_string()),
            name: self.name.clone(),
            description: self.description.clone(),
            version: self.version,
            is_template: self.is_template,
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
            canvas: CanvasRecord { nodes, edges },
        }
    }

    /// Rebuild a document, normalizing legacy node shapes and re-checking every edge
    pub fn from_record(record: FlowRecord) -> Result<(Self, MigrationReport), GraphError> {
        let name = checked_name(record.name)?;
        let mut report = MigrationReport::default();
        let mut graph = FlowGraph::new();

        for node in record.canvas.nodes {
            let id = NodeId::from(node.id);
            let normalized =
                migration::normalize_node(&id, &node.kind, node.label, node.data, &mut report)?;
            if let Err(problems) = normalized.kind.check_payload(&normalized.payload) {
                warn!(
                    node_id = %id,
                    kind = %normalized.kind,
                    problems = problems.len(),
                    "stored node does not satisfy its payload contract"
                );
            }
            graph.restore_node(Node::new(
                id,
                normalized.kind,
                normalized.label,
                normalized.payload,
                node.position.map(Position::from_raw),
            ))?;
        }

        for edge in &record.canvas.edges {
            graph
                .restore_edge(
                    EdgeId::from(edge.id.as_str()),
                    &NodeId::from(edge.source.as_str()),
                    &NodeId::from(edge.target.as_str()),
                    edge.resolved_branch_key(),
                )
                .map_err(|err| match err {
                    GraphError::CorruptFlowDocument(_) => err,
                    other => {
                        GraphError::CorruptFlowDocument(format!("edge '{}': {}", edge.id, other))
                    }
                })?;
        }

        let now = Utc::now();
        let created_at = record.created_at.unwrap_or(now);
        let document = Self {
            id: record.id.map(FlowId::from).unwrap_or_else(FlowId::generate),
            name,
            description: record.description,
            version: record.version.max(1),
            is_template: record.is_template,
            created_at,
            updated_at: record.updated_at.unwrap_or(created_at),
            graph,
        };

        debug!(
            flow_id = %document.id,
            nodes = document.graph.node_count(),
            edges = document.graph.edge_count(),
            migrated = report.len(),
            "loaded flow document"
        );
        Ok((document, report))
    }

    /// Decode a document, returning any legacy rewrites applied on the way
    pub fn decode(text: &str, format: Format) -> Result<(Self, MigrationReport), GraphError> {
        let record: FlowRecord = match format {
            Format::Json => serde_json::from_str(text)?,
            Format::Yaml => {
                // RawValue positions only deserialize from JSON text.
                let value: serde_json::Value = serde_yaml::from_str(text)?;
                serde_json::from_str(&value.to_string())?
            }
        };
        Self::from_record(record)
    }

    pub fn encode(&self, format: Format) -> Result<String, GraphError> {
        let record = self.to_record();
        let encoded = match format {
            Format::Json => serde_json::to_string_pretty(&record)
                .map_err(|e| GraphError::Serialization(e.to_string()))?,
            Format::Yaml => {
                let json = serde_json::to_string(&record)
                    .map_err(|e| GraphError::Serialization(e.to_string()))?;
                let value: serde_json::Value = serde_json::from_str(&json)
                    .map_err(|e| GraphError::Serialization(e.to_string()))?;
                serde_yaml::to_string(&value).map_err(|e| GraphError::Serialization(e.to_string()))?
            }
        };
        Ok(encoded)
    }

    pub fn from_json_str(text: &str) -> Result<Self, GraphError> {
        Self::decode(text, Format::Json).map(|(document, _)| document)
    }

    pub fn to_json_string(&self) -> Result<String, GraphError> {
        self.encode(Format::Json)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, GraphError> {
        Self::decode(text, Format::Yaml).map(|(document, _)| document)
    }

    pub fn to_yaml_string(&self) -> Result<String, GraphError> {
        self.encode(Format::Yaml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CANVAS_EXPORT: &str = r#"{
        "name": "Lead qualifier",
        "description": "Qualifies inbound leads",
        "canvas_data": {
            "nodes": [
                { "id": "start-1", "type": "flowNode", "position": { "x": 250, "y": 50 },
                  "data": { "type": "start_outbound", "label": "Start", "text": "Outbound call begins here" } },
                { "id": "speak-1", "type": "flowNode", "position": { "x": 250, "y": 180 },
                  "data": { "type": "say", "label": "Greeting", "text": "Namaste!" } },
                { "id": "end-1", "type": "flowNode", "position": { "x": 250, "y": 320 },
                  "data": { "type": "end_call", "label": "End Call", "text": "Thank you for calling!" } }
            ],
            "edges": [
                { "id": "e1", "source": "start-1", "target": "speak-1", "animated": true, "sourceHandle": null },
                { "id": "e2", "source": "speak-1", "target": "end-1" }
            ]
        }
    }"#;

    #[test]
    fn test_starter_canvas_is_valid() {
        let document = FlowDocument::with_starter_canvas("New flow").unwrap();
        assert_eq!(document.graph().node_count(), 3);
        assert_eq!(document.graph().edge_count(), 2);
        assert_eq!(document.version(), 1);
        assert!(document.executable_graph().is_ok());
    }

    #[test]
    fn test_name_is_required() {
        assert_eq!(FlowDocument::new("  ").unwrap_err(), GraphError::EmptyFlowName);
        let mut document = FlowDocument::new("Flow").unwrap();
        assert!(document.rename("").is_err());
        assert_eq!(document.name(), "Flow");
        assert_eq!(document.version(), 1);
    }

    #[test]
    fn test_canvas_export_is_migrated() {
        let (document, report) = FlowDocument::decode(CANVAS_EXPORT, Format::Json).unwrap();

        assert_eq!(document.name(), "Lead qualifier");
        assert_eq!(report.len(), 3);
        let speak = document.graph().node(&NodeId::from("speak-1")).unwrap();
        assert_eq!(speak.kind(), NodeKind::Speak);
        assert_eq!(speak.label(), "Greeting");
        assert_eq!(speak.position().unwrap().as_json(), r#"{ "x": 250, "y": 180 }"#);
        assert!(document.validate().valid);
    }

    #[test]
    fn test_dangling_edge_is_corrupt() {
        let text = r#"{
            "name": "Broken",
            "canvas": {
                "nodes": [ { "id": "start-1", "type": "start_outbound" } ],
                "edges": [ { "id": "e1", "source": "start-1", "target": "gone" } ]
            }
        }"#;
        match FlowDocument::from_json_str(text).unwrap_err() {
            GraphError::CorruptFlowDocument(message) => {
                assert!(message.contains("e1"), "{}", message);
                assert!(message.contains("gone"), "{}", message);
            }
            other => panic!("Expected CorruptFlowDocument, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_kind_on_load() {
        let text = r#"{ "name": "Old", "canvas": { "nodes": [ { "id": "n1", "type": "sms" } ] } }"#;
        assert_eq!(
            FlowDocument::from_json_str(text).unwrap_err(),
            GraphError::UnknownNodeKind("sms".to_string())
        );
    }

    #[test]
    fn test_branch_key_aliases() {
        let text = r#"{
            "name": "Router",
            "canvas": {
                "nodes": [
                    { "id": "b1", "type": "branch_sentiment" },
                    { "id": "x", "type": "end_call" },
                    { "id": "y", "type": "end_call" }
                ],
                "edges": [
                    { "id": "e1", "source": "b1", "target": "x", "branchKey": "positive" },
                    { "id": "e2", "source": "b1", "target": "y", "sourceHandle": "negative", "label": null }
                ]
            }
        }"#;
        let document = FlowDocument::from_json_str(text).unwrap();
        let keys: Vec<_> = document
            .graph()
            .edges()
            .iter()
            .map(|e| e.branch_key().map(str::to_string))
            .collect();
        assert_eq!(keys, vec![Some("positive".to_string()), Some("negative".to_string())]);
    }

    #[test]
    fn test_duplicate_and_instantiate() {
        let mut template = FlowDocument::with_starter_canvas("Cold call").unwrap();
        template.set_template(true);

        let copy = template.duplicate();
        assert_eq!(copy.name(), "Cold call (Copy)");
        assert!(!copy.is_template());
        assert_ne!(copy.id(), template.id());
        assert_eq!(copy.graph(), template.graph());

        let flow = template.instantiate("Diwali offer").unwrap();
        assert_eq!(flow.description(), "Based on template: Cold call");
        assert_eq!(flow.version(), 1);
    }

    #[test]
    fn test_edit_graph_is_atomic() {
        let mut document = FlowDocument::with_starter_canvas("Flow").unwrap();
        let before = document.graph().clone();

        let result = document.edit_graph(|graph| {
            graph.add_node(NodeKind::Wait, "Pause", None)?;
            graph.add_node(NodeKind::Webhook, "CRM", None)?;
            Ok(())
        });

        assert!(matches!(result, Err(GraphError::InvalidPayload { .. })));
        assert_eq!(document.graph(), &before);
        assert_eq!(document.version(), 1);

        document
            .edit_graph(|graph| graph.add_node(NodeKind::Wait, "Pause", None).map(|_| ()))
            .unwrap();
        assert_eq!(document.version(), 2);
    }

    #[test]
    fn test_executable_graph_refuses_invalid_flows() {
        let mut document = FlowDocument::new("Lonely").unwrap();
        document
            .edit_graph(|graph| graph.add_node(NodeKind::StartOutbound, "Start", None).map(|_| ()))
            .unwrap();

        let report = document.executable_graph().unwrap_err();
        assert_eq!(
            report.issues,
            vec!["flow from 'Start' never reaches End Call".to_string()]
        );
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path(Path::new("flow.yaml")), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("flow.YML")), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("flow.json")), Format::Json);
        assert_eq!(Format::from_path(Path::new("flow")), Format::Json);
    }
}
