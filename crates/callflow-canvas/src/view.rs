//! Read-only view of a graph as the canvas draws it.
//!
//! Everything here is derived on demand and never written back into the graph.

use callflow_graph::{Edge, EdgeId, FlowGraph, Node, NodeId, NodeKind};
use serde::Serialize;
use std::fmt;

use crate::style::{style_for, NodeStyle};

/// A node as drawn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub id: NodeId,
    pub kind: NodeKind,
    pub label: String,
    pub style: NodeStyle,
    /// Second line of the node card
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    /// Opaque position JSON, passed through for the canvas
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<serde_json::Value>,
}

/// An edge as drawn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeView {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Edges leaving a start node are drawn animated
    pub animated: bool,
}

/// Node and connection counters shown in the canvas corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CanvasStats {
    pub nodes: usize,
    pub connections: usize,
}

impl fmt::Display for CanvasStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} nodes · {} connections", self.nodes, self.connections)
    }
}

/// Everything the canvas needs to draw one graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanvasView {
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
}

impl CanvasView {
    pub fn of(graph: &FlowGraph) -> Self {
        let nodes = graph.nodes().iter().map(node_view).collect();
        let edges = graph
            .edges()
            .iter()
            .map(|edge| edge_view(graph, edge))
            .collect();
        Self { nodes, edges }
    }

    pub fn stats(&self) -> CanvasStats {
        CanvasStats {
            nodes: self.nodes.len(),
            connections: self.edges.len(),
        }
    }

    pub fn node(&self, id: &NodeId) -> Option<&NodeView> {
        self.nodes.iter().find(|n| &n.id == id)
    }
}

fn node_view(node: &Node) -> NodeView {
    NodeView {
        id: node.id().clone(),
        kind: node.kind(),
        label: node.label().to_string(),
        style: style_for(node.kind()),
        preview: preview(node),
        position: node
            .position()
            .and_then(|p| serde_json::from_str(p.as_json()).ok()),
    }
}

fn edge_view(graph: &FlowGraph, edge: &Edge) -> EdgeView {
    let animated = graph
        .node(edge.source())
        .map(|source| source.kind().is_trigger())
        .unwrap_or(false);
    EdgeView {
        id: edge.id().clone(),
        source: edge.source().clone(),
        target: edge.target().clone(),
        label: edge.branch_key().map(str::to_string),
        animated,
    }
}

fn preview(node: &Node) -> Option<String> {
    let field = match node.kind() {
        NodeKind::LlmResponse => "instructions",
        NodeKind::SetVariable => "variable_name",
        NodeKind::Webhook => "url",
        NodeKind::Transfer => "transfer_to",
        NodeKind::EndCall => "closing_message",
        _ => "text",
    };
    node.text_field(field)
        .or_else(|| node.text_field("text"))
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}
