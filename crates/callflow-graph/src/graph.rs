//! The flow graph and its mutation operations.
//!
//! [`FlowGraph`] enforces referential integrity on every call: edges only ever
//! connect nodes that exist, trigger nodes never receive an edge, and removing
//! a node takes its incident edges with it. A rejected call leaves the graph
//! exactly as it was.

use indexmap::IndexMap;
use serde_json::value::RawValue;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::error::GraphError;
use crate::ids::{EdgeId, NodeId};
use crate::taxonomy::{NodeKind, Payload};

/// Canvas position of a node.
///
/// Owned by the presentation layer and opaque to the model; kept as raw JSON
/// so it survives a save/load cycle byte-for-byte.
#[derive(Debug, Clone)]
pub struct Position(Box<RawValue>);

impl Position {
    /// Wrap a JSON fragment, rejecting text that is not valid JSON.
    ///
    /// `null` is rejected too: a stored `"position": null` means the node has
    /// no position. Surrounding whitespace is dropped.
    pub fn from_json(json: impl Into<String>) -> Result<Self, GraphError> {
        let raw = RawValue::from_string(json.into())
            .map_err(|e| GraphError::CorruptFlowDocument(format!("invalid position: {}", e)))?;
        if raw.get() == "null" {
            return Err(GraphError::CorruptFlowDocument(
                "invalid position: null is not a position".to_string(),
            ));
        }
        Ok(Position(raw))
    }

    /// Convenience constructor for the common `{"x":..,"y":..}` shape
    pub fn xy(x: f64, y: f64) -> Result<Self, GraphError> {
        Self::from_json(serde_json::json!({ "x": x, "y": y }).to_string())
    }

    pub fn as_json(&self) -> &str {
        self.0.get()
    }

    pub(crate) fn from_raw(raw: Box<RawValue>) -> Self {
        Position(raw)
    }

    pub(crate) fn raw(&self) -> &RawValue {
        &self.0
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.0.get() == other.0.get()
    }
}

impl Eq for Position {}

/// A node of the conversation graph
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    label: String,
    payload: Payload,
    position: Option<Position>,
}

impl Node {
    pub(crate) fn new(
        id: NodeId,
        kind: NodeKind,
        label: String,
        payload: Payload,
        position: Option<Position>,
    ) -> Self {
        Self {
            id,
            kind,
            label,
            payload,
            position,
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// String payload field, if present
    pub fn text_field(&self, name: &str) -> Option<&str> {
        self.payload.get(name).and_then(Value::as_str)
    }

    /// Label for human-facing messages; falls back to the id when blank
    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            self.id.as_str()
        } else {
            &self.label
        }
    }
}

/// A directed control transfer between two nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    id: EdgeId,
    source: NodeId,
    target: NodeId,
    branch_key: Option<String>,
}

impl Edge {
    pub fn id(&self) -> &EdgeId {
        &self.id
    }

    pub fn source(&self) -> &NodeId {
        &self.source
    }

    pub fn target(&self) -> &NodeId {
        &self.target
    }

    /// Outcome of the source branch this edge represents, if any
    pub fn branch_key(&self) -> Option<&str> {
        self.branch_key.as_deref()
    }

    fn same_transition(&self, source: &NodeId, target: &NodeId, branch_key: Option<&str>) -> bool {
        &self.source == source && &self.target == target && self.branch_key() == branch_key
    }
}

/// Changes to apply to a node in one step
#[derive(Debug, Clone, Default)]
pub struct NodePatch {
    label: Option<String>,
    set: Payload,
    unset: Vec<String>,
    position: Option<Position>,
}

impl NodePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set one payload field
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.insert(field.into(), value.into());
        self
    }

    /// Remove one payload field
    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.unset.push(field.into());
        self
    }

    pub fn position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    fn apply(self, node: &Node) -> Node {
        let mut next = node.clone();
        if let Some(label) = self.label {
            next.label = label;
        }
        for field in self.unset {
            next.payload.remove(&field);
        }
        next.payload.extend(self.set);
        if let Some(position) = self.position {
            next.position = Some(position);
        }
        next
    }
}

/// Detached, restartable view of a graph's nodes or edges at one point in time
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    items: Arc<[Arc<T>]>,
}

impl<T> Snapshot<T> {
    fn new(items: Vec<Arc<T>>) -> Self {
        Self {
            items: items.into(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.iter().map(|item| item.as_ref())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Directed graph of typed nodes and edges making up a conversation flow
#[derive(Debug, Clone, Default)]
pub struct FlowGraph {
    nodes: IndexMap<NodeId, Arc<Node>>,
    edges: IndexMap<EdgeId, Arc<Edge>>,
}

impl PartialEq for FlowGraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.edges == other.edges
    }
}

impl FlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node of `kind` with a fresh id.
    ///
    /// Fails with [`GraphError::InvalidPayload`] when `payload` does not satisfy
    /// the kind's field contract; nothing is inserted in that case.
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        label: impl Into<String>,
        payload: Option<Payload>,
    ) -> Result<&Node, GraphError> {
        let payload = payload.unwrap_or_default();
        kind.check_payload(&payload)
            .map_err(|problems| GraphError::InvalidPayload {
                node: None,
                kind,
                problems,
            })?;

        let mut id = NodeId::generate(kind);
        while self.nodes.contains_key(&id) {
            id = NodeId::generate(kind);
        }

        debug!(node_id = %id, kind = %kind, "adding node");
        let node = Arc::new(Node::new(id.clone(), kind, label.into(), payload, None));
        Ok(&**self.nodes.entry(id).or_insert(node))
    }

    /// Apply `patch` to a node atomically.
    ///
    /// The patched payload is re-checked before anything is written.
    pub fn update_node(&mut self, id: &NodeId, patch: NodePatch) -> Result<&Node, GraphError> {
        let current = self
            .nodes
            .get(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;

        let next = patch.apply(current);
        next.kind
            .check_payload(&next.payload)
            .map_err(|problems| GraphError::InvalidPayload {
                node: Some(id.clone()),
                kind: next.kind,
                problems,
            })?;

        debug!(node_id = %id, "updating node");
        let slot = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
        *slot = Arc::new(next);
        Ok(&**slot)
    }

    /// Remove a node together with every edge that starts or ends at it.
    ///
    /// Returns the removed node and the ids of the cascaded edges.
    pub fn remove_node(&mut self, id: &NodeId) -> Result<(Node, Vec<EdgeId>), GraphError> {
        let node = self
            .nodes
            .shift_remove(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;

        let mut removed_edges = Vec::new();
        self.edges.retain(|edge_id, edge| {
            let incident = &edge.source == id || &edge.target == id;
            if incident {
                removed_edges.push(edge_id.clone());
            }
            !incident
        });

        debug!(
            node_id = %id,
            cascaded_edges = removed_edges.len(),
            "removed node"
        );
        Ok((unwrap_arc(node), removed_edges))
    }

    /// Connect `source` to `target`, optionally labelled with a branch outcome.
    ///
    /// Blank branch keys are treated as absent.
    pub fn add_edge(
        &mut self,
        source: &NodeId,
        target: &NodeId,
        branch_key: Option<&str>,
    ) -> Result<&Edge, GraphError> {
        let mut id = EdgeId::generate();
        while self.edges.contains_key(&id) {
            id = EdgeId::generate();
        }
        self.insert_edge(id, source, target, branch_key)
    }

    pub fn remove_edge(&mut self, id: &EdgeId) -> Result<Edge, GraphError> {
        let edge = self
            .edges
            .shift_remove(id)
            .ok_or_else(|| GraphError::EdgeNotFound(id.clone()))?;
        debug!(edge_id = %id, "removed edge");
        Ok(unwrap_arc(edge))
    }

    /// Snapshot of the current nodes in insertion order
    pub fn nodes(&self) -> Snapshot<Node> {
        Snapshot::new(self.nodes.values().cloned().collect())
    }

    /// Snapshot of the current edges in insertion order
    pub fn edges(&self) -> Snapshot<Edge> {
        Snapshot::new(self.edges.values().cloned().collect())
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id).map(|node| node.as_ref())
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.get(id).map(|edge| edge.as_ref())
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Edges leaving `id`, in insertion order
    pub fn outgoing<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges
            .values()
            .map(|edge| edge.as_ref())
            .filter(move |edge| &edge.source == id)
    }

    /// Edges entering `id`, in insertion order
    pub fn incoming<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges
            .values()
            .map(|edge| edge.as_ref())
            .filter(move |edge| &edge.target == id)
    }

    pub(crate) fn iter_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().map(|node| node.as_ref())
    }

    pub(crate) fn iter_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values().map(|edge| edge.as_ref())
    }

    /// Insert a node that already has an id, as when loading a stored flow.
    ///
    /// The payload is not checked here; stored flows may predate the current
    /// field contract and the validation engine reports any drift.
    pub(crate) fn restore_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::CorruptFlowDocument(format!(
                "duplicate node id '{}'",
                node.id
            )));
        }
        self.nodes.insert(node.id.clone(), Arc::new(node));
        Ok(())
    }

    /// Insert an edge that already has an id, running the same checks as [`Self::add_edge`]
    pub(crate) fn restore_edge(
        &mut self,
        id: EdgeId,
        source: &NodeId,
        target: &NodeId,
        branch_key: Option<&str>,
    ) -> Result<(), GraphError> {
        if self.edges.contains_key(&id) {
            return Err(GraphError::CorruptFlowDocument(format!(
                "duplicate edge id '{}'",
                id
            )));
        }
        self.insert_edge(id, source, target, branch_key).map(|_| ())
    }

    fn insert_edge(
        &mut self,
        id: EdgeId,
        source: &NodeId,
        target: &NodeId,
        branch_key: Option<&str>,
    ) -> Result<&Edge, GraphError> {
        if !self.nodes.contains_key(source) {
            return Err(GraphError::NodeNotFound(source.clone()));
        }
        let target_node = self
            .nodes
            .get(target)
            .ok_or_else(|| GraphError::NodeNotFound(target.clone()))?;

        if target_node.kind.is_trigger() {
            return Err(GraphError::InvalidEdge {
                from: source.clone(),
                to: target.clone(),
                reason: format!(
                    "'{}' is a {} node and cannot be the destination of an edge",
                    target_node.display_label(),
                    target_node.kind
                ),
            });
        }

        let branch_key = branch_key.map(str::trim).filter(|key| !key.is_empty());
        if let Some(existing) = self
            .edges
            .values()
            .find(|edge| edge.same_transition(source, target, branch_key))
        {
            return Err(GraphError::DuplicateEdge {
                from: source.clone(),
                to: target.clone(),
                branch_key: branch_key.map(str::to_string),
                existing: existing.id.clone(),
            });
        }

        debug!(edge_id = %id, from = %source, to = %target, "adding edge");
        let edge = Arc::new(Edge {
            id: id.clone(),
            source: source.clone(),
            target: target.clone(),
            branch_key: branch_key.map(str::to_string),
        });
        Ok(&**self.edges.entry(id).or_insert(edge))
    }

    /// Bypass every edge rule, for exercising the consistency check
    #[cfg(test)]
    pub(crate) fn insert_edge_unchecked(&mut self, id: &str, source: &str, target: &str) {
        let edge = Edge {
            id: EdgeId::from(id),
            source: NodeId::from(source),
            target: NodeId::from(target),
            branch_key: None,
        };
        self.edges.insert(edge.id.clone(), Arc::new(edge));
    }
}

fn unwrap_arc<T: Clone>(shared: Arc<T>) -> T {
    Arc::try_unwrap(shared).unwrap_or_else(|shared| shared.as_ref().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(value: &str) -> Option<Payload> {
        let mut payload = Payload::new();
        payload.insert("text".to_string(), json!(value));
        Some(payload)
    }

    fn linear_graph() -> (FlowGraph, NodeId, NodeId, NodeId) {
        let mut graph = FlowGraph::new();
        let start = graph
            .add_node(NodeKind::StartOutbound, "Start", None)
            .unwrap()
            .id()
            .clone();
        let speak = graph
            .add_node(NodeKind::Speak, "Greeting", text("Namaste!"))
            .unwrap()
            .id()
            .clone();
        let end = graph
            .add_node(NodeKind::EndCall, "End Call", None)
            .unwrap()
            .id()
            .clone();
        graph.add_edge(&start, &speak, None).unwrap();
        graph.add_edge(&speak, &end, None).unwrap();
        (graph, start, speak, end)
    }

    #[test]
    fn test_add_node_generates_unique_ids() {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(NodeKind::Wait, "Wait", None).unwrap().id().clone();
        let b = graph.add_node(NodeKind::Wait, "Wait", None).unwrap().id().clone();
        assert_ne!(a, b);
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_add_node_rejects_invalid_payload() {
        let mut graph = FlowGraph::new();
        let err = graph.add_node(NodeKind::Speak, "Speak", None).unwrap_err();
        match err {
            GraphError::InvalidPayload { kind, problems, .. } => {
                assert_eq!(kind, NodeKind::Speak);
                assert_eq!(problems.len(), 1);
                assert_eq!(problems[0].field(), "text");
            }
            other => panic!("Expected InvalidPayload, got {:?}", other),
        }
        assert!(graph.is_empty());
    }

    #[test]
    fn test_update_node_is_atomic() {
        let (mut graph, _, speak, _) = linear_graph();

        let err = graph
            .update_node(&speak, NodePatch::new().label("Renamed").unset("text"))
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidPayload { node: Some(_), .. }));

        let node = graph.node(&speak).unwrap();
        assert_eq!(node.label(), "Greeting");
        assert_eq!(node.text_field("text"), Some("Namaste!"));

        let node = graph
            .update_node(&speak, NodePatch::new().label("Hello").set("text", "Hi there"))
            .unwrap();
        assert_eq!(node.label(), "Hello");
        assert_eq!(node.text_field("text"), Some("Hi there"));
    }

    #[test]
    fn test_update_missing_node() {
        let mut graph = FlowGraph::new();
        let missing = NodeId::from("nope");
        assert_eq!(
            graph.update_node(&missing, NodePatch::new()).unwrap_err(),
            GraphError::NodeNotFound(missing)
        );
    }

    #[test]
    fn test_remove_node_cascades_edges() {
        let (mut graph, start, speak, end) = linear_graph();
        graph.add_edge(&start, &end, None).unwrap();
        assert_eq!(graph.edge_count(), 3);

        let (removed, cascaded) = graph.remove_node(&speak).unwrap();
        assert_eq!(removed.id(), &speak);
        assert_eq!(cascaded.len(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph
            .iter_edges()
            .all(|e| graph.contains_node(e.source()) && graph.contains_node(e.target())));
    }

    #[test]
    fn test_add_edge_checks_endpoints() {
        let (mut graph, start, speak, _) = linear_graph();
        let ghost = NodeId::from("ghost");

        assert_eq!(
            graph.add_edge(&start, &ghost, None).unwrap_err(),
            GraphError::NodeNotFound(ghost.clone())
        );
        assert_eq!(
            graph.add_edge(&ghost, &speak, None).unwrap_err(),
            GraphError::NodeNotFound(ghost)
        );
    }

    #[test]
    fn test_trigger_cannot_be_a_destination() {
        let (mut graph, start, speak, _) = linear_graph();
        let err = graph.add_edge(&speak, &start, None).unwrap_err();
        assert!(matches!(err, GraphError::InvalidEdge { .. }));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_duplicate_edge_is_rejected() {
        let mut graph = FlowGraph::new();
        let branch = graph
            .add_node(NodeKind::BranchIntent, "Interested?", None)
            .unwrap()
            .id()
            .clone();
        let end = graph.add_node(NodeKind::EndCall, "End", None).unwrap().id().clone();

        graph.add_edge(&branch, &end, Some("yes")).unwrap();
        graph.add_edge(&branch, &end, Some("no")).unwrap();
        let err = graph.add_edge(&branch, &end, Some(" yes ")).unwrap_err();

        assert!(matches!(err, GraphError::DuplicateEdge { .. }));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_snapshots_are_detached() {
        let (mut graph, _, speak, _) = linear_graph();
        let before = graph.nodes();
        let edges_before = graph.edges();

        graph.remove_node(&speak).unwrap();

        assert_eq!(before.len(), 3);
        assert_eq!(before.iter().count(), 3);
        assert_eq!(before.iter().count(), 3, "snapshots can be iterated again");
        assert_eq!(edges_before.len(), 2);
        assert_eq!(graph.nodes().len(), 2);
    }

    #[test]
    fn test_remove_edge() {
        let (mut graph, start, _, _) = linear_graph();
        let id = graph.outgoing(&start).next().unwrap().id().clone();
        graph.remove_edge(&id).unwrap();
        assert_eq!(
            graph.remove_edge(&id).unwrap_err(),
            GraphError::EdgeNotFound(id)
        );
    }

    #[test]
    fn test_position_round_trips_verbatim() {
        let position = Position::from_json(r#"{"x": 250, "y":50.0}"#).unwrap();
        assert_eq!(position.as_json(), r#"{"x": 250, "y":50.0}"#);
        assert!(Position::from_json("{not json").is_err());
    }

    #[test]
    fn test_null_is_not_a_position() {
        for json in ["null", "  null\n"] {
            match Position::from_json(json) {
                Err(GraphError::CorruptFlowDocument(message)) => {
                    assert!(message.contains("null"), "{}", message)
                }
                other => panic!("Expected CorruptFlowDocument for {:?}, got {:?}", json, other),
            }
        }
        assert_eq!(Position::from_json(" [1, 2] ").unwrap().as_json(), "[1, 2]");
    }
}
