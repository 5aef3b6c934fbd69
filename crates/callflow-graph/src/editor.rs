//! Editing session driven by an interactive surface.
//!
//! A [`FlowEditor`] owns one graph plus the current selection. Selecting never
//! touches the graph, and any deletion that removes the selected node or edge
//! clears the selection in the same call.

use tracing::debug;

use crate::error::GraphError;
use crate::graph::{Edge, FlowGraph, Node, NodePatch};
use crate::ids::{EdgeId, NodeId};
use crate::taxonomy::{NodeKind, Payload};
use crate::validation::ValidationReport;

/// What the author currently has selected
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selection {
    Node(NodeId),
    Edge(EdgeId),
}

/// Result of [`FlowEditor::delete_selected`]
#[derive(Debug, Clone, PartialEq)]
pub enum Deleted {
    /// A node and the ids of the edges removed with it
    Node { node: Node, edges: Vec<EdgeId> },
    Edge(Edge),
}

/// Single-writer editing session over a [`FlowGraph`]
#[derive(Debug, Clone, Default)]
pub struct FlowEditor {
    graph: FlowGraph,
    selection: Option<Selection>,
}

impl FlowEditor {
    pub fn new(graph: FlowGraph) -> Self {
        Self {
            graph,
            selection: None,
        }
    }

    pub fn graph(&self) -> &FlowGraph {
        &self.graph
    }

    /// End the session, handing back the edited graph
    pub fn into_graph(self) -> FlowGraph {
        self.graph
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// The selected node, if the selection is a node
    pub fn selected_node(&self) -> Option<&Node> {
        match &self.selection {
            Some(Selection::Node(id)) => self.graph.node(id),
            _ => None,
        }
    }

    pub fn select_node(&mut self, id: &NodeId) -> Result<(), GraphError> {
        if !self.graph.contains_node(id) {
            return Err(GraphError::NodeNotFound(id.clone()));
        }
        self.selection = Some(Selection::Node(id.clone()));
        Ok(())
    }

    pub fn select_edge(&mut self, id: &EdgeId) -> Result<(), GraphError> {
        if self.graph.edge(id).is_none() {
            return Err(GraphError::EdgeNotFound(id.clone()));
        }
        self.selection = Some(Selection::Edge(id.clone()));
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Drop a new node from the palette, labelled with the kind's display name, and select it
    pub fn add_node(&mut self, kind: NodeKind, payload: Option<Payload>) -> Result<&Node, GraphError> {
        self.add_labeled_node(kind, kind.display_name(), payload)
    }

    /// Add a node with an explicit label and select it
    pub fn add_labeled_node(
        &mut self,
        kind: NodeKind,
        label: impl Into<String>,
        payload: Option<Payload>,
    ) -> Result<&Node, GraphError> {
        let id = self.graph.add_node(kind, label, payload)?.id().clone();
        self.selection = Some(Selection::Node(id.clone()));
        self.graph
            .node(&id)
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// Drag-to-connect; exactly [`FlowGraph::add_edge`]
    pub fn connect(
        &mut self,
        source: &NodeId,
        target: &NodeId,
        branch_key: Option<&str>,
    ) -> Result<&Edge, GraphError> {
        self.graph.add_edge(source, target, branch_key)
    }

    pub fn update_node(&mut self, id: &NodeId, patch: NodePatch) -> Result<&Node, GraphError> {
        self.graph.update_node(id, patch)
    }

    /// Patch the selected node. Returns `Ok(None)` when no node is selected.
    pub fn update_selected(&mut self, patch: NodePatch) -> Result<Option<&Node>, GraphError> {
        match self.selection.clone() {
            Some(Selection::Node(id)) => self.graph.update_node(&id, patch).map(Some),
            _ => Ok(None),
        }
    }

    /// Remove a node and its edges, dropping the selection if it pointed at any of them
    pub fn remove_node(&mut self, id: &NodeId) -> Result<(Node, Vec<EdgeId>), GraphError> {
        let (node, edges) = self.graph.remove_node(id)?;
        let clears = match &self.selection {
            Some(Selection::Node(selected)) => selected == id,
            Some(Selection::Edge(selected)) => edges.contains(selected),
            None => false,
        };
        if clears {
            self.selection = None;
        }
        Ok((node, edges))
    }

    pub fn remove_edge(&mut self, id: &EdgeId) -> Result<Edge, GraphError> {
        let edge = self.graph.remove_edge(id)?;
        if self.selection == Some(Selection::Edge(id.clone())) {
            self.selection = None;
        }
        Ok(edge)
    }

    /// Delete whatever is selected. Returns `Ok(None)` when nothing is.
    pub fn delete_selected(&mut self) -> Result<Option<Deleted>, GraphError> {
        let deleted = match self.selection.take() {
            Some(Selection::Node(id)) => {
                let (node, edges) = self.graph.remove_node(&id)?;
                debug!(node_id = %id, "deleted selected node");
                Deleted::Node { node, edges }
            }
            Some(Selection::Edge(id)) => {
                let edge = self.graph.remove_edge(&id)?;
                debug!(edge_id = %id, "deleted selected edge");
                Deleted::Edge(edge)
            }
            None => return Ok(None),
        };
        Ok(Some(deleted))
    }

    /// Validate the graph as it stands now; never cached
    pub fn validate(&self) -> ValidationReport {
        self.graph.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn speak_payload() -> Option<Payload> {
        json!({ "text": "Namaste!" }).as_object().cloned()
    }

    fn editor_with_chain() -> (FlowEditor, NodeId, NodeId, NodeId) {
        let mut editor = FlowEditor::default();
        let start = editor
            .add_node(NodeKind::StartOutbound, None)
            .unwrap()
            .id()
            .clone();
        let speak = editor
            .add_node(NodeKind::Speak, speak_payload())
            .unwrap()
            .id()
            .clone();
        let end = editor.add_node(NodeKind::EndCall, None).unwrap().id().clone();
        editor.connect(&start, &speak, None).unwrap();
        editor.connect(&speak, &end, None).unwrap();
        (editor, start, speak, end)
    }

    #[test]
    fn test_new_node_is_selected_and_labelled() {
        let mut editor = FlowEditor::default();
        let node = editor.add_node(NodeKind::LlmResponse, None).unwrap();
        assert_eq!(node.label(), "LLM Response");
        let id = node.id().clone();
        assert_eq!(editor.selection(), Some(&Selection::Node(id)));
    }

    #[test]
    fn test_rejected_add_keeps_selection() {
        let (mut editor, start, _, _) = editor_with_chain();
        editor.select_node(&start).unwrap();
        assert!(editor.add_node(NodeKind::Webhook, None).is_err());
        assert_eq!(editor.selection(), Some(&Selection::Node(start)));
    }

    #[test]
    fn test_delete_selected_node_clears_selection() {
        let (mut editor, _, speak, _) = editor_with_chain();
        editor.select_node(&speak).unwrap();

        let deleted = editor.delete_selected().unwrap().unwrap();
        match deleted {
            Deleted::Node { node, edges } => {
                assert_eq!(node.id(), &speak);
                assert_eq!(edges.len(), 2);
            }
            other => panic!("Expected a deleted node, got {:?}", other),
        }
        assert!(editor.selection().is_none());
        assert_eq!(editor.graph().edge_count(), 0);
        assert_eq!(editor.delete_selected().unwrap(), None);
    }

    #[test]
    fn test_cascade_clears_selected_edge() {
        let (mut editor, start, speak, _) = editor_with_chain();
        let edge = editor.graph().outgoing(&start).next().unwrap().id().clone();
        editor.select_edge(&edge).unwrap();

        editor.remove_node(&speak).unwrap();
        assert!(editor.selection().is_none());
    }

    #[test]
    fn test_unrelated_removal_keeps_selection() {
        let (mut editor, start, _, end) = editor_with_chain();
        editor.select_node(&start).unwrap();
        editor.remove_node(&end).unwrap();
        assert_eq!(editor.selection(), Some(&Selection::Node(start)));
    }

    #[test]
    fn test_selecting_does_not_mutate() {
        let (mut editor, start, _, _) = editor_with_chain();
        let before = editor.graph().clone();
        editor.select_node(&start).unwrap();
        editor.clear_selection();
        assert_eq!(editor.graph(), &before);
        assert!(editor.select_node(&NodeId::from("missing")).is_err());
    }

    #[test]
    fn test_update_selected() {
        let (mut editor, _, speak, _) = editor_with_chain();
        editor.clear_selection();
        assert!(editor
            .update_selected(NodePatch::new().label("x"))
            .unwrap()
            .is_none());

        editor.select_node(&speak).unwrap();
        let node = editor
            .update_selected(NodePatch::new().set("text", "Hello again"))
            .unwrap()
            .unwrap();
        assert_eq!(node.text_field("text"), Some("Hello again"));
    }

    #[test]
    fn test_validation_tracks_edits() {
        let (mut editor, _, speak, _) = editor_with_chain();
        assert!(editor.validate().valid);

        editor.remove_node(&speak).unwrap();
        let report = editor.validate();
        assert!(!report.valid);
        assert!(report
            .issues
            .contains(&"node 'End Call' is unreachable from any start node".to_string()));
    }
}
