//! One-time normalization of stored node records.
//!
//! Older flows used a handful of kind names that no longer exist, and flows
//! saved straight from the canvas wrap every node as `"type": "flowNode"` with
//! the real kind inside `data`. Both are rewritten here, once, at load time;
//! [`NodeKind::from_str`](std::str::FromStr) itself only accepts current names.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::GraphError;
use crate::ids::NodeId;
use crate::taxonomy::{NodeKind, Payload};

/// Node type used by the canvas library for every node it saves
pub const CANVAS_WRAPPER_TYPE: &str = "flowNode";

/// Retired kind names and their current equivalents.
///
/// Provisional: confirm against real stored flows before relying on it.
/// `sms`, `note` and `verify` have no equivalent and stay unknown.
const LEGACY_KINDS: &[(&str, NodeKind)] = &[
    ("start", NodeKind::StartOutbound),
    ("say", NodeKind::Speak),
    ("ask", NodeKind::Listen),
    ("collect", NodeKind::Listen),
    ("hangup", NodeKind::EndCall),
    ("branch", NodeKind::BranchIntent),
    ("tag", NodeKind::SetVariable),
    ("api_call", NodeKind::Webhook),
    ("pause", NodeKind::Wait),
    ("llm", NodeKind::LlmResponse),
];

/// Current kind a retired name maps to, if any
pub fn legacy_alias(name: &str) -> Option<NodeKind> {
    LEGACY_KINDS
        .iter()
        .find(|(legacy, _)| *legacy == name)
        .map(|(_, kind)| *kind)
}

/// Resolve a stored kind name, accepting retired aliases
pub fn normalize_kind(name: &str) -> Result<NodeKind, GraphError> {
    name.parse::<NodeKind>()
        .or_else(|err| legacy_alias(name).ok_or(err))
}

/// One node rewritten during load
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeMigration {
    pub node: NodeId,
    /// Kind name as stored
    pub from: String,
    pub to: NodeKind,
    /// Whether the node was unwrapped from the canvas wrapper shape
    pub unwrapped: bool,
}

/// Every rewrite applied while loading one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub nodes: Vec<NodeMigration>,
}

impl MigrationReport {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

/// A stored node reduced to its current kind, label and payload
#[derive(Debug)]
pub(crate) struct NormalizedNode {
    pub kind: NodeKind,
    pub label: String,
    pub payload: Payload,
}

/// Normalize one stored node, recording any rewrite in `report`
pub(crate) fn normalize_node(
    id: &NodeId,
    stored_type: &str,
    label: Option<String>,
    mut payload: Payload,
    report: &mut MigrationReport,
) -> Result<NormalizedNode, GraphError> {
    let unwrapped = stored_type == CANVAS_WRAPPER_TYPE;

    let (kind_name, label) = if unwrapped {
        let kind_name = match payload.remove("type") {
            Some(Value::String(name)) => name,
            _ => {
                return Err(GraphError::CorruptFlowDocument(format!(
                    "node '{}' is a canvas node without a kind in its data",
                    id
                )))
            }
        };
        let inner_label = match payload.remove("label") {
            Some(Value::String(label)) => Some(label),
            _ => None,
        };
        (kind_name, label.filter(|l| !l.is_empty()).or(inner_label))
    } else {
        (stored_type.to_string(), label)
    };

    let kind = normalize_kind(&kind_name)?;
    if unwrapped || kind.as_str() != kind_name {
        warn!(node_id = %id, from = %kind_name, to = %kind, "migrating stored node");
        report.nodes.push(NodeMigration {
            node: id.clone(),
            from: kind_name,
            to: kind,
            unwrapped,
        });
    }

    Ok(NormalizedNode {
        kind,
        label: label.unwrap_or_else(|| kind.display_name().to_string()),
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_current_names_pass_through() {
        for kind in NodeKind::ALL {
            assert_eq!(normalize_kind(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn test_legacy_aliases() {
        assert_eq!(normalize_kind("say").unwrap(), NodeKind::Speak);
        assert_eq!(normalize_kind("collect").unwrap(), NodeKind::Listen);
        assert_eq!(normalize_kind("hangup").unwrap(), NodeKind::EndCall);
        assert_eq!(normalize_kind("api_call").unwrap(), NodeKind::Webhook);
    }

    #[test]
    fn test_retired_kinds_without_equivalent_are_rejected() {
        for name in ["sms", "note", "verify", ""] {
            assert_eq!(
                normalize_kind(name),
                Err(GraphError::UnknownNodeKind(name.to_string()))
            );
        }
    }

    #[test]
    fn test_canvas_wrapper_is_unwrapped() {
        let mut report = MigrationReport::default();
        let id = NodeId::from("speak-1");
        let node = normalize_node(
            &id,
            "flowNode",
            None,
            data(json!({ "type": "say", "label": "Greeting", "text": "Namaste!" })),
            &mut report,
        )
        .unwrap();

        assert_eq!(node.kind, NodeKind::Speak);
        assert_eq!(node.label, "Greeting");
        assert_eq!(node.payload, data(json!({ "text": "Namaste!" })));
        assert_eq!(
            report.nodes,
            vec![NodeMigration {
                node: id,
                from: "say".to_string(),
                to: NodeKind::Speak,
                unwrapped: true,
            }]
        );
    }

    #[test]
    fn test_wrapper_without_kind_is_corrupt() {
        let mut report = MigrationReport::default();
        let err = normalize_node(
            &NodeId::from("n1"),
            "flowNode",
            None,
            data(json!({ "label": "Mystery" })),
            &mut report,
        )
        .unwrap_err();
        assert!(matches!(err, GraphError::CorruptFlowDocument(_)));
    }

    #[test]
    fn test_current_nodes_are_not_reported() {
        let mut report = MigrationReport::default();
        let node = normalize_node(
            &NodeId::from("wait-1"),
            "wait",
            None,
            Payload::new(),
            &mut report,
        )
        .unwrap();
        assert_eq!(node.label, "Wait");
        assert!(report.is_empty());
    }
}
