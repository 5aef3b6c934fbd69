//! Plain-text outline of a flow, used as prompt material by the call runtime.

use serde_json::Value;
use std::collections::{HashSet, VecDeque};

use crate::graph::{FlowGraph, Node};
use crate::ids::NodeId;
use crate::taxonomy::NodeKind;

const OUTLINE_HEADER: &str = "Follow this conversation flow:";

/// Describe every node reachable from the start nodes, breadth first.
///
/// Start nodes are visited in id order and successors in edge order. Returns
/// `None` when the flow has no start node.
pub fn outline(graph: &FlowGraph) -> Option<String> {
    let mut starts: Vec<&Node> = graph.iter_nodes().filter(|n| n.kind().is_trigger()).collect();
    if starts.is_empty() {
        return None;
    }
    starts.sort_by(|a, b| a.id().cmp(b.id()));

    let mut lines = vec![OUTLINE_HEADER.to_string()];
    let mut seen: HashSet<&NodeId> = HashSet::new();
    let mut queue: VecDeque<&NodeId> = starts.iter().map(|n| n.id()).collect();

    while let Some(id) = queue.pop_front() {
        if !seen.insert(id) {
            continue;
        }
        let node = match graph.node(id) {
            Some(node) => node,
            None => continue,
        };
        lines.push(format!("- {}", describe(node)));
        queue.extend(graph.outgoing(id).map(|edge| edge.target()));
    }

    Some(lines.join("\n"))
}

/// One-line instruction for a single node
pub fn describe(node: &Node) -> String {
    let text = |field: &str| node.text_field(field).unwrap_or_default();

    match node.kind() {
        NodeKind::StartOutbound | NodeKind::StartInbound => "Start the call.".to_string(),
        NodeKind::Greeting => format!("Greet the caller: \"{}\"", text("text")),
        NodeKind::Speak => format!("Say: \"{}\"", text("text")),
        NodeKind::Listen => format!(
            "Listen for the caller's response (up to {} seconds).",
            number_or(node, "timeout_seconds", "5")
        ),
        NodeKind::LlmResponse => format!("Respond using LLM: {}", text("instructions")),
        NodeKind::BranchIntent => {
            let labels: Vec<&str> = node
                .payload()
                .get("intents")
                .and_then(Value::as_array)
                .map(|intents| {
                    intents
                        .iter()
                        .filter_map(|intent| intent.get("label").and_then(Value::as_str))
                        .collect()
                })
                .unwrap_or_default();
            format!(
                "Classify caller intent ({}) and route accordingly.",
                labels.join(", ")
            )
        }
        NodeKind::BranchKeyword => "Route based on keyword in caller's response.".to_string(),
        NodeKind::BranchSentiment => {
            "Route based on sentiment (positive/neutral/negative).".to_string()
        }
        NodeKind::SetVariable => format!(
            "Extract and store {} from the caller's response.",
            text("variable_name")
        ),
        NodeKind::Webhook => format!("Call webhook: {}", text("url")),
        NodeKind::Transfer => format!("Transfer the call to {}.", text("transfer_to")),
        NodeKind::Wait => format!("Pause for {} seconds.", number_or(node, "seconds", "2")),
        NodeKind::EndCall => {
            let mut parts = Vec::new();
            let closing = text("closing_message");
            if !closing.is_empty() {
                parts.push(format!("Say: \"{}\"", closing));
            }
            let outcome = text("outcome");
            if !outcome.is_empty() {
                parts.push(format!("Tag outcome as: {}", outcome));
            }
            parts.push("End the call.".to_string());
            parts.join(" ")
        }
    }
}

fn number_or(node: &Node, field: &str, default: &str) -> String {
    match node.payload().get(field) {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::Payload;
    use serde_json::json;

    fn payload(value: Value) -> Option<Payload> {
        value.as_object().cloned()
    }

    #[test]
    fn test_no_start_means_no_outline() {
        let mut graph = FlowGraph::new();
        graph.add_node(NodeKind::Wait, "Wait", None).unwrap();
        assert_eq!(outline(&graph), None);
    }

    #[test]
    fn test_outline_walks_breadth_first() {
        let mut graph = FlowGraph::new();
        let start = graph
            .add_node(NodeKind::StartInbound, "Start", None)
            .unwrap()
            .id()
            .clone();
        let listen = graph
            .add_node(NodeKind::Listen, "Listen", payload(json!({ "timeout_seconds": 8 })))
            .unwrap()
            .id()
            .clone();
        let router = graph
            .add_node(
                NodeKind::BranchIntent,
                "Intent",
                payload(json!({ "intents": [{ "label": "buy" }, { "label": "cancel" }] })),
            )
            .unwrap()
            .id()
            .clone();
        let transfer = graph
            .add_node(
                NodeKind::Transfer,
                "Sales",
                payload(json!({ "transfer_to": "+91 98765 43210" })),
            )
            .unwrap()
            .id()
            .clone();
        let end = graph
            .add_node(
                NodeKind::EndCall,
                "Bye",
                payload(json!({ "closing_message": "Goodbye!", "outcome": "not_interested" })),
            )
            .unwrap()
            .id()
            .clone();
        graph.add_edge(&start, &listen, None).unwrap();
        graph.add_edge(&listen, &router, None).unwrap();
        graph.add_edge(&router, &transfer, Some("buy")).unwrap();
        graph.add_edge(&router, &end, Some("cancel")).unwrap();
        graph.add_edge(&router, &listen, Some("unclear")).unwrap();

        let expected = [
            "Follow this conversation flow:",
            "- Start the call.",
            "- Listen for the caller's response (up to 8 seconds).",
            "- Classify caller intent (buy, cancel) and route accordingly.",
            "- Transfer the call to +91 98765 43210.",
            "- Say: \"Goodbye!\" Tag outcome as: not_interested End the call.",
        ]
        .join("\n");
        assert_eq!(outline(&graph), Some(expected));
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let mut graph = FlowGraph::new();
        let wait = graph.add_node(NodeKind::Wait, "Wait", None).unwrap().clone();
        let end = graph.add_node(NodeKind::EndCall, "End", None).unwrap().clone();
        assert_eq!(describe(&wait), "Pause for 2 seconds.");
        assert_eq!(describe(&end), "End the call.");
    }
}
