//! Structural validation of flow graphs.
//!
//! [`validate`] runs every check in a fixed order and accumulates all issues,
//! so an author sees every problem at once. Issues within a check are ordered
//! by node or edge id, which makes the report for an unchanged graph identical
//! from one run to the next.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

use crate::graph::{FlowGraph, Node};
use crate::ids::NodeId;

mod advisories;
mod branches;
mod entry;
mod integrity;
mod payload;
mod reachability;

/// Outcome of validating a graph at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True iff `issues` is empty
    pub valid: bool,
    /// Structural defects that make the flow unsafe to execute
    pub issues: Vec<String>,
    /// Suspicious but executable constructs; never affect `valid`
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn new(issues: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            valid: issues.is_empty(),
            issues,
            warnings,
        }
    }

    /// Whether there is anything at all to show the author
    pub fn is_clean(&self) -> bool {
        self.valid && self.warnings.is_empty()
    }
}

/// Precomputed lookups shared by every check
pub(crate) struct ValidationContext<'a> {
    pub graph: &'a FlowGraph,
    /// Nodes ordered by id
    pub nodes: Vec<&'a Node>,
    successors: HashMap<&'a NodeId, Vec<&'a NodeId>>,
    predecessors: HashMap<&'a NodeId, Vec<&'a NodeId>>,
    label_counts: HashMap<&'a str, usize>,
}

impl<'a> ValidationContext<'a> {
    fn new(graph: &'a FlowGraph) -> Self {
        let mut nodes: Vec<&Node> = graph.iter_nodes().collect();
        nodes.sort_by(|a, b| a.id().cmp(b.id()));

        let mut successors: HashMap<&NodeId, Vec<&NodeId>> = HashMap::with_capacity(nodes.len());
        let mut predecessors: HashMap<&NodeId, Vec<&NodeId>> =
            HashMap::with_capacity(nodes.len());
        for edge in graph.iter_edges() {
            successors.entry(edge.source()).or_default().push(edge.target());
            predecessors.entry(edge.target()).or_default().push(edge.source());
        }

        let mut label_counts: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
        for node in &nodes {
            *label_counts.entry(node.display_label()).or_default() += 1;
        }

        Self {
            graph,
            nodes,
            successors,
            predecessors,
            label_counts,
        }
    }

    /// How a node is named in issues: its label, plus its id when another
    /// node carries the same label
    pub fn name_of<'n>(&self, node: &'n Node) -> Cow<'n, str> {
        let label = node.display_label();
        if self.label_counts.get(label).copied().unwrap_or_default() > 1 {
            Cow::Owned(format!("{} ({})", label, node.id()))
        } else {
            Cow::Borrowed(label)
        }
    }

    /// Nodes reachable from `starts` following edges forward, starts included
    pub fn reachable_from(&self, starts: impl IntoIterator<Item = &'a NodeId>) -> HashSet<&'a NodeId> {
        breadth_first(starts, &self.successors)
    }

    /// Nodes from which one of `goals` can be reached, goals included
    pub fn reaching(&self, goals: impl IntoIterator<Item = &'a NodeId>) -> HashSet<&'a NodeId> {
        breadth_first(goals, &self.predecessors)
    }
}

fn breadth_first<'a>(
    starts: impl IntoIterator<Item = &'a NodeId>,
    adjacency: &HashMap<&'a NodeId, Vec<&'a NodeId>>,
) -> HashSet<&'a NodeId> {
    let mut seen = HashSet::new();
    let mut queue: VecDeque<&NodeId> = VecDeque::new();

    for start in starts {
        if seen.insert(start) {
            queue.push_back(start);
        }
    }

    while let Some(current) = queue.pop_front() {
        if let Some(next) = adjacency.get(current) {
            for &neighbour in next {
                if seen.insert(neighbour) {
                    queue.push_back(neighbour);
                }
            }
        }
    }

    seen
}

/// A single structural rule applied to a whole graph
pub(crate) trait Check {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Issues found by this rule, already in report order
    fn run(&self, ctx: &ValidationContext<'_>) -> Vec<String>;
}

/// Validate `graph`, returning every structural issue found.
///
/// Never mutates the graph and never fails; an invalid graph is still a
/// representable graph.
pub fn validate(graph: &FlowGraph) -> ValidationReport {
    let ctx = ValidationContext::new(graph);

    let checks: [&dyn Check; 6] = [
        &entry::SingleEntry,
        &reachability::Reachability,
        &reachability::Termination,
        &branches::BranchCompleteness,
        &payload::PayloadContract,
        &integrity::ReferentialIntegrity,
    ];

    let mut issues = Vec::new();
    for check in checks {
        let found = check.run(&ctx);
        if !found.is_empty() {
            debug!(check = check.name(), issues = found.len(), "validation check failed");
        }
        issues.extend(found);
    }

    let warnings = advisories::collect(&ctx);

    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        issues = issues.len(),
        warnings = warnings.len(),
        "validated flow graph"
    );

    ValidationReport::new(issues, warnings)
}

impl FlowGraph {
    /// Shorthand for [`validate`]
    pub fn validate(&self) -> ValidationReport {
        validate(self)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use serde_json::json;

    use crate::graph::FlowGraph;
    use crate::ids::NodeId;
    use crate::taxonomy::{NodeKind, Payload};

    pub fn payload_for(kind: NodeKind) -> Option<Payload> {
        let value = match kind {
            NodeKind::Greeting | NodeKind::Speak => json!({ "text": "Hello" }),
            NodeKind::SetVariable => json!({ "variable_name": "name" }),
            NodeKind::Webhook => json!({ "url": "https://example.com/hook", "method": "POST" }),
            NodeKind::Transfer => json!({ "transfer_to": "+91 98765 43210" }),
            _ => return None,
        };
        value.as_object().cloned()
    }

    pub fn add(graph: &mut FlowGraph, kind: NodeKind, label: &str) -> NodeId {
        graph
            .add_node(kind, label, payload_for(kind))
            .unwrap()
            .id()
            .clone()
    }

    pub fn link(graph: &mut FlowGraph, from: &NodeId, to: &NodeId) {
        graph.add_edge(from, to, None).unwrap();
    }

    pub fn branch(graph: &mut FlowGraph, from: &NodeId, to: &NodeId, key: &str) {
        graph.add_edge(from, to, Some(key)).unwrap();
    }
}
