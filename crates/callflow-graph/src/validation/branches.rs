use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::graph::Edge;
use crate::validation::{Check, ValidationContext};

/// Branch nodes need at least one outgoing edge, each with its own non-empty key
pub(crate) struct BranchCompleteness;

impl Check for BranchCompleteness {
    fn name(&self) -> &'static str {
        "branch_completeness"
    }

    fn run(&self, ctx: &ValidationContext<'_>) -> Vec<String> {
        let mut issues = Vec::new();

        for node in ctx.nodes.iter().filter(|n| n.kind().requires_branch_keys()) {
            let label = ctx.name_of(node);
            let mut outgoing: Vec<&Edge> = ctx.graph.outgoing(node.id()).collect();
            outgoing.sort_by(|a, b| a.id().cmp(b.id()));

            if outgoing.is_empty() {
                issues.push(format!("branch node '{}' has no outgoing edges", label));
                continue;
            }

            let mut key_counts: BTreeMap<&str, usize> = BTreeMap::new();
            for edge in &outgoing {
                match edge.branch_key().map(str::trim).filter(|k| !k.is_empty()) {
                    Some(key) => *key_counts.entry(key).or_default() += 1,
                    None => {
                        let target = ctx
                            .graph
                            .node(edge.target())
                            .map(|n| ctx.name_of(n))
                            .unwrap_or_else(|| Cow::Borrowed(edge.target().as_str()));
                        issues.push(format!(
                            "branch node '{}' has an outgoing edge to '{}' without a branch key",
                            label, target
                        ));
                    }
                }
            }

            for (key, _) in key_counts.into_iter().filter(|(_, count)| *count > 1) {
                issues.push(format!(
                    "branch node '{}' has duplicate branch key '{}'",
                    label, key
                ));
            }
        }

        issues
    }
}
