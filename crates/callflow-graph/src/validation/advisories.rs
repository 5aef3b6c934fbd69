//! Warnings: constructs that are legal but probably not what the author meant.

use crate::ids::NodeId;
use crate::taxonomy::NodeCategory;
use crate::validation::ValidationContext;

pub(crate) fn collect(ctx: &ValidationContext<'_>) -> Vec<String> {
    let mut warnings = Vec::new();
    if ctx.nodes.is_empty() {
        return warnings;
    }

    if !ctx.nodes.iter().any(|n| n.kind().is_trigger()) {
        warnings.push("flow has no start node".to_string());
    }
    if !ctx
        .nodes
        .iter()
        .any(|n| n.kind().category() == NodeCategory::Ending)
    {
        warnings.push("flow has no End Call node".to_string());
    }

    let fan_out = |id: &NodeId| ctx.graph.outgoing(id).count();

    for node in ctx
        .nodes
        .iter()
        .filter(|n| !n.kind().requires_branch_keys() && fan_out(n.id()) > 1)
    {
        warnings.push(format!(
            "node '{}' has multiple outgoing edges; control flow is ambiguous",
            ctx.name_of(node)
        ));
    }

    for node in ctx.nodes.iter().filter(|n| {
        let category = n.kind().category();
        category != NodeCategory::Trigger
            && category != NodeCategory::Logic
            && !n.kind().may_terminate()
            && fan_out(n.id()) == 0
    }) {
        warnings.push(format!("node '{}' is a dead end", ctx.name_of(node)));
    }

    warnings
}
