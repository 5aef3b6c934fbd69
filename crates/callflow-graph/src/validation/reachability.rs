use crate::graph::Node;
use crate::taxonomy::NodeCategory;
use crate::validation::{Check, ValidationContext};

/// Every non-trigger node is reachable from some start node
pub(crate) struct Reachability;

/// Every start node has a path to an End Call node
pub(crate) struct Termination;

impl Check for Reachability {
    fn name(&self) -> &'static str {
        "reachability"
    }

    fn run(&self, ctx: &ValidationContext<'_>) -> Vec<String> {
        let triggers = ctx
            .nodes
            .iter()
            .copied()
            .filter(|n| n.kind().is_trigger())
            .map(Node::id);
        let reached = ctx.reachable_from(triggers);

        ctx.nodes
            .iter()
            .filter(|n| !n.kind().is_trigger() && !reached.contains(n.id()))
            .map(|n| {
                format!(
                    "node '{}' is unreachable from any start node",
                    ctx.name_of(n)
                )
            })
            .collect()
    }
}

impl Check for Termination {
    fn name(&self) -> &'static str {
        "termination"
    }

    fn run(&self, ctx: &ValidationContext<'_>) -> Vec<String> {
        let endings = ctx
            .nodes
            .iter()
            .copied()
            .filter(|n| n.kind().category() == NodeCategory::Ending)
            .map(Node::id);
        let can_finish = ctx.reaching(endings);

        ctx.nodes
            .iter()
            .filter(|n| n.kind().is_trigger() && !can_finish.contains(n.id()))
            .map(|n| format!("flow from '{}' never reaches End Call", ctx.name_of(n)))
            .collect()
    }
}
