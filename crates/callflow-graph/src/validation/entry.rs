use crate::taxonomy::NodeKind;
use crate::validation::{Check, ValidationContext};

/// At most one start node per call direction
pub(crate) struct SingleEntry;

const ENTRY_KINDS: [NodeKind; 2] = [NodeKind::StartOutbound, NodeKind::StartInbound];

impl Check for SingleEntry {
    fn name(&self) -> &'static str {
        "single_entry"
    }

    fn run(&self, ctx: &ValidationContext<'_>) -> Vec<String> {
        ENTRY_KINDS
            .iter()
            .filter(|kind| ctx.nodes.iter().filter(|n| n.kind() == **kind).count() > 1)
            .map(|kind| format!("multiple {} nodes", kind))
            .collect()
    }
}
