use crate::graph::Edge;
use crate::validation::{Check, ValidationContext};

/// Re-verifies edge endpoints.
///
/// The graph API makes these impossible, so anything found here is a bug in
/// the model rather than an authoring mistake.
pub(crate) struct ReferentialIntegrity;

impl Check for ReferentialIntegrity {
    fn name(&self) -> &'static str {
        "referential_integrity"
    }

    fn run(&self, ctx: &ValidationContext<'_>) -> Vec<String> {
        let mut edges: Vec<&Edge> = ctx.graph.iter_edges().collect();
        edges.sort_by(|a, b| a.id().cmp(b.id()));

        let mut issues = Vec::new();
        for edge in edges {
            for endpoint in [edge.source(), edge.target()] {
                if !ctx.graph.contains_node(endpoint) {
                    issues.push(format!(
                        "internal consistency error: edge '{}' references missing node '{}'",
                        edge.id(),
                        endpoint
                    ));
                }
            }
            if let Some(target) = ctx.graph.node(edge.target()) {
                if target.kind().is_trigger() {
                    issues.push(format!(
                        "internal consistency error: edge '{}' enters start node '{}'",
                        edge.id(),
                        ctx.name_of(target)
                    ));
                }
            }
        }
        issues
    }
}
