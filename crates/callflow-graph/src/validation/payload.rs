use crate::validation::{Check, ValidationContext};

/// Re-checks every payload against its kind's field contract
pub(crate) struct PayloadContract;

impl Check for PayloadContract {
    fn name(&self) -> &'static str {
        "payload_contract"
    }

    fn run(&self, ctx: &ValidationContext<'_>) -> Vec<String> {
        let mut issues = Vec::new();
        for node in &ctx.nodes {
            if let Err(problems) = node.kind().check_payload(node.payload()) {
                issues.extend(problems.into_iter().map(|problem| {
                    format!(
                        "node '{}' has invalid payload: {}",
                        ctx.name_of(node),
                        problem
                    )
                }));
            }
        }
        issues
    }
}
