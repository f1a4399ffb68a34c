use super::{BusinessRule, Provenance, RuleContext, RulePass, RuleSet, status_field};
use crate::diagnostics::Diagnostics;

/// Workflow and audit-timestamp rules.
pub struct BusinessRulePass;

impl RulePass for BusinessRulePass {
    fn name(&self) -> &'static str {
        "business_rules"
    }

    fn extract(&self, ctx: &RuleContext<'_>, rules: &mut RuleSet, _diagnostics: &mut Diagnostics) {
        for entity in ctx.entities {
            if let Some(field) = status_field(entity) {
                rules.add_business(BusinessRule {
                    entity: entity.name.clone(),
                    rule: "workflow_progression".to_string(),
                    message: format!(
                        "{} {} may only change along its state machine",
                        entity.label, field.name
                    ),
                    provenance: Provenance::Heuristic,
                });
            }

            let metadata = &entity.metadata;
            let Some(created) = metadata.created_at_field.as_deref() else {
                continue;
            };
            let message = match metadata.updated_at_field.as_deref() {
                Some(updated) => format!(
                    "{} cannot change on update; {} records each update",
                    created, updated
                ),
                None => format!("{} cannot change on update", created),
            };
            rules.add_business(BusinessRule {
                entity: entity.name.clone(),
                rule: "timestamp_immutability".to_string(),
                message,
                provenance: Provenance::Heuristic,
            });
        }
    }
}
