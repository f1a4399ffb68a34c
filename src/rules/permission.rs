use super::{PermissionRule, Provenance, RuleContext, RulePass, RuleSet};
use crate::diagnostics::Diagnostics;
use crate::entity::{Entity, OperationKind, classify_operation};
use itertools::Itertools;

fn permission(entity: &Entity, action: &str, roles: &[&str], provenance: Provenance) -> PermissionRule {
    PermissionRule {
        entity: entity.name.clone(),
        action: action.to_string(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        message: format!(
            "{} {} requires {}",
            action,
            entity.label,
            roles.iter().join(" or ")
        ),
        provenance,
    }
}

/// Role conventions for mutating operations and approval or archive flows.
pub struct OperationPermissionPass;

impl OperationPermissionPass {
    fn roles_for(kind: OperationKind) -> Option<&'static [&'static str]> {
        match kind {
            OperationKind::Create => Some(&["authenticated"]),
            OperationKind::Update => Some(&["owner", "admin"]),
            OperationKind::Delete => Some(&["admin"]),
            _ => None,
        }
    }
}

impl RulePass for OperationPermissionPass {
    fn name(&self) -> &'static str {
        "operation_permissions"
    }

    fn extract(&self, ctx: &RuleContext<'_>, rules: &mut RuleSet, _diagnostics: &mut Diagnostics) {
        for entity in ctx.entities {
            for operation in &entity.operations {
                if let Some(roles) = Self::roles_for(operation.kind) {
                    rules.add_permission(permission(
                        entity,
                        operation.kind.as_str(),
                        roles,
                        Provenance::Heuristic,
                    ));
                }
            }

            let naming_flows = ctx
                .flows
                .iter()
                .filter(|f| f.mentions(&entity.name) || f.mentions(&entity.label));
            for flow in naming_flows {
                if flow.mentions("approve") {
                    rules.add_permission(permission(
                        entity,
                        "approve",
                        &["manager", "admin"],
                        Provenance::Inferred,
                    ));
                }
                if flow.mentions("archive") {
                    rules.add_permission(permission(
                        entity,
                        "archive",
                        &["owner", "admin"],
                        Provenance::Inferred,
                    ));
                }
            }
        }
    }
}

/// A 403 response restricts the attempted operation to administrators.
pub struct ForbiddenResponsePass;

impl RulePass for ForbiddenResponsePass {
    fn name(&self) -> &'static str {
        "forbidden_responses"
    }

    fn extract(&self, ctx: &RuleContext<'_>, rules: &mut RuleSet, _diagnostics: &mut Diagnostics) {
        for (event, entity, key) in ctx.network_evidence() {
            if event.status != Some(403) {
                continue;
            }
            let Some(kind) = event
                .http_method()
                .and_then(|method| classify_operation(&method, &key.resource))
            else {
                continue;
            };
            rules.add_permission(permission(entity, kind.as_str(), &["admin"], Provenance::Api403));
        }
    }
}
