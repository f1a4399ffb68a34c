use super::{Provenance, RuleContext, RulePass, RuleSet, ValidationRule};
use crate::diagnostics::Diagnostics;
use crate::entity::naming::word_tokens;
use crate::entity::{Entity, EntityField, FieldType, top_level_fields};
use ahash::AHashSet;
use once_cell::sync::Lazy;
use regex::Regex;

const ALWAYS_REQUIRED: &[&str] = &["id", "name", "email"];
const MAX_STRING_LENGTH: usize = 500;

static INLINE_ERROR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:is required|required|invalid|is not valid|must be|must have|must contain|cannot be|can't be blank|too short|too long|already (?:exists|taken))\b",
    )
    .expect("inline error pattern is valid")
});

fn rule(entity: &Entity, field: &str, rule: impl Into<String>, message: String, provenance: Provenance) -> ValidationRule {
    ValidationRule {
        entity: entity.name.clone(),
        field: field.to_string(),
        rule: rule.into(),
        message,
        provenance,
    }
}

/// Naming and type conventions over the resolved fields.
pub struct FieldValidationPass;

impl FieldValidationPass {
    fn field_rules(entity: &Entity, field: &EntityField) -> Vec<ValidationRule> {
        let name = field.name.as_str();
        let mut rules = Vec::new();

        if field.required {
            rules.push(rule(entity, name, "required", format!("{} is required", name), Provenance::Inferred));
        } else if ALWAYS_REQUIRED.contains(&name) {
            rules.push(rule(entity, name, "required", format!("{} is required", name), Provenance::Heuristic));
        }

        match field.field_type {
            FieldType::String => {
                if name.to_ascii_lowercase().contains("email") {
                    rules.push(rule(
                        entity,
                        name,
                        "email",
                        format!("{} must be a valid email address", name),
                        Provenance::Heuristic,
                    ));
                }
                rules.push(rule(
                    entity,
                    name,
                    format!("max:{}", MAX_STRING_LENGTH),
                    format!("{} must be at most {} characters", name, MAX_STRING_LENGTH),
                    Provenance::Heuristic,
                ));
            }
            FieldType::Number => rules.push(rule(
                entity,
                name,
                "min:0",
                format!("{} must not be negative", name),
                Provenance::Heuristic,
            )),
            _ => {}
        }

        for constraint in &field.constraints {
            let message = match constraint.strip_prefix("oneOf:") {
                Some(values) => format!("{} must be one of {}", name, values.replace('|', ", ")),
                None => format!("{} must satisfy {}", name, constraint),
            };
            rules.push(rule(entity, name, constraint.clone(), message, Provenance::Inferred));
        }
        rules
    }
}

impl RulePass for FieldValidationPass {
    fn name(&self) -> &'static str {
        "field_validation"
    }

    fn extract(&self, ctx: &RuleContext<'_>, rules: &mut RuleSet, _diagnostics: &mut Diagnostics) {
        for entity in ctx.entities {
            for field in &entity.fields {
                for validation in Self::field_rules(entity, field) {
                    rules.add_validation(validation);
                }
            }
        }
    }
}

/// Every field of a request the server rejected with 422 is validated server-side.
pub struct ServerValidationPass;

impl RulePass for ServerValidationPass {
    fn name(&self) -> &'static str {
        "server_validation"
    }

    fn extract(&self, ctx: &RuleContext<'_>, rules: &mut RuleSet, _diagnostics: &mut Diagnostics) {
        for (event, entity, key) in ctx.network_evidence() {
            if event.status != Some(422) {
                continue;
            }
            let Some(shape) = &event.request_shape else {
                continue;
            };
            let method = event.http_method().unwrap_or_default();
            for field in top_level_fields(shape) {
                rules.add_validation(rule(
                    entity,
                    &field.name,
                    "server_validation",
                    format!(
                        "{} was rejected by {} {} (422)",
                        field.name, method, key.resource.path
                    ),
                    Provenance::Api422,
                ));
            }
        }
    }
}

/// UI labels that read like a form error and name an entity field.
pub struct InlineErrorPass;

impl InlineErrorPass {
    fn names_field(tokens: &AHashSet<String>, field: &str) -> bool {
        let words = word_tokens(field);
        !words.is_empty() && words.iter().all(|w| tokens.contains(w))
    }
}

impl RulePass for InlineErrorPass {
    fn name(&self) -> &'static str {
        "inline_errors"
    }

    fn extract(&self, ctx: &RuleContext<'_>, rules: &mut RuleSet, _diagnostics: &mut Diagnostics) {
        for event in ctx.trace.events().filter(|e| e.kind.is_ui()) {
            let Some(label) = event.label.as_deref() else {
                continue;
            };
            if !INLINE_ERROR.is_match(label) {
                continue;
            }
            let tokens: AHashSet<String> = word_tokens(label)
                .into_iter()
                .chain(event.selector.as_deref().map(word_tokens).unwrap_or_default())
                .collect();

            // A label that also names an entity narrows the match to it.
            let named: Vec<&Entity> = ctx
                .entities
                .iter()
                .filter(|e| Self::names_field(&tokens, &e.name))
                .collect();
            let candidates: Vec<&Entity> = if named.is_empty() {
                ctx.entities.iter().collect()
            } else {
                named
            };

            for entity in candidates {
                for field in &entity.fields {
                    if Self::names_field(&tokens, &field.name) {
                        rules.add_validation(rule(
                            entity,
                            &field.name,
                            "inline",
                            label.trim().to_string(),
                            Provenance::InlineError,
                        ));
                    }
                }
            }
        }
    }
}
