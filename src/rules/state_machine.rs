use super::{RuleContext, RulePass, RuleSet, StateMachine, StateTransition, status_field};
use crate::diagnostics::{Diagnostics, codes};
use crate::entity::Entity;
use crate::entity::naming::word_tokens;
use crate::flow::Flow;
use ahash::AHashSet;
use itertools::Itertools;

/// Lifecycle keywords recognized in flow names and operations, in canonical order.
pub const LIFECYCLE_STATES: &[&str] = &["draft", "pending", "active", "completed", "archived", "deleted"];

const DEFAULT_STATES: &[&str] = &["draft", "active", "archived"];
const INITIAL_CANDIDATES: &[&str] = &["draft", "pending", "new", "created", "initial"];
const DELETED: &str = "deleted";

/// Builds one state machine per entity with a status-like field.
pub struct StateMachinePass;

impl RulePass for StateMachinePass {
    fn name(&self) -> &'static str {
        "state_machines"
    }

    fn extract(&self, ctx: &RuleContext<'_>, rules: &mut RuleSet, diagnostics: &mut Diagnostics) {
        for entity in ctx.entities {
            if status_field(entity).is_none() {
                continue;
            }
            let flows: Vec<&Flow> = ctx.flows_mentioning(entity).collect();
            let machine = build_machine(entity, &flows, diagnostics);
            rules.add_state_machine(machine);
        }
    }
}

fn build_machine(entity: &Entity, flows: &[&Flow], diagnostics: &mut Diagnostics) -> StateMachine {
    let mut states = known_states(entity, flows);
    if states.is_empty() {
        diagnostics.fallback(
            codes::DEFAULT_STATES,
            Some(entity.name.as_str()),
            format!("no states observed; using {}", DEFAULT_STATES.join(", ")),
        );
        states = DEFAULT_STATES.iter().map(|s| s.to_string()).collect();
    }

    let candidates = observed_transitions(flows, &states);
    let mut seen = AHashSet::new();
    let mut transitions = Vec::new();
    for transition in candidates {
        if transition.from == transition.to || !seen.insert((transition.from.clone(), transition.to.clone())) {
            continue;
        }
        for state in [&transition.from, &transition.to] {
            if !states.contains(state) {
                diagnostics.record(
                    codes::IMPLIED_STATE,
                    Some(entity.name.as_str()),
                    format!("added '{}' for {} transition", state, transition.trigger),
                );
                states.push(state.clone());
            }
        }
        transitions.push(transition);
    }

    let initial = INITIAL_CANDIDATES
        .iter()
        .find(|candidate| states.iter().any(|s| s == *candidate))
        .map(|s| s.to_string())
        .or_else(|| states.first().cloned())
        .unwrap_or_default();

    StateMachine {
        entity: entity.name.clone(),
        states,
        initial,
        transitions,
    }
}

/// The status field's enum, else lifecycle keywords mentioned by related flows.
fn known_states(entity: &Entity, flows: &[&Flow]) -> Vec<String> {
    if let Some(values) = status_field(entity).and_then(|f| f.enum_values.as_ref()) {
        if !values.is_empty() {
            return values.iter().map(|v| v.to_ascii_lowercase()).unique().collect();
        }
    }

    let tokens: AHashSet<String> = flows
        .iter()
        .flat_map(|flow| {
            std::iter::once(flow.name.as_str())
                .chain(flow.steps.iter().filter_map(|s| s.operation.as_deref()))
        })
        .flat_map(word_tokens)
        .collect();

    LIFECYCLE_STATES
        .iter()
        .filter(|state| tokens.contains(**state))
        .map(|s| s.to_string())
        .collect()
}

fn transition(from: &str, to: &str, trigger: &str) -> StateTransition {
    StateTransition {
        from: from.to_string(),
        to: to.to_string(),
        trigger: trigger.to_string(),
        conditions: Vec::new(),
    }
}

/// Maps the HTTP methods of each flow onto lifecycle transitions.
fn observed_transitions(flows: &[&Flow], states: &[String]) -> Vec<StateTransition> {
    let mut transitions = Vec::new();
    for flow in flows {
        for method in flow.network_methods() {
            match method.as_str() {
                "POST" => transitions.push(transition("draft", "active", "create_success")),
                "PATCH" | "PUT" => {
                    if flow.mentions("archive") {
                        transitions.push(transition("active", "archived", "archive"));
                    }
                    if flow.mentions("approve") {
                        transitions.push(transition("pending", "active", "approve"));
                    }
                }
                "DELETE" => transitions.extend(
                    states
                        .iter()
                        .filter(|s| *s != DELETED)
                        .map(|s| transition(s, DELETED, "delete")),
                ),
                _ => {}
            }
        }
    }
    transitions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Stage;
    use crate::entity::{EntityField, EntityMetadata, FieldSource, FieldType};
    use crate::flow::{FlowStep, StepKind};

    fn entity(status_enum: Option<&[&str]>) -> Entity {
        Entity {
            name: "Order".into(),
            label: "Order".into(),
            fields: vec![EntityField {
                name: "status".into(),
                field_type: FieldType::String,
                required: false,
                source: FieldSource::Response,
                constraints: Vec::new(),
                enum_values: status_enum.map(|v| v.iter().map(|s| s.to_string()).collect()),
            }],
            operations: Vec::new(),
            metadata: EntityMetadata::default(),
        }
    }

    fn flow(name: &str, operations: &[&str]) -> Flow {
        Flow {
            id: "flow-1".into(),
            name: name.into(),
            from_screen: "screen-orders".into(),
            to_screen: "screen-orders-detail".into(),
            steps: operations
                .iter()
                .map(|op| FlowStep {
                    kind: StepKind::Network,
                    screen: "screen-orders".into(),
                    action: None,
                    operation: Some(op.to_string()),
                    duration: 10,
                })
                .collect(),
            avg_duration: 100,
        }
    }

    #[test]
    fn test_create_flow_activates_draft() {
        let order = entity(Some(&["draft", "active", "archived"]));
        let creation = flow("Order Creation", &["POST /api/orders"]);
        let mut diagnostics = Diagnostics::new(Stage::Rules);

        let machine = build_machine(&order, &[&creation], &mut diagnostics);

        assert_eq!(machine.initial, "draft");
        assert_eq!(machine.transitions, vec![transition("draft", "active", "create_success")]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_defaults_when_nothing_is_known() {
        let order = entity(None);
        let mut diagnostics = Diagnostics::new(Stage::Rules);

        let machine = build_machine(&order, &[], &mut diagnostics);

        assert_eq!(machine.states, vec!["draft", "active", "archived"]);
        assert_eq!(machine.initial, "draft");
        assert_eq!(diagnostics.into_vec()[0].code, codes::DEFAULT_STATES);
    }

    #[test]
    fn test_states_from_flow_keywords() {
        let order = entity(None);
        let review = flow("Orders → Pending Orders", &["PATCH /api/orders/:id/approve"]);
        let approve = flow("Approve Order", &["PUT /api/orders/:id"]);
        let mut diagnostics = Diagnostics::new(Stage::Rules);

        let machine = build_machine(&order, &[&review, &approve], &mut diagnostics);

        assert_eq!(machine.states, vec!["pending", "active"]);
        assert_eq!(machine.initial, "pending");
        assert_eq!(machine.transitions, vec![transition("pending", "active", "approve")]);
        assert_eq!(diagnostics.into_vec()[0].code, codes::IMPLIED_STATE);
    }

    #[test]
    fn test_approve_adds_pending_to_default_states() {
        let order = entity(None);
        let approve = flow("Approve Order", &["PATCH /api/orders/:id"]);
        let mut diagnostics = Diagnostics::new(Stage::Rules);

        let machine = build_machine(&order, &[&approve], &mut diagnostics);

        assert_eq!(machine.states, vec!["draft", "active", "archived", "pending"]);
        assert_eq!(machine.initial, "draft");
        assert_eq!(machine.transitions, vec![transition("pending", "active", "approve")]);
        let codes_seen: Vec<_> = diagnostics.into_vec().into_iter().map(|d| d.code).collect();
        assert_eq!(codes_seen, vec![codes::DEFAULT_STATES, codes::IMPLIED_STATE]);
    }

    #[test]
    fn test_enum_with_pending_approves_to_active() {
        let order = entity(Some(&["pending", "active", "rejected"]));
        let approve = flow("Approve Order", &["PUT /api/orders/:id"]);
        let mut diagnostics = Diagnostics::new(Stage::Rules);

        let machine = build_machine(&order, &[&approve], &mut diagnostics);

        assert_eq!(machine.states, vec!["pending", "active", "rejected"]);
        assert_eq!(machine.initial, "pending");
        assert_eq!(machine.transitions, vec![transition("pending", "active", "approve")]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_archive_and_create_add_missing_endpoints() {
        let order = entity(Some(&["open", "closed"]));
        let edit = flow("Archive Order", &["POST /api/orders", "PATCH /api/orders/:id"]);
        let mut diagnostics = Diagnostics::new(Stage::Rules);

        let machine = build_machine(&order, &[&edit], &mut diagnostics);

        assert_eq!(machine.states, vec!["open", "closed", "draft", "active", "archived"]);
        assert_eq!(machine.initial, "draft");
        assert_eq!(
            machine.transitions,
            vec![
                transition("draft", "active", "create_success"),
                transition("active", "archived", "archive"),
            ]
        );
    }

    #[test]
    fn test_delete_reaches_deleted_from_every_state() {
        let order = entity(Some(&["draft", "active"]));
        let removal = flow("Remove Order", &["DELETE /api/orders/:id", "DELETE /api/orders/:id"]);
        let mut diagnostics = Diagnostics::new(Stage::Rules);

        let machine = build_machine(&order, &[&removal], &mut diagnostics);

        assert_eq!(machine.states, vec!["draft", "active", "deleted"]);
        assert_eq!(
            machine.transitions,
            vec![transition("draft", "deleted", "delete"), transition("active", "deleted", "delete")]
        );
    }

    #[test]
    fn test_initial_falls_back_to_first_state() {
        let order = entity(Some(&["Open", "Closed"]));
        let mut diagnostics = Diagnostics::new(Stage::Rules);
        let machine = build_machine(&order, &[], &mut diagnostics);
        assert_eq!(machine.initial, "open");
    }
}
