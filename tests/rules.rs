//! Rule extraction tests
mod common;
use common::*;
use retrace::diagnostics::codes;
use retrace::entity::{EntityField, EntityMetadata, FieldSource, FieldType};
use retrace::flow::{FlowStep, StepKind};
use retrace::prelude::*;
use retrace::rules::{Provenance, StateTransition};

#[cfg(test)]
mod rule_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn extract(trace: &Trace) -> retrace::rules::ExtractedRules {
        let flows = FlowAssembler::new(trace).assemble().flows;
        let entities = EntityResolver::new(trace).resolve().entities;
        RuleExtractor::new().extract(&RuleContext::new(&entities, &flows, trace))
    }

    fn transition(from: &str, to: &str, trigger: &str) -> StateTransition {
        StateTransition {
            from: from.into(),
            to: to.into(),
            trigger: trigger.into(),
            conditions: Vec::new(),
        }
    }

    fn order_entity() -> Entity {
        Entity {
            name: "Order".into(),
            label: "Order".into(),
            fields: vec![EntityField {
                name: "status".into(),
                field_type: FieldType::String,
                required: false,
                source: FieldSource::Response,
                constraints: vec!["oneOf:draft|active|archived".into()],
                enum_values: Some(vec!["draft".into(), "active".into(), "archived".into()]),
            }],
            operations: Vec::new(),
            metadata: EntityMetadata::default(),
        }
    }

    #[test]
    fn test_order_creation_flow_activates_draft() {
        let entities = [order_entity()];
        let flows = [Flow {
            id: "flow-1".into(),
            name: "Order Creation".into(),
            from_screen: "screen-orders-new".into(),
            to_screen: "screen-orders-id".into(),
            steps: vec![FlowStep {
                kind: StepKind::Network,
                screen: "screen-orders-new".into(),
                action: None,
                operation: Some("POST /api/orders".into()),
                duration: 40,
            }],
            avg_duration: 900,
        }];
        let trace = trace_with(Vec::new());

        let extracted = RuleExtractor::new().extract(&RuleContext::new(&entities, &flows, &trace));

        assert_eq!(extracted.rules.state_machines.len(), 1);
        let machine = &extracted.rules.state_machines[0];
        assert_eq!(machine.states, vec!["draft", "active", "archived"]);
        assert_eq!(machine.initial, "draft");
        assert_eq!(
            machine.transitions,
            vec![transition("draft", "active", "create_success")]
        );
    }

    #[test]
    fn test_no_network_means_no_rules() {
        let trace = trace_with(vec![click("c1", 1100), click("c2", 1200), navigate("n1", 1300, "/x")]);
        let extracted = extract(&trace);

        assert!(extracted.rules.state_machines.is_empty());
        assert_eq!(extracted.rules.total(), 0);
        assert!(extracted.diagnostics.is_empty());
    }

    #[test]
    fn test_order_trace_state_machine() {
        let extracted = extract(&order_trace());

        let machine = &extracted.rules.state_machines[0];
        assert_eq!(machine.entity, "Order");
        assert_eq!(machine.states, vec!["draft", "active", "archived", "deleted"]);
        assert_eq!(
            machine.transitions,
            vec![
                transition("draft", "active", "create_success"),
                transition("draft", "deleted", "delete"),
                transition("active", "deleted", "delete"),
                transition("archived", "deleted", "delete"),
            ]
        );
    }

    #[test]
    fn test_order_trace_validation_rules() {
        let extracted = extract(&order_trace());

        let rules: Vec<(&str, &str, Provenance)> = extracted
            .rules
            .validation_rules
            .iter()
            .map(|r| (r.field.as_str(), r.rule.as_str(), r.provenance))
            .collect();
        assert_eq!(
            rules,
            vec![
                ("id", "required", Provenance::Heuristic),
                ("id", "min:0", Provenance::Heuristic),
                ("title", "required", Provenance::Inferred),
                ("title", "max:500", Provenance::Heuristic),
                ("status", "max:500", Provenance::Heuristic),
                ("status", "oneOf:draft|active|archived", Provenance::Inferred),
                ("customerEmail", "required", Provenance::Inferred),
                ("customerEmail", "email", Provenance::Heuristic),
                ("customerEmail", "max:500", Provenance::Heuristic),
                ("title", "server_validation", Provenance::Api422),
                ("customerEmail", "server_validation", Provenance::Api422),
                ("title", "inline", Provenance::InlineError),
            ]
        );
        assert_eq!(
            extracted.rules.validation_rules.last().map(|r| r.message.as_str()),
            Some("Title is required")
        );
    }

    #[test]
    fn test_order_trace_permissions_and_business_rules() {
        let extracted = extract(&order_trace());

        let permissions: Vec<(&str, Vec<String>, Provenance)> = extracted
            .rules
            .permission_rules
            .iter()
            .map(|r| (r.action.as_str(), r.roles.clone(), r.provenance))
            .collect();
        assert_eq!(
            permissions,
            vec![
                ("create", vec!["authenticated".to_string()], Provenance::Heuristic),
                ("delete", vec!["admin".to_string()], Provenance::Heuristic),
                ("delete", vec!["admin".to_string()], Provenance::Api403),
            ]
        );

        let business: Vec<&str> = extracted
            .rules
            .business_rules
            .iter()
            .map(|r| r.rule.as_str())
            .collect();
        assert_eq!(business, vec!["workflow_progression", "timestamp_immutability"]);
    }

    #[test]
    fn test_default_states_are_reported() {
        let trace = trace_with(vec![
            call("n1", 1100, "GET", "/api/tickets/1", 200)
                .with_response_shape(Shape::object([
                    ("id", Shape::primitive("number")),
                    ("state", Shape::primitive("string")),
                ])),
        ]);

        let extracted = extract(&trace);

        let machine = &extracted.rules.state_machines[0];
        assert_eq!(machine.entity, "Ticket");
        assert_eq!(machine.states, vec!["draft", "active", "archived"]);
        assert!(machine.transitions.is_empty());
        assert_eq!(extracted.diagnostics[0].code, codes::DEFAULT_STATES);
    }

    #[test]
    fn test_archive_flow_grants_archive_permission() {
        let entities = [order_entity()];
        let flows = [Flow {
            id: "flow-1".into(),
            name: "Archive Order".into(),
            from_screen: "screen-orders-id".into(),
            to_screen: "screen-orders".into(),
            steps: vec![FlowStep {
                kind: StepKind::Network,
                screen: "screen-orders-id".into(),
                action: None,
                operation: Some("PATCH /api/orders/:id".into()),
                duration: 10,
            }],
            avg_duration: 300,
        }];
        let trace = trace_with(Vec::new());

        let extracted = RuleExtractor::new().extract(&RuleContext::new(&entities, &flows, &trace));

        assert_eq!(
            extracted.rules.state_machines[0].transitions,
            vec![transition("active", "archived", "archive")]
        );
        let archive = extracted
            .rules
            .permission_rules
            .iter()
            .find(|r| r.action == "archive")
            .unwrap();
        assert_eq!(archive.roles, vec!["owner", "admin"]);
        assert_eq!(archive.provenance, Provenance::Inferred);
    }

    #[test]
    fn test_approve_flow_moves_pending_to_active() {
        let entities = [order_entity()];
        let flows = [Flow {
            id: "flow-1".into(),
            name: "Approve Order".into(),
            from_screen: "screen-orders-id".into(),
            to_screen: "screen-orders".into(),
            steps: vec![FlowStep {
                kind: StepKind::Network,
                screen: "screen-orders-id".into(),
                action: None,
                operation: Some("PATCH /api/orders/:id".into()),
                duration: 10,
            }],
            avg_duration: 300,
        }];
        let trace = trace_with(Vec::new());

        let extracted = RuleExtractor::new().extract(&RuleContext::new(&entities, &flows, &trace));

        let machine = &extracted.rules.state_machines[0];
        assert_eq!(machine.states, vec!["draft", "active", "archived", "pending"]);
        assert_eq!(machine.transitions, vec![transition("pending", "active", "approve")]);
        assert!(extracted.diagnostics.iter().any(|d| d.code == codes::IMPLIED_STATE));

        let approve = extracted
            .rules
            .permission_rules
            .iter()
            .find(|r| r.action == "approve")
            .unwrap();
        assert_eq!(approve.roles, vec!["manager", "admin"]);
    }

    #[test]
    fn test_unknown_method_implies_no_transition() {
        let entities = [order_entity()];
        let flows = [Flow {
            id: "flow-1".into(),
            name: "Order Creation".into(),
            from_screen: "screen-orders-new".into(),
            to_screen: "screen-orders".into(),
            steps: vec![FlowStep {
                kind: StepKind::Network,
                screen: "screen-orders-new".into(),
                action: None,
                operation: Some("UNKNOWN /api/orders".into()),
                duration: 10,
            }],
            avg_duration: 300,
        }];
        let trace = trace_with(Vec::new());

        let extracted = RuleExtractor::new().extract(&RuleContext::new(&entities, &flows, &trace));

        assert!(extracted.rules.state_machines[0].transitions.is_empty());
    }
}
