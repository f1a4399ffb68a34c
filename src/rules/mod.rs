//! Business rule extraction.
//!
//! Rules are produced by a set of independent passes, each reading the same
//! [`RuleContext`] and appending to a shared [`RuleSet`]. Passes do not see
//! each other's output beyond deduplication.

use crate::diagnostics::{Diagnostic, Diagnostics, Stage};
use crate::entity::{Entity, EntityField, ResourceKey};
use crate::flow::Flow;
use crate::trace::{Event, Trace};
use ahash::AHashSet;
use serde::{Deserialize, Serialize};

mod business;
mod permission;
mod state_machine;
mod validation;

pub use business::BusinessRulePass;
pub use permission::{ForbiddenResponsePass, OperationPermissionPass};
pub use state_machine::{LIFECYCLE_STATES, StateMachinePass};
pub use validation::{FieldValidationPass, InlineErrorPass, ServerValidationPass};

/// Field names that hold an entity's lifecycle state.
pub const STATUS_FIELDS: &[&str] = &["status", "state", "phase", "stage"];

/// Where a rule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provenance {
    /// A naming or type convention.
    #[serde(rename = "heuristic")]
    Heuristic,
    /// Derived from observed data such as enums or required fields.
    #[serde(rename = "inferred")]
    Inferred,
    #[serde(rename = "api_422")]
    Api422,
    #[serde(rename = "api_403")]
    Api403,
    #[serde(rename = "inline_error")]
    InlineError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMachine {
    pub entity: String,
    pub states: Vec<String>,
    pub initial: String,
    pub transitions: Vec<StateTransition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateTransition {
    pub from: String,
    pub to: String,
    pub trigger: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    pub entity: String,
    pub field: String,
    pub rule: String,
    pub message: String,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRule {
    pub entity: String,
    pub action: String,
    pub roles: Vec<String>,
    pub message: String,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessRule {
    pub entity: String,
    pub rule: String,
    pub message: String,
    pub provenance: Provenance,
}

/// The four rule collections, deduplicated as they are filled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    pub state_machines: Vec<StateMachine>,
    pub validation_rules: Vec<ValidationRule>,
    pub permission_rules: Vec<PermissionRule>,
    pub business_rules: Vec<BusinessRule>,
    #[serde(skip)]
    seen: AHashSet<String>,
}

impl RuleSet {
    fn first_time(&mut self, key: String) -> bool {
        self.seen.insert(key)
    }

    /// One state machine per entity; later ones for the same entity are ignored.
    pub fn add_state_machine(&mut self, machine: StateMachine) -> bool {
        let added = self.first_time(format!("sm:{}", machine.entity));
        if added {
            self.state_machines.push(machine);
        }
        added
    }

    /// Unique by entity, field and rule.
    pub fn add_validation(&mut self, rule: ValidationRule) -> bool {
        let added = self.first_time(format!("v:{}:{}:{}", rule.entity, rule.field, rule.rule));
        if added {
            self.validation_rules.push(rule);
        }
        added
    }

    /// Unique by entity, action and provenance.
    pub fn add_permission(&mut self, rule: PermissionRule) -> bool {
        let added = self.first_time(format!(
            "p:{}:{}:{:?}",
            rule.entity, rule.action, rule.provenance
        ));
        if added {
            self.permission_rules.push(rule);
        }
        added
    }

    /// Unique by entity and rule.
    pub fn add_business(&mut self, rule: BusinessRule) -> bool {
        let added = self.first_time(format!("b:{}:{}", rule.entity, rule.rule));
        if added {
            self.business_rules.push(rule);
        }
        added
    }

    pub fn total(&self) -> usize {
        self.state_machines.len()
            + self.validation_rules.len()
            + self.permission_rules.len()
            + self.business_rules.len()
    }
}

/// Everything a rule pass may read.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub entities: &'a [Entity],
    pub flows: &'a [Flow],
    pub trace: &'a Trace,
}

impl<'a> RuleContext<'a> {
    pub fn new(entities: &'a [Entity], flows: &'a [Flow], trace: &'a Trace) -> Self {
        Self {
            entities,
            flows,
            trace,
        }
    }

    pub fn entity(&self, name: &str) -> Option<&'a Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Flows whose name mentions the entity, or whose network steps hit it.
    pub fn flows_mentioning(&self, entity: &'a Entity) -> impl Iterator<Item = &'a Flow> + 'a {
        let flows = self.flows;
        flows.iter().filter(move |flow| {
            flow.mentions(&entity.name)
                || flow.mentions(&entity.label)
                || flow.steps.iter().any(|step| {
                    step.operation
                        .as_deref()
                        .and_then(|op| op.split_whitespace().nth(1))
                        .and_then(|path| ResourceKey::from_url(path).ok())
                        .is_some_and(|key| key.entity == entity.name)
                })
        })
    }

    /// Network events that resolve to a known entity.
    pub fn network_evidence(&self) -> impl Iterator<Item = (&'a Event, &'a Entity, ResourceKey)> + 'a {
        let (entities, trace) = (self.entities, self.trace);
        trace.network_events().filter_map(move |event| {
            let key = ResourceKey::from_url(event.url.as_deref()?).ok()?;
            let entity = entities.iter().find(|e| e.name == key.entity)?;
            Some((event, entity, key))
        })
    }
}

/// The status-like field of an entity, if it has one.
pub fn status_field(entity: &Entity) -> Option<&EntityField> {
    entity
        .fields
        .iter()
        .find(|f| STATUS_FIELDS.contains(&f.name.to_ascii_lowercase().as_str()))
}

/// One independent rule extraction pass.
pub trait RulePass: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, ctx: &RuleContext<'_>, rules: &mut RuleSet, diagnostics: &mut Diagnostics);
}

/// The outcome of running every pass.
#[derive(Debug)]
pub struct ExtractedRules {
    pub rules: RuleSet,
    pub diagnostics: Vec<Diagnostic>,
}

/// Runs a registry of rule passes in registration order.
pub struct RuleExtractor {
    passes: Vec<Box<dyn RulePass>>,
}

impl Default for RuleExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleExtractor {
    /// An extractor with every built-in pass registered.
    pub fn new() -> Self {
        Self::empty()
            .with_pass(StateMachinePass)
            .with_pass(FieldValidationPass)
            .with_pass(ServerValidationPass)
            .with_pass(InlineErrorPass)
            .with_pass(OperationPermissionPass)
            .with_pass(ForbiddenResponsePass)
            .with_pass(BusinessRulePass)
    }

    pub fn empty() -> Self {
        Self { passes: Vec::new() }
    }

    pub fn with_pass(mut self, pass: impl RulePass + 'static) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    pub fn extract(&self, ctx: &RuleContext<'_>) -> ExtractedRules {
        let mut rules = RuleSet::default();
        let mut diagnostics = Diagnostics::new(Stage::Rules);

        for pass in &self.passes {
            let before = rules.total();
            pass.extract(ctx, &mut rules, &mut diagnostics);
            tracing::debug!(pass = pass.name(), added = rules.total() - before, "rule pass finished");
        }

        tracing::info!(
            state_machines = rules.state_machines.len(),
            validation = rules.validation_rules.len(),
            permission = rules.permission_rules.len(),
            business = rules.business_rules.len(),
            "extracted rules"
        );
        ExtractedRules {
            rules,
            diagnostics: diagnostics.into_vec(),
        }
    }
}
