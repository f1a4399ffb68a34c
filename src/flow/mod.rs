use serde::{Deserialize, Serialize};

mod assembler;

pub use assembler::{AssembledFlows, FlowAssembler, FlowAssemblerBuilder};

/// Minimum number of steps that must precede a navigation for a flow to count.
pub const DEFAULT_MIN_STEPS_FOR_FLOW: usize = 2;
/// Flows spanning longer than this (in milliseconds) are treated as idle time.
pub const DEFAULT_MAX_FLOW_DURATION_MS: u64 = 5 * 60 * 1000;
/// Method recorded for network steps whose event carried none.
pub const UNKNOWN_METHOD: &str = "UNKNOWN";

/// A user journey between two screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    pub id: String,
    pub name: String,
    pub from_screen: String,
    pub to_screen: String,
    pub steps: Vec<FlowStep>,
    /// Elapsed milliseconds from the start of the flow to its closing navigation.
    pub avg_duration: u64,
}

impl Flow {
    /// True when the flow's name refers to the given term, case-insensitively.
    pub fn mentions(&self, term: &str) -> bool {
        !term.is_empty() && self.name.to_lowercase().contains(&term.to_lowercase())
    }

    /// The HTTP methods of the flow's network steps, in step order.
    pub fn network_methods(&self) -> impl Iterator<Item = String> + '_ {
        self.steps
            .iter()
            .filter(|s| s.kind == StepKind::Network)
            .filter_map(|s| s.method())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepKind {
    View,
    Click,
    Input,
    Navigate,
    Network,
}

/// One step of a flow. `action` holds the triggering event id for UI steps;
/// `operation` holds `"METHOD /path"` for network steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowStep {
    #[serde(rename = "type")]
    pub kind: StepKind,
    pub screen: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// Milliseconds since the previous event of the session.
    pub duration: u64,
}

impl FlowStep {
    /// The HTTP method of a network step's operation, if one was recorded.
    pub fn method(&self) -> Option<String> {
        self.operation
            .as_deref()
            .and_then(|op| op.split_whitespace().next())
            .map(str::to_ascii_uppercase)
            .filter(|m| m != UNKNOWN_METHOD)
    }
}
