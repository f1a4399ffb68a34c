use serde::{Deserialize, Serialize};
use std::fmt;

/// The pipeline stage a report or diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Screens,
    Flows,
    Entities,
    Rules,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Screens => "screens",
            Stage::Flows => "flows",
            Stage::Entities => "entities",
            Stage::Rules => "rules",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identifiers for the notices a stage can raise.
pub mod codes {
    pub const MALFORMED_URL: &str = "malformed_url";
    pub const MISSING_URL: &str = "missing_url";
    pub const MISSING_METHOD: &str = "missing_method";
    pub const STATIC_ASSET: &str = "static_asset";
    pub const NO_RESOURCE_SEGMENT: &str = "no_resource_segment";
    pub const UNSUPPORTED_METHOD: &str = "unsupported_method";
    pub const TYPE_CONFLICT: &str = "type_conflict";
    pub const FLOW_TOO_SHORT: &str = "flow_too_short";
    pub const FLOW_TOO_LONG: &str = "flow_too_long";
    pub const DEFAULT_STATES: &str = "default_states";
    pub const IMPLIED_STATE: &str = "implied_state";
    pub const NO_PRIMARY_KEY: &str = "no_primary_key";
}

/// A non-fatal notice: a heuristic that fell back to its default, or a
/// record that was skipped. Diagnostics never turn a stage into a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub stage: Stage,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subject {
            Some(subject) => write!(
                f,
                "[{}] {} ({}): {}",
                self.stage, self.code, subject, self.message
            ),
            None => write!(f, "[{}] {}: {}", self.stage, self.code, self.message),
        }
    }
}

/// Collects the diagnostics of one stage run and mirrors them to the log.
#[derive(Debug)]
pub struct Diagnostics {
    stage: Stage,
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            items: Vec::new(),
        }
    }

    /// Records a skipped record or a minor shortfall.
    pub fn record(&mut self, code: &str, subject: Option<&str>, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(stage = %self.stage, code, subject = subject.unwrap_or("-"), "{}", message);
        self.push(code, subject, message);
    }

    /// Records a heuristic that had to fall back to a default.
    pub fn fallback(&mut self, code: &str, subject: Option<&str>, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(stage = %self.stage, code, subject = subject.unwrap_or("-"), "{}", message);
        self.push(code, subject, message);
    }

    fn push(&mut self, code: &str, subject: Option<&str>, message: String) {
        self.items.push(Diagnostic {
            stage: self.stage,
            code: code.to_string(),
            message,
            subject: subject.map(str::to_string),
        });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
