//! The four output documents and their file I/O.

use crate::entity::Entity;
use crate::error::{OutputError, TraceError};
use crate::flow::Flow;
use crate::rules::RuleSet;
use crate::screen::Screen;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const SCREENS_FILE: &str = "screens.json";
pub const FLOWS_FILE: &str = "flows.json";
pub const ENTITIES_FILE: &str = "entities.json";
pub const RULES_FILE: &str = "rules.json";

/// RFC 3339 timestamp for `extractedAt`.
pub fn extracted_at() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// A pretty-printed JSON document written by one stage.
pub trait JsonDocument: Serialize + DeserializeOwned {
    const NAME: &'static str;

    fn from_file(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| TraceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| TraceError::JsonParseError {
            path: path.to_path_buf(),
            document: Self::NAME,
            source,
        })
    }

    fn to_json(&self) -> Result<String, OutputError> {
        serde_json::to_string_pretty(self).map_err(|source| OutputError::Serialize {
            document: Self::NAME,
            source,
        })
    }

    fn save(&self, path: impl AsRef<Path>) -> Result<(), OutputError> {
        let json = self.to_json()?;
        write_document(path.as_ref(), &json)
    }
}

/// Writes already-serialized JSON, creating parent directories as needed.
pub fn write_document(path: &Path, json: &str) -> Result<(), OutputError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| OutputError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, json).map_err(|source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreensDocument {
    pub screens: Vec<Screen>,
}

impl JsonDocument for ScreensDocument {
    const NAME: &'static str = "screens";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowsDocument {
    pub flows: Vec<Flow>,
}

impl JsonDocument for FlowsDocument {
    const NAME: &'static str = "flows";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitiesMetadata {
    pub extracted_at: String,
    pub total_entities: usize,
    pub total_operations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitiesDocument {
    pub entities: Vec<Entity>,
    pub metadata: EntitiesMetadata,
}

impl EntitiesDocument {
    pub fn new(entities: Vec<Entity>) -> Self {
        let metadata = EntitiesMetadata {
            extracted_at: extracted_at(),
            total_entities: entities.len(),
            total_operations: entities.iter().map(|e| e.operations.len()).sum(),
        };
        Self { entities, metadata }
    }
}

impl JsonDocument for EntitiesDocument {
    const NAME: &'static str = "entities";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesMetadata {
    pub extracted_at: String,
    pub total_state_machines: usize,
    pub total_validation_rules: usize,
    pub total_permission_rules: usize,
    pub total_business_rules: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesDocument {
    #[serde(flatten)]
    pub rules: RuleSet,
    pub metadata: RulesMetadata,
}

impl RulesDocument {
    pub fn new(rules: RuleSet) -> Self {
        let metadata = RulesMetadata {
            extracted_at: extracted_at(),
            total_state_machines: rules.state_machines.len(),
            total_validation_rules: rules.validation_rules.len(),
            total_permission_rules: rules.permission_rules.len(),
            total_business_rules: rules.business_rules.len(),
        };
        Self { rules, metadata }
    }
}

impl JsonDocument for RulesDocument {
    const NAME: &'static str = "rules";
}
