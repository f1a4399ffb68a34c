use serde::{Deserialize, Serialize};
use std::fmt;

mod fields;
pub mod naming;
mod operations;
mod resolver;

pub use fields::{FieldObservation, top_level_fields};
pub use operations::classify_operation;
pub use resolver::{EntityResolver, ResolvedEntities, ResourceKey};

/// A data model inferred from network traffic against a common resource path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub name: String,
    pub label: String,
    pub fields: Vec<EntityField>,
    pub operations: Vec<EntityOperation>,
    pub metadata: EntityMetadata,
}

impl Entity {
    pub fn field(&self, name: &str) -> Option<&EntityField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_operation(&self, kind: OperationKind) -> bool {
        self.operations.iter().any(|op| op.kind == kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    Object,
    Array,
    Unknown,
}

impl FieldType {
    pub fn is_concrete(&self) -> bool {
        *self != FieldType::Unknown
    }

    /// Maps a recorder leaf type name onto a field type.
    pub fn from_leaf(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "string" | "str" | "text" => FieldType::String,
            "number" | "integer" | "int" | "float" | "double" | "decimal" | "bigint" => {
                FieldType::Number
            }
            "boolean" | "bool" => FieldType::Boolean,
            "date" | "datetime" | "timestamp" => FieldType::Date,
            "object" => FieldType::Object,
            "array" => FieldType::Array,
            _ => FieldType::Unknown,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Object => "object",
            FieldType::Array => "array",
            FieldType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Which side of the wire a field was observed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldSource {
    Request,
    Response,
    /// Seen in both requests and responses.
    Inferred,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    pub source: FieldSource,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    List,
    Create,
    Read,
    Update,
    Delete,
    Search,
    Export,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::List => "list",
            OperationKind::Create => "create",
            OperationKind::Read => "read",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
            OperationKind::Search => "search",
            OperationKind::Export => "export",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityOperation {
    pub kind: OperationKind,
    pub method: String,
    pub path: String,
}

impl EntityOperation {
    /// The uniqueness key of an operation within its entity.
    pub fn key(&self) -> String {
        format!("{}:{}", self.method, self.path)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at_field: Option<String>,
    /// Distinct normalized paths merged into this entity.
    #[serde(default)]
    pub endpoints: Vec<String>,
    /// Number of network events attributed to this entity.
    #[serde(default)]
    pub observations: usize,
}
