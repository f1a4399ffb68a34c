use super::{EntityField, FieldSource, FieldType};
use crate::trace::Shape;
use indexmap::IndexMap;

/// Keys that wrap a payload in list responses.
const ENVELOPE_KEYS: &[&str] = &["data", "items", "results", "records"];
/// Keys that may sit next to an envelope key without making it a real entity.
const PAGINATION_KEYS: &[&str] = &[
    "total", "count", "page", "pageSize", "page_size", "perPage", "per_page", "limit",
    "offset", "next", "previous", "cursor", "nextCursor", "hasMore", "has_more", "meta",
];

/// One field as seen in a single request or response shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldObservation {
    pub name: String,
    pub field_type: FieldType,
    pub enum_values: Option<Vec<String>>,
}

/// Parses a leaf type name. `enum<a|b|c>` declares a string with known values.
fn parse_leaf(name: &str) -> (FieldType, Option<Vec<String>>) {
    let trimmed = name.trim();
    if let Some(inner) = trimmed
        .strip_prefix("enum<")
        .and_then(|rest| rest.strip_suffix('>'))
    {
        let values: Vec<String> = inner
            .split('|')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        return (FieldType::String, (!values.is_empty()).then_some(values));
    }
    (FieldType::from_leaf(trimmed), None)
}

fn observe(name: &str, shape: &Shape) -> FieldObservation {
    let (field_type, enum_values) = match shape {
        Shape::Primitive(leaf) => parse_leaf(leaf),
        Shape::Array(_) => (FieldType::Array, None),
        Shape::Object(_) => (FieldType::Object, None),
    };
    FieldObservation {
        name: name.to_string(),
        field_type,
        enum_values,
    }
}

fn is_ignored_key(key: &str) -> bool {
    // `_id` is the conventional document key and doubles as a primary key.
    key != "_id" && (key.starts_with('_') || key.starts_with('$'))
}

/// Finds the payload inside a `{data: ..., total: ...}` style envelope.
fn unwrap_envelope(fields: &IndexMap<String, Shape>) -> Option<&Shape> {
    let mut envelope = None;
    for (key, value) in fields {
        if ENVELOPE_KEYS.contains(&key.as_str()) && envelope.is_none() {
            envelope = Some(value);
        } else if !PAGINATION_KEYS.contains(&key.as_str()) {
            return None;
        }
    }
    envelope.filter(|shape| !matches!(shape, Shape::Primitive(_)))
}

/// Flattens a shape into its top-level fields. Arrays are unwrapped to their
/// element shape and list envelopes to their payload.
pub fn top_level_fields(shape: &Shape) -> Vec<FieldObservation> {
    match shape {
        Shape::Primitive(_) => Vec::new(),
        Shape::Array(element) => top_level_fields(element),
        Shape::Object(fields) => {
            if let Some(payload) = unwrap_envelope(fields) {
                return top_level_fields(payload);
            }
            fields
                .iter()
                .filter(|(key, _)| !is_ignored_key(key))
                .map(|(key, value)| observe(key, value))
                .collect()
        }
    }
}

/// Result of merging an observation that disagreed with what was known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TypeConflict {
    pub field: String,
    pub previous: FieldType,
    pub observed: FieldType,
}

struct FieldDraft {
    field_type: FieldType,
    source: FieldSource,
    enum_values: Vec<String>,
    create_hits: usize,
}

/// Accumulates field observations for one entity, in first-seen order.
#[derive(Default)]
pub(crate) struct FieldTable {
    fields: IndexMap<String, FieldDraft>,
    create_requests: usize,
}

impl FieldTable {
    /// Merges one observation. Types widen from `unknown`; between two
    /// concrete types the latest one wins and the conflict is returned.
    pub fn merge(
        &mut self,
        observation: FieldObservation,
        source: FieldSource,
    ) -> Option<TypeConflict> {
        let FieldObservation {
            name,
            field_type,
            enum_values,
        } = observation;

        let draft = match self.fields.get_mut(&name) {
            Some(draft) => draft,
            None => {
                self.fields.insert(
                    name,
                    FieldDraft {
                        field_type,
                        source,
                        enum_values: enum_values.unwrap_or_default(),
                        create_hits: 0,
                    },
                );
                return None;
            }
        };

        if draft.source != source {
            draft.source = FieldSource::Inferred;
        }
        for value in enum_values.unwrap_or_default() {
            if !draft.enum_values.contains(&value) {
                draft.enum_values.push(value);
            }
        }

        let previous = draft.field_type;
        if !field_type.is_concrete() || previous == field_type {
            return None;
        }
        draft.field_type = field_type;
        previous.is_concrete().then(|| TypeConflict {
            field: name,
            previous,
            observed: field_type,
        })
    }

    /// Counts a create request and which fields it carried.
    pub fn record_create_request(&mut self, names: &[String]) {
        self.create_requests += 1;
        for name in names {
            if let Some(draft) = self.fields.get_mut(name) {
                draft.create_hits += 1;
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// A field is required when every create request carried it.
    pub fn into_fields(self) -> Vec<EntityField> {
        let create_requests = self.create_requests;
        self.fields
            .into_iter()
            .map(|(name, draft)| {
                let enum_values = (!draft.enum_values.is_empty()).then_some(draft.enum_values);
                let constraints = enum_values
                    .as_ref()
                    .map(|values| vec![format!("oneOf:{}", values.join("|"))])
                    .unwrap_or_default();
                EntityField {
                    name,
                    field_type: draft.field_type,
                    required: create_requests > 0 && draft.create_hits == create_requests,
                    source: draft.source,
                    constraints,
                    enum_values,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(json: &str) -> Shape {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_flatten_ignores_private_keys_and_unwraps_arrays() {
        let fields = top_level_fields(&shape(
            r#"[{
                "id": "number",
                "_links": { "self": "string" },
                "$type": "string",
                "_id": "string",
                "tags": ["string"],
                "owner": { "name": "string" }
            }]"#,
        ));

        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "_id", "tags", "owner"]);
        assert_eq!(fields[2].field_type, FieldType::Array);
        assert_eq!(fields[3].field_type, FieldType::Object);
    }

    #[test]
    fn test_envelope_is_unwrapped_only_next_to_pagination() {
        let wrapped = top_level_fields(&shape(
            r#"{
                "data": [{ "id": "number", "title": "string" }],
                "total": "number",
                "page": "number"
            }"#,
        ));
        assert_eq!(wrapped.len(), 2);
        assert_eq!(wrapped[1].name, "title");

        let real_fields = top_level_fields(&shape(
            r#"{ "data": { "blob": "string" }, "name": "string" }"#,
        ));
        assert_eq!(real_fields.len(), 2);
        assert_eq!(real_fields[0].name, "data");
    }

    #[test]
    fn test_enum_leaf() {
        let fields = top_level_fields(&shape(r#"{ "status": "enum<draft|active|archived>" }"#));
        assert_eq!(fields[0].field_type, FieldType::String);
        assert_eq!(
            fields[0].enum_values,
            Some(vec!["draft".into(), "active".into(), "archived".into()])
        );
    }

    #[test]
    fn test_merge_widens_and_tracks_source() {
        let mut table = FieldTable::default();
        let unknown = FieldObservation {
            name: "price".into(),
            field_type: FieldType::Unknown,
            enum_values: None,
        };
        let number = FieldObservation {
            field_type: FieldType::Number,
            ..unknown.clone()
        };
        let string = FieldObservation {
            field_type: FieldType::String,
            ..unknown.clone()
        };

        assert_eq!(table.merge(unknown.clone(), FieldSource::Request), None);
        assert_eq!(table.merge(number, FieldSource::Response), None);
        assert_eq!(table.merge(unknown, FieldSource::Response), None);
        let conflict = table.merge(string, FieldSource::Response).unwrap();
        assert_eq!(conflict.previous, FieldType::Number);

        let fields = table.into_fields();
        assert_eq!(fields[0].field_type, FieldType::String);
        assert_eq!(fields[0].source, FieldSource::Inferred);
        assert!(!fields[0].required);
    }

    #[test]
    fn test_required_when_every_create_carries_field() {
        let mut table = FieldTable::default();
        for name in ["title", "notes"] {
            table.merge(
                FieldObservation {
                    name: name.into(),
                    field_type: FieldType::String,
                    enum_values: None,
                },
                FieldSource::Request,
            );
        }
        table.record_create_request(&["title".into(), "notes".into()]);
        table.record_create_request(&["title".into()]);

        let fields = table.into_fields();
        assert!(fields[0].required);
        assert!(!fields[1].required);
    }
}
