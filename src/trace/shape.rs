use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A type-only description of a JSON payload. Shapes never carry values.
///
/// On the wire a shape is written the way the recorder emits it: a leaf is a
/// type name (`"string"`), an array is a one-element list holding the element
/// shape (`["number"]`), and an object maps field names to nested shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawShape", into = "RawShape")]
pub enum Shape {
    Primitive(String),
    Array(Box<Shape>),
    Object(IndexMap<String, Shape>),
}

impl Shape {
    pub fn primitive(name: impl Into<String>) -> Self {
        Shape::Primitive(name.into())
    }

    pub fn array(element: Shape) -> Self {
        Shape::Array(Box::new(element))
    }

    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Shape)>) -> Self {
        Shape::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Looks up a top-level member of an object shape.
    pub fn field(&self, name: &str) -> Option<&Shape> {
        match self {
            Shape::Object(fields) => fields.get(name),
            _ => None,
        }
    }
}

/// The loosely typed form a shape takes in recorder output.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawShape {
    Primitive(String),
    List(Vec<Shape>),
    Object(IndexMap<String, Shape>),
    Null(()),
}

impl From<RawShape> for Shape {
    fn from(raw: RawShape) -> Self {
        match raw {
            RawShape::Primitive(name) => Shape::Primitive(name),
            // Recorders emit the first element's shape; an empty list tells us nothing.
            RawShape::List(items) => Shape::Array(Box::new(
                items
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| Shape::primitive("unknown")),
            )),
            RawShape::Object(fields) => Shape::Object(fields),
            RawShape::Null(()) => Shape::primitive("null"),
        }
    }
}

impl From<Shape> for RawShape {
    fn from(shape: Shape) -> Self {
        match shape {
            Shape::Primitive(name) => RawShape::Primitive(name),
            Shape::Array(element) => RawShape::List(vec![*element]),
            Shape::Object(fields) => RawShape::Object(fields),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_shape_from_recorder_json() {
        let shape: Shape = serde_json::from_value(json!({
            "id": "number",
            "tags": ["string"],
            "owner": { "name": "string" },
            "archivedAt": null
        }))
        .unwrap();

        assert_eq!(shape.field("id"), Some(&Shape::primitive("number")));
        assert_eq!(
            shape.field("tags"),
            Some(&Shape::array(Shape::primitive("string")))
        );
        assert_eq!(
            shape.field("owner"),
            Some(&Shape::object([("name", Shape::primitive("string"))]))
        );
        assert_eq!(shape.field("archivedAt"), Some(&Shape::primitive("null")));
    }

    #[test]
    fn test_empty_list_becomes_unknown_array() {
        let shape: Shape = serde_json::from_value(json!([])).unwrap();
        assert_eq!(shape, Shape::array(Shape::primitive("unknown")));
    }

    #[test]
    fn test_field_order_is_preserved_when_written_back() {
        let shape = Shape::object([
            ("zeta", Shape::primitive("string")),
            ("alpha", Shape::array(Shape::primitive("number"))),
        ]);
        let written = serde_json::to_string(&shape).unwrap();
        assert_eq!(written, r#"{"zeta":"string","alpha":["number"]}"#);
    }
}
