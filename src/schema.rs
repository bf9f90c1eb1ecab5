//! OpenAPI schema objects and the shared schema-name resolution rule.
//!
//! Only the handful of keywords the synthesizer itself produces are typed; everything else a
//! caller supplies (or a base document already contains) is kept in [`Schema::extra`] so that
//! schemas pass through the synthesizer untouched.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root under which component schemas are referenced
pub const COMPONENTS_SCHEMAS: &str = "#/components/schemas/";

/// Suffix marking a schema name as "array of"
const ARRAY_MARKER: &str = "[]";

/// OpenAPI Schema definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Reference to another schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// The type of the schema (string, integer, object, array, etc.)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    /// Format for primitive types (e.g., "int32", "date-time")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Allowed values
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    /// Regular expression the value must match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    /// Any other schema keyword
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl Schema {
    /// A plain `{"type": "string"}` schema
    pub fn string() -> Self {
        Self::of_type("string")
    }

    pub fn of_type(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Self::default()
        }
    }

    /// A `$ref` to a component schema
    pub fn reference(name: &str) -> Self {
        Self {
            reference: Some(format!("{}{}", COMPONENTS_SCHEMAS, name)),
            ..Self::default()
        }
    }

    /// An array schema with the given items
    pub fn array_of(items: Schema) -> Self {
        Self {
            schema_type: Some("array".to_string()),
            items: Some(Box::new(items)),
            ..Self::default()
        }
    }

    pub fn with_example(mut self, example: impl Into<Value>) -> Self {
        self.example = Some(example.into());
        self
    }
}

/// Resolves a bare schema name to a schema.
///
/// `"Widget"` becomes a reference to `#/components/schemas/Widget`, `"Widget[]"` an array whose
/// items reference `#/components/schemas/Widget`.
pub fn schema_ref(name: &str) -> Schema {
    match name.strip_suffix(ARRAY_MARKER) {
        Some(item) => Schema::array_of(Schema::reference(item)),
        None => Schema::reference(name),
    }
}
