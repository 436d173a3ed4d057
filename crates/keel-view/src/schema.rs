//! View schemas: typed field lists with structural-equality deduplication.
//!
//! Schemas are immutable once constructed and owned by exactly one
//! [`ViewMetadata`](crate::metadata::ViewMetadata) (or staged inside a
//! builder session until finalize). Two schemas with the same field structure
//! are considered the same schema regardless of their assigned ids; the
//! builder uses [`Schema::same_schema`] to collapse them to one stored entity.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Primitive type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// True/false.
    Boolean,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 32-bit IEEE float.
    Float,
    /// 64-bit IEEE float.
    Double,
    /// Calendar date without a time zone.
    Date,
    /// Microsecond-precision timestamp.
    Timestamp,
    /// UTF-8 string.
    String,
    /// 128-bit universally unique identifier.
    Uuid,
    /// Arbitrary bytes.
    Binary,
}

/// A single field in a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    /// Unique field id within the schema.
    pub id: i32,

    /// Field name.
    pub name: String,

    /// Whether a value is required.
    pub required: bool,

    /// Field data type.
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Optional documentation string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl SchemaField {
    /// Creates a required field.
    #[must_use]
    pub fn required(id: i32, name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id,
            name: name.into(),
            required: true,
            field_type,
            doc: None,
        }
    }

    /// Creates an optional field.
    #[must_use]
    pub fn optional(id: i32, name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id,
            name: name.into(),
            required: false,
            field_type,
            doc: None,
        }
    }
}

/// An ordered, typed field list identified by a schema id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema id, unique within one metadata value.
    #[serde(rename = "schema-id")]
    pub schema_id: i32,

    /// Ordered schema fields.
    pub fields: Vec<SchemaField>,

    /// Ids of the fields that identify a row.
    #[serde(
        rename = "identifier-field-ids",
        default,
        skip_serializing_if = "BTreeSet::is_empty"
    )]
    pub identifier_field_ids: BTreeSet<i32>,
}

impl Schema {
    /// Creates a schema with the given id and fields and no identifier fields.
    #[must_use]
    pub fn new(schema_id: i32, fields: Vec<SchemaField>) -> Self {
        Self {
            schema_id,
            fields,
            identifier_field_ids: BTreeSet::new(),
        }
    }

    /// Returns a copy of this schema carrying a different schema id.
    ///
    /// Used by the builder when deduplication assigns a fresh id to a
    /// candidate schema.
    #[must_use]
    pub fn with_schema_id(&self, schema_id: i32) -> Self {
        Self {
            schema_id,
            ..self.clone()
        }
    }

    /// Structural equality for deduplication.
    ///
    /// Compares the ordered field list and the identifier-field id set while
    /// ignoring `schema_id`. The ignored-field set is the deduplication
    /// contract: a candidate matching an existing schema under this
    /// comparison reuses the existing id instead of growing the collection.
    #[must_use]
    pub fn same_schema(&self, other: &Self) -> bool {
        self.fields == other.fields && self.identifier_field_ids == other.identifier_field_ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_field_schema(schema_id: i32) -> Schema {
        Schema::new(
            schema_id,
            vec![
                SchemaField::required(1, "id", FieldType::Long),
                SchemaField::optional(2, "payload", FieldType::String),
            ],
        )
    }

    #[test]
    fn same_schema_ignores_schema_id() {
        assert!(two_field_schema(0).same_schema(&two_field_schema(7)));
    }

    #[test]
    fn same_schema_detects_field_differences() {
        let base = two_field_schema(0);
        let mut renamed = two_field_schema(0);
        renamed.fields[1].name = "body".to_string();
        assert!(!base.same_schema(&renamed));
    }

    #[test]
    fn same_schema_detects_identifier_field_differences() {
        let base = two_field_schema(0);
        let mut keyed = two_field_schema(0);
        keyed.identifier_field_ids.insert(1);
        assert!(!base.same_schema(&keyed));
    }

    #[test]
    fn same_schema_is_order_sensitive() {
        let base = two_field_schema(0);
        let mut swapped = two_field_schema(0);
        swapped.fields.reverse();
        assert!(!base.same_schema(&swapped));
    }

    #[test]
    fn with_schema_id_rewrites_only_the_id() {
        let rewritten = two_field_schema(0).with_schema_id(3);
        assert_eq!(rewritten.schema_id, 3);
        assert!(rewritten.same_schema(&two_field_schema(0)));
    }

    #[test]
    fn serde_uses_kebab_case_keys() {
        let schema = two_field_schema(5);
        let json = serde_json::to_value(&schema).expect("serialize");
        assert_eq!(json["schema-id"], 5);
        assert_eq!(json["fields"][0]["type"], "long");
        // Empty identifier set is omitted entirely.
        assert!(json.get("identifier-field-ids").is_none());
    }

    #[test]
    fn serde_roundtrip_preserves_identifier_fields() {
        let mut schema = two_field_schema(1);
        schema.identifier_field_ids.insert(1);
        let json = serde_json::to_string(&schema).expect("serialize");
        let parsed: Schema = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(schema, parsed);
    }
}
