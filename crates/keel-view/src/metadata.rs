//! The immutable metadata aggregate produced by a builder session.
//!
//! A [`ViewMetadata`] value is a complete description of one committed state
//! of a view. It is never mutated in place; the next state is produced by
//! opening a builder on it ([`ViewMetadata::to_builder`]) and finalizing a
//! new value. Id lookups go through position indexes computed once at
//! construction, so `schema(id)` and `version(id)` stay O(1) regardless of
//! how often callers resolve references.

use std::collections::HashMap;

use uuid::Uuid;

use crate::builder::ViewMetadataBuilder;
use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::update::MetadataUpdate;
use crate::version::{ViewHistoryEntry, ViewVersion};

/// Highest metadata format version this crate can produce or accept.
pub const SUPPORTED_VIEW_FORMAT_VERSION: i32 = 1;

/// Format version assigned when a fresh build never upgrades explicitly.
pub const DEFAULT_VIEW_FORMAT_VERSION: i32 = 1;

/// Raw field set assembled by the builder, indexed and checked by
/// [`ViewMetadata::from_parts`].
pub(crate) struct MetadataParts {
    pub(crate) view_uuid: Uuid,
    pub(crate) format_version: i32,
    pub(crate) location: String,
    pub(crate) schemas: Vec<Schema>,
    pub(crate) versions: Vec<ViewVersion>,
    pub(crate) current_version_id: i32,
    pub(crate) history: Vec<ViewHistoryEntry>,
    pub(crate) properties: HashMap<String, String>,
    pub(crate) changes: Vec<MetadataUpdate>,
    pub(crate) metadata_location: Option<String>,
}

/// One committed, self-consistent state of a view.
///
/// Invariants held by construction: the current version id resolves to an
/// entry of `versions`, that version's schema reference resolves to an entry
/// of `schemas`, ids are unique within their collection, and the format
/// version is within the supported range.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewMetadata {
    view_uuid: Uuid,
    format_version: i32,
    location: String,
    schemas: Vec<Schema>,
    versions: Vec<ViewVersion>,
    current_version_id: i32,
    history: Vec<ViewHistoryEntry>,
    properties: HashMap<String, String>,
    changes: Vec<MetadataUpdate>,
    metadata_location: Option<String>,
    schemas_by_id: HashMap<i32, usize>,
    versions_by_id: HashMap<i32, usize>,
    current_version_pos: usize,
    current_schema_pos: usize,
}

impl ViewMetadata {
    /// Indexes the assembled parts and enforces the referential invariants.
    pub(crate) fn from_parts(parts: MetadataParts) -> Result<Self> {
        if !(1..=SUPPORTED_VIEW_FORMAT_VERSION).contains(&parts.format_version) {
            return Err(Error::validation(format!(
                "unsupported format version: {} (supported: 1..={SUPPORTED_VIEW_FORMAT_VERSION})",
                parts.format_version
            )));
        }

        let mut schemas_by_id = HashMap::with_capacity(parts.schemas.len());
        for (pos, schema) in parts.schemas.iter().enumerate() {
            if schemas_by_id.insert(schema.schema_id, pos).is_some() {
                return Err(Error::validation(format!(
                    "duplicate schema id: {}",
                    schema.schema_id
                )));
            }
        }

        let mut versions_by_id = HashMap::with_capacity(parts.versions.len());
        for (pos, version) in parts.versions.iter().enumerate() {
            if versions_by_id.insert(version.version_id, pos).is_some() {
                return Err(Error::validation(format!(
                    "duplicate version id: {}",
                    version.version_id
                )));
            }
        }

        let Some(&current_version_pos) = versions_by_id.get(&parts.current_version_id) else {
            let known: Vec<i32> = parts.versions.iter().map(|v| v.version_id).collect();
            return Err(Error::validation(format!(
                "cannot find current version {} among versions {known:?}",
                parts.current_version_id
            )));
        };

        let Some(current_schema_id) = parts.versions[current_version_pos].schema_ref.id() else {
            return Err(Error::invalid_state(format!(
                "current version {} holds an unresolved schema reference",
                parts.current_version_id
            )));
        };
        let Some(&current_schema_pos) = schemas_by_id.get(&current_schema_id) else {
            return Err(Error::unknown_id("schema", current_schema_id));
        };

        Ok(Self {
            view_uuid: parts.view_uuid,
            format_version: parts.format_version,
            location: parts.location,
            schemas: parts.schemas,
            versions: parts.versions,
            current_version_id: parts.current_version_id,
            history: parts.history,
            properties: parts.properties,
            changes: parts.changes,
            metadata_location: parts.metadata_location,
            schemas_by_id,
            versions_by_id,
            current_version_pos,
            current_schema_pos,
        })
    }

    /// Starts a builder for brand-new view metadata.
    #[must_use]
    pub fn builder() -> ViewMetadataBuilder {
        ViewMetadataBuilder::new()
    }

    /// Starts a builder seeded from this metadata, for the next commit.
    #[must_use]
    pub fn to_builder(&self) -> ViewMetadataBuilder {
        ViewMetadataBuilder::from_metadata(self)
    }

    /// Identifier of the view, stable across commits.
    #[must_use]
    pub const fn view_uuid(&self) -> Uuid {
        self.view_uuid
    }

    /// Metadata format version of this state.
    #[must_use]
    pub const fn format_version(&self) -> i32 {
        self.format_version
    }

    /// Base storage location of the view.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// All schemas, in insertion order; schemas are never expired.
    #[must_use]
    pub fn schemas(&self) -> &[Schema] {
        &self.schemas
    }

    /// All retained versions. After an expiry the current version sorts
    /// first, followed by the remaining versions in descending id order.
    #[must_use]
    pub fn versions(&self) -> &[ViewVersion] {
        &self.versions
    }

    /// Id of the version currently served to readers.
    #[must_use]
    pub const fn current_version_id(&self) -> i32 {
        self.current_version_id
    }

    /// Gap-free log of current-version transitions, oldest first.
    #[must_use]
    pub fn history(&self) -> &[ViewHistoryEntry] {
        &self.history
    }

    /// Free-form configuration properties.
    #[must_use]
    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    /// Change records accumulated by the builder session that produced this
    /// state. Empty when the state was loaded from a metadata file.
    #[must_use]
    pub fn changes(&self) -> &[MetadataUpdate] {
        &self.changes
    }

    /// Storage location of the metadata file this state was loaded from, when
    /// the association has been recorded.
    #[must_use]
    pub fn metadata_location(&self) -> Option<&str> {
        self.metadata_location.as_deref()
    }

    /// Looks up a schema by id.
    #[must_use]
    pub fn schema(&self, schema_id: i32) -> Option<&Schema> {
        self.schemas_by_id
            .get(&schema_id)
            .map(|&pos| &self.schemas[pos])
    }

    /// Looks up a version by id.
    #[must_use]
    pub fn version(&self, version_id: i32) -> Option<&ViewVersion> {
        self.versions_by_id
            .get(&version_id)
            .map(|&pos| &self.versions[pos])
    }

    /// The version currently served to readers.
    #[must_use]
    pub fn current_version(&self) -> &ViewVersion {
        &self.versions[self.current_version_pos]
    }

    /// Id of the schema referenced by the current version.
    #[must_use]
    pub fn current_schema_id(&self) -> i32 {
        self.schemas[self.current_schema_pos].schema_id
    }

    /// The schema referenced by the current version.
    #[must_use]
    pub fn current_schema(&self) -> &Schema {
        &self.schemas[self.current_schema_pos]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldType, SchemaField};
    use crate::version::{SchemaRef, ViewRepresentation};

    fn schema(schema_id: i32) -> Schema {
        Schema::new(
            schema_id,
            vec![SchemaField::required(1, "event_id", FieldType::Long)],
        )
    }

    fn version(version_id: i32, schema_id: i32) -> ViewVersion {
        ViewVersion {
            version_id,
            timestamp_ms: i64::from(version_id) * 1_000,
            schema_ref: SchemaRef::Id(schema_id),
            summary: HashMap::from([("operation".to_string(), "create".to_string())]),
            default_catalog: None,
            default_namespace: vec!["marketing".to_string()],
            representations: vec![ViewRepresentation::sql("SELECT 1", "spark")],
        }
    }

    fn parts(
        schemas: Vec<Schema>,
        versions: Vec<ViewVersion>,
        current_version_id: i32,
    ) -> MetadataParts {
        let history = versions
            .iter()
            .map(|v| ViewHistoryEntry {
                timestamp_ms: v.timestamp_ms,
                version_id: v.version_id,
            })
            .collect();
        MetadataParts {
            view_uuid: Uuid::new_v4(),
            format_version: DEFAULT_VIEW_FORMAT_VERSION,
            location: "s3://bucket/warehouse/events_view".to_string(),
            schemas,
            versions,
            current_version_id,
            history,
            properties: HashMap::new(),
            changes: Vec::new(),
            metadata_location: None,
        }
    }

    #[test]
    fn indexes_resolve_ids_to_entries() {
        let metadata = ViewMetadata::from_parts(parts(
            vec![schema(0), schema(1)],
            vec![version(1, 0), version(2, 1)],
            2,
        ))
        .unwrap();

        assert_eq!(metadata.schema(1).map(|s| s.schema_id), Some(1));
        assert_eq!(metadata.version(1).map(|v| v.version_id), Some(1));
        assert!(metadata.schema(7).is_none());
        assert!(metadata.version(7).is_none());

        assert_eq!(metadata.current_version_id(), 2);
        assert_eq!(metadata.current_version().version_id, 2);
        assert_eq!(metadata.current_schema_id(), 1);
        assert_eq!(metadata.current_schema().schema_id, 1);
        assert_eq!(metadata.history().len(), 2);
    }

    #[test]
    fn unknown_current_version_is_rejected() {
        let err = ViewMetadata::from_parts(parts(
            vec![schema(0)],
            vec![version(1, 0)],
            9,
        ))
        .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert!(err.to_string().contains('9'));
    }

    #[test]
    fn duplicate_version_ids_are_rejected() {
        let err = ViewMetadata::from_parts(parts(
            vec![schema(0)],
            vec![version(1, 0), version(1, 0)],
            1,
        ))
        .unwrap_err();
        assert!(err.to_string().contains("duplicate version id"));
    }

    #[test]
    fn duplicate_schema_ids_are_rejected() {
        let err = ViewMetadata::from_parts(parts(
            vec![schema(0), schema(0)],
            vec![version(1, 0)],
            1,
        ))
        .unwrap_err();
        assert!(err.to_string().contains("duplicate schema id"));
    }

    #[test]
    fn current_version_must_reference_known_schema() {
        let err = ViewMetadata::from_parts(parts(
            vec![schema(0)],
            vec![version(1, 3)],
            1,
        ))
        .unwrap_err();
        assert!(err.to_string().contains("unknown schema id: 3"));
    }

    #[test]
    fn unresolved_schema_reference_is_rejected() {
        let mut dangling = version(1, 0);
        dangling.schema_ref = SchemaRef::LastAdded;
        let err = ViewMetadata::from_parts(parts(vec![schema(0)], vec![dangling], 1))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
    }

    #[test]
    fn format_version_above_supported_is_rejected() {
        let mut raw = parts(vec![schema(0)], vec![version(1, 0)], 1);
        raw.format_version = SUPPORTED_VIEW_FORMAT_VERSION + 1;
        let err = ViewMetadata::from_parts(raw).unwrap_err();
        assert!(err.to_string().contains("unsupported format version"));
    }
}
