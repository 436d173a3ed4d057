//! View versions, representations, and the history log.
//!
//! A [`ViewVersion`] is a schema-bound definition revision identified by a
//! stable integer id. Versions are immutable once constructed; the builder
//! assigns ids monotonically and collapses structurally identical
//! submissions via [`ViewVersion::same_version`].
//!
//! Schema and version references use explicit tagged values instead of a
//! reserved magic id: [`SchemaRef::LastAdded`] and [`VersionRef::LastAdded`]
//! name "the entity most recently added in this builder session", which
//! keeps replayed change logs relocatable when deduplication reassigns ids.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Reference to a schema from a view version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaRef {
    /// A concrete schema id that must exist in the owning metadata.
    Id(i32),
    /// The schema most recently added in the current builder session.
    LastAdded,
}

impl SchemaRef {
    /// Returns the concrete schema id, or `None` for the last-added sentinel.
    #[must_use]
    pub const fn id(self) -> Option<i32> {
        match self {
            Self::Id(id) => Some(id),
            Self::LastAdded => None,
        }
    }
}

/// Reference to a view version, used when setting the current version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionRef {
    /// A concrete version id that must exist in the owning metadata.
    Id(i32),
    /// The version most recently added in the current builder session.
    LastAdded,
}

impl VersionRef {
    /// Returns the concrete version id, or `None` for the last-added sentinel.
    #[must_use]
    pub const fn id(self) -> Option<i32> {
        match self {
            Self::Id(id) => Some(id),
            Self::LastAdded => None,
        }
    }
}

/// One representation of a view version.
///
/// A version may hold at most one representation per SQL dialect; the
/// builder rejects duplicates case-insensitively at insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ViewRepresentation {
    /// A SQL query in a named dialect.
    Sql {
        /// The view query text.
        sql: String,
        /// The SQL dialect the query is written in (e.g. `spark`, `trino`).
        dialect: String,
    },
}

impl ViewRepresentation {
    /// Creates a SQL representation.
    #[must_use]
    pub fn sql(sql: impl Into<String>, dialect: impl Into<String>) -> Self {
        Self::Sql {
            sql: sql.into(),
            dialect: dialect.into(),
        }
    }

    /// Returns the dialect of this representation.
    #[must_use]
    pub fn dialect(&self) -> &str {
        match self {
            Self::Sql { dialect, .. } => dialect,
        }
    }
}

/// A named, schema-bound definition revision of a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewVersion {
    /// Version id, unique and monotonically assigned within one metadata
    /// value.
    #[serde(rename = "version-id")]
    pub version_id: i32,

    /// Creation timestamp in milliseconds since the epoch.
    #[serde(rename = "timestamp-ms")]
    pub timestamp_ms: i64,

    /// The schema this version is bound to.
    #[serde(rename = "schema-ref")]
    pub schema_ref: SchemaRef,

    /// Operation summary (carries at least the `operation` key).
    #[serde(default)]
    pub summary: HashMap<String, String>,

    /// Catalog the view's unqualified references resolve against.
    #[serde(rename = "default-catalog", skip_serializing_if = "Option::is_none")]
    pub default_catalog: Option<String>,

    /// Namespace the view's unqualified references resolve against.
    #[serde(
        rename = "default-namespace",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub default_namespace: Vec<String>,

    /// Ordered representations, at most one per dialect.
    #[serde(default)]
    pub representations: Vec<ViewRepresentation>,
}

impl ViewVersion {
    /// Returns the operation recorded in the summary, if any.
    #[must_use]
    pub fn operation(&self) -> Option<&str> {
        self.summary.get("operation").map(String::as_str)
    }

    /// Returns a copy of this version carrying a different version id.
    #[must_use]
    pub fn with_version_id(&self, version_id: i32) -> Self {
        Self {
            version_id,
            ..self.clone()
        }
    }

    /// Returns a copy of this version carrying a different schema reference.
    #[must_use]
    pub fn with_schema_ref(&self, schema_ref: SchemaRef) -> Self {
        Self {
            schema_ref,
            ..self.clone()
        }
    }

    /// Structural equality for deduplication.
    ///
    /// Compares summary, representations, default catalog, default
    /// namespace, and the schema reference while ignoring `version_id` and
    /// `timestamp_ms`: two submissions that would behave identically
    /// collapse to one stored version.
    #[must_use]
    pub fn same_version(&self, other: &Self) -> bool {
        self.summary == other.summary
            && self.representations == other.representations
            && self.default_catalog == other.default_catalog
            && self.default_namespace == other.default_namespace
            && self.schema_ref == other.schema_ref
    }

    /// Returns the lower-cased set of dialects this version has SQL
    /// representations for.
    #[must_use]
    pub fn dialects(&self) -> BTreeSet<String> {
        self.representations
            .iter()
            .map(|repr| repr.dialect().to_lowercase())
            .collect()
    }
}

/// One entry of the version history log: when a version became current.
///
/// The log is append-only and must never reference a version id absent from
/// the owning metadata at write time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewHistoryEntry {
    /// When the version became current, in milliseconds since the epoch.
    #[serde(rename = "timestamp-ms")]
    pub timestamp_ms: i64,

    /// The version that became current.
    #[serde(rename = "version-id")]
    pub version_id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spark_version(version_id: i32, timestamp_ms: i64) -> ViewVersion {
        ViewVersion {
            version_id,
            timestamp_ms,
            schema_ref: SchemaRef::Id(0),
            summary: HashMap::from([("operation".to_string(), "create".to_string())]),
            default_catalog: None,
            default_namespace: vec!["analytics".to_string()],
            representations: vec![ViewRepresentation::sql("SELECT 1", "spark")],
        }
    }

    #[test]
    fn same_version_ignores_id_and_timestamp() {
        assert!(spark_version(1, 100).same_version(&spark_version(9, 999)));
    }

    #[test]
    fn same_version_includes_schema_ref() {
        let base = spark_version(1, 100);
        let rebound = base.with_schema_ref(SchemaRef::Id(3));
        assert!(!base.same_version(&rebound));
    }

    #[test]
    fn same_version_includes_representations() {
        let base = spark_version(1, 100);
        let mut extra = spark_version(1, 100);
        extra
            .representations
            .push(ViewRepresentation::sql("SELECT 1", "trino"));
        assert!(!base.same_version(&extra));
    }

    #[test]
    fn same_version_includes_summary() {
        let base = spark_version(1, 100);
        let mut replaced = spark_version(1, 100);
        replaced
            .summary
            .insert("operation".to_string(), "replace".to_string());
        assert!(!base.same_version(&replaced));
    }

    #[test]
    fn dialects_are_lower_cased() {
        let mut version = spark_version(1, 100);
        version.representations = vec![
            ViewRepresentation::sql("SELECT 1", "Spark"),
            ViewRepresentation::sql("SELECT 1", "TRINO"),
        ];
        let dialects: Vec<_> = version.dialects().into_iter().collect();
        assert_eq!(dialects, vec!["spark".to_string(), "trino".to_string()]);
    }

    #[test]
    fn operation_reads_the_summary() {
        let version = spark_version(1, 100);
        assert_eq!(version.operation(), Some("create"));
    }

    #[test]
    fn ref_ids_resolve_only_for_the_explicit_form() {
        assert_eq!(SchemaRef::Id(5).id(), Some(5));
        assert_eq!(SchemaRef::LastAdded.id(), None);
        assert_eq!(VersionRef::Id(5).id(), Some(5));
        assert_eq!(VersionRef::LastAdded.id(), None);
    }

    #[test]
    fn schema_ref_serde_shapes() {
        let id = serde_json::to_value(SchemaRef::Id(5)).expect("serialize");
        assert_eq!(id, serde_json::json!({ "id": 5 }));

        let last = serde_json::to_value(SchemaRef::LastAdded).expect("serialize");
        assert_eq!(last, serde_json::json!("last-added"));
    }

    #[test]
    fn representation_serde_is_tagged() {
        let repr = ViewRepresentation::sql("SELECT * FROM t", "trino");
        let json = serde_json::to_value(&repr).expect("serialize");
        assert_eq!(json["type"], "sql");
        assert_eq!(json["dialect"], "trino");
    }

    #[test]
    fn history_entry_serde_roundtrip() {
        let entry = ViewHistoryEntry {
            timestamp_ms: 1_700_000_000_000,
            version_id: 2,
        };
        let json = serde_json::to_string(&entry).expect("serialize");
        assert!(json.contains("timestamp-ms"));
        let parsed: ViewHistoryEntry = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(entry, parsed);
    }
}
