//! Change records appended by builder sessions.
//!
//! Every successful, non-no-op mutation on a
//! [`ViewMetadataBuilder`](crate::builder::ViewMetadataBuilder) appends
//! exactly one record. The finished metadata carries the ordered log so an
//! external commit protocol can serialize it and apply the same mutations
//! atomically against a catalog under optimistic concurrency.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::Schema;
use crate::version::{VersionRef, ViewVersion};

/// One atomic, serializable description of a single metadata mutation.
///
/// `AddViewVersion` may carry [`SchemaRef::LastAdded`] and
/// `SetCurrentViewVersion` may carry [`VersionRef::LastAdded`]: the sentinel
/// forms keep a replayed log relocatable when deduplication assigns
/// different ids on the replaying side.
///
/// [`SchemaRef::LastAdded`]: crate::version::SchemaRef::LastAdded
/// [`VersionRef::LastAdded`]: crate::version::VersionRef::LastAdded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum MetadataUpdate {
    /// Assign the view's immutable identifier.
    AssignUuid {
        /// The assigned identifier.
        uuid: Uuid,
    },

    /// Upgrade the format version.
    UpgradeFormatVersion {
        /// Target format version.
        #[serde(rename = "format-version")]
        format_version: i32,
    },

    /// Set the view's base location.
    SetLocation {
        /// New location.
        location: String,
    },

    /// Add a new schema.
    AddSchema {
        /// The schema as stored (id already resolved by deduplication).
        schema: Schema,
    },

    /// Add a new view version.
    AddViewVersion {
        /// The version as stored, except that its schema reference is the
        /// last-added sentinel when it points at the schema added by the
        /// same session.
        version: ViewVersion,
    },

    /// Make a version the current one.
    SetCurrentViewVersion {
        /// The target version, in sentinel form when it is the version most
        /// recently added by the same session.
        #[serde(rename = "version-ref")]
        version_ref: VersionRef,
    },

    /// Merge entries into the property map.
    SetProperties {
        /// Properties to set.
        updates: HashMap<String, String>,
    },

    /// Delete entries from the property map.
    RemoveProperties {
        /// Property keys to remove.
        removals: BTreeSet<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::SchemaRef;

    #[test]
    fn upgrade_format_version_serde_shape() {
        let update = MetadataUpdate::UpgradeFormatVersion { format_version: 1 };
        let json = serde_json::to_value(&update).expect("serialize");
        assert_eq!(json["action"], "upgrade-format-version");
        assert_eq!(json["format-version"], 1);
    }

    #[test]
    fn set_current_view_version_sentinel_form() {
        let update = MetadataUpdate::SetCurrentViewVersion {
            version_ref: VersionRef::LastAdded,
        };
        let json = serde_json::to_value(&update).expect("serialize");
        assert_eq!(json["action"], "set-current-view-version");
        assert_eq!(json["version-ref"], "last-added");
    }

    #[test]
    fn add_view_version_deserializes_from_tagged_json() {
        let json = r#"{
            "action": "add-view-version",
            "version": {
                "version-id": 1,
                "timestamp-ms": 1700000000000,
                "schema-ref": "last-added",
                "summary": {"operation": "create"},
                "representations": [
                    {"type": "sql", "sql": "SELECT 1", "dialect": "spark"}
                ]
            }
        }"#;
        let update: MetadataUpdate = serde_json::from_str(json).expect("deserialize");
        let MetadataUpdate::AddViewVersion { version } = update else {
            panic!("wrong variant");
        };
        assert_eq!(version.version_id, 1);
        assert_eq!(version.schema_ref, SchemaRef::LastAdded);
    }

    #[test]
    fn remove_properties_keeps_sorted_keys() {
        let update = MetadataUpdate::RemoveProperties {
            removals: BTreeSet::from(["b".to_string(), "a".to_string()]),
        };
        let json = serde_json::to_string(&update).expect("serialize");
        // BTreeSet serializes in key order, keeping the log deterministic.
        assert!(json.contains(r#"["a","b"]"#));
    }

    #[test]
    fn assign_uuid_roundtrip() {
        let update = MetadataUpdate::AssignUuid {
            uuid: Uuid::new_v4(),
        };
        let json = serde_json::to_string(&update).expect("serialize");
        let parsed: MetadataUpdate = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(update, parsed);
    }
}
