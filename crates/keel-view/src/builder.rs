//! Mutation sessions that produce the next metadata state.
//!
//! A [`ViewMetadataBuilder`] stages schema, version, and property changes
//! against a base [`ViewMetadata`] (or from scratch) and finalizes into a new
//! immutable state plus the ordered change records an external commit layer
//! replays against the catalog. Every successful non-no-op call appends
//! exactly one change record; verified no-ops append nothing. A failed call
//! leaves the staged state exactly as it was before the call.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::Utc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::metadata::{
    MetadataParts, ViewMetadata, DEFAULT_VIEW_FORMAT_VERSION, SUPPORTED_VIEW_FORMAT_VERSION,
};
use crate::properties;
use crate::retention;
use crate::schema::Schema;
use crate::update::MetadataUpdate;
use crate::version::{SchemaRef, VersionRef, ViewHistoryEntry, ViewVersion};

/// Id assigned to the first schema when none exists yet.
const INITIAL_SCHEMA_ID: i32 = 0;

/// Id assigned to the first version when none exists yet.
const INITIAL_VERSION_ID: i32 = 0;

/// One mutation session over view metadata.
///
/// Obtained from [`ViewMetadata::builder`] for a fresh view or
/// [`ViewMetadata::to_builder`] for the next commit on an existing one.
/// Structurally identical schemas and versions collapse to a single stored
/// entity with a single id, so re-submitting the same definition is always
/// an id lookup rather than growth. Consumed by [`build`](Self::build).
#[derive(Debug)]
pub struct ViewMetadataBuilder {
    view_uuid: Option<Uuid>,
    format_version: i32,
    location: Option<String>,
    schemas: Vec<Schema>,
    versions: Vec<ViewVersion>,
    current_version_id: Option<i32>,
    history: Vec<ViewHistoryEntry>,
    properties: HashMap<String, String>,
    changes: Vec<MetadataUpdate>,
    metadata_location: Option<String>,

    // session state, never copied into the finalized value
    last_added_schema_id: Option<i32>,
    last_added_version_id: Option<i32>,
    history_entry: Option<ViewHistoryEntry>,
    previous_version: Option<ViewVersion>,

    schemas_by_id: HashMap<i32, usize>,
    versions_by_id: HashMap<i32, usize>,
}

impl ViewMetadataBuilder {
    /// Creates a session with no base state, for building a brand-new view.
    #[must_use]
    pub fn new() -> Self {
        Self {
            view_uuid: None,
            format_version: DEFAULT_VIEW_FORMAT_VERSION,
            location: None,
            schemas: Vec::new(),
            versions: Vec::new(),
            current_version_id: None,
            history: Vec::new(),
            properties: HashMap::new(),
            changes: Vec::new(),
            metadata_location: None,
            last_added_schema_id: None,
            last_added_version_id: None,
            history_entry: None,
            previous_version: None,
            schemas_by_id: HashMap::new(),
            versions_by_id: HashMap::new(),
        }
    }

    /// Creates a session seeded from a committed base state.
    ///
    /// The base's current version is captured for the dialect-drop check at
    /// finalize, the change log starts empty, and any metadata-file
    /// association is cleared because the built state will no longer match
    /// what that file holds.
    #[must_use]
    pub fn from_metadata(base: &ViewMetadata) -> Self {
        let schemas_by_id = base
            .schemas()
            .iter()
            .enumerate()
            .map(|(pos, schema)| (schema.schema_id, pos))
            .collect();
        let versions_by_id = base
            .versions()
            .iter()
            .enumerate()
            .map(|(pos, version)| (version.version_id, pos))
            .collect();

        Self {
            view_uuid: Some(base.view_uuid()),
            format_version: base.format_version(),
            location: Some(base.location().to_string()),
            schemas: base.schemas().to_vec(),
            versions: base.versions().to_vec(),
            current_version_id: Some(base.current_version_id()),
            history: base.history().to_vec(),
            properties: base.properties().clone(),
            changes: Vec::new(),
            metadata_location: None,
            last_added_schema_id: None,
            last_added_version_id: None,
            history_entry: None,
            previous_version: Some(base.current_version().clone()),
            schemas_by_id,
            versions_by_id,
        }
    }

    /// Raises the metadata format version.
    ///
    /// Downgrades and versions above [`SUPPORTED_VIEW_FORMAT_VERSION`] fail
    /// with [`Error::Validation`]; upgrading to the current version is a
    /// verified no-op.
    pub fn upgrade_format_version(&mut self, format_version: i32) -> Result<&mut Self> {
        if format_version < self.format_version {
            return Err(Error::validation(format!(
                "cannot downgrade v{} metadata to v{format_version}",
                self.format_version
            )));
        }

        if format_version > SUPPORTED_VIEW_FORMAT_VERSION {
            return Err(Error::validation(format!(
                "unsupported format version: {format_version} \
                 (supported: 1..={SUPPORTED_VIEW_FORMAT_VERSION})"
            )));
        }

        if format_version == self.format_version {
            return Ok(self);
        }

        self.format_version = format_version;
        self.changes
            .push(MetadataUpdate::UpgradeFormatVersion { format_version });
        Ok(self)
    }

    /// Sets the base storage location of the view.
    ///
    /// An empty location fails with [`Error::Validation`]; setting the
    /// current location again is a verified no-op.
    pub fn set_location(&mut self, location: &str) -> Result<&mut Self> {
        if location.is_empty() {
            return Err(Error::validation("invalid location: empty"));
        }

        if self.location.as_deref() == Some(location) {
            return Ok(self);
        }

        self.location = Some(location.to_string());
        self.changes.push(MetadataUpdate::SetLocation {
            location: location.to_string(),
        });
        Ok(self)
    }

    /// Associates the built state with the metadata file it was loaded from.
    ///
    /// The association claims "this state is exactly what that file holds",
    /// so finalizing with both a metadata location and staged changes fails;
    /// that check runs at [`build`](Self::build) once all changes are known.
    pub fn set_metadata_location(&mut self, metadata_location: impl Into<String>) -> &mut Self {
        self.metadata_location = Some(metadata_location.into());
        self
    }

    /// Adds a schema, collapsing structural duplicates, and returns the
    /// resolved id.
    ///
    /// A candidate matching an existing schema (field structure and
    /// identifier fields, id ignored) reuses that schema's id and stages
    /// nothing. A genuinely new schema is stored under the next free id,
    /// appends one change record, and becomes the session's last-added
    /// schema.
    pub fn add_schema(&mut self, schema: Schema) -> i32 {
        let new_schema_id = self.reuse_or_create_schema_id(&schema);
        if self.schemas_by_id.contains_key(&new_schema_id) {
            // already present, either inherited or added earlier in this session
            return new_schema_id;
        }

        let stored = if schema.schema_id == new_schema_id {
            schema
        } else {
            schema.with_schema_id(new_schema_id)
        };

        self.schemas_by_id.insert(new_schema_id, self.schemas.len());
        self.changes.push(MetadataUpdate::AddSchema {
            schema: stored.clone(),
        });
        self.schemas.push(stored);
        self.last_added_schema_id = Some(new_schema_id);

        new_schema_id
    }

    /// Adds a version, collapsing structural duplicates, and returns the
    /// resolved id.
    ///
    /// Structural comparison ignores the candidate's id and timestamp. On a
    /// duplicate the session's last-added version becomes the matched id if
    /// that version was added in this session, and is cleared otherwise. A
    /// genuinely new version must reference a known schema (with
    /// [`SchemaRef::LastAdded`] resolving to the schema most recently added
    /// in this session) and may hold at most one representation per dialect,
    /// compared case-insensitively. Its change record re-encodes the schema
    /// reference as [`SchemaRef::LastAdded`] when it points at the session's
    /// last-added schema, which keeps the record replayable against a base
    /// that assigns a different schema id.
    pub fn add_version(&mut self, version: ViewVersion) -> Result<i32> {
        let new_version_id = self.reuse_or_create_version_id(&version);
        if self.versions_by_id.contains_key(&new_version_id) {
            self.last_added_version_id = if self.version_added_in_session(new_version_id) {
                Some(new_version_id)
            } else {
                None
            };
            return Ok(new_version_id);
        }

        let schema_id = match version.schema_ref {
            SchemaRef::Id(id) => id,
            SchemaRef::LastAdded => self.last_added_schema_id.ok_or_else(|| {
                Error::invalid_state(
                    "cannot resolve last-added schema: no schema was added in this session",
                )
            })?,
        };

        if !self.schemas_by_id.contains_key(&schema_id) {
            return Err(Error::unknown_id("schema", schema_id));
        }

        check_unique_dialects(&version)?;

        let stored = version
            .with_version_id(new_version_id)
            .with_schema_ref(SchemaRef::Id(schema_id));

        let recorded = if self.last_added_schema_id == Some(schema_id) {
            stored.with_schema_ref(SchemaRef::LastAdded)
        } else {
            stored.clone()
        };

        self.versions_by_id
            .insert(new_version_id, self.versions.len());
        self.versions.push(stored);
        self.changes
            .push(MetadataUpdate::AddViewVersion { version: recorded });
        self.last_added_version_id = Some(new_version_id);

        Ok(new_version_id)
    }

    /// Makes a version current.
    ///
    /// [`VersionRef::LastAdded`] resolves to the version most recently added
    /// in this session and fails with [`Error::InvalidState`] when none was.
    /// Re-setting the already-current id is a verified no-op; an unknown id
    /// fails with [`Error::Validation`]. On success one change record is
    /// appended, in the last-added form when the target is the session's
    /// last-added version, and the single pending history entry is
    /// (re)staged: it carries the version's own timestamp when that version
    /// was added in this session, and the wall clock when a historical
    /// version is being re-activated.
    pub fn set_current_version_id(&mut self, version_ref: VersionRef) -> Result<&mut Self> {
        let new_version_id = match version_ref {
            VersionRef::Id(id) => id,
            VersionRef::LastAdded => self.last_added_version_id.ok_or_else(|| {
                Error::invalid_state(
                    "cannot resolve last-added version: no version was added in this session",
                )
            })?,
        };

        if self.current_version_id == Some(new_version_id) {
            return Ok(self);
        }

        let Some(&pos) = self.versions_by_id.get(&new_version_id) else {
            return Err(Error::unknown_id("version", new_version_id));
        };
        let version_timestamp_ms = self.versions[pos].timestamp_ms;

        self.current_version_id = Some(new_version_id);

        let recorded = if self.last_added_version_id == Some(new_version_id) {
            VersionRef::LastAdded
        } else {
            VersionRef::Id(new_version_id)
        };
        self.changes.push(MetadataUpdate::SetCurrentViewVersion {
            version_ref: recorded,
        });

        // A version added in this session becomes current "at" its own
        // creation time; re-activating a historical version is a new event
        // and gets the commit wall clock.
        let timestamp_ms = if self.version_added_in_session(new_version_id) {
            version_timestamp_ms
        } else {
            Utc::now().timestamp_millis()
        };
        self.history_entry = Some(ViewHistoryEntry {
            timestamp_ms,
            version_id: new_version_id,
        });

        Ok(self)
    }

    /// Adds a schema and a version bound to it, then makes that version
    /// current.
    ///
    /// The version's schema reference is rewritten to whatever id the schema
    /// resolves to, so callers never guess ids across the three steps.
    pub fn set_current_version(&mut self, version: ViewVersion, schema: Schema) -> Result<&mut Self> {
        check_unique_dialects(&version)?;

        let schema_id = self.add_schema(schema);
        let version_id = self.add_version(version.with_schema_ref(SchemaRef::Id(schema_id)))?;
        self.set_current_version_id(VersionRef::Id(version_id))
    }

    /// Merges the given properties into the property map.
    ///
    /// Empty input is a no-op and appends nothing; any non-empty input
    /// appends one change record, even when values are unchanged.
    pub fn set_properties(&mut self, updates: HashMap<String, String>) -> &mut Self {
        if updates.is_empty() {
            return self;
        }

        self.properties
            .extend(updates.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.changes.push(MetadataUpdate::SetProperties { updates });
        self
    }

    /// Removes the given keys from the property map.
    ///
    /// Empty input is a no-op and appends nothing.
    pub fn remove_properties(&mut self, removals: &BTreeSet<String>) -> &mut Self {
        if removals.is_empty() {
            return self;
        }

        for key in removals {
            self.properties.remove(key);
        }
        self.changes.push(MetadataUpdate::RemoveProperties {
            removals: removals.clone(),
        });
        self
    }

    /// Assigns the view's identifier.
    ///
    /// The identifier is assigned once: re-assigning the same value is a
    /// no-op, a different value fails with [`Error::InvalidState`].
    pub fn assign_uuid(&mut self, uuid: Uuid) -> Result<&mut Self> {
        match self.view_uuid {
            Some(existing) if existing != uuid => Err(Error::invalid_state(format!(
                "cannot reassign uuid: {existing} is already assigned"
            ))),
            Some(_) => Ok(self),
            None => {
                self.view_uuid = Some(uuid);
                self.changes.push(MetadataUpdate::AssignUuid { uuid });
                Ok(self)
            }
        }
    }

    /// Finalizes the session into an immutable [`ViewMetadata`].
    ///
    /// Validates that a location is set, at least one version exists, and a
    /// current version was chosen; rejects a metadata-file association
    /// combined with staged changes; appends the pending history entry; runs
    /// the dialect-drop check against the base's current version unless
    /// [`properties::REPLACE_DROP_DIALECT_ALLOWED`] permits the loss; and
    /// expires versions beyond the configured history size, always retaining
    /// the current version and everything added in this session.
    pub fn build(mut self) -> Result<ViewMetadata> {
        let Some(location) = self.location.take() else {
            return Err(Error::validation("invalid location: none was set"));
        };

        if self.versions.is_empty() {
            return Err(Error::validation("invalid view: no versions were added"));
        }

        let Some(current_version_id) = self.current_version_id else {
            return Err(Error::validation("invalid view: no current version was set"));
        };
        let Some(&current_pos) = self.versions_by_id.get(&current_version_id) else {
            let known: Vec<i32> = self.versions.iter().map(|v| v.version_id).collect();
            return Err(Error::validation(format!(
                "cannot find current version {current_version_id} among versions {known:?}"
            )));
        };

        // A metadata location claims the state matches a file exactly, and
        // files do not store changes.
        if self.metadata_location.is_some() && !self.changes.is_empty() {
            return Err(Error::validation(
                "cannot create view metadata with a metadata location and changes",
            ));
        }

        if let Some(entry) = self.history_entry.take() {
            self.history.push(entry);
        }

        if let Some(previous) = &self.previous_version {
            let allow_drop = properties::property_as_bool(
                &self.properties,
                properties::REPLACE_DROP_DIALECT_ALLOWED,
                properties::REPLACE_DROP_DIALECT_ALLOWED_DEFAULT,
            );
            if !allow_drop {
                let previous_dialects = previous.dialects();
                let current_dialects = self.versions[current_pos].dialects();
                if !current_dialects.is_superset(&previous_dialects) {
                    return Err(Error::invalid_state(format!(
                        "cannot replace view due to loss of view dialects ({}=false): \
                         previous dialects {previous_dialects:?}, new dialects {current_dialects:?}",
                        properties::REPLACE_DROP_DIALECT_ALLOWED
                    )));
                }
            }
        }

        let history_size = properties::property_as_i64(
            &self.properties,
            properties::VERSION_HISTORY_SIZE,
            properties::VERSION_HISTORY_SIZE_DEFAULT,
        )?;
        if history_size <= 0 {
            return Err(Error::validation(format!(
                "{} must be positive but was {history_size}",
                properties::VERSION_HISTORY_SIZE
            )));
        }

        // Expire old versions, but never the current version or anything
        // added in this session.
        let mut session_ids = self.session_version_ids();
        session_ids.insert(current_version_id);
        let keep = usize::try_from(history_size)
            .unwrap_or(usize::MAX)
            .max(session_ids.len());

        let (versions, history) = if self.versions.len() > keep {
            let retained = retention::expire_versions(&self.versions, keep, current_version_id);
            let retained_ids: HashSet<i32> = retained.iter().map(|v| v.version_id).collect();
            let retained_history = retention::retain_history(&self.history, &retained_ids);
            (retained, retained_history)
        } else {
            (
                std::mem::take(&mut self.versions),
                std::mem::take(&mut self.history),
            )
        };

        tracing::debug!(
            current_version_id,
            versions = versions.len(),
            changes = self.changes.len(),
            "finalized view metadata"
        );

        ViewMetadata::from_parts(MetadataParts {
            view_uuid: self.view_uuid.unwrap_or_else(Uuid::new_v4),
            format_version: self.format_version,
            location,
            schemas: self.schemas,
            versions,
            current_version_id,
            history,
            properties: self.properties,
            changes: self.changes,
            metadata_location: self.metadata_location,
        })
    }

    fn reuse_or_create_schema_id(&self, candidate: &Schema) -> i32 {
        let mut new_schema_id = INITIAL_SCHEMA_ID;
        for schema in &self.schemas {
            if schema.same_schema(candidate) {
                return schema.schema_id;
            } else if schema.schema_id >= new_schema_id {
                new_schema_id = schema.schema_id + 1;
            }
        }

        new_schema_id
    }

    fn reuse_or_create_version_id(&self, candidate: &ViewVersion) -> i32 {
        let mut new_version_id = INITIAL_VERSION_ID;
        for version in &self.versions {
            if version.same_version(candidate) {
                return version.version_id;
            } else if version.version_id >= new_version_id {
                new_version_id = version.version_id + 1;
            }
        }

        new_version_id
    }

    fn version_added_in_session(&self, version_id: i32) -> bool {
        self.changes.iter().any(|change| {
            matches!(change, MetadataUpdate::AddViewVersion { version } if version.version_id == version_id)
        })
    }

    fn session_version_ids(&self) -> HashSet<i32> {
        self.changes
            .iter()
            .filter_map(|change| match change {
                MetadataUpdate::AddViewVersion { version } => Some(version.version_id),
                _ => None,
            })
            .collect()
    }
}

impl Default for ViewMetadataBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks that a version holds at most one representation per dialect,
/// compared case-insensitively.
fn check_unique_dialects(version: &ViewVersion) -> Result<()> {
    let mut dialects = BTreeSet::new();
    for representation in &version.representations {
        let lowered = representation.dialect().to_lowercase();
        if dialects.contains(&lowered) {
            return Err(Error::validation(format!(
                "invalid view version: cannot add multiple queries for dialect {lowered}"
            )));
        }
        dialects.insert(lowered);
    }

    Ok(())
}
