//! # keel-view
//!
//! Versioned view metadata for Keel: the immutable schema/version/history
//! state of a view, and the builder protocol that produces the next state
//! while recording every change for an external commit layer.
//!
//! The crate is organized around three guarantees:
//!
//! - **Structural deduplication**: submitting a schema or version that is
//!   structurally identical to an existing one (ignoring ids and timestamps)
//!   resolves to the existing id instead of growing the collections
//! - **Bounded, auditable history**: old versions expire under the configured
//!   history size without ever dropping the current version, anything added
//!   in the active session, or a history entry that would leave a gap
//! - **Replayable change log**: every successful non-no-op mutation appends
//!   exactly one serializable change record, encoded so the external commit
//!   protocol can re-apply it against a freshly loaded base under optimistic
//!   concurrency
//!
//! Reading the current state and committing new metadata files are the
//! caller's concern; this crate only computes the next immutable state.
//!
//! ## Example
//!
//! ```rust,ignore
//! use keel_view::prelude::*;
//!
//! let mut builder = ViewMetadata::builder();
//! builder.set_location("s3://warehouse/events_view")?;
//! builder.set_current_version(version, schema)?;
//! let metadata = builder.build()?;
//! let next = metadata.to_builder();
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod builder;
pub mod error;
pub mod metadata;
pub mod properties;
pub mod retention;
pub mod schema;
pub mod update;
pub mod version;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::builder::ViewMetadataBuilder;
    pub use crate::error::{Error, Result};
    pub use crate::metadata::{
        ViewMetadata, DEFAULT_VIEW_FORMAT_VERSION, SUPPORTED_VIEW_FORMAT_VERSION,
    };
    pub use crate::schema::{FieldType, Schema, SchemaField};
    pub use crate::update::MetadataUpdate;
    pub use crate::version::{
        SchemaRef, VersionRef, ViewHistoryEntry, ViewRepresentation, ViewVersion,
    };
}

// Re-export key types at crate root
pub use builder::ViewMetadataBuilder;
pub use error::{Error, Result};
pub use metadata::{ViewMetadata, DEFAULT_VIEW_FORMAT_VERSION, SUPPORTED_VIEW_FORMAT_VERSION};
pub use schema::{FieldType, Schema, SchemaField};
pub use update::MetadataUpdate;
pub use version::{SchemaRef, VersionRef, ViewHistoryEntry, ViewRepresentation, ViewVersion};
