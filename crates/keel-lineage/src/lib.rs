//! # keel-lineage
//!
//! Snapshot ancestry primitives for Keel: root paths, lowest common
//! ancestors, and shortest connecting lineages over the parent-link forest
//! of a table's snapshots.
//!
//! Snapshots are resolved by id through the [`SnapshotLookup`] capability,
//! so the resolver works against any snapshot store; [`SnapshotLog`] is the
//! in-memory implementation for embedders and tests. All operations are
//! read-only and recomputed per call, which makes them safe to invoke
//! concurrently for different snapshot pairs.
//!
//! Corrupt parent links are defended against rather than assumed away: a
//! cycle on a root walk fails with [`Error::CycleDetected`] instead of
//! looping, and a parent id that no longer resolves simply ends the walk at
//! the last known snapshot.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod lineage;
pub mod snapshot;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::lineage::{lowest_common_ancestor, path_to_root, shortest_lineage};
    pub use crate::snapshot::{Snapshot, SnapshotLog, SnapshotLookup};
}

// Re-export key types at crate root
pub use error::{Error, Result};
pub use lineage::{lowest_common_ancestor, path_to_root, shortest_lineage};
pub use snapshot::{Snapshot, SnapshotLog, SnapshotLookup};
