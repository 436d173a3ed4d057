//! Snapshot entities and the lookup capability the resolver walks through.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One point-in-time state of a table, linked to its parent.
///
/// Snapshots form a forest: every snapshot has at most one parent, and a
/// missing parent id marks a root. The resolver never follows anything but
/// `parent_snapshot_id`, so consumers are free to attach whatever summary
/// they track for planning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unique snapshot id.
    #[serde(rename = "snapshot-id")]
    pub snapshot_id: i64,

    /// Parent snapshot id; absent for a root.
    #[serde(rename = "parent-snapshot-id", skip_serializing_if = "Option::is_none")]
    pub parent_snapshot_id: Option<i64>,

    /// When the snapshot was committed, in milliseconds.
    #[serde(rename = "timestamp-ms")]
    pub timestamp_ms: i64,

    /// Free-form operation summary.
    #[serde(default)]
    pub summary: HashMap<String, String>,
}

impl Snapshot {
    /// Creates a root snapshot with no parent.
    #[must_use]
    pub fn root(snapshot_id: i64, timestamp_ms: i64) -> Self {
        Self {
            snapshot_id,
            parent_snapshot_id: None,
            timestamp_ms,
            summary: HashMap::new(),
        }
    }

    /// Creates a snapshot linked to the given parent.
    #[must_use]
    pub fn child_of(parent_snapshot_id: i64, snapshot_id: i64, timestamp_ms: i64) -> Self {
        Self {
            snapshot_id,
            parent_snapshot_id: Some(parent_snapshot_id),
            timestamp_ms,
            summary: HashMap::new(),
        }
    }
}

/// Resolves snapshot ids to snapshots.
///
/// The resolver walks parent links through this capability; `None` for a
/// referenced parent is not an error, it makes the referencing snapshot an
/// effective root.
pub trait SnapshotLookup {
    /// Returns the snapshot with the given id, or `None` when unknown.
    fn snapshot(&self, snapshot_id: i64) -> Option<Snapshot>;
}

/// Insertion-ordered, in-memory snapshot collection.
///
/// The concrete [`SnapshotLookup`] for embedders that hold a table's
/// snapshot list in memory, and for tests building ancestry graphs.
#[derive(Debug, Clone, Default)]
pub struct SnapshotLog {
    snapshots: Vec<Snapshot>,
    by_id: HashMap<i64, usize>,
}

impl SnapshotLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a snapshot, replacing any entry with the same id in place.
    pub fn add(&mut self, snapshot: Snapshot) {
        match self.by_id.get(&snapshot.snapshot_id) {
            Some(&pos) => self.snapshots[pos] = snapshot,
            None => {
                self.by_id.insert(snapshot.snapshot_id, self.snapshots.len());
                self.snapshots.push(snapshot);
            }
        }
    }

    /// Number of snapshots in the log.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether the log holds no snapshots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Iterates snapshots in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }
}

impl FromIterator<Snapshot> for SnapshotLog {
    fn from_iter<I: IntoIterator<Item = Snapshot>>(iter: I) -> Self {
        let mut log = Self::new();
        for snapshot in iter {
            log.add(snapshot);
        }
        log
    }
}

impl SnapshotLookup for SnapshotLog {
    fn snapshot(&self, snapshot_id: i64) -> Option<Snapshot> {
        self.by_id
            .get(&snapshot_id)
            .map(|&pos| self.snapshots[pos].clone())
    }
}
