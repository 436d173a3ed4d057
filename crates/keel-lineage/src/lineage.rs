//! Ancestry resolution over the snapshot parent-link forest.
//!
//! All three operations are pure reads: they recompute on every call and
//! never cache, so they stay correct under any external mutation of the
//! snapshot log between calls.

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::snapshot::{Snapshot, SnapshotLookup};

/// Walks from a snapshot to its root, inclusive of both endpoints.
///
/// Each step resolves the parent id through `lookup`; a parent that does not
/// resolve ends the walk at the last resolved snapshot, treating it as an
/// effective root. Revisiting an id already on the path means the parent
/// links are corrupt and fails with [`Error::CycleDetected`].
pub fn path_to_root(lookup: &impl SnapshotLookup, start: &Snapshot) -> Result<Vec<Snapshot>> {
    let mut path: Vec<Snapshot> = Vec::new();
    let mut visited = HashSet::new();

    let mut next = Some(start.clone());
    while let Some(current) = next {
        if !visited.insert(current.snapshot_id) {
            let mut cycle: Vec<i64> = path.iter().map(|s| s.snapshot_id).collect();
            cycle.push(current.snapshot_id);
            return Err(Error::CycleDetected { cycle });
        }

        next = current
            .parent_snapshot_id
            .and_then(|parent_id| lookup.snapshot(parent_id));
        path.push(current);
    }

    Ok(path)
}

/// Returns the closest snapshot present on both root paths.
///
/// Scans `path_b` in order and returns the first snapshot whose id appears
/// anywhere on `path_a`, or `None` when the lineages are unrelated. The
/// returned reference points into `path_a`.
#[must_use]
pub fn lowest_common_ancestor<'a>(
    path_a: &'a [Snapshot],
    path_b: &[Snapshot],
) -> Option<&'a Snapshot> {
    let positions: HashMap<i64, usize> = path_a
        .iter()
        .enumerate()
        .map(|(pos, snapshot)| (snapshot.snapshot_id, pos))
        .collect();

    path_b
        .iter()
        .find_map(|snapshot| positions.get(&snapshot.snapshot_id))
        .map(|&pos| &path_a[pos])
}

/// Returns the shortest path connecting two snapshots through their lowest
/// common ancestor.
///
/// The result starts at `from`, ascends parent links to the common ancestor,
/// then descends to `to`; the ancestor appears exactly once. Unrelated
/// lineages fail with [`Error::NoCommonAncestor`] (a valid state of the
/// world, surfaced as an explicit outcome rather than an empty path).
pub fn shortest_lineage(
    lookup: &impl SnapshotLookup,
    from: &Snapshot,
    to: &Snapshot,
) -> Result<Vec<Snapshot>> {
    let path_from = path_to_root(lookup, from)?;
    let path_to = path_to_root(lookup, to)?;

    let Some(ancestor) = lowest_common_ancestor(&path_from, &path_to) else {
        return Err(Error::NoCommonAncestor {
            from: from.snapshot_id,
            to: to.snapshot_id,
        });
    };
    let ancestor_id = ancestor.snapshot_id;

    let mut lineage: Vec<Snapshot> = path_from
        .iter()
        .take_while(|snapshot| snapshot.snapshot_id != ancestor_id)
        .cloned()
        .collect();
    lineage.push(ancestor.clone());

    let mut descent: Vec<Snapshot> = path_to
        .iter()
        .take_while(|snapshot| snapshot.snapshot_id != ancestor_id)
        .cloned()
        .collect();
    descent.reverse();
    lineage.extend(descent);

    tracing::debug!(
        from = from.snapshot_id,
        to = to.snapshot_id,
        ancestor = ancestor_id,
        length = lineage.len(),
        "resolved snapshot lineage"
    );

    Ok(lineage)
}
