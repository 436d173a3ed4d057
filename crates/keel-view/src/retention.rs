//! Version expiry and history filtering applied at finalize.
//!
//! Version ids are assigned monotonically, so "most recent" is "highest id".
//! Expiry keeps the current version unconditionally, then the highest ids
//! until the keep count is reached. History is only meaningful as an
//! unbroken chain back from the current version: the first entry referencing
//! an expired version invalidates everything accumulated before it in log
//! order, not just that entry.

use std::collections::{HashMap, HashSet};

use crate::version::{ViewHistoryEntry, ViewVersion};

/// Selects the versions to retain under a keep count.
///
/// The current version is always retained and listed first; the remaining
/// slots are filled with the highest version ids in descending order. The
/// caller decides whether expiry applies at all (it is skipped when the
/// version count does not exceed the keep count).
#[must_use]
pub fn expire_versions(
    versions: &[ViewVersion],
    keep: usize,
    current_version_id: i32,
) -> Vec<ViewVersion> {
    let by_id: HashMap<i32, &ViewVersion> =
        versions.iter().map(|v| (v.version_id, v)).collect();

    let mut ids: Vec<i32> = by_id.keys().copied().collect();
    ids.sort_unstable_by(|a, b| b.cmp(a));

    let mut retained: Vec<ViewVersion> = Vec::with_capacity(keep);
    if let Some(current) = by_id.get(&current_version_id) {
        retained.push((*current).clone());
    }

    for id in ids.into_iter().take(keep) {
        if retained.len() == keep {
            break;
        }
        if id != current_version_id {
            if let Some(version) = by_id.get(&id) {
                retained.push((*version).clone());
            }
        }
    }

    tracing::debug!(
        expired = versions.len().saturating_sub(retained.len()),
        keep,
        current_version_id,
        "expired view versions"
    );

    retained
}

/// Filters the history log against the retained version ids.
///
/// Walks entries in log order keeping those whose version id is still
/// retained; the first entry referencing an expired id clears all history
/// accumulated so far, because a gap breaks the chain back from the current
/// version.
#[must_use]
pub fn retain_history(
    history: &[ViewHistoryEntry],
    retained_ids: &HashSet<i32>,
) -> Vec<ViewHistoryEntry> {
    let mut retained = Vec::new();
    for entry in history {
        if retained_ids.contains(&entry.version_id) {
            retained.push(*entry);
        } else {
            retained.clear();
        }
    }

    retained
}
