//! Error types and result alias for lineage operations.

/// The result type used throughout `keel-lineage`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving snapshot ancestry.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A cycle was detected while following parent links.
    ///
    /// Well-formed snapshot logs are forests; a repeated id on a root walk
    /// means the parent links are corrupt.
    #[error("cycle detected in snapshot lineage: {cycle:?}")]
    CycleDetected {
        /// The walked snapshot ids, ending at the first repeated id.
        cycle: Vec<i64>,
    },

    /// The two snapshots belong to unrelated lineages.
    #[error("no common ancestor between snapshots {from} and {to}")]
    NoCommonAncestor {
        /// Id of the snapshot the path starts from.
        from: i64,
        /// Id of the snapshot the path leads to.
        to: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_display_names_the_walked_ids() {
        let err = Error::CycleDetected {
            cycle: vec![3, 2, 3],
        };
        assert!(err.to_string().contains("cycle detected"));
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn no_common_ancestor_display_names_both_snapshots() {
        let err = Error::NoCommonAncestor { from: 10, to: 20 };
        assert!(err.to_string().contains("10"));
        assert!(err.to_string().contains("20"));
    }
}
