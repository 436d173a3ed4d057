//! Error types and result alias for view-metadata operations.

/// The result type used throughout `keel-view`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while staging or finalizing view metadata.
///
/// Every failure is local to the call that raised it: a failed builder call
/// leaves the builder's staged state exactly as it was before the call.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or out-of-range input (unknown ids, empty locations,
    /// duplicate dialects, downgrades, non-positive retention sizes).
    #[error("validation failed: {message}")]
    Validation {
        /// Description of what made the input invalid.
        message: String,
    },

    /// The operation is valid in isolation but violates the state of the
    /// current builder session (unresolved last-added sentinel, uuid
    /// reassignment, dialect loss without the override property).
    #[error("invalid state: {message}")]
    InvalidState {
        /// Description of the violated session invariant.
        message: String,
    },
}

impl Error {
    /// Creates a validation error with the given message.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates an invalid-state error with the given message.
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates a validation error for an id that does not resolve.
    #[must_use]
    pub fn unknown_id(entity: &'static str, id: i32) -> Self {
        Self::Validation {
            message: format!("unknown {entity} id: {id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display() {
        let err = Error::validation("location must be non-empty");
        assert!(err.to_string().contains("validation failed"));
        assert!(err.to_string().contains("location must be non-empty"));
    }

    #[test]
    fn invalid_state_display() {
        let err = Error::invalid_state("cannot reassign uuid");
        assert!(err.to_string().contains("invalid state"));
    }

    #[test]
    fn unknown_id_names_the_entity() {
        let err = Error::unknown_id("schema", 42);
        assert!(err.to_string().contains("schema"));
        assert!(err.to_string().contains("42"));
    }
}
