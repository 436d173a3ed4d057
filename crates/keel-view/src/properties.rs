//! Recognized view properties and typed accessors.
//!
//! Properties are free-form string pairs carried on the metadata; the keys
//! below are the ones this crate consults at finalize time. Typed access
//! goes through the helpers here so parse failures surface as validation
//! errors instead of silent fallbacks.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Number of versions and history entries to retain, consulted at finalize.
pub const VERSION_HISTORY_SIZE: &str = "version.history.num-entries";

/// Default retention size when [`VERSION_HISTORY_SIZE`] is unset.
pub const VERSION_HISTORY_SIZE_DEFAULT: i64 = 10;

/// Whether replacing the current version may drop a SQL dialect the previous
/// current version supported.
pub const REPLACE_DROP_DIALECT_ALLOWED: &str = "replace.drop-dialect.allowed";

/// Default for [`REPLACE_DROP_DIALECT_ALLOWED`].
pub const REPLACE_DROP_DIALECT_ALLOWED_DEFAULT: bool = false;

/// Reads an integer property, falling back to `default` when unset.
///
/// # Errors
///
/// Returns a validation error when the value is present but unparsable.
pub fn property_as_i64(
    properties: &HashMap<String, String>,
    key: &str,
    default: i64,
) -> Result<i64> {
    match properties.get(key) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| Error::Validation {
            message: format!("{key} must be an integer but was '{value}'"),
        }),
    }
}

/// Reads a boolean property, falling back to `default` when unset or when
/// the value is not exactly `true` or `false`.
#[must_use]
pub fn property_as_bool(properties: &HashMap<String, String>, key: &str, default: bool) -> bool {
    properties
        .get(key)
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
