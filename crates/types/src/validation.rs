//! Append-time validation for document keys, paths, values and batch size.
//!
//! Paths are opaque to this layer: only emptiness and length are checked, the
//! store parses the syntax.

use std::fmt;

use crate::config::ValidationConfig;

/// Validation error with structured context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// Description of the violated constraint.
    pub constraint: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.constraint)
    }
}

impl std::error::Error for ValidationError {}

fn check_len(
    field: &str,
    len: usize,
    max: usize,
    allow_empty: bool,
) -> Result<(), ValidationError> {
    if len == 0 && !allow_empty {
        return Err(ValidationError {
            field: field.to_string(),
            constraint: "must not be empty".to_string(),
        });
    }
    if len > max {
        return Err(ValidationError {
            field: field.to_string(),
            constraint: format!("length {len} bytes exceeds maximum {max} bytes"),
        });
    }
    Ok(())
}

/// Validates a document key.
///
/// # Errors
///
/// Returns [`ValidationError`] if the key is empty or exceeds `max_key_bytes`.
pub fn validate_key(key: &str, config: &ValidationConfig) -> Result<(), ValidationError> {
    check_len("key", key.len(), config.max_key_bytes, false)
}

/// Validates a sub-document path.
///
/// # Errors
///
/// Returns [`ValidationError`] if the path is empty or exceeds `max_path_bytes`.
pub fn validate_path(path: &[u8], config: &ValidationConfig) -> Result<(), ValidationError> {
    check_len("path", path.len(), config.max_path_bytes, false)
}

/// Validates an encoded value.
///
/// # Errors
///
/// Returns [`ValidationError`] if the value exceeds `max_value_bytes`.
pub fn validate_value(value: &[u8], config: &ValidationConfig) -> Result<(), ValidationError> {
    check_len("value", value.len(), config.max_value_bytes, true)
}

/// Validates that one more spec fits in the batch.
///
/// # Errors
///
/// Returns [`ValidationError`] if `current` already equals `max_specs`.
pub fn validate_spec_count(
    current: usize,
    config: &ValidationConfig,
) -> Result<(), ValidationError> {
    if current >= config.max_specs {
        return Err(ValidationError {
            field: "specs".to_string(),
            constraint: format!("batch already holds the maximum of {} specs", config.max_specs),
        });
    }
    Ok(())
}
