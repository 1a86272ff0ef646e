//! Test configuration helpers.
//!
//! Provides small limits for tests that exercise validation boundaries,
//! centralizing values that would otherwise be scattered across test modules.

use docbatch_types::{BuilderConfig, ValidationConfig};

/// Returns a validation configuration with tight limits.
///
/// - `max_key_bytes`: 16
/// - `max_path_bytes`: 32
/// - `max_value_bytes`: 64
/// - `max_specs`: 4
#[must_use]
pub fn test_validation_config() -> ValidationConfig {
    ValidationConfig { max_key_bytes: 16, max_path_bytes: 32, max_value_bytes: 64, max_specs: 4 }
}

/// Returns a builder configuration using [`test_validation_config`].
#[must_use]
pub fn test_builder_config(default_quiet: bool) -> BuilderConfig {
    BuilderConfig { default_quiet, validation: test_validation_config() }
}
