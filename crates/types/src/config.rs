//! Configuration types for docbatch.
//!
//! Config structs are deserialisable with serde and constructed in code via
//! fallible bon builders. Post-deserialisation validation is available via the
//! `validate` method on each struct.

use serde::{Deserialize, Serialize};
use snafu::Snafu;

/// Configuration validation error.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    /// A configuration value is invalid.
    #[snafu(display("invalid config: {message}"))]
    Validation {
        /// Description of the validation failure.
        message: String,
    },
}

/// No limit. Requests only reject empty keys and paths unless a caller opts in
/// to tighter limits.
const UNBOUNDED: usize = usize::MAX;

/// Default maximum document key size in bytes.
const fn default_max_key_bytes() -> usize {
    UNBOUNDED
}

/// Default maximum sub-document path size in bytes.
const fn default_max_path_bytes() -> usize {
    UNBOUNDED
}

/// Default maximum encoded value size in bytes.
const fn default_max_value_bytes() -> usize {
    UNBOUNDED
}

/// Default maximum number of specs in one batch.
const fn default_max_specs() -> usize {
    UNBOUNDED
}

/// Limits applied while specs are appended to a builder.
///
/// # Example
///
/// ```no_run
/// # use docbatch_types::config::ValidationConfig;
/// let config = ValidationConfig::builder()
///     .max_path_bytes(512)
///     .max_specs(8)
///     .build()
///     .expect("valid validation config");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Maximum document key size in bytes. Must be >= 1. Default: unbounded.
    #[serde(default = "default_max_key_bytes")]
    pub max_key_bytes: usize,
    /// Maximum path size in bytes. Must be >= 1. Default: unbounded.
    #[serde(default = "default_max_path_bytes")]
    pub max_path_bytes: usize,
    /// Maximum encoded value size in bytes. Must be >= 1. Default: unbounded.
    #[serde(default = "default_max_value_bytes")]
    pub max_value_bytes: usize,
    /// Maximum number of specs per batch. Must be >= 1. Default: unbounded.
    #[serde(default = "default_max_specs")]
    pub max_specs: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_key_bytes: default_max_key_bytes(),
            max_path_bytes: default_max_path_bytes(),
            max_value_bytes: default_max_value_bytes(),
            max_specs: default_max_specs(),
        }
    }
}

#[bon::bon]
impl ValidationConfig {
    /// Creates a new validation configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any limit is zero.
    #[builder]
    pub fn new(
        #[builder(default = default_max_key_bytes())] max_key_bytes: usize,
        #[builder(default = default_max_path_bytes())] max_path_bytes: usize,
        #[builder(default = default_max_value_bytes())] max_value_bytes: usize,
        #[builder(default = default_max_specs())] max_specs: usize,
    ) -> Result<Self, ConfigError> {
        let config = Self { max_key_bytes, max_path_bytes, max_value_bytes, max_specs };
        config.validate()?;
        Ok(config)
    }
}

impl ValidationConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any limit is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("max_key_bytes", self.max_key_bytes),
            ("max_path_bytes", self.max_path_bytes),
            ("max_value_bytes", self.max_value_bytes),
            ("max_specs", self.max_specs),
        ] {
            if value == 0 {
                return Err(ConfigError::Validation { message: format!("{name} must be >= 1") });
            }
        }
        Ok(())
    }
}

/// Builder-level settings shared by every request a client creates.
///
/// # Example
///
/// ```no_run
/// # use docbatch_types::config::BuilderConfig;
/// let config = BuilderConfig::builder().default_quiet(true).build().expect("valid config");
/// assert!(config.default_quiet);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Quiet setting for lookups and removals that do not override it.
    #[serde(default)]
    pub default_quiet: bool,
    /// Append-time limits.
    #[serde(default)]
    pub validation: ValidationConfig,
}

#[bon::bon]
impl BuilderConfig {
    /// Creates a builder configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the validation limits are invalid.
    #[builder]
    pub fn new(
        #[builder(default)] default_quiet: bool,
        #[builder(default)] validation: ValidationConfig,
    ) -> Result<Self, ConfigError> {
        validation.validate()?;
        Ok(Self { default_quiet, validation })
    }
}
