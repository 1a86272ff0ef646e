//! Core types for docbatch.
//!
//! This crate provides the foundational types shared by the builder and its
//! executors:
//! - Operation kinds and the builder mode state machine
//! - Operation specs and their fixed-layout compiled form
//! - JSON value encoding
//! - Append-time validation and configuration
//! - Error types using snafu

pub mod codec;
pub mod config;
pub mod kind;
pub mod spec;
pub mod validation;
pub mod value;

// Re-export commonly used types at crate root
pub use codec::{CodecError, CompiledBatch, SpecRecord, SpecView};
pub use config::{BuilderConfig, ConfigError, ValidationConfig};
pub use kind::{Category, IntermediatesPolicy, KindTraits, Mode, OperationKind};
pub use spec::OperationSpec;
pub use validation::ValidationError;
pub use value::{ValueError, encode_value};
