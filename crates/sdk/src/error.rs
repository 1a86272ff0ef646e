//! SDK error types.
//!
//! Provides a two-tier error model:
//! - **Builder errors**: raised synchronously while specs are appended, compiled or executed
//! - **Executor errors**: transport, CAS and per-path failures reported by an executor
//!
//! Per-path not-found outcomes are not errors at this layer; they travel inside
//! [`SpecResult`](crate::SpecResult) and are classified with the quiet flags.

use docbatch_types::{Category, CodecError, Mode, OperationKind, ValueError};
use snafu::Snafu;

use crate::results::SubdocStatus;

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, SdkError>;

/// SDK error types with context-rich error messages.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SdkError {
    /// Document key is empty or too long.
    #[snafu(display("Invalid document key {key:?}: {message}"))]
    InvalidKey {
        /// The rejected key.
        key: String,
        /// Violated constraint.
        message: String,
    },

    /// Path is empty or too long.
    #[snafu(display("Invalid path for {kind}: {message}"))]
    InvalidPath {
        /// Kind being appended.
        kind: OperationKind,
        /// Violated constraint.
        message: String,
    },

    /// Operation category does not match the builder's mode.
    #[snafu(display("Unable to perform {kind} as mode is currently {mode}"))]
    ModeConflict {
        /// Kind being appended.
        kind: OperationKind,
        /// Mode the builder is fixed to.
        mode: Mode,
    },

    /// A lookup kind was passed to a mutate entry point, or the reverse.
    #[snafu(display("{kind} is not a {expected} operation"))]
    WrongCategory {
        /// Kind passed in.
        kind: OperationKind,
        /// Category the entry point accepts.
        expected: Category,
    },

    /// A value was supplied to a valueless kind, or omitted for a value kind.
    #[snafu(display(
        "{kind} {}",
        if *takes_value { "requires a value" } else { "does not take a value" }
    ))]
    ValueArity {
        /// Kind being appended.
        kind: OperationKind,
        /// Whether the kind takes a value.
        takes_value: bool,
    },

    /// Append-time limit exceeded.
    #[snafu(display("Validation error: {message}"))]
    Validation {
        /// Violated constraint.
        message: String,
    },

    /// Value could not be encoded as JSON.
    #[snafu(display("Cannot encode value for {kind}: {source}"))]
    Encoding {
        /// Kind being appended.
        kind: OperationKind,
        /// Underlying encoding error.
        source: ValueError,
    },

    /// Batch could not be packed or read back.
    #[snafu(display("Batch codec error: {source}"))]
    Codec {
        /// Underlying codec error.
        source: CodecError,
    },

    /// Spec appended after the batch was compiled.
    #[snafu(display("Unable to append {kind}: batch already compiled"))]
    AlreadyCompiled {
        /// Kind being appended.
        kind: OperationKind,
    },

    /// Compiled buffer requested after release.
    #[snafu(display("Batch memory already released"))]
    Released,

    /// `execute` called after the executor was consumed.
    #[snafu(display("Request already executed"))]
    AlreadyExecuted,

    /// A spec failed and was not covered by its quiet flag.
    #[snafu(display("Spec {index} failed with {status}"))]
    PathFailure {
        /// Position of the failing spec.
        index: usize,
        /// Status reported for it.
        status: SubdocStatus,
    },

    /// Executor returned a result list of the wrong length.
    #[snafu(display("Expected {expected} spec results, got {actual}"))]
    ResultCount {
        /// Number of specs sent.
        expected: usize,
        /// Number of results received.
        actual: usize,
    },

    /// Design document listing could not be parsed.
    #[snafu(display("Design document listing error: {message}"))]
    DesignDocs {
        /// Parse failure description.
        message: String,
    },

    /// Executor transport failure.
    #[snafu(display("Transport error: {message}"))]
    Transport {
        /// Error description.
        message: String,
    },

    /// Document CAS did not match the supplied value.
    #[snafu(display("CAS mismatch on {key:?}: expected {expected}, found {actual}"))]
    CasMismatch {
        /// Document key.
        key: String,
        /// CAS supplied by the caller.
        expected: u64,
        /// CAS held by the store.
        actual: u64,
    },

    /// Target document does not exist.
    #[snafu(display("Document {key:?} not found"))]
    DocumentNotFound {
        /// Document key.
        key: String,
    },
}

impl SdkError {
    /// Returns true if the error is transient and the batch may be resubmitted.
    ///
    /// Only transport failures qualify; every builder error is deterministic.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn mode_conflict_names_kind_and_mode() {
        let err = SdkError::ModeConflict { kind: OperationKind::DictUpsert, mode: Mode::Lookup };
        assert_eq!(err.to_string(), "Unable to perform dict_upsert as mode is currently lookup");
    }

    #[test]
    fn value_arity_messages() {
        let err = SdkError::ValueArity { kind: OperationKind::Remove, takes_value: false };
        assert_eq!(err.to_string(), "remove does not take a value");
        let err = SdkError::ValueArity { kind: OperationKind::Counter, takes_value: true };
        assert_eq!(err.to_string(), "counter requires a value");
    }

    #[test]
    fn path_failure_shows_status() {
        let err = SdkError::PathFailure { index: 2, status: SubdocStatus::PathMismatch };
        assert_eq!(err.to_string(), "Spec 2 failed with path mismatch (0xc1)");
    }

    #[test]
    fn transport_is_retryable() {
        assert!(SdkError::Transport { message: "reset".to_owned() }.is_retryable());
    }

    #[test]
    fn builder_errors_not_retryable() {
        assert!(!SdkError::AlreadyExecuted.is_retryable());
        assert!(!SdkError::Released.is_retryable());
        assert!(
            !SdkError::InvalidKey { key: String::new(), message: "empty".to_owned() }
                .is_retryable()
        );
        assert!(!SdkError::DocumentNotFound { key: "k".to_owned() }.is_retryable());
    }
}
