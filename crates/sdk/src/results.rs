//! Per-spec results and their classification.
//!
//! Executors return one [`SpecResult`] per spec, in append order. The quiet
//! flags retained by the builder decide whether a path-not-found outcome is an
//! error or plain absence.

use std::fmt;

use serde_json::Value;

use crate::error::{Result, SdkError};

/// Protocol status of a single spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubdocStatus {
    /// Operation succeeded.
    Success,
    /// Document does not exist.
    DocumentNotFound,
    /// Path does not exist.
    PathNotFound,
    /// Path traverses a value of the wrong type.
    PathMismatch,
    /// Path syntax is invalid.
    PathInvalid,
    /// Path is too long.
    PathTooBig,
    /// Document nesting is too deep.
    DocumentTooDeep,
    /// Value cannot be inserted at the path.
    ValueCannotInsert,
    /// Document is not JSON.
    DocumentNotJson,
    /// Counter result out of range.
    NumberRange,
    /// Counter delta is invalid.
    DeltaInvalid,
    /// Path already exists.
    PathExists,
    /// Inserting the value would make the document too deep.
    ValueTooDeep,
    /// Any other status code.
    Other(u16),
}

impl SubdocStatus {
    /// Protocol status code.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Success => 0x00,
            Self::DocumentNotFound => 0x01,
            Self::PathNotFound => 0xc0,
            Self::PathMismatch => 0xc1,
            Self::PathInvalid => 0xc2,
            Self::PathTooBig => 0xc3,
            Self::DocumentTooDeep => 0xc4,
            Self::ValueCannotInsert => 0xc5,
            Self::DocumentNotJson => 0xc6,
            Self::NumberRange => 0xc7,
            Self::DeltaInvalid => 0xc8,
            Self::PathExists => 0xc9,
            Self::ValueTooDeep => 0xca,
            Self::Other(code) => code,
        }
    }

    /// Maps a protocol status code.
    #[must_use]
    pub const fn from_code(code: u16) -> Self {
        match code {
            0x00 => Self::Success,
            0x01 => Self::DocumentNotFound,
            0xc0 => Self::PathNotFound,
            0xc1 => Self::PathMismatch,
            0xc2 => Self::PathInvalid,
            0xc3 => Self::PathTooBig,
            0xc4 => Self::DocumentTooDeep,
            0xc5 => Self::ValueCannotInsert,
            0xc6 => Self::DocumentNotJson,
            0xc7 => Self::NumberRange,
            0xc8 => Self::DeltaInvalid,
            0xc9 => Self::PathExists,
            0xca => Self::ValueTooDeep,
            other => Self::Other(other),
        }
    }

    /// Returns true for [`SubdocStatus::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    fn label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::DocumentNotFound => "document not found",
            Self::PathNotFound => "path not found",
            Self::PathMismatch => "path mismatch",
            Self::PathInvalid => "path invalid",
            Self::PathTooBig => "path too big",
            Self::DocumentTooDeep => "document too deep",
            Self::ValueCannotInsert => "value cannot insert",
            Self::DocumentNotJson => "document not json",
            Self::NumberRange => "number out of range",
            Self::DeltaInvalid => "delta invalid",
            Self::PathExists => "path exists",
            Self::ValueTooDeep => "value too deep",
            Self::Other(_) => "status",
        }
    }
}

impl fmt::Display for SubdocStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#04x})", self.label(), self.code())
    }
}

/// Raw result for one spec as reported by an executor.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecResult {
    /// Protocol status.
    pub status: SubdocStatus,
    /// Returned value for `get`, `get_count` and `counter`.
    pub value: Option<Value>,
}

impl SpecResult {
    /// Successful result with an optional value.
    #[must_use]
    pub fn success(value: Option<Value>) -> Self {
        Self { status: SubdocStatus::Success, value }
    }

    /// Result carrying only a status.
    #[must_use]
    pub fn status(status: SubdocStatus) -> Self {
        Self { status, value: None }
    }
}

/// Classified outcome of one spec.
#[derive(Debug, Clone, PartialEq)]
pub enum SpecOutcome {
    /// The spec succeeded, with the value the store returned, if any.
    Found(Option<Value>),
    /// The path was not found and the spec was quiet.
    Absent,
}

impl SpecOutcome {
    /// Returns true if the spec succeeded.
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Returned value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Found(value) => value.as_ref(),
            Self::Absent => None,
        }
    }
}

/// Classifies executor results using per-spec quiet flags.
///
/// # Errors
///
/// Returns `SdkError::ResultCount` if the lengths differ and
/// `SdkError::PathFailure` for the first failure not covered by a quiet flag.
pub fn interpret(results: Vec<SpecResult>, quiet_flags: &[bool]) -> Result<Vec<SpecOutcome>> {
    if results.len() != quiet_flags.len() {
        return Err(SdkError::ResultCount { expected: quiet_flags.len(), actual: results.len() });
    }
    results
        .into_iter()
        .zip(quiet_flags)
        .enumerate()
        .map(|(index, (result, &quiet))| match result.status {
            SubdocStatus::Success => Ok(SpecOutcome::Found(result.value)),
            SubdocStatus::PathNotFound if quiet => Ok(SpecOutcome::Absent),
            status => Err(SdkError::PathFailure { index, status }),
        })
        .collect()
}
