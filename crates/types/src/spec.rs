//! A single entry in a sub-document batch.

use serde::{Deserialize, Serialize};

use crate::kind::OperationKind;

/// One path-scoped operation, with its path and value already encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSpec {
    kind: OperationKind,
    path: Vec<u8>,
    create_intermediates: bool,
    value: Option<Vec<u8>>,
    quiet: bool,
}

impl OperationSpec {
    /// Creates a spec. Callers are expected to have resolved the
    /// create-intermediates flag and value presence against the kind's rules.
    pub fn new(
        kind: OperationKind,
        path: impl Into<Vec<u8>>,
        create_intermediates: bool,
        value: Option<Vec<u8>>,
        quiet: bool,
    ) -> Self {
        Self { kind, path: path.into(), create_intermediates, value, quiet }
    }

    /// The operation kind.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Path bytes.
    #[must_use]
    pub fn path(&self) -> &[u8] {
        &self.path
    }

    /// Whether missing parents are created.
    #[must_use]
    pub fn create_intermediates(&self) -> bool {
        self.create_intermediates
    }

    /// Encoded JSON value, if the kind carries one.
    #[must_use]
    pub fn value(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }

    /// Whether path-not-found is treated as absence rather than an error.
    #[must_use]
    pub fn quiet(&self) -> bool {
        self.quiet
    }

    /// Bytes this spec contributes to the batch arena.
    #[must_use]
    pub fn arena_bytes(&self) -> usize {
        self.path.len() + self.value.as_ref().map_or(0, Vec::len)
    }
}
