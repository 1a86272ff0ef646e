//! Sub-document operation kinds and the builder mode state machine.
//!
//! Every kind maps to a single [`KindTraits`] row that drives validation in the
//! builder: which category it belongs to, whether it carries a value, and how
//! the create-intermediates flag is treated. The opcode numbering matches the
//! `lcb_SUBDOCOP` constants used on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a sub-document operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Read-only access to a path.
    Lookup,
    /// Modification of document content.
    Mutate,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lookup => write!(f, "lookup"),
            Self::Mutate => write!(f, "mutate"),
        }
    }
}

/// How a kind treats the create-intermediates option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntermediatesPolicy {
    /// The option has no meaning for this kind and is always recorded as off.
    NotApplicable,
    /// On unless the caller turns it off.
    DefaultOn,
    /// Always off; the target path must already exist.
    ForcedOff,
}

/// Static per-kind rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindTraits {
    /// Lookup or mutate.
    pub category: Category,
    /// Whether the operation carries a JSON value.
    pub takes_value: bool,
    /// Treatment of the create-intermediates flag.
    pub intermediates: IntermediatesPolicy,
    /// Wire opcode.
    pub opcode: u8,
}

/// A sub-document operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Fetch the value at a path.
    Get,
    /// Check whether a path exists.
    Exists,
    /// Count the elements of the array or object at a path.
    GetCount,
    /// Delete the value at a path.
    Remove,
    /// Insert a dictionary entry that must not exist yet.
    DictAdd,
    /// Insert or overwrite a dictionary entry.
    DictUpsert,
    /// Prepend to an array.
    ArrayAddFirst,
    /// Append to an array.
    ArrayAddLast,
    /// Append to an array if the value is not already present.
    ArrayAddUnique,
    /// Add a delta to a numeric value.
    Counter,
    /// Overwrite an existing value.
    Replace,
    /// Insert into an array at an index.
    ArrayInsert,
}

impl OperationKind {
    /// All kinds, lookups first.
    pub const ALL: [Self; 12] = [
        Self::Get,
        Self::Exists,
        Self::GetCount,
        Self::Remove,
        Self::DictAdd,
        Self::DictUpsert,
        Self::ArrayAddFirst,
        Self::ArrayAddLast,
        Self::ArrayAddUnique,
        Self::Counter,
        Self::Replace,
        Self::ArrayInsert,
    ];

    /// Returns the static rules for this kind.
    #[must_use]
    pub const fn traits(self) -> KindTraits {
        use Category::{Lookup, Mutate};
        use IntermediatesPolicy::{DefaultOn, ForcedOff, NotApplicable};

        let (category, takes_value, intermediates, opcode) = match self {
            Self::Get => (Lookup, false, NotApplicable, 1),
            Self::Exists => (Lookup, false, NotApplicable, 2),
            Self::GetCount => (Lookup, false, NotApplicable, 12),
            Self::Remove => (Mutate, false, NotApplicable, 11),
            Self::DictAdd => (Mutate, true, DefaultOn, 4),
            Self::DictUpsert => (Mutate, true, DefaultOn, 5),
            Self::ArrayAddFirst => (Mutate, true, DefaultOn, 6),
            Self::ArrayAddLast => (Mutate, true, DefaultOn, 7),
            Self::ArrayAddUnique => (Mutate, true, DefaultOn, 8),
            Self::Counter => (Mutate, true, DefaultOn, 10),
            Self::Replace => (Mutate, true, ForcedOff, 3),
            Self::ArrayInsert => (Mutate, true, ForcedOff, 9),
        };
        KindTraits { category, takes_value, intermediates, opcode }
    }

    /// Returns the category of this kind.
    #[must_use]
    pub const fn category(self) -> Category {
        self.traits().category
    }

    /// Returns true if this kind carries a value.
    #[must_use]
    pub const fn takes_value(self) -> bool {
        self.traits().takes_value
    }

    /// Returns the wire opcode.
    #[must_use]
    pub const fn opcode(self) -> u8 {
        self.traits().opcode
    }

    /// Looks up a kind by wire opcode.
    #[must_use]
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.opcode() == opcode)
    }

    /// Resolves the create-intermediates flag for a requested override.
    ///
    /// Returns the effective flag and whether a caller request was discarded.
    #[must_use]
    pub const fn resolve_intermediates(self, requested: Option<bool>) -> (bool, bool) {
        match self.traits().intermediates {
            IntermediatesPolicy::DefaultOn => match requested {
                Some(flag) => (flag, false),
                None => (true, false),
            },
            IntermediatesPolicy::ForcedOff | IntermediatesPolicy::NotApplicable => {
                (false, matches!(requested, Some(true)))
            },
        }
    }

    /// Returns the command name, e.g. `dict_upsert`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Exists => "exists",
            Self::GetCount => "get_count",
            Self::Remove => "remove",
            Self::DictAdd => "dict_add",
            Self::DictUpsert => "dict_upsert",
            Self::ArrayAddFirst => "array_add_first",
            Self::ArrayAddLast => "array_add_last",
            Self::ArrayAddUnique => "array_add_unique",
            Self::Counter => "counter",
            Self::Replace => "replace",
            Self::ArrayInsert => "array_insert",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Builder mode: fixed by the first appended spec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// No spec appended yet.
    #[default]
    Unset,
    /// Only lookups may be appended.
    Lookup,
    /// Only mutations may be appended.
    Mutate,
}

impl Mode {
    /// Transition for appending a spec of `category`.
    ///
    /// # Errors
    ///
    /// Returns the current mode unchanged if it is populated with the other
    /// category.
    pub const fn admit(self, category: Category) -> Result<Self, Self> {
        match (self, category) {
            (Self::Unset | Self::Lookup, Category::Lookup) => Ok(Self::Lookup),
            (Self::Unset | Self::Mutate, Category::Mutate) => Ok(Self::Mutate),
            (current, _) => Err(current),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "unset"),
            Self::Lookup => write!(f, "lookup"),
            Self::Mutate => write!(f, "mutate"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn lookup_kinds_take_no_value() {
        for kind in [OperationKind::Get, OperationKind::Exists, OperationKind::GetCount] {
            assert_eq!(kind.category(), Category::Lookup);
            assert!(!kind.takes_value());
        }
    }

    #[test]
    fn remove_is_the_only_valueless_mutation() {
        let valueless: Vec<_> = OperationKind::ALL
            .into_iter()
            .filter(|k| k.category() == Category::Mutate && !k.takes_value())
            .collect();
        assert_eq!(valueless, vec![OperationKind::Remove]);
    }

    #[test]
    fn opcodes_are_unique_and_roundtrip() {
        for kind in OperationKind::ALL {
            assert_eq!(OperationKind::from_opcode(kind.opcode()), Some(kind));
        }
        let mut codes: Vec<u8> = OperationKind::ALL.iter().map(|k| k.opcode()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), OperationKind::ALL.len());
    }

    #[test]
    fn unknown_opcode_is_none() {
        assert_eq!(OperationKind::from_opcode(0), None);
        assert_eq!(OperationKind::from_opcode(13), None);
        assert_eq!(OperationKind::from_opcode(0xff), None);
    }

    #[test]
    fn default_on_kinds_honour_override() {
        assert_eq!(OperationKind::DictUpsert.resolve_intermediates(None), (true, false));
        assert_eq!(OperationKind::Counter.resolve_intermediates(Some(false)), (false, false));
        assert_eq!(OperationKind::ArrayAddLast.resolve_intermediates(Some(true)), (true, false));
    }

    #[test]
    fn forced_off_kinds_discard_override() {
        for kind in [OperationKind::Replace, OperationKind::ArrayInsert] {
            assert_eq!(kind.resolve_intermediates(None), (false, false));
            assert_eq!(kind.resolve_intermediates(Some(false)), (false, false));
            assert_eq!(kind.resolve_intermediates(Some(true)), (false, true));
        }
    }

    #[test]
    fn mode_first_append_fixes_mode() {
        assert_eq!(Mode::Unset.admit(Category::Lookup), Ok(Mode::Lookup));
        assert_eq!(Mode::Unset.admit(Category::Mutate), Ok(Mode::Mutate));
    }

    #[test]
    fn mode_rejects_opposite_category() {
        assert_eq!(Mode::Lookup.admit(Category::Mutate), Err(Mode::Lookup));
        assert_eq!(Mode::Mutate.admit(Category::Lookup), Err(Mode::Mutate));
        assert_eq!(Mode::Lookup.admit(Category::Lookup), Ok(Mode::Lookup));
    }

    #[test]
    fn display_uses_command_names() {
        assert_eq!(OperationKind::ArrayAddUnique.to_string(), "array_add_unique");
        assert_eq!(Mode::Mutate.to_string(), "mutate");
    }
}
