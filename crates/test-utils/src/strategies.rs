//! Proptest strategies for docbatch types.
//!
//! Reusable generators for property-based testing across crates. Strategies
//! produce well-formed keys, paths, values and specs while exploring edge cases
//! through random variation.
//!
//! # Usage
//!
//! ```no_run
//! use docbatch_test_utils::strategies;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn my_property(spec in strategies::arb_spec()) {
//!         // test invariant with a randomly generated spec
//!     }
//! }
//! ```

use docbatch_types::{Category, OperationKind, OperationSpec};
use proptest::prelude::*;
use serde_json::Value;

/// Generates a document key of 1-512 characters matching `[a-z][a-z0-9:_]{0,511}`.
pub fn arb_key() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9:_]{0,511}"
}

/// Generates a dictionary path segment of 1-8 characters.
pub fn arb_segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,7}"
}

/// Generates a dotted path of 1-4 segments, each optionally followed by an
/// array index in `0..8`.
pub fn arb_path() -> impl Strategy<Value = String> {
    proptest::collection::vec((arb_segment(), proptest::option::of(0u8..8)), 1..=4).prop_map(
        |segments| {
            segments
                .into_iter()
                .map(|(name, index)| match index {
                    Some(i) => format!("{name}[{i}]"),
                    None => name,
                })
                .collect::<Vec<_>>()
                .join(".")
        },
    )
}

/// Generates a JSON scalar: null, bool, integer or short string.
pub fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[ -~]{0,16}".prop_map(Value::String),
    ]
}

/// Generates a JSON value nested up to 3 levels with at most 4 children per
/// container. Floats are excluded so values compare exactly after a round trip.
pub fn arb_json_value() -> impl Strategy<Value = Value> {
    arb_scalar().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            proptest::collection::btree_map(arb_segment(), inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

/// Generates a lookup kind.
pub fn arb_lookup_kind() -> impl Strategy<Value = OperationKind> {
    prop::sample::select(kinds_in(Category::Lookup))
}

/// Generates a mutation kind, including `remove`.
pub fn arb_mutation_kind() -> impl Strategy<Value = OperationKind> {
    prop::sample::select(kinds_in(Category::Mutate))
}

/// Generates a spec of any kind with a value exactly when the kind takes one.
pub fn arb_spec() -> impl Strategy<Value = OperationSpec> {
    (
        prop::sample::select(OperationKind::ALL.to_vec()),
        arb_path(),
        any::<bool>(),
        arb_json_value(),
        any::<bool>(),
    )
        .prop_map(|(kind, path, create, value, quiet)| {
            let value = kind.takes_value().then(|| value.to_string().into_bytes());
            let (create, _) = kind.resolve_intermediates(Some(create));
            OperationSpec::new(kind, path, create, value, quiet)
        })
}

/// Generates 1-64 specs of mixed kinds.
pub fn arb_spec_list() -> impl Strategy<Value = Vec<OperationSpec>> {
    proptest::collection::vec(arb_spec(), 1..=64)
}

fn kinds_in(category: Category) -> Vec<OperationKind> {
    OperationKind::ALL.into_iter().filter(|kind| kind.category() == category).collect()
}
