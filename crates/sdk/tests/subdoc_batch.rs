//! Integration tests for sub-document batches built through the public API
//! and executed against `MockBucket`.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::disallowed_methods)]

use docbatch_sdk::{
    ExecOptions, Mode, OperationKind, SdkError, SpecOptions, SpecOutcome, SubdocExecutor,
    SubdocRequest, SubdocStatus, mock::MockBucket,
};
use docbatch_test_utils::{strategies, test_builder_config};
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Spec ordering and encoding
// ============================================================================

#[test]
fn lookups_keep_call_order_and_quiet_flags() {
    let bucket = MockBucket::new("default");
    let mut request = bucket.subdoc("doc", false).unwrap();
    request.get("a.b").unwrap().get_with("a.c", SpecOptions::default().with_quiet(true)).unwrap();

    let specs = request.specs().unwrap();
    assert_eq!(specs.len(), 2);
    assert_eq!((specs[0].kind(), specs[0].path(), specs[0].quiet()), (OperationKind::Get, &b"a.b"[..], false));
    assert_eq!((specs[1].kind(), specs[1].path(), specs[1].quiet()), (OperationKind::Get, &b"a.c"[..], true));
    assert_eq!(request.mode(), Mode::Lookup);
}

#[test]
fn upsert_then_remove_share_mutate_mode() {
    let bucket = MockBucket::new("default");
    let mut request = bucket.subdoc("doc", false).unwrap();
    request.dict_upsert("x", &42).unwrap().remove("y").unwrap();

    let specs = request.specs().unwrap();
    assert_eq!(specs[0].kind(), OperationKind::DictUpsert);
    assert_eq!(specs[0].value(), Some(&b"42"[..]));
    assert!(specs[0].create_intermediates());
    assert_eq!(specs[1].kind(), OperationKind::Remove);
    assert_eq!(specs[1].value(), None);
    assert!(!specs[1].create_intermediates());
    assert_eq!(request.mode(), Mode::Mutate);
}

#[test]
fn mutation_after_lookup_is_mode_conflict() {
    let bucket = MockBucket::new("default");
    let mut request = bucket.subdoc("doc", false).unwrap();
    request.get("a").unwrap();
    let err = request.dict_upsert("b", &1).unwrap_err();
    assert!(matches!(err, SdkError::ModeConflict { .. }));
    assert_eq!(err.to_string(), "Unable to perform dict_upsert as mode is currently lookup");
    assert_eq!(request.len(), 1);
}

// ============================================================================
// Configured limits
// ============================================================================

#[test]
fn configured_limits_apply() {
    let bucket = MockBucket::new("default");
    let config = test_builder_config(true);

    let err = SubdocRequest::from_config("k".repeat(17), &config, &bucket).unwrap_err();
    assert!(matches!(err, SdkError::InvalidKey { .. }));

    let mut request = SubdocRequest::from_config("doc", &config, &bucket).unwrap();
    assert!(request.default_quiet());
    for i in 0..4 {
        request.get(format!("f{i}")).unwrap();
    }
    assert!(matches!(request.get("f4").unwrap_err(), SdkError::Validation { .. }));
    assert_eq!(request.len(), 4);
    assert!(request.quiet_flags().iter().all(|&q| q));
}

#[tokio::test]
async fn default_request_has_no_size_or_count_limits() {
    let bucket = MockBucket::new("default");
    let key = format!("user:{}", "x".repeat(600));
    let fields: serde_json::Map<String, serde_json::Value> =
        (0..40).map(|i| (format!("f{i}"), json!(i))).collect();
    bucket.set_document(key.clone(), serde_json::Value::Object(fields));

    let mut request = bucket.subdoc(key, false).unwrap();
    for i in 0..40 {
        request.get(format!("f{i}")).unwrap();
    }
    assert_eq!(request.len(), 40);
    let results = request.execute(ExecOptions::default()).await.unwrap();
    assert_eq!(results.len(), 40);
    assert_eq!(results[39].value, Some(json!(39)));
    assert_eq!(bucket.last_batch().unwrap().count(), 40);
}

// ============================================================================
// Execution through the mock bucket
// ============================================================================

#[tokio::test]
async fn profile_update_round_trip() {
    let bucket = MockBucket::new("default");
    bucket.set_document("user:1", json!({"name": "alice", "logins": 0, "session": "abc"}));

    let mut update = bucket.subdoc("user:1", false).unwrap();
    update
        .dict_upsert("profile.email", "alice@example.com")
        .unwrap()
        .counter("logins", &1)
        .unwrap()
        .remove("session")
        .unwrap()
        .array_add_last("history", &json!({"event": "login"}))
        .unwrap();
    let results = update.execute(ExecOptions::default()).await.unwrap();
    assert_eq!(results.len(), 4);
    assert_eq!(results[1].value, Some(json!(1)));

    let mut read = bucket.subdoc("user:1", false).unwrap();
    read.get("profile.email")
        .unwrap()
        .exists_with("session", SpecOptions::default().with_quiet(true))
        .unwrap()
        .get_count("history")
        .unwrap();
    let results = read.execute(ExecOptions::default()).await.unwrap();
    let outcomes = read.interpret(results).unwrap();
    assert_eq!(outcomes[0], SpecOutcome::Found(Some(json!("alice@example.com"))));
    assert_eq!(outcomes[1], SpecOutcome::Absent);
    assert_eq!(outcomes[2], SpecOutcome::Found(Some(json!(1))));
}

#[tokio::test]
async fn loud_missing_path_is_error_on_interpret() {
    let bucket = MockBucket::new("default");
    bucket.set_document("doc", json!({}));
    let mut request = bucket.subdoc("doc", false).unwrap();
    request.get("missing").unwrap();
    let results = request.execute(ExecOptions::default()).await.unwrap();
    assert_eq!(results[0].status, SubdocStatus::PathNotFound);
    let err = request.interpret(results).unwrap_err();
    assert!(matches!(err, SdkError::PathFailure { index: 0, status: SubdocStatus::PathNotFound }));
}

#[tokio::test]
async fn execute_twice_is_rejected() {
    let bucket = MockBucket::new("default");
    bucket.set_document("doc", json!({"a": 1}));
    let mut request = bucket.subdoc("doc", false).unwrap();
    request.get("a").unwrap();
    request.execute(ExecOptions::default()).await.unwrap();
    let err = request.execute(ExecOptions::default()).await.unwrap_err();
    assert!(matches!(err, SdkError::AlreadyExecuted));
    assert_eq!(bucket.batch_count(), 1);
}

#[tokio::test]
async fn captured_options_reach_executor() {
    let bucket = MockBucket::new("default");
    bucket.set_document("doc", json!({}));
    let cas = bucket.cas("doc").unwrap();
    let captured = ExecOptions::builder().cas(cas).timeout(std::time::Duration::from_secs(2)).build();
    let mut request = SubdocRequest::with_options("doc", false, &bucket, captured).unwrap();
    request.dict_upsert("a", &true).unwrap();
    request.execute(ExecOptions::default()).await.unwrap();

    let sent = bucket.last_options().unwrap();
    assert_eq!(sent.cas, Some(cas));
    assert_eq!(sent.timeout, Some(std::time::Duration::from_secs(2)));
    assert_eq!(bucket.document("doc").unwrap(), json!({"a": true}));
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn compiled_batch_matches_appended_lookups(
        key in strategies::arb_key(),
        lookups in proptest::collection::vec((strategies::arb_lookup_kind(), strategies::arb_path()), 1..=64),
    ) {
        let bucket = MockBucket::new("default");
        let mut request = bucket.subdoc(key, false).unwrap();
        for (kind, path) in &lookups {
            request.lookup(*kind, path.as_bytes(), SpecOptions::default()).unwrap();
        }
        let batch = request.to_buffer().unwrap();
        prop_assert_eq!(batch.count(), lookups.len());
        for (view, (kind, path)) in batch.iter().zip(&lookups) {
            let view = view.unwrap();
            prop_assert_eq!(view.kind, *kind);
            prop_assert_eq!(view.path, path.as_bytes());
            prop_assert_eq!(view.value, None);
        }
    }

    #[test]
    fn first_spec_fixes_mode(
        lookup in strategies::arb_lookup_kind(),
        mutation in strategies::arb_mutation_kind(),
        path in strategies::arb_path(),
        value in strategies::arb_scalar(),
    ) {
        let bucket = MockBucket::new("default");
        let mut request = bucket.subdoc("doc", false).unwrap();
        request.lookup(lookup, path.as_bytes(), SpecOptions::default()).unwrap();
        let value = mutation.takes_value().then_some(&value);
        let err = request.mutate(mutation, path.as_bytes(), value, SpecOptions::default()).unwrap_err();
        prop_assert!(matches!(err, SdkError::ModeConflict { .. }), "unexpected error: {err}");
        prop_assert_eq!(request.len(), 1);
        prop_assert_eq!(request.mode(), Mode::Lookup);
    }

    #[test]
    fn upserted_values_read_back(
        path in strategies::arb_segment(),
        value in strategies::arb_json_value(),
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let bucket = MockBucket::new("default");
            bucket.set_document("doc", json!({}));

            let mut write = bucket.subdoc("doc", false).unwrap();
            write.dict_upsert(path.as_str(), &value).unwrap();
            write.execute(ExecOptions::default()).await.unwrap();

            let mut read = bucket.subdoc("doc", false).unwrap();
            read.get(path.as_str()).unwrap();
            let results = read.execute(ExecOptions::default()).await.unwrap();
            assert_eq!(results[0].value.as_ref(), Some(&value));
        });
    }
}
