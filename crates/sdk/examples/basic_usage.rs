//! Basic usage example demonstrating lookup and mutation batches.
//!
//! Run: `cargo run --example basic_usage`
//!
//! This example shows:
//! - Creating requests against an executor
//! - Appending mutations and lookups
//! - Interpreting results with quiet flags
//! - Error handling patterns

// Examples are allowed to use expect/unwrap for brevity
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::disallowed_methods)]

use docbatch_sdk::{
    DesignDocs, ExecOptions, Result, SdkError, SpecOptions, SpecOutcome, SubdocExecutor,
    mock::MockBucket,
};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<()> {
    let bucket = MockBucket::new("travel");
    bucket.set_document("user:123", json!({"name": "alice", "visits": 0}));

    // -------------------------------------------------------------------------
    // 1. Mutate several paths in one round trip
    // -------------------------------------------------------------------------
    let mut update = bucket.subdoc("user:123", false)?;
    update
        .dict_upsert("profile.email", "alice@example.com")?
        .counter("visits", &1)?
        .array_add_unique("tags", "early-adopter")?;
    let results = update.execute(ExecOptions::default()).await?;
    println!("visits is now {:?}", results[1].value);

    // -------------------------------------------------------------------------
    // 2. Read back, treating a missing path as absence
    // -------------------------------------------------------------------------
    let mut read = bucket.subdoc("user:123", false)?;
    read.get("profile.email")?
        .get_with("profile.phone", SpecOptions::default().with_quiet(true))?
        .get_count("tags")?;
    let results = read.execute(ExecOptions::default()).await?;
    for (index, outcome) in read.interpret(results)?.into_iter().enumerate() {
        match outcome {
            SpecOutcome::Found(value) => println!("spec {index}: {value:?}"),
            SpecOutcome::Absent => println!("spec {index}: absent"),
        }
    }

    // -------------------------------------------------------------------------
    // 3. Lookups and mutations never share a batch
    // -------------------------------------------------------------------------
    let mut mixed = bucket.subdoc("user:123", false)?;
    mixed.get("name")?;
    match mixed.remove("name") {
        Err(SdkError::ModeConflict { .. }) => println!("mode conflict rejected as expected"),
        other => println!("unexpected: {other:?}"),
    }

    // -------------------------------------------------------------------------
    // 4. Design documents
    // -------------------------------------------------------------------------
    bucket.set_design_listing(
        serde_json::to_vec(&json!({"rows": [
            {"doc": {"meta": {"id": "_design/users"}, "json": {"views": {"by_email": {"map": "function (doc) { emit(doc.email) }"}}}}}
        ]}))
        .expect("serialize listing"),
    );
    let designs = DesignDocs::fetch(&bucket, bucket.name()).await?;
    for name in designs.designs() {
        println!("design document: {name}");
    }

    Ok(())
}
