//! Fluent sub-document batch builder.
//!
//! Collects lookup or mutation specs against a single document, validates them
//! as they are appended, and compiles them into one contiguous buffer that an
//! executor sends in a single round trip.
//!
//! # Features
//!
//! - **Typed operations**: one method per sub-document operation
//! - **Mode enforcement**: lookups and mutations never mix in one batch
//! - **Single allocation**: paths and values share one arena behind fixed-size records
//! - **Pluggable executors**: transport lives behind [`SubdocExecutor`]
//! - **Design documents**: [`DesignDocs`] indexes a bucket's views
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use docbatch_sdk::{ExecOptions, SubdocExecutor, mock::MockBucket};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> docbatch_sdk::Result<()> {
//!     let bucket = MockBucket::new("default");
//!     bucket.set_document("user:123", json!({"name": "alice"}));
//!
//!     let mut request = bucket.subdoc("user:123", false)?;
//!     request.dict_upsert("email", "alice@example.com")?.counter("logins", &1)?;
//!     request.execute(ExecOptions::default()).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 SubdocRequest (Public API)                  │
//! │  .get() │ .dict_upsert() │ .counter() │ .execute()          │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   Append-time validation                    │
//! │   Mode check │ Value arity │ Limits │ JSON encoding         │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   CompiledBatch (zerocopy)                  │
//! │   20-byte records │ Shared arena │ Offsets into arena       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   SubdocExecutor                            │
//! │   Transport │ Retries │ Result decoding                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod builders;
mod design_docs;
mod error;
mod executor;
pub mod mock;
mod results;

// Public API exports
pub use builders::{SpecOptions, SubdocRequest};
pub use design_docs::{DesignDoc, DesignDocs, ManagementTransport, ViewDefinition};
pub use error::{Result, SdkError};
pub use executor::{Durability, ExecOptions, SubdocExecutor};
pub use results::{SpecOutcome, SpecResult, SubdocStatus, interpret};

// Re-export commonly used types from docbatch-types
pub use docbatch_types::{
    BuilderConfig, Category, CompiledBatch, Mode, OperationKind, OperationSpec, SpecView,
    ValidationConfig,
};
