//! Fluent builder APIs for sub-document batches.
//!
//! # Example
//!
//! ```no_run
//! # use docbatch_sdk::{ExecOptions, SubdocExecutor};
//! # async fn example<E: SubdocExecutor>(bucket: &E) -> docbatch_sdk::Result<()> {
//! let mut request = bucket.subdoc("user:123", false)?;
//! request
//!     .dict_upsert("profile.name", "alice")?
//!     .counter("stats.logins", &1)?
//!     .remove("session")?;
//! let results = request.execute(ExecOptions::default()).await?;
//! # Ok(())
//! # }
//! ```

mod subdoc;

pub use subdoc::{SpecOptions, SubdocRequest};
