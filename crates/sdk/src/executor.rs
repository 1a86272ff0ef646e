//! Executor boundary.
//!
//! An executor owns transport, retries and result decoding. The builder hands
//! itself to [`SubdocExecutor::execute_subdoc_batch`]; the executor compiles it
//! with [`SubdocRequest::to_buffer`], sends the batch, classifies not-found
//! outcomes with [`SubdocRequest::quiet_flags`] if it needs to, and releases
//! the request memory once the buffer is no longer read.

use std::{future::Future, time::Duration};

use crate::{builders::SubdocRequest, error::Result, results::SpecResult};

/// Replication and persistence requirements for a mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Durability {
    /// Number of nodes the mutation must be persisted to.
    pub persist_to: u8,
    /// Number of replicas the mutation must reach.
    pub replicate_to: u8,
}

/// Options forwarded to the executor with a batch.
///
/// Options captured when a request is created are merged with the options
/// passed to `execute`; fields set at execution time win.
#[derive(Debug, Clone, Default, PartialEq, Eq, bon::Builder)]
pub struct ExecOptions {
    /// Expected document CAS.
    pub cas: Option<u64>,
    /// Document expiry applied by a mutation.
    pub expiry: Option<Duration>,
    /// Per-request timeout.
    pub timeout: Option<Duration>,
    /// Durability requirement for mutations.
    pub durability: Option<Durability>,
}

impl ExecOptions {
    /// Overlays `overrides` on `self`.
    #[must_use]
    pub fn merge(self, overrides: Self) -> Self {
        Self {
            cas: overrides.cas.or(self.cas),
            expiry: overrides.expiry.or(self.expiry),
            timeout: overrides.timeout.or(self.timeout),
            durability: overrides.durability.or(self.durability),
        }
    }
}

/// Executes compiled sub-document batches.
pub trait SubdocExecutor: Sized + Sync {
    /// Runs the request's batch and returns one result per spec, in order.
    fn execute_subdoc_batch(
        &self,
        request: &mut SubdocRequest<'_, Self>,
        options: ExecOptions,
    ) -> impl Future<Output = Result<Vec<SpecResult>>> + Send;

    /// Starts a request bound to this executor.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::InvalidKey` if the key is empty.
    fn subdoc(
        &self,
        key: impl Into<String>,
        default_quiet: bool,
    ) -> Result<SubdocRequest<'_, Self>> {
        SubdocRequest::new(key, default_quiet, self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn merge_prefers_overrides() {
        let captured = ExecOptions::builder().cas(7).timeout(Duration::from_secs(1)).build();
        let merged = captured.merge(ExecOptions::builder().cas(9).build());
        assert_eq!(merged.cas, Some(9));
        assert_eq!(merged.timeout, Some(Duration::from_secs(1)));
        assert_eq!(merged.expiry, None);
    }

    #[test]
    fn merge_with_default_keeps_captured() {
        let captured = ExecOptions::builder()
            .durability(Durability { persist_to: 1, replicate_to: 2 })
            .build();
        let merged = captured.clone().merge(ExecOptions::default());
        assert_eq!(merged, captured);
    }
}
