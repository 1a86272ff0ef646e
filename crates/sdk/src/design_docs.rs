//! Design document index.
//!
//! Fetches the bucket's design document listing once through a
//! [`ManagementTransport`] and answers name lookups from memory. Names may be
//! given with or without the `_design/` prefix.

use std::{collections::BTreeMap, future::Future};

use serde::Deserialize;

use crate::error::{Result, SdkError};

const DESIGN_PREFIX: &str = "_design/";

/// HTTP GET access to the management API.
pub trait ManagementTransport: Sync {
    /// Fetches `path` and returns the response body.
    fn get(&self, path: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

#[derive(Debug, Deserialize)]
struct Listing {
    #[serde(default)]
    rows: Option<Vec<Row>>,
}

#[derive(Debug, Deserialize)]
struct Row {
    doc: RowDoc,
}

#[derive(Debug, Deserialize)]
struct RowDoc {
    meta: RowMeta,
    #[serde(default)]
    json: DesignBody,
}

#[derive(Debug, Deserialize)]
struct RowMeta {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct DesignBody {
    #[serde(default)]
    views: BTreeMap<String, ViewDefinition>,
}

/// Map/reduce source of a view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ViewDefinition {
    /// Map function source.
    #[serde(default)]
    pub map: Option<String>,
    /// Reduce function source or built-in name.
    #[serde(default)]
    pub reduce: Option<String>,
}

/// One design document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignDoc {
    id: String,
    views: BTreeMap<String, ViewDefinition>,
}

impl DesignDoc {
    /// Full id, including the `_design/` prefix.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name without the `_design/` prefix.
    #[must_use]
    pub fn name(&self) -> &str {
        short_name(&self.id)
    }

    /// View names, sorted.
    pub fn views(&self) -> impl Iterator<Item = &str> {
        self.views.keys().map(String::as_str)
    }

    /// Definition of `name`, if the document declares it.
    #[must_use]
    pub fn view(&self, name: &str) -> Option<&ViewDefinition> {
        self.views.get(name)
    }

    /// Every view definition.
    #[must_use]
    pub fn view_config(&self) -> &BTreeMap<String, ViewDefinition> {
        &self.views
    }
}

/// Design documents of one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesignDocs {
    docs: Vec<DesignDoc>,
}

impl DesignDocs {
    /// Management path of the listing for `bucket`.
    #[must_use]
    pub fn listing_path(bucket: &str) -> String {
        format!("/pools/default/buckets/{bucket}/ddocs")
    }

    /// Fetches and parses the listing for `bucket`.
    ///
    /// # Errors
    ///
    /// Returns the transport's error, or `SdkError::DesignDocs` if the body is
    /// not a valid listing.
    pub async fn fetch<T: ManagementTransport>(transport: &T, bucket: &str) -> Result<Self> {
        let body = transport.get(&Self::listing_path(bucket)).await?;
        let docs = Self::from_body(&body)?;
        tracing::debug!(bucket, count = docs.docs.len(), "loaded design documents");
        Ok(docs)
    }

    /// Parses a listing body. An empty body is an empty listing.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::DesignDocs` if the body is not a valid listing.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        if body.is_empty() {
            return Ok(Self::default());
        }
        let listing: Listing = serde_json::from_slice(body)
            .map_err(|e| SdkError::DesignDocs { message: e.to_string() })?;
        let docs = listing
            .rows
            .unwrap_or_default()
            .into_iter()
            .map(|row| DesignDoc { id: row.doc.meta.id, views: row.doc.json.views })
            .collect();
        Ok(Self { docs })
    }

    /// Short names of every design document, in listing order.
    pub fn designs(&self) -> impl Iterator<Item = &str> {
        self.docs.iter().map(DesignDoc::name)
    }

    /// Finds a design document by short name or full id.
    #[must_use]
    pub fn design(&self, name: &str) -> Option<&DesignDoc> {
        self.docs.iter().find(|doc| doc.id == name || doc.name() == name)
    }

    /// Number of design documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Returns true if the bucket has no design documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

fn short_name(id: &str) -> &str {
    id.strip_prefix(DESIGN_PREFIX).unwrap_or(id)
}
