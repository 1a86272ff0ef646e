//! In-memory bucket for SDK testing.
//!
//! `MockBucket` implements [`SubdocExecutor`] and [`ManagementTransport`]
//! against documents held in memory, so builders can be exercised end to end
//! without a cluster.
//!
//! # Features
//!
//! - **Document storage**: JSON documents with a CAS per key
//! - **Wire decoding**: every batch is compiled, copied and re-read from its record block
//! - **Atomic mutations**: a failing mutation leaves the document untouched
//! - **Failure injection**: transport errors for the next N batches
//! - **Inspection**: batch count, last options and last compiled batch
//!
//! # Example
//!
//! ```no_run
//! # use docbatch_sdk::{ExecOptions, SubdocExecutor, mock::MockBucket};
//! # use serde_json::json;
//! # async fn example() -> docbatch_sdk::Result<()> {
//! let bucket = MockBucket::new("default");
//! bucket.set_document("user:1", json!({"name": "alice"}));
//!
//! let mut request = bucket.subdoc("user:1", false)?;
//! request.get("name")?;
//! let results = request.execute(ExecOptions::default()).await?;
//! assert_eq!(results[0].value, Some(json!("alice")));
//! # Ok(())
//! # }
//! ```

use std::{
    collections::HashMap,
    future::{self, Future},
    sync::{
        Arc,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
};

use docbatch_types::{CompiledBatch, Mode, OperationKind, SpecView};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use snafu::ResultExt;

use crate::{
    builders::SubdocRequest,
    design_docs::{DesignDocs, ManagementTransport},
    error::{CodecSnafu, Result, SdkError},
    executor::{ExecOptions, SubdocExecutor},
    results::{SpecResult, SubdocStatus},
};

/// Stored document: (value, cas)
type StoredDocument = (Value, u64);

/// Outcome of applying one spec; the error is the status reported for it.
type StatusResult<T> = std::result::Result<T, SubdocStatus>;

/// Shared state for the mock bucket.
#[derive(Debug, Default)]
struct MockState {
    /// Documents by key.
    documents: RwLock<HashMap<String, StoredDocument>>,

    /// Body served for the design document listing.
    design_listing: RwLock<Vec<u8>>,

    /// Number of transport failures to inject for next batches.
    fail_count: AtomicUsize,

    /// Total batches received.
    batch_count: AtomicUsize,

    /// Next CAS to assign.
    next_cas: AtomicU64,

    /// Options passed with the most recent batch.
    last_options: RwLock<Option<ExecOptions>>,

    /// Most recent batch as decoded from its record block.
    last_batch: RwLock<Option<CompiledBatch>>,
}

impl MockState {
    /// Checks if we should inject a failure, decrementing the counter if so.
    fn should_inject_failure(&self) -> bool {
        self.fail_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn assign_cas(&self) -> u64 {
        self.next_cas.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// In-memory bucket executing sub-document batches.
#[derive(Debug, Clone)]
pub struct MockBucket {
    name: String,
    state: Arc<MockState>,
}

impl MockBucket {
    /// Creates an empty bucket.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), state: Arc::new(MockState::default()) }
    }

    /// Bucket name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stores a document, assigning a fresh CAS.
    pub fn set_document(&self, key: impl Into<String>, value: Value) {
        let cas = self.state.assign_cas();
        self.state.documents.write().insert(key.into(), (value, cas));
    }

    /// Returns a copy of a stored document.
    #[must_use]
    pub fn document(&self, key: &str) -> Option<Value> {
        self.state.documents.read().get(key).map(|(value, _)| value.clone())
    }

    /// Returns the CAS of a stored document.
    #[must_use]
    pub fn cas(&self, key: &str) -> Option<u64> {
        self.state.documents.read().get(key).map(|(_, cas)| *cas)
    }

    /// Sets the body served for the design document listing.
    pub fn set_design_listing(&self, body: Vec<u8>) {
        *self.state.design_listing.write() = body;
    }

    /// Fails the next `count` batches with a transport error.
    pub fn inject_transport_failures(&self, count: usize) {
        self.state.fail_count.store(count, Ordering::SeqCst);
    }

    /// Number of batches received, including failed ones.
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.state.batch_count.load(Ordering::SeqCst)
    }

    /// Options passed with the most recent batch.
    #[must_use]
    pub fn last_options(&self) -> Option<ExecOptions> {
        self.state.last_options.read().clone()
    }

    /// Most recent batch as decoded from its record block.
    #[must_use]
    pub fn last_batch(&self) -> Option<CompiledBatch> {
        self.state.last_batch.read().clone()
    }

    fn run(
        &self,
        request: &mut SubdocRequest<'_, Self>,
        options: ExecOptions,
    ) -> Result<Vec<SpecResult>> {
        self.state.batch_count.fetch_add(1, Ordering::SeqCst);
        *self.state.last_options.write() = Some(options.clone());

        if self.state.should_inject_failure() {
            tracing::warn!(key = request.key(), "injecting transport failure");
            request.release();
            return Err(SdkError::Transport { message: "injected transport failure".to_owned() });
        }

        let key = request.key().to_owned();
        let mode = request.mode();
        let quiet = request.quiet_flags().to_vec();
        let sent = request.to_buffer()?;
        let batch = CompiledBatch::from_parts(sent.records_bytes(), sent.arena().to_vec())
            .context(CodecSnafu)?;
        request.release();

        let results = match mode {
            Mode::Mutate => self.mutate(&key, &batch, &quiet, &options),
            Mode::Lookup | Mode::Unset => self.lookup(&key, &batch),
        };
        *self.state.last_batch.write() = Some(batch);
        results
    }

    fn lookup(&self, key: &str, batch: &CompiledBatch) -> Result<Vec<SpecResult>> {
        let documents = self.state.documents.read();
        let (doc, _) = documents
            .get(key)
            .ok_or_else(|| SdkError::DocumentNotFound { key: key.to_owned() })?;

        batch
            .iter()
            .map(|view| -> Result<SpecResult> {
                let view = view.context(CodecSnafu)?;
                Ok(lookup_one(doc, &view).unwrap_or_else(SpecResult::status))
            })
            .collect()
    }

    fn mutate(
        &self,
        key: &str,
        batch: &CompiledBatch,
        quiet: &[bool],
        options: &ExecOptions,
    ) -> Result<Vec<SpecResult>> {
        let mut documents = self.state.documents.write();
        let (current, current_cas) = documents
            .get(key)
            .ok_or_else(|| SdkError::DocumentNotFound { key: key.to_owned() })?;
        if let Some(expected) = options.cas.filter(|&cas| cas != *current_cas) {
            return Err(SdkError::CasMismatch {
                key: key.to_owned(),
                expected,
                actual: *current_cas,
            });
        }

        let mut working = current.clone();
        let mut results = Vec::with_capacity(batch.count());
        for (index, view) in batch.iter().enumerate() {
            let view = view.context(CodecSnafu)?;
            match mutate_one(&mut working, &view) {
                Ok(value) => results.push(SpecResult::success(value)),
                Err(SubdocStatus::PathNotFound) if quiet.get(index).copied().unwrap_or(false) => {
                    results.push(SpecResult::status(SubdocStatus::PathNotFound));
                },
                Err(status) => return Err(SdkError::PathFailure { index, status }),
            }
        }

        let cas = self.state.assign_cas();
        documents.insert(key.to_owned(), (working, cas));
        Ok(results)
    }
}

impl SubdocExecutor for MockBucket {
    fn execute_subdoc_batch(
        &self,
        request: &mut SubdocRequest<'_, Self>,
        options: ExecOptions,
    ) -> impl Future<Output = Result<Vec<SpecResult>>> + Send {
        future::ready(self.run(request, options))
    }
}

impl ManagementTransport for MockBucket {
    fn get(&self, path: &str) -> impl Future<Output = Result<Vec<u8>>> + Send {
        let response = if path == DesignDocs::listing_path(&self.name) {
            Ok(self.state.design_listing.read().clone())
        } else {
            Err(SdkError::Transport { message: format!("404 Not Found: {path}") })
        };
        future::ready(response)
    }
}

// ============================================================================
// Path resolution
// ============================================================================

/// One step of a sub-document path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    /// Array index; `-1` addresses the last element.
    Index(i64),
}

/// Parses `a.b[0].c`. Returns `None` on a syntax error.
fn parse_path(path: &[u8]) -> Option<Vec<Segment>> {
    let path = std::str::from_utf8(path).ok()?;
    let mut segments = Vec::new();
    let mut key = String::new();
    let mut chars = path.chars().peekable();
    // true when the previous token was `]`, so a bare `.` or `[` may follow
    let mut after_index = false;

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if key.is_empty() && !after_index {
                    return None;
                }
                if !key.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut key)));
                }
                after_index = false;
                if chars.peek().is_none() {
                    return None;
                }
            },
            '[' => {
                if !key.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut key)));
                }
                let mut digits = String::new();
                loop {
                    match chars.next()? {
                        ']' => break,
                        d @ ('0'..='9' | '-') => digits.push(d),
                        _ => return None,
                    }
                }
                let index: i64 = digits.parse().ok()?;
                if index < -1 {
                    return None;
                }
                segments.push(Segment::Index(index));
                after_index = true;
            },
            ']' => return None,
            c => {
                if after_index {
                    return None;
                }
                key.push(c);
            },
        }
    }
    if !key.is_empty() {
        segments.push(Segment::Key(key));
    }
    (!segments.is_empty()).then_some(segments)
}

fn array_index(index: i64, len: usize) -> Option<usize> {
    if index == -1 {
        len.checked_sub(1)
    } else {
        usize::try_from(index).ok().filter(|&i| i < len)
    }
}

fn resolve<'v>(doc: &'v Value, segments: &[Segment]) -> StatusResult<&'v Value> {
    segments.iter().try_fold(doc, |current, segment| match (segment, current) {
        (Segment::Key(key), Value::Object(map)) => map.get(key).ok_or(SubdocStatus::PathNotFound),
        (Segment::Index(index), Value::Array(items)) => array_index(*index, items.len())
            .and_then(|i| items.get(i))
            .ok_or(SubdocStatus::PathNotFound),
        _ => Err(SubdocStatus::PathMismatch),
    })
}

/// Walks to a container, creating missing dictionary levels when `create` is set.
fn resolve_mut<'v>(
    doc: &'v mut Value,
    segments: &[Segment],
    create: bool,
) -> StatusResult<&'v mut Value> {
    let mut current = doc;
    for segment in segments {
        current = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => {
                if create {
                    map.entry(key.clone()).or_insert_with(|| Value::Object(Map::new()))
                } else {
                    map.get_mut(key).ok_or(SubdocStatus::PathNotFound)?
                }
            },
            (Segment::Index(index), Value::Array(items)) => {
                let i = array_index(*index, items.len()).ok_or(SubdocStatus::PathNotFound)?;
                items.get_mut(i).ok_or(SubdocStatus::PathNotFound)?
            },
            _ => return Err(SubdocStatus::PathMismatch),
        };
    }
    Ok(current)
}

fn parse_value(bytes: Option<&[u8]>) -> StatusResult<Value> {
    bytes
        .and_then(|b| serde_json::from_slice(b).ok())
        .ok_or(SubdocStatus::ValueCannotInsert)
}

fn lookup_one(doc: &Value, view: &SpecView<'_>) -> StatusResult<SpecResult> {
    let segments = parse_path(view.path).ok_or(SubdocStatus::PathInvalid)?;
    let target = resolve(doc, &segments)?;
    match view.kind {
        OperationKind::Get => Ok(SpecResult::success(Some(target.clone()))),
        OperationKind::Exists => Ok(SpecResult::success(None)),
        OperationKind::GetCount => match target {
            Value::Array(items) => Ok(SpecResult::success(Some(items.len().into()))),
            Value::Object(map) => Ok(SpecResult::success(Some(map.len().into()))),
            _ => Err(SubdocStatus::PathMismatch),
        },
        _ => Err(SubdocStatus::Other(0x04)),
    }
}

/// Applies one mutation to `doc`, returning the value reported back (counters only).
fn mutate_one(doc: &mut Value, view: &SpecView<'_>) -> StatusResult<Option<Value>> {
    let segments = parse_path(view.path).ok_or(SubdocStatus::PathInvalid)?;
    let Some((last, parents)) = segments.split_last() else {
        return Err(SubdocStatus::PathInvalid);
    };
    let create = view.create_intermediates;

    match view.kind {
        OperationKind::Remove => {
            let parent = resolve_mut(doc, parents, false)?;
            match (last, parent) {
                (Segment::Key(key), Value::Object(map)) => {
                    map.remove(key).ok_or(SubdocStatus::PathNotFound)?;
                },
                (Segment::Index(index), Value::Array(items)) => {
                    let i = array_index(*index, items.len()).ok_or(SubdocStatus::PathNotFound)?;
                    items.remove(i);
                },
                _ => return Err(SubdocStatus::PathMismatch),
            }
            Ok(None)
        },
        OperationKind::DictAdd | OperationKind::DictUpsert => {
            let value = parse_value(view.value)?;
            let Segment::Key(key) = last else {
                return Err(SubdocStatus::PathInvalid);
            };
            let Value::Object(map) = resolve_mut(doc, parents, create)? else {
                return Err(SubdocStatus::PathMismatch);
            };
            if view.kind == OperationKind::DictAdd && map.contains_key(key) {
                return Err(SubdocStatus::PathExists);
            }
            map.insert(key.clone(), value);
            Ok(None)
        },
        OperationKind::Replace => {
            let value = parse_value(view.value)?;
            *resolve_mut(doc, &segments, false)? = value;
            Ok(None)
        },
        OperationKind::ArrayAddFirst | OperationKind::ArrayAddLast | OperationKind::ArrayAddUnique => {
            let value = parse_value(view.value)?;
            let array = match (create, last) {
                (true, Segment::Key(key)) => {
                    let Value::Object(map) = resolve_mut(doc, parents, true)? else {
                        return Err(SubdocStatus::PathMismatch);
                    };
                    map.entry(key.clone()).or_insert_with(|| Value::Array(Vec::new()))
                },
                _ => resolve_mut(doc, &segments, false)?,
            };
            let Value::Array(items) = array else {
                return Err(SubdocStatus::PathMismatch);
            };
            match view.kind {
                OperationKind::ArrayAddFirst => items.insert(0, value),
                OperationKind::ArrayAddUnique => {
                    if value.is_array() || value.is_object() {
                        return Err(SubdocStatus::ValueCannotInsert);
                    }
                    if items.contains(&value) {
                        return Err(SubdocStatus::PathExists);
                    }
                    items.push(value);
                },
                _ => items.push(value),
            }
            Ok(None)
        },
        OperationKind::ArrayInsert => {
            let value = parse_value(view.value)?;
            let Segment::Index(index) = last else {
                return Err(SubdocStatus::PathInvalid);
            };
            let Value::Array(items) = resolve_mut(doc, parents, false)? else {
                return Err(SubdocStatus::PathMismatch);
            };
            let i = usize::try_from(*index).map_err(|_| SubdocStatus::PathInvalid)?;
            if i > items.len() {
                return Err(SubdocStatus::PathNotFound);
            }
            items.insert(i, value);
            Ok(None)
        },
        OperationKind::Counter => {
            let delta = parse_value(view.value)
                .ok()
                .and_then(|v| v.as_i64())
                .filter(|&d| d != 0)
                .ok_or(SubdocStatus::DeltaInvalid)?;
            let Segment::Key(key) = last else {
                let target = resolve_mut(doc, &segments, false)?;
                return apply_delta(target, delta);
            };
            let Value::Object(map) = resolve_mut(doc, parents, create)? else {
                return Err(SubdocStatus::PathMismatch);
            };
            let target = map.entry(key.clone()).or_insert_with(|| Value::from(0));
            apply_delta(target, delta)
        },
        OperationKind::Get | OperationKind::Exists | OperationKind::GetCount => {
            Err(SubdocStatus::Other(0x04))
        },
    }
}

fn apply_delta(target: &mut Value, delta: i64) -> StatusResult<Option<Value>> {
    let current = target.as_i64().ok_or(SubdocStatus::PathMismatch)?;
    let next = current.checked_add(delta).ok_or(SubdocStatus::NumberRange)?;
    *target = Value::from(next);
    Ok(Some(Value::from(next)))
}
