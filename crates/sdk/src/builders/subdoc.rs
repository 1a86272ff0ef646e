//! Fluent builder for sub-document batches against a single document.
//!
//! Specs are appended in order and compiled into one contiguous buffer. The
//! first spec fixes the builder's mode: a lookup builder only accepts
//! lookups and a mutate builder only accepts mutations.
//!
//! # Example
//!
//! ```no_run
//! # use docbatch_sdk::{ExecOptions, SpecOptions, SubdocExecutor};
//! # async fn example<E: SubdocExecutor>(bucket: &E) -> docbatch_sdk::Result<()> {
//! let mut request = bucket.subdoc("user:123", false)?;
//! let results = request
//!     .get("name")?
//!     .get_with("nickname", SpecOptions::default().with_quiet(true))?
//!     .execute(ExecOptions::default())
//!     .await?;
//! let outcomes = request.interpret(results)?;
//! # Ok(())
//! # }
//! ```

use docbatch_types::{
    BuilderConfig, Category, CompiledBatch, Mode, OperationKind, OperationSpec, ValidationConfig,
    encode_value, validation,
};
use serde::Serialize;
use snafu::{OptionExt, ResultExt};

use crate::{
    error::{
        AlreadyExecutedSnafu, CodecSnafu, EncodingSnafu, Result, ReleasedSnafu, SdkError,
    },
    executor::{ExecOptions, SubdocExecutor},
    results::{SpecOutcome, SpecResult, interpret},
};

/// Per-call overrides for a single spec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpecOptions {
    /// Quiet override; `None` uses the builder default for lookups and
    /// removals, and `false` for value mutations.
    pub quiet: Option<bool>,
    /// Create-intermediates override. Ignored by lookups and `remove`, and
    /// forced off for `replace` and `array_insert`.
    pub create_intermediates: Option<bool>,
}

impl SpecOptions {
    /// Sets the quiet override.
    #[must_use]
    pub const fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = Some(quiet);
        self
    }

    /// Sets the create-intermediates override.
    #[must_use]
    pub const fn with_create_intermediates(mut self, create: bool) -> Self {
        self.create_intermediates = Some(create);
        self
    }
}

/// Builder for one sub-document batch.
///
/// Lifecycle: specs accumulate until [`to_buffer`](Self::to_buffer) compiles
/// them; after that no spec may be appended. [`release`](Self::release) drops
/// the compiled buffer once the executor is done reading it. The quiet flags
/// survive both steps.
pub struct SubdocRequest<'a, E> {
    key: String,
    mode: Mode,
    /// `Some` while building.
    specs: Option<Vec<OperationSpec>>,
    /// `Some` once compiled and until released.
    compiled: Option<CompiledBatch>,
    quiet_flags: Vec<bool>,
    default_quiet: bool,
    validation: ValidationConfig,
    executor: Option<&'a E>,
    exec_opts: Option<ExecOptions>,
}

impl<'a, E> SubdocRequest<'a, E> {
    /// Creates a request for `key` bound to `executor`.
    ///
    /// Only empty keys and empty paths are rejected; use
    /// [`from_config`](Self::from_config) to opt in to size and count limits.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::InvalidKey` if the key is empty.
    pub fn new(key: impl Into<String>, default_quiet: bool, executor: &'a E) -> Result<Self> {
        Self::build(key.into(), default_quiet, ValidationConfig::default(), executor, None)
    }

    /// Creates a request that carries options merged into every execution.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::InvalidKey` if the key is empty.
    pub fn with_options(
        key: impl Into<String>,
        default_quiet: bool,
        executor: &'a E,
        exec_opts: ExecOptions,
    ) -> Result<Self> {
        Self::build(key.into(), default_quiet, ValidationConfig::default(), executor, Some(exec_opts))
    }

    /// Creates a request using shared builder settings.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::InvalidKey` if the key violates the configured limits.
    pub fn from_config(
        key: impl Into<String>,
        config: &BuilderConfig,
        executor: &'a E,
    ) -> Result<Self> {
        Self::build(key.into(), config.default_quiet, config.validation.clone(), executor, None)
    }

    fn build(
        key: String,
        default_quiet: bool,
        validation: ValidationConfig,
        executor: &'a E,
        exec_opts: Option<ExecOptions>,
    ) -> Result<Self> {
        if let Err(e) = validation::validate_key(&key, &validation) {
            return Err(SdkError::InvalidKey { key, message: e.constraint });
        }
        Ok(Self {
            key,
            mode: Mode::Unset,
            specs: Some(Vec::new()),
            compiled: None,
            quiet_flags: Vec::new(),
            default_quiet,
            validation,
            executor: Some(executor),
            exec_opts,
        })
    }

    /// Target document key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Builder-level quiet default.
    #[must_use]
    pub fn default_quiet(&self) -> bool {
        self.default_quiet
    }

    /// Effective quiet flag of every appended spec, in order.
    #[must_use]
    pub fn quiet_flags(&self) -> &[bool] {
        &self.quiet_flags
    }

    /// Number of appended specs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.quiet_flags.len()
    }

    /// Returns true if no spec has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quiet_flags.is_empty()
    }

    /// Appended specs, while the request is still building.
    #[must_use]
    pub fn specs(&self) -> Option<&[OperationSpec]> {
        self.specs.as_deref()
    }

    /// Returns true once the batch has been compiled.
    #[must_use]
    pub fn is_compiled(&self) -> bool {
        self.specs.is_none()
    }

    // -- Generic entry points --

    /// Appends a lookup of `kind`.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::WrongCategory` for a mutate kind, plus every error
    /// an append can raise (mode conflict, invalid path, batch limit, already
    /// compiled).
    pub fn lookup(
        &mut self,
        kind: OperationKind,
        path: impl AsRef<[u8]>,
        opts: SpecOptions,
    ) -> Result<&mut Self> {
        if kind.category() != Category::Lookup {
            return Err(SdkError::WrongCategory { kind, expected: Category::Lookup });
        }
        self.append::<()>(kind, path.as_ref(), None, opts)
    }

    /// Appends a mutation of `kind` with an optional value.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::WrongCategory` for a lookup kind,
    /// `SdkError::ValueArity` if the value presence does not match the kind,
    /// `SdkError::Encoding` if the value cannot be serialised (including NaN
    /// and infinite floats), plus every error an append can raise.
    pub fn mutate<T: Serialize + ?Sized>(
        &mut self,
        kind: OperationKind,
        path: impl AsRef<[u8]>,
        value: Option<&T>,
        opts: SpecOptions,
    ) -> Result<&mut Self> {
        if kind.category() != Category::Mutate {
            return Err(SdkError::WrongCategory { kind, expected: Category::Mutate });
        }
        self.append(kind, path.as_ref(), value, opts)
    }

    fn append<T: Serialize + ?Sized>(
        &mut self,
        kind: OperationKind,
        path: &[u8],
        value: Option<&T>,
        opts: SpecOptions,
    ) -> Result<&mut Self> {
        let Some(specs) = self.specs.as_mut() else {
            return Err(SdkError::AlreadyCompiled { kind });
        };
        let mode =
            self.mode.admit(kind.category()).map_err(|mode| SdkError::ModeConflict { kind, mode })?;
        if kind.takes_value() != value.is_some() {
            return Err(SdkError::ValueArity { kind, takes_value: kind.takes_value() });
        }
        validation::validate_spec_count(specs.len(), &self.validation)
            .map_err(|e| SdkError::Validation { message: e.to_string() })?;
        validation::validate_path(path, &self.validation)
            .map_err(|e| SdkError::InvalidPath { kind, message: e.constraint })?;

        let value = match value {
            Some(value) => {
                let bytes = encode_value(value).context(EncodingSnafu { kind })?;
                validation::validate_value(&bytes, &self.validation)
                    .map_err(|e| SdkError::Validation { message: e.to_string() })?;
                Some(bytes)
            },
            None => None,
        };

        let (create_intermediates, discarded) =
            kind.resolve_intermediates(opts.create_intermediates);
        if discarded {
            tracing::debug!(
                key = %self.key,
                kind = %kind,
                "create_intermediates not supported for this operation, recording false"
            );
        }

        let quiet = match (kind.category(), kind.takes_value()) {
            (Category::Mutate, true) => opts.quiet.unwrap_or(false),
            _ => opts.quiet.unwrap_or(self.default_quiet),
        };

        specs.push(OperationSpec::new(kind, path, create_intermediates, value, quiet));
        self.quiet_flags.push(quiet);
        self.mode = mode;
        Ok(self)
    }

    // -- Lookups --

    /// Fetches the value at `path`.
    ///
    /// # Errors
    ///
    /// Fails like [`lookup`](Self::lookup); the request is left unchanged.
    pub fn get(&mut self, path: impl AsRef<[u8]>) -> Result<&mut Self> {
        self.lookup(OperationKind::Get, path, SpecOptions::default())
    }

    /// Fetches the value at `path` with per-call overrides.
    ///
    /// # Errors
    ///
    /// Fails like [`lookup`](Self::lookup); the request is left unchanged.
    pub fn get_with(&mut self, path: impl AsRef<[u8]>, opts: SpecOptions) -> Result<&mut Self> {
        self.lookup(OperationKind::Get, path, opts)
    }

    /// Checks whether `path` exists.
    ///
    /// # Errors
    ///
    /// Fails like [`lookup`](Self::lookup); the request is left unchanged.
    pub fn exists(&mut self, path: impl AsRef<[u8]>) -> Result<&mut Self> {
        self.lookup(OperationKind::Exists, path, SpecOptions::default())
    }

    /// Checks whether `path` exists with per-call overrides.
    ///
    /// # Errors
    ///
    /// Fails like [`lookup`](Self::lookup); the request is left unchanged.
    pub fn exists_with(&mut self, path: impl AsRef<[u8]>, opts: SpecOptions) -> Result<&mut Self> {
        self.lookup(OperationKind::Exists, path, opts)
    }

    /// Counts the elements at `path`.
    ///
    /// # Errors
    ///
    /// Fails like [`lookup`](Self::lookup); the request is left unchanged.
    pub fn get_count(&mut self, path: impl AsRef<[u8]>) -> Result<&mut Self> {
        self.lookup(OperationKind::GetCount, path, SpecOptions::default())
    }

    /// Counts the elements at `path` with per-call overrides.
    ///
    /// # Errors
    ///
    /// Fails like [`lookup`](Self::lookup); the request is left unchanged.
    pub fn get_count_with(
        &mut self,
        path: impl AsRef<[u8]>,
        opts: SpecOptions,
    ) -> Result<&mut Self> {
        self.lookup(OperationKind::GetCount, path, opts)
    }

    // -- Mutations --

    /// Removes the value at `path`.
    ///
    /// # Errors
    ///
    /// Fails like [`mutate`](Self::mutate); the request is left unchanged.
    pub fn remove(&mut self, path: impl AsRef<[u8]>) -> Result<&mut Self> {
        self.mutate::<()>(OperationKind::Remove, path, None, SpecOptions::default())
    }

    /// Removes the value at `path` with per-call overrides.
    ///
    /// # Errors
    ///
    /// Fails like [`mutate`](Self::mutate); the request is left unchanged.
    pub fn remove_with(&mut self, path: impl AsRef<[u8]>, opts: SpecOptions) -> Result<&mut Self> {
        self.mutate::<()>(OperationKind::Remove, path, None, opts)
    }

    /// Adds a dictionary entry that must not already exist.
    ///
    /// # Errors
    ///
    /// Fails like [`mutate`](Self::mutate); the request is left unchanged.
    pub fn dict_add<T: Serialize + ?Sized>(
        &mut self,
        path: impl AsRef<[u8]>,
        value: &T,
    ) -> Result<&mut Self> {
        self.mutate(OperationKind::DictAdd, path, Some(value), SpecOptions::default())
    }

    /// [`dict_add`](Self::dict_add) with per-call overrides.
    ///
    /// # Errors
    ///
    /// Fails like [`mutate`](Self::mutate); the request is left unchanged.
    pub fn dict_add_with<T: Serialize + ?Sized>(
        &mut self,
        path: impl AsRef<[u8]>,
        value: &T,
        opts: SpecOptions,
    ) -> Result<&mut Self> {
        self.mutate(OperationKind::DictAdd, path, Some(value), opts)
    }

    /// Inserts or overwrites a dictionary entry.
    ///
    /// # Errors
    ///
    /// Fails like [`mutate`](Self::mutate); the request is left unchanged.
    pub fn dict_upsert<T: Serialize + ?Sized>(
        &mut self,
        path: impl AsRef<[u8]>,
        value: &T,
    ) -> Result<&mut Self> {
        self.mutate(OperationKind::DictUpsert, path, Some(value), SpecOptions::default())
    }

    /// [`dict_upsert`](Self::dict_upsert) with per-call overrides.
    ///
    /// # Errors
    ///
    /// Fails like [`mutate`](Self::mutate); the request is left unchanged.
    pub fn dict_upsert_with<T: Serialize + ?Sized>(
        &mut self,
        path: impl AsRef<[u8]>,
        value: &T,
        opts: SpecOptions,
    ) -> Result<&mut Self> {
        self.mutate(OperationKind::DictUpsert, path, Some(value), opts)
    }

    /// Prepends to the array at `path`.
    ///
    /// # Errors
    ///
    /// Fails like [`mutate`](Self::mutate); the request is left unchanged.
    pub fn array_add_first<T: Serialize + ?Sized>(
        &mut self,
        path: impl AsRef<[u8]>,
        value: &T,
    ) -> Result<&mut Self> {
        self.mutate(OperationKind::ArrayAddFirst, path, Some(value), SpecOptions::default())
    }

    /// [`array_add_first`](Self::array_add_first) with per-call overrides.
    ///
    /// # Errors
    ///
    /// Fails like [`mutate`](Self::mutate); the request is left unchanged.
    pub fn array_add_first_with<T: Serialize + ?Sized>(
        &mut self,
        path: impl AsRef<[u8]>,
        value: &T,
        opts: SpecOptions,
    ) -> Result<&mut Self> {
        self.mutate(OperationKind::ArrayAddFirst, path, Some(value), opts)
    }

    /// Appends to the array at `path`.
    ///
    /// # Errors
    ///
    /// Fails like [`mutate`](Self::mutate); the request is left unchanged.
    pub fn array_add_last<T: Serialize + ?Sized>(
        &mut self,
        path: impl AsRef<[u8]>,
        value: &T,
    ) -> Result<&mut Self> {
        self.mutate(OperationKind::ArrayAddLast, path, Some(value), SpecOptions::default())
    }

    /// [`array_add_last`](Self::array_add_last) with per-call overrides.
    ///
    /// # Errors
    ///
    /// Fails like [`mutate`](Self::mutate); the request is left unchanged.
    pub fn array_add_last_with<T: Serialize + ?Sized>(
        &mut self,
        path: impl AsRef<[u8]>,
        value: &T,
        opts: SpecOptions,
    ) -> Result<&mut Self> {
        self.mutate(OperationKind::ArrayAddLast, path, Some(value), opts)
    }

    /// Appends to the array at `path` unless the value is already present.
    ///
    /// # Errors
    ///
    /// Fails like [`mutate`](Self::mutate); the request is left unchanged.
    pub fn array_add_unique<T: Serialize + ?Sized>(
        &mut self,
        path: impl AsRef<[u8]>,
        value: &T,
    ) -> Result<&mut Self> {
        self.mutate(OperationKind::ArrayAddUnique, path, Some(value), SpecOptions::default())
    }

    /// [`array_add_unique`](Self::array_add_unique) with per-call overrides.
    ///
    /// # Errors
    ///
    /// Fails like [`mutate`](Self::mutate); the request is left unchanged.
    pub fn array_add_unique_with<T: Serialize + ?Sized>(
        &mut self,
        path: impl AsRef<[u8]>,
        value: &T,
        opts: SpecOptions,
    ) -> Result<&mut Self> {
        self.mutate(OperationKind::ArrayAddUnique, path, Some(value), opts)
    }

    /// Adds `delta` to the number at `path`.
    ///
    /// # Errors
    ///
    /// Fails like [`mutate`](Self::mutate); the request is left unchanged.
    pub fn counter<T: Serialize + ?Sized>(
        &mut self,
        path: impl AsRef<[u8]>,
        delta: &T,
    ) -> Result<&mut Self> {
        self.mutate(OperationKind::Counter, path, Some(delta), SpecOptions::default())
    }

    /// [`counter`](Self::counter) with per-call overrides.
    ///
    /// # Errors
    ///
    /// Fails like [`mutate`](Self::mutate); the request is left unchanged.
    pub fn counter_with<T: Serialize + ?Sized>(
        &mut self,
        path: impl AsRef<[u8]>,
        delta: &T,
        opts: SpecOptions,
    ) -> Result<&mut Self> {
        self.mutate(OperationKind::Counter, path, Some(delta), opts)
    }

    /// Overwrites the existing value at `path`.
    ///
    /// # Errors
    ///
    /// Fails like [`mutate`](Self::mutate); the request is left unchanged.
    pub fn replace<T: Serialize + ?Sized>(
        &mut self,
        path: impl AsRef<[u8]>,
        value: &T,
    ) -> Result<&mut Self> {
        self.mutate(OperationKind::Replace, path, Some(value), SpecOptions::default())
    }

    /// [`replace`](Self::replace) with per-call overrides. A create-intermediates
    /// override is discarded.
    ///
    /// # Errors
    ///
    /// Fails like [`mutate`](Self::mutate); the request is left unchanged.
    pub fn replace_with<T: Serialize + ?Sized>(
        &mut self,
        path: impl AsRef<[u8]>,
        value: &T,
        opts: SpecOptions,
    ) -> Result<&mut Self> {
        self.mutate(OperationKind::Replace, path, Some(value), opts)
    }

    /// Inserts into an array at the index `path` ends with.
    ///
    /// # Errors
    ///
    /// Fails like [`mutate`](Self::mutate); the request is left unchanged.
    pub fn array_insert<T: Serialize + ?Sized>(
        &mut self,
        path: impl AsRef<[u8]>,
        value: &T,
    ) -> Result<&mut Self> {
        self.mutate(OperationKind::ArrayInsert, path, Some(value), SpecOptions::default())
    }

    /// [`array_insert`](Self::array_insert) with per-call overrides. A
    /// create-intermediates override is discarded.
    ///
    /// # Errors
    ///
    /// Fails like [`mutate`](Self::mutate); the request is left unchanged.
    pub fn array_insert_with<T: Serialize + ?Sized>(
        &mut self,
        path: impl AsRef<[u8]>,
        value: &T,
        opts: SpecOptions,
    ) -> Result<&mut Self> {
        self.mutate(OperationKind::ArrayInsert, path, Some(value), opts)
    }

    // -- Compilation and memory --

    /// Compiles the appended specs into a contiguous batch.
    ///
    /// The first call packs the specs and drops the spec list; later calls
    /// return the same batch without reprocessing.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::Released` after [`release`](Self::release), or
    /// `SdkError::Codec` if the batch cannot be packed.
    pub fn to_buffer(&mut self) -> Result<&CompiledBatch> {
        if let Some(specs) = self.specs.as_deref() {
            let batch = CompiledBatch::compile(specs).context(CodecSnafu)?;
            tracing::debug!(
                key = %self.key,
                count = batch.count(),
                arena_bytes = batch.arena().len(),
                "compiled sub-document batch"
            );
            self.specs = None;
            self.compiled = Some(batch);
        }
        self.compiled.as_ref().context(ReleasedSnafu)
    }

    /// Drops the compiled buffer and its arena.
    ///
    /// Call only after the executor has finished reading the buffer. The
    /// request cannot be compiled again; quiet flags are kept.
    pub fn release(&mut self) {
        let had_specs = self.specs.take().is_some();
        let had_batch = self.compiled.take().is_some();
        if had_specs || had_batch {
            tracing::debug!(key = %self.key, "released sub-document batch memory");
        }
    }

    /// Classifies executor results with this request's quiet flags.
    ///
    /// # Errors
    ///
    /// See [`interpret`].
    pub fn interpret(&self, results: Vec<SpecResult>) -> Result<Vec<SpecOutcome>> {
        interpret(results, &self.quiet_flags)
    }
}

impl<E: SubdocExecutor> SubdocRequest<'_, E> {
    /// Hands the request to its executor.
    ///
    /// `options` are merged over the options captured at construction. The
    /// executor and captured options are consumed, so a request executes at
    /// most once.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::AlreadyExecuted` on a second call, or whatever the
    /// executor reports.
    pub async fn execute(&mut self, options: ExecOptions) -> Result<Vec<SpecResult>> {
        let executor = self.executor.take().context(AlreadyExecutedSnafu)?;
        let options = self.exec_opts.take().unwrap_or_default().merge(options);
        tracing::debug!(
            key = %self.key,
            mode = %self.mode,
            specs = self.quiet_flags.len(),
            "executing sub-document batch"
        );
        executor.execute_subdoc_batch(self, options).await
    }
}

impl<E> std::fmt::Debug for SubdocRequest<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubdocRequest")
            .field("key", &self.key)
            .field("mode", &self.mode)
            .field("specs", &self.quiet_flags.len())
            .field("compiled", &self.compiled.is_some())
            .field("executed", &self.executor.is_none())
            .finish()
    }
}

/// Extract specs from a request for testing purposes.
#[cfg(test)]
impl<E> SubdocRequest<'_, E> {
    fn spec_list(&self) -> Vec<OperationSpec> {
        self.specs.clone().unwrap_or_default()
    }
}
