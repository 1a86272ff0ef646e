//! Compiled batch layout.
//!
//! A batch compiles into a contiguous block of fixed-size [`SpecRecord`]s plus
//! an arena holding every path and value byte. Records reference the arena by
//! offset and explicit length; nothing is NUL-terminated, so readers must use
//! the recorded lengths.
//!
//! ```text
//! records: [rec 0][rec 1]...[rec n-1]     (n * 20 bytes, little-endian)
//! arena:   path0 value0 path1 path2 value2 ...
//! ```

use snafu::{Snafu, ensure};
use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
    byteorder::{LittleEndian, U16, U32},
};

use crate::{kind::OperationKind, spec::OperationSpec};

/// Record flag: create missing parent containers.
pub const FLAG_CREATE_INTERMEDIATES: u8 = 0x01;

/// Error type for compiling or reading a batch.
#[derive(Debug, Snafu)]
pub enum CodecError {
    /// The record block is not a whole number of records.
    #[snafu(display("Record block of {len} bytes is not a multiple of {record_size}"))]
    Truncated {
        /// Length of the received block.
        len: usize,
        /// Size of one record.
        record_size: usize,
    },

    /// A record carries an opcode no kind maps to.
    #[snafu(display("Record {index} has unknown opcode {opcode}"))]
    UnknownOpcode {
        /// Record position.
        index: usize,
        /// Offending opcode.
        opcode: u8,
    },

    /// A record references bytes outside the arena.
    #[snafu(display("Record {index} references {start}..{end} outside arena of {arena_len} bytes"))]
    OutOfBounds {
        /// Record position.
        index: usize,
        /// Range start.
        start: u64,
        /// Range end (exclusive).
        end: u64,
        /// Arena length.
        arena_len: usize,
    },

    /// A record for a valueless kind references value bytes.
    #[snafu(display("Record {index} ({kind}) must not carry a value"))]
    UnexpectedValue {
        /// Record position.
        index: usize,
        /// Kind decoded from the record.
        kind: OperationKind,
    },

    /// Path and value bytes do not fit 32-bit offsets.
    #[snafu(display("Batch arena exceeds {max} bytes"))]
    ArenaOverflow {
        /// Largest addressable arena.
        max: u64,
    },
}

/// Fixed-layout record for one spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct SpecRecord {
    opcode: u8,
    flags: u8,
    reserved: U16<LittleEndian>,
    path_offset: U32<LittleEndian>,
    path_len: U32<LittleEndian>,
    value_offset: U32<LittleEndian>,
    value_len: U32<LittleEndian>,
}

impl SpecRecord {
    /// Encoded size of one record in bytes.
    pub const SIZE: usize = size_of::<Self>();

    /// Wire opcode.
    #[must_use]
    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    /// Raw flag bits.
    #[must_use]
    pub fn flags(&self) -> u8 {
        self.flags
    }

    /// `(offset, len)` of the path in the arena.
    #[must_use]
    pub fn path_range(&self) -> (u32, u32) {
        (self.path_offset.get(), self.path_len.get())
    }

    /// `(offset, len)` of the value in the arena; `(0, 0)` when absent.
    #[must_use]
    pub fn value_range(&self) -> (u32, u32) {
        (self.value_offset.get(), self.value_len.get())
    }
}

/// Borrowed view of a record resolved against its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecView<'a> {
    /// Operation kind.
    pub kind: OperationKind,
    /// Path bytes.
    pub path: &'a [u8],
    /// Value bytes, present for value-carrying kinds.
    pub value: Option<&'a [u8]>,
    /// Whether missing parents are created.
    pub create_intermediates: bool,
}

/// A batch packed into records and an arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledBatch {
    records: Vec<SpecRecord>,
    arena: Vec<u8>,
}

impl CompiledBatch {
    /// Packs specs in order into a record block and arena.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::ArenaOverflow` if the combined path and value
    /// bytes cannot be addressed with 32-bit offsets.
    pub fn compile(specs: &[OperationSpec]) -> Result<Self, CodecError> {
        let arena_len: usize = specs.iter().map(OperationSpec::arena_bytes).sum();
        ensure!(u32::try_from(arena_len).is_ok(), ArenaOverflowSnafu { max: u64::from(u32::MAX) });

        let mut records = Vec::with_capacity(specs.len());
        let mut arena = Vec::with_capacity(arena_len);

        for spec in specs {
            let (path_offset, path_len) = push_bytes(&mut arena, spec.path());
            let (value_offset, value_len) = match spec.value() {
                Some(value) => push_bytes(&mut arena, value),
                None => (0, 0),
            };
            let flags = if spec.create_intermediates() { FLAG_CREATE_INTERMEDIATES } else { 0 };
            records.push(SpecRecord {
                opcode: spec.kind().opcode(),
                flags,
                reserved: U16::ZERO,
                path_offset: U32::new(path_offset),
                path_len: U32::new(path_len),
                value_offset: U32::new(value_offset),
                value_len: U32::new(value_len),
            });
        }

        Ok(Self { records, arena })
    }

    /// Rebuilds a batch from a received record block and arena, validating
    /// every record.
    ///
    /// # Errors
    ///
    /// Returns `CodecError` if the block is truncated, an opcode is unknown, a
    /// range falls outside the arena, or a valueless kind carries value bytes.
    pub fn from_parts(records: &[u8], arena: Vec<u8>) -> Result<Self, CodecError> {
        let records = <[SpecRecord]>::ref_from_bytes(records)
            .map_err(|_| CodecError::Truncated { len: records.len(), record_size: SpecRecord::SIZE })?
            .to_vec();
        let batch = Self { records, arena };
        for index in 0..batch.records.len() {
            batch.view(index)?;
        }
        Ok(batch)
    }

    /// Number of records.
    #[must_use]
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the batch has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The contiguous record block.
    #[must_use]
    pub fn records_bytes(&self) -> &[u8] {
        self.records.as_bytes()
    }

    /// The arena backing every record.
    #[must_use]
    pub fn arena(&self) -> &[u8] {
        &self.arena
    }

    /// Raw record at `index`.
    #[must_use]
    pub fn record(&self, index: usize) -> Option<&SpecRecord> {
        self.records.get(index)
    }

    /// Resolves the record at `index` against the arena.
    ///
    /// # Errors
    ///
    /// Returns `CodecError` if the record is malformed. Batches built with
    /// [`CompiledBatch::compile`] never fail here.
    pub fn view(&self, index: usize) -> Result<SpecView<'_>, CodecError> {
        let Some(record) = self.records.get(index) else {
            return Err(CodecError::OutOfBounds {
                index,
                start: 0,
                end: 0,
                arena_len: self.arena.len(),
            });
        };
        let kind = OperationKind::from_opcode(record.opcode)
            .ok_or(CodecError::UnknownOpcode { index, opcode: record.opcode })?;

        let (path_offset, path_len) = record.path_range();
        let path = self.slice(index, path_offset, path_len)?;

        let (value_offset, value_len) = record.value_range();
        let value = if kind.takes_value() {
            Some(self.slice(index, value_offset, value_len)?)
        } else {
            ensure!(value_len == 0, UnexpectedValueSnafu { index, kind });
            None
        };

        Ok(SpecView {
            kind,
            path,
            value,
            create_intermediates: record.flags & FLAG_CREATE_INTERMEDIATES != 0,
        })
    }

    /// Iterates over resolved records in order.
    pub fn iter(&self) -> impl Iterator<Item = Result<SpecView<'_>, CodecError>> + '_ {
        (0..self.records.len()).map(|index| self.view(index))
    }

    fn slice(&self, index: usize, offset: u32, len: u32) -> Result<&[u8], CodecError> {
        let start = u64::from(offset);
        let end = start + u64::from(len);
        let out_of_bounds =
            || CodecError::OutOfBounds { index, start, end, arena_len: self.arena.len() };
        let start = usize::try_from(start).map_err(|_| out_of_bounds())?;
        let end = usize::try_from(end).map_err(|_| out_of_bounds())?;
        self.arena.get(start..end).ok_or_else(out_of_bounds)
    }
}

/// Appends bytes to the arena and returns their `(offset, len)`.
///
/// The caller has already checked the total arena size fits in `u32`.
#[allow(clippy::cast_possible_truncation)]
fn push_bytes(arena: &mut Vec<u8>, bytes: &[u8]) -> (u32, u32) {
    let offset = arena.len() as u32;
    arena.extend_from_slice(bytes);
    (offset, bytes.len() as u32)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn sample_specs() -> Vec<OperationSpec> {
        vec![
            OperationSpec::new(OperationKind::DictUpsert, "x", true, Some(b"42".to_vec()), false),
            OperationSpec::new(OperationKind::Remove, "y", false, None, false),
            OperationSpec::new(OperationKind::Replace, "a.b[0]", false, Some(b"\"z\"".to_vec()), false),
        ]
    }

    #[test]
    fn record_is_twenty_bytes() {
        assert_eq!(SpecRecord::SIZE, 20);
    }

    #[test]
    fn compile_preserves_order_and_fields() {
        let batch = CompiledBatch::compile(&sample_specs()).unwrap();
        assert_eq!(batch.count(), 3);
        assert_eq!(batch.records_bytes().len(), 3 * SpecRecord::SIZE);

        let views: Vec<_> = batch.iter().collect::<Result<_, _>>().unwrap();
        assert_eq!(views[0].kind, OperationKind::DictUpsert);
        assert_eq!(views[0].path, b"x");
        assert_eq!(views[0].value, Some(&b"42"[..]));
        assert!(views[0].create_intermediates);

        assert_eq!(views[1].kind, OperationKind::Remove);
        assert_eq!(views[1].value, None);
        assert!(!views[1].create_intermediates);

        assert_eq!(views[2].path, b"a.b[0]");
        assert_eq!(views[2].value, Some(&b"\"z\""[..]));
    }

    #[test]
    fn arena_is_packed_without_terminators() {
        let batch = CompiledBatch::compile(&sample_specs()).unwrap();
        assert_eq!(batch.arena(), b"x42ya.b[0]\"z\"");
        assert_eq!(batch.record(2).unwrap().path_range(), (4, 6));
    }

    #[test]
    fn record_layout_is_little_endian() {
        let batch = CompiledBatch::compile(&sample_specs()).unwrap();
        let bytes = batch.records_bytes();
        // second record: remove "y" at arena offset 3
        let rec = &bytes[SpecRecord::SIZE..2 * SpecRecord::SIZE];
        assert_eq!(rec[0], OperationKind::Remove.opcode());
        assert_eq!(rec[1], 0);
        assert_eq!(&rec[4..8], &3u32.to_le_bytes());
        assert_eq!(&rec[8..12], &1u32.to_le_bytes());
        assert_eq!(&rec[12..20], &[0u8; 8]);
    }

    #[test]
    fn empty_batch_compiles() {
        let batch = CompiledBatch::compile(&[]).unwrap();
        assert!(batch.is_empty());
        assert!(batch.records_bytes().is_empty());
    }

    #[test]
    fn from_parts_accepts_compiled_output() {
        let batch = CompiledBatch::compile(&sample_specs()).unwrap();
        let rebuilt =
            CompiledBatch::from_parts(batch.records_bytes(), batch.arena().to_vec()).unwrap();
        assert_eq!(rebuilt, batch);
    }

    #[test]
    fn from_parts_rejects_partial_record() {
        let err = CompiledBatch::from_parts(&[0u8; 21], Vec::new()).unwrap_err();
        assert!(matches!(err, CodecError::Truncated { len: 21, record_size: 20 }));
    }

    #[test]
    fn from_parts_rejects_unknown_opcode() {
        let batch = CompiledBatch::compile(&sample_specs()).unwrap();
        let mut bytes = batch.records_bytes().to_vec();
        bytes[SpecRecord::SIZE] = 0x7f;
        let err = CompiledBatch::from_parts(&bytes, batch.arena().to_vec()).unwrap_err();
        assert!(matches!(err, CodecError::UnknownOpcode { index: 1, opcode: 0x7f }));
    }

    #[test]
    fn from_parts_rejects_range_past_arena() {
        let batch = CompiledBatch::compile(&sample_specs()).unwrap();
        let mut arena = batch.arena().to_vec();
        arena.truncate(5);
        let err = CompiledBatch::from_parts(batch.records_bytes(), arena).unwrap_err();
        assert!(matches!(err, CodecError::OutOfBounds { index: 2, .. }));
    }

    #[test]
    fn from_parts_rejects_value_on_remove() {
        let batch = CompiledBatch::compile(&sample_specs()).unwrap();
        let mut bytes = batch.records_bytes().to_vec();
        // value_len of the remove record
        bytes[SpecRecord::SIZE + 16] = 1;
        let err = CompiledBatch::from_parts(&bytes, batch.arena().to_vec()).unwrap_err();
        assert!(matches!(err, CodecError::UnexpectedValue { index: 1, .. }));
    }

    proptest! {
        #[test]
        fn from_parts_never_panics(
            records in prop::collection::vec(any::<u8>(), 0..128),
            arena in prop::collection::vec(any::<u8>(), 0..64),
        ) {
            let _ = CompiledBatch::from_parts(&records, arena);
        }
    }
}
