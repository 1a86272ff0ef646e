//! Fuzz target for compiled batch decoding.
//!
//! Tests that arbitrary record blocks and arenas fed to
//! `CompiledBatch::from_parts` never panic, and that every accepted batch
//! yields in-bounds views that recompile to the same bytes.

#![no_main]

use libfuzzer_sys::fuzz_target;

use docbatch_types::{CompiledBatch, OperationSpec, SpecRecord};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // First byte picks how many records the input carries; the rest is arena.
    let records_len = (usize::from(data[0]) * SpecRecord::SIZE).min(data.len() - 1);
    let (records, arena) = data[1..].split_at(records_len);

    let Ok(batch) = CompiledBatch::from_parts(records, arena.to_vec()) else {
        return;
    };

    let specs: Vec<OperationSpec> = batch
        .iter()
        .map(|view| {
            let view = view.expect("accepted batch must yield valid views");
            OperationSpec::new(
                view.kind,
                view.path,
                view.create_intermediates,
                view.value.map(<[u8]>::to_vec),
                false,
            )
        })
        .collect();

    let recompiled = CompiledBatch::compile(&specs).expect("recompile accepted batch");
    assert_eq!(recompiled.count(), batch.count());
    for (left, right) in recompiled.iter().zip(batch.iter()) {
        assert_eq!(left.expect("view"), right.expect("view"));
    }
});
