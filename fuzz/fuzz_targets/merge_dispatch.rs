//! Merge dispatch across arbitrary value pairs: no panics, and the
//! merge laws hold whatever the shapes are.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tessera_core::{Element, Record, Sparse, Value, MAX_LENGTH};
use tessera_sectors::SectorSet;
use tessera_test::properties;

#[derive(Arbitrary, Debug)]
enum Seed {
    Top,
    Default,
    Int(i64),
    Float(i32),
    Bytes(Vec<u8>),
    Seq(Vec<Seed>),
    Record(Vec<(u8, Seed)>),
    SparseSeq {
        cells: Vec<Seed>,
        below: u8,
        above: Option<u8>,
        runs: Vec<(u8, u8)>,
    },
    SparseBytes {
        cells: Vec<Option<u8>>,
        below: u8,
        above: Option<u8>,
        runs: Vec<(u8, u8)>,
    },
}

const MAX_DEPTH: usize = 4;

fn build(seed: &Seed, depth: usize) -> Value {
    if depth >= MAX_DEPTH {
        return Value::Top;
    }
    match seed {
        Seed::Top => Value::Top,
        Seed::Default => Value::Default,
        Seed::Int(n) => Value::Int(*n),
        Seed::Float(n) => Value::Float(*n as f64 / 16.0),
        Seed::Bytes(payload) => Value::Bytes(payload.clone().into()),
        Seed::Seq(cells) => Value::Seq(
            cells
                .iter()
                .take(6)
                .map(|cell| build(cell, depth + 1))
                .collect(),
        ),
        Seed::Record(fields) => {
            let mut record = Record::new();
            for (name, value) in fields.iter().take(6) {
                record.set(format!("f{}", name % 8), build(value, depth + 1));
            }
            Value::Record(record)
        }
        Seed::SparseSeq {
            cells,
            below,
            above,
            runs,
        } => {
            let cells: Vec<Value> = cells
                .iter()
                .take(6)
                .map(|cell| build(cell, depth + 1))
                .collect();
            sparse_value(cells, *below, *above, runs)
        }
        Seed::SparseBytes {
            cells,
            below,
            above,
            runs,
        } => sparse_value(cells.iter().copied().take(6).collect(), *below, *above, runs),
    }
}

fn sparse_value<E: Element>(cells: Vec<E>, below: u8, above: Option<u8>, runs: &[(u8, u8)]) -> Value {
    let len = cells.len();
    let min = len.saturating_sub(below as usize % 4);
    let max = match above {
        Some(above) => len + above as usize % 4,
        None => MAX_LENGTH,
    };
    let mut sectors = SectorSet::new();
    for (start, span) in runs.iter().take(4) {
        let start = (*start as usize).min(len);
        sectors.add(start..(start + 1 + *span as usize % 3).min(len));
    }
    Sparse::new(cells, min, max, sectors).into_value()
}

fuzz_target!(|pair: (Seed, Seed)| {
    let left = build(&pair.0, 0);
    let right = build(&pair.1, 0);

    assert!(properties::merge_idempotent(&left));
    assert!(properties::top_yields(&right));
    assert!(properties::default_yields(&right));
    assert!(properties::result_compatible_with_left(&left, &right));
});
