//! Proptest strategies for partial values
//!
//! Generators here stay canonical by construction: sparse containers go
//! through `Sparse::new`, so the usual cleanup (window clamp, trailing
//! filler, sector truncation) has already run on everything a test
//! receives.

use proptest::collection::vec;
use proptest::prelude::*;

use tessera_core::{Element, Record, SliceSpec, Sparse, SparseBytes, SparseSeq, Value, MAX_LENGTH};
use tessera_sectors::SectorSet;

/// Scalar payloads, including the two resolution identities.
pub fn scalar_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        1 => Just(Value::Top),
        1 => Just(Value::Default),
        3 => any::<i64>().prop_map(Value::Int),
        2 => (-1.0e6..1.0e6f64).prop_map(Value::Float),
        2 => vec(any::<u8>(), 0..6).prop_map(|payload| Value::Bytes(payload.into())),
    ]
}

/// Arbitrary values: scalars plus nested sequences, records and sparse
/// containers up to a small depth.
pub fn value() -> impl Strategy<Value = Value> {
    scalar_value().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            vec(inner.clone(), 0..4).prop_map(Value::Seq),
            record_of(inner.clone()),
            sparse_with(inner).prop_map(|sparse| sparse.into_value()),
        ]
    })
}

/// Values without sparse containers at any depth.
pub fn dense_value() -> impl Strategy<Value = Value> {
    scalar_value().prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            vec(inner.clone(), 0..4).prop_map(Value::Seq),
            record_of(inner),
        ]
    })
}

fn field_name() -> impl Strategy<Value = String> {
    (0..6u32).prop_map(|i| format!("f{}", i))
}

fn record_of(inner: BoxedStrategy<Value>) -> impl Strategy<Value = Value> {
    vec((field_name(), inner), 0..4).prop_map(|fields| {
        let mut record = Record::new();
        for (name, value) in fields {
            record.set(name, value);
        }
        Value::Record(record)
    })
}

/// Sparse containers over `cell`. The length window always contains the
/// backing length, with `None` slack standing for an unbounded maximum,
/// and the seeded sectors land inside the backing.
pub fn sparse_with<E>(cell: impl Strategy<Value = E> + Clone) -> impl Strategy<Value = Sparse<E>>
where
    E: Element + 'static,
{
    (
        vec(cell, 0..5),
        0..3usize,
        prop_oneof![3 => (0..4usize).prop_map(Some), 1 => Just(None)],
        vec((0..6usize, 1..4usize), 0..3),
    )
        .prop_map(|(cells, below, above, seeds)| {
            let len = cells.len();
            let min = len.saturating_sub(below);
            let max = match above {
                Some(above) => len + above,
                None => MAX_LENGTH,
            };
            let mut sectors = SectorSet::new();
            for (start, span) in seeds {
                let start = start.min(len);
                sectors.add(start..(start + span).min(len));
            }
            Sparse::new(cells, min, max, sectors)
        })
}

/// Sparse sequences with integer or filler cells.
pub fn sparse_seq() -> impl Strategy<Value = SparseSeq> {
    sparse_with(prop_oneof![
        1 => Just(Value::Default),
        3 => any::<i64>().prop_map(Value::Int),
    ])
}

/// Sparse byte strings with occasional undetermined cells.
pub fn sparse_bytes() -> impl Strategy<Value = SparseBytes> {
    sparse_with(prop_oneof![
        1 => Just(None),
        3 => any::<u8>().prop_map(Some),
    ])
}

/// Slice specs biased toward plain contiguous slices, with occasional
/// negative bounds and extended steps.
pub fn slice_spec() -> impl Strategy<Value = SliceSpec> {
    slice_case().prop_map(|(_, start, stop, step)| {
        SliceSpec::between(start, stop).with_step(step)
    })
}

/// A sequence length together with raw slice bounds, for oracle tests
/// that need the unnormalized parts.
pub fn slice_case() -> impl Strategy<Value = (usize, Option<isize>, Option<isize>, isize)> {
    let bound = prop_oneof![1 => Just(None), 3 => (-9isize..9).prop_map(Some)];
    let step = prop_oneof![
        3 => Just(1isize),
        1 => 2isize..4,
        1 => -3isize..0,
    ];
    (0..8usize, bound.clone(), bound, step)
}

/// Scripts of raw interval operations: `(additive, start, end)` with
/// inverted and empty ranges left in deliberately.
pub fn interval_ops(universe: usize) -> impl Strategy<Value = Vec<(bool, usize, usize)>> {
    vec((any::<bool>(), 0..universe, 0..universe), 0..24)
}
