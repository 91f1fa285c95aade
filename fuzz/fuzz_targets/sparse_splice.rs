//! Slice reads, writes and deletes over sparse sequences: representation
//! invariants after every operation. Windows stay bounded so splices
//! cannot ask for absurd backing extensions.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tessera_core::{SliceSpec, Sparse, SparseSeq, Value};
use tessera_sectors::SectorSet;
use tessera_test::properties;

#[derive(Arbitrary, Debug)]
struct Case {
    cells: Vec<(i8, bool)>,
    below: u8,
    above: u8,
    runs: Vec<(u8, u8)>,
    ops: Vec<SliceOp>,
}

#[derive(Arbitrary, Debug, Clone, Copy)]
enum SliceOp {
    Get {
        start: Option<i8>,
        stop: Option<i8>,
        step: i8,
    },
    Set {
        start: Option<i8>,
        stop: Option<i8>,
        step: i8,
        payload_len: u8,
    },
    Delete {
        start: Option<i8>,
        stop: Option<i8>,
        step: i8,
    },
    SetScalar {
        index: i8,
        cell: i8,
    },
    GetScalar {
        index: i8,
    },
}

fn spec(start: Option<i8>, stop: Option<i8>, step: i8) -> SliceSpec {
    let step = (step % 4) as isize;
    let step = if step == 0 { 1 } else { step };
    SliceSpec::between(start.map(isize::from), stop.map(isize::from)).with_step(step)
}

fn check(sparse: &SparseSeq) {
    let (min, max) = sparse.length_range();
    assert!(min <= max, "length window inverted");
    assert!(sparse.backing().len() <= max, "backing exceeds the window");
    if let Some(last) = sparse.backing().last() {
        assert!(
            !matches!(last, Value::Default),
            "trailing filler survived cleanup"
        );
    }
    if let Some(last) = sparse.sectors().last() {
        assert!(
            last.end <= sparse.backing().len(),
            "sector marks positions past the backing"
        );
    }
}

fuzz_target!(|case: Case| {
    let cells: Vec<Value> = case
        .cells
        .iter()
        .take(8)
        .map(|(n, filler)| {
            if *filler {
                Value::Default
            } else {
                Value::Int(*n as i64)
            }
        })
        .collect();
    let len = cells.len();
    let min = len.saturating_sub(case.below as usize % 4);
    let max = len + case.above as usize % 4;
    let mut sectors = SectorSet::new();
    for (start, span) in case.runs.iter().take(4) {
        let start = (*start as usize).min(len);
        sectors.add(start..(start + 1 + *span as usize % 3).min(len));
    }
    let mut sparse = Sparse::new(cells, min, max, sectors);
    check(&sparse);

    for op in case.ops.iter().take(16) {
        match *op {
            SliceOp::Get { start, stop, step } => {
                let _ = sparse.get_slice(&spec(start, stop, step));
            }
            SliceOp::Set {
                start,
                stop,
                step,
                payload_len,
            } => {
                let payload = vec![Value::Int(7); payload_len as usize % 8];
                let _ = sparse.set_slice(&spec(start, stop, step), payload);
            }
            SliceOp::Delete { start, stop, step } => {
                let _ = sparse.delete_slice(&spec(start, stop, step));
            }
            SliceOp::SetScalar { index, cell } => {
                let _ = sparse.set(index as isize, Value::Int(cell as i64));
            }
            SliceOp::GetScalar { index } => {
                let _ = sparse.get(index as isize);
            }
        }
        check(&sparse);
    }

    assert!(properties::merge_idempotent(&sparse.into_value()));
});
