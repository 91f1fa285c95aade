//! Sector arithmetic under random op scripts: structural invariants
//! after every step, bit-model equivalence while the script sticks to
//! add/sub.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tessera_sectors::SectorSet;
use tessera_test::IntervalModel;

#[derive(Arbitrary, Debug, Clone, Copy)]
enum SectorOp {
    Add { start: u8, span: u8 },
    Sub { start: u8, span: u8 },
    ShiftTail { from: u8, delta: i8 },
    Truncate { from: u8 },
}

fuzz_target!(|ops: Vec<SectorOp>| {
    let mut set = SectorSet::new();
    let mut model = Some(IntervalModel::new());

    for op in ops {
        match op {
            SectorOp::Add { start, span } => {
                let (start, end) = (start as usize, start as usize + span as usize);
                set.add(start..end);
                if let Some(model) = model.as_mut() {
                    model.add(start, end);
                }
            }
            SectorOp::Sub { start, span } => {
                let (start, end) = (start as usize, start as usize + span as usize);
                set.sub(start..end);
                if let Some(model) = model.as_mut() {
                    model.sub(start, end);
                }
            }
            SectorOp::ShiftTail { from, delta } => {
                set.shift_tail(from as usize, delta as isize);
                // the bit model does not follow whole-sector moves
                model = None;
            }
            SectorOp::Truncate { from } => {
                set.truncate_from(from as usize);
                model = None;
            }
        }

        let sectors = set.as_slice();
        for sector in sectors {
            assert!(sector.start < sector.end, "empty sector stored");
        }
        for pair in sectors.windows(2) {
            assert!(pair[0].end < pair[1].start, "sectors not disjoint and coalesced");
        }
    }

    if let Some(model) = model {
        let got: Vec<(usize, usize)> = set.iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(got, model.ranges());
        for i in 0..512 {
            assert_eq!(set.contains_point(i), model.contains(i));
        }
    }
});
