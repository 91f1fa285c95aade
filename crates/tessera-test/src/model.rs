//! Reference models for the reconciliation engine
//!
//! - [`slice_samples`]: positional enumeration of what a slice visits,
//!   with no closed-form run arithmetic
//! - [`IntervalModel`]: bit-per-position oracle for `SectorSet`
//! - [`properties`]: laws every merge outcome must satisfy

/// The positions `[start:stop:step]` visits on a sequence of `len`
/// elements, in visit order. Bounds normalize the way Python slices do.
pub fn slice_samples(
    len: usize,
    start: Option<isize>,
    stop: Option<isize>,
    step: isize,
) -> Vec<usize> {
    assert!(step != 0, "slice step cannot be zero");
    let n = len as isize;
    let norm = |bound: isize| if bound < 0 { bound + n } else { bound };
    let mut out = Vec::new();
    if step > 0 {
        let start = start.map_or(0, norm).clamp(0, n);
        let stop = stop.map_or(n, norm).clamp(0, n);
        let mut p = start;
        while p < stop {
            out.push(p as usize);
            p += step;
        }
    } else {
        let start = start.map_or(n - 1, norm).clamp(-1, n - 1);
        let stop = stop.map_or(-1, norm).clamp(-1, n - 1);
        let mut p = start;
        while p > stop {
            out.push(p as usize);
            p += step;
        }
    }
    out
}

/// Bit-per-position oracle for sector arithmetic.
#[derive(Clone, Debug, Default)]
pub struct IntervalModel {
    bits: Vec<bool>,
}

impl IntervalModel {
    pub fn new() -> Self {
        IntervalModel::default()
    }

    pub fn add(&mut self, start: usize, end: usize) {
        if self.bits.len() < end {
            self.bits.resize(end, false);
        }
        for i in start..end.min(self.bits.len()) {
            self.bits[i] = true;
        }
    }

    pub fn sub(&mut self, start: usize, end: usize) {
        for i in start..end.min(self.bits.len()) {
            self.bits[i] = false;
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.bits.get(index).copied().unwrap_or(false)
    }

    /// Maximal covered runs, in order.
    pub fn ranges(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        let mut run_start = None;
        for (i, &bit) in self.bits.iter().enumerate() {
            match (bit, run_start) {
                (true, None) => run_start = Some(i),
                (false, Some(start)) => {
                    out.push((start, i));
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run_start {
            out.push((start, self.bits.len()));
        }
        out
    }

    /// Whether a covered run cuts the interval `[start, end)`. An empty
    /// interval strictly inside a run counts as cut.
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.ranges().iter().any(|&(s, e)| s < end && e > start)
    }
}

/// Laws every merge outcome must satisfy, phrased as predicates so both
/// proptest suites and fuzz targets can share them.
pub mod properties {
    use tessera_core::Value;

    /// Merging a value with itself gains nothing.
    pub fn merge_idempotent(value: &Value) -> bool {
        matches!(
            value.clone().imerge(value),
            Ok((ref merged, false)) if *merged == *value
        )
    }

    /// `Top` keeps nothing of its own and adopts the peer wholesale.
    pub fn top_yields(value: &Value) -> bool {
        let keeps = matches!(
            value.clone().imerge(&Value::Top),
            Ok((ref merged, false)) if *merged == *value
        );
        let adopts = match Value::Top.imerge(value) {
            Ok((merged, changed)) => {
                merged == *value && changed == !matches!(value, Value::Top)
            }
            Err(_) => false,
        };
        keeps && adopts
    }

    /// Filler loses to content but ties with `Top` and itself.
    pub fn default_yields(value: &Value) -> bool {
        match Value::Default.imerge(value) {
            Ok((merged, changed)) => match value {
                Value::Top | Value::Default => merged == Value::Default && !changed,
                _ => merged == *value && changed,
            },
            Err(_) => false,
        }
    }

    /// A successful merge stays compatible with its left operand:
    /// folding the result back over it cannot conflict.
    pub fn result_compatible_with_left(left: &Value, right: &Value) -> bool {
        match left.clone().imerge(right) {
            Ok((merged, _)) => merged.imerge(left).is_ok(),
            Err(_) => true,
        }
    }

    /// Folding the result back over the left operand gains nothing.
    /// Dense values only: sparse cleanup can shed a touched filler cell
    /// and re-adopt it on the fold-back.
    pub fn result_subsumes_left(left: &Value, right: &Value) -> bool {
        match left.clone().imerge(right) {
            Ok((merged, _)) => matches!(merged.imerge(left), Ok((_, false))),
            Err(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use tessera_core::{run_length, SliceSpec, Sparse, Value};
    use tessera_sectors::SectorSet;

    use crate::strategies;

    use super::properties;
    use super::*;

    proptest! {
        #[test]
        fn merge_is_idempotent(value in strategies::value()) {
            prop_assert!(properties::merge_idempotent(&value));
        }

        #[test]
        fn top_yields_everywhere(value in strategies::value()) {
            prop_assert!(properties::top_yields(&value));
        }

        #[test]
        fn filler_yields_to_content(value in strategies::value()) {
            prop_assert!(properties::default_yields(&value));
        }

        #[test]
        fn merge_result_stays_compatible(
            left in strategies::value(),
            right in strategies::value(),
        ) {
            prop_assert!(properties::result_compatible_with_left(&left, &right));
        }

        #[test]
        fn merge_result_subsumes_dense_left(
            left in strategies::dense_value(),
            right in strategies::dense_value(),
        ) {
            prop_assert!(properties::result_subsumes_left(&left, &right));
        }

        #[test]
        fn sector_set_matches_bit_model(ops in strategies::interval_ops(32)) {
            let mut set = SectorSet::new();
            let mut model = IntervalModel::new();
            for (additive, start, end) in ops {
                if additive {
                    set.add(start..end);
                    model.add(start, end);
                } else {
                    set.sub(start..end);
                    model.sub(start, end);
                }
                let got: Vec<(usize, usize)> =
                    set.iter().map(|s| (s.start, s.end)).collect();
                prop_assert_eq!(got, model.ranges());
            }
            for i in 0..40 {
                prop_assert_eq!(set.contains_point(i), model.contains(i));
            }
        }

        #[test]
        fn cut_detection_matches_bit_model(
            ops in strategies::interval_ops(32),
            probe_start in 0..36usize,
            probe_end in 0..36usize,
        ) {
            let mut set = SectorSet::new();
            let mut model = IntervalModel::new();
            for (additive, start, end) in ops {
                if additive {
                    set.add(start..end);
                    model.add(start, end);
                } else {
                    set.sub(start..end);
                    model.sub(start, end);
                }
            }
            prop_assert_eq!(
                set.is_cutting(probe_start..probe_end),
                model.overlaps(probe_start, probe_end)
            );
        }

        #[test]
        fn run_length_matches_sample_count(
            (len, start, stop, step) in strategies::slice_case(),
        ) {
            let samples = slice_samples(len, start, stop, step);
            let spec = SliceSpec::between(start, stop).with_step(step);
            let (lo, hi, st) = spec.indices(len);
            prop_assert_eq!(run_length(lo, hi, st), samples.len());
            let mut walked = Vec::new();
            let mut p = lo;
            for _ in 0..run_length(lo, hi, st) {
                walked.push(p as usize);
                p += st;
            }
            prop_assert_eq!(walked, samples);
        }

        #[test]
        fn concrete_slice_read_matches_samples(
            (len, start, stop, step) in strategies::slice_case(),
            seed in any::<i64>(),
        ) {
            let cells: Vec<Value> =
                (0..len).map(|i| Value::Int(seed.wrapping_add(i as i64))).collect();
            let sparse = Sparse::new(
                cells.clone(),
                len,
                len,
                SectorSet::from_ranges([(0, len)]),
            );
            let spec = SliceSpec::between(start, stop).with_step(step);
            let expected: Vec<Value> = slice_samples(len, start, stop, step)
                .into_iter()
                .map(|i| cells[i].clone())
                .collect();
            prop_assert_eq!(sparse.get_slice(&spec), Value::Seq(expected));
        }

        #[test]
        fn sparse_slice_read_projects_sectors(
            cells in prop::collection::vec((0..5i64, any::<bool>()), 0..10),
            (_, start, stop, step) in strategies::slice_case(),
        ) {
            let len = cells.len();
            let mut backing = Vec::with_capacity(len);
            let mut sectors = SectorSet::new();
            for (i, (v, touched)) in cells.into_iter().enumerate() {
                backing.push(if touched { Value::Int(v) } else { Value::Default });
                if touched {
                    sectors.add_point(i);
                }
            }
            let sparse = Sparse::new(backing, len, len, sectors);
            let spec = SliceSpec::between(start, stop).with_step(step);
            let samples = slice_samples(len, start, stop, step);
            match sparse.get_slice(&spec) {
                Value::Seq(got) => {
                    prop_assert_eq!(got.len(), samples.len());
                    for (k, &p) in samples.iter().enumerate() {
                        prop_assert!(sparse.sectors().contains_point(p));
                        prop_assert_eq!(got[k].clone(), sparse.value_at(p));
                    }
                }
                Value::Sparse(out) => {
                    prop_assert_eq!(out.length_range(), (samples.len(), samples.len()));
                    for (k, &p) in samples.iter().enumerate() {
                        prop_assert_eq!(
                            out.sectors().contains_point(k),
                            sparse.sectors().contains_point(p)
                        );
                        if out.sectors().contains_point(k) {
                            prop_assert_eq!(out.value_at(k), sparse.value_at(p));
                        }
                    }
                }
                other => prop_assert!(false, "unexpected slice result {}", other),
            }
        }

        #[test]
        fn concrete_merge_matches_elementwise_oracle(
            cells in prop::collection::vec((0..3i64, any::<bool>()), 0..8),
            below in 0..3usize,
            above in 0..3usize,
            pick in 0..8usize,
            pool in prop::collection::vec(0..3i64, 12),
        ) {
            let mut backing = Vec::with_capacity(cells.len());
            let mut sectors = SectorSet::new();
            for (i, (v, touched)) in cells.into_iter().enumerate() {
                backing.push(if touched { Value::Int(v) } else { Value::Default });
                if touched {
                    sectors.add_point(i);
                }
            }
            let len = backing.len();
            let sparse = Sparse::new(backing, len.saturating_sub(below), len + above, sectors);
            let (lo, hi) = sparse.length_range();
            let cand_len = lo + pick % (hi - lo + 1);
            let candidate: Vec<Value> =
                pool[..cand_len].iter().map(|&v| Value::Int(v)).collect();

            let mut expected = Vec::with_capacity(cand_len);
            let mut conflict = false;
            for (i, cand) in candidate.iter().enumerate() {
                if sparse.sectors().contains_point(i) {
                    match sparse.value_at(i).imerge(cand) {
                        Ok((cell, _)) => expected.push(cell),
                        Err(_) => {
                            conflict = true;
                            break;
                        }
                    }
                } else {
                    expected.push(cand.clone());
                }
            }

            let result = Value::Sparse(Box::new(sparse)).imerge(&Value::Seq(candidate));
            if conflict {
                prop_assert!(result.is_err());
            } else {
                let (merged, changed) = result.unwrap();
                prop_assert_eq!(merged, Value::Seq(expected));
                prop_assert!(changed);
            }
        }
    }
}
