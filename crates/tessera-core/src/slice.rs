//! Python-style slice normalization
//!
//! Sparse sequences are indexed with signed, optional-endpoint slices.
//! `SliceSpec::indices` clamps a spec against a concrete length exactly
//! the way CPython's `slice.indices` does, so slice behavior matches the
//! descriptions binary formats are written against.

/// Ceiling on declared sequence lengths; stands in for "no limit".
pub const MAX_LENGTH: usize = isize::MAX as usize;

/// A slice with optional signed endpoints and a non-zero signed step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SliceSpec {
    pub start: Option<isize>,
    pub stop: Option<isize>,
    pub step: isize,
}

impl SliceSpec {
    /// Slice between two optional endpoints with step 1.
    pub fn between(start: Option<isize>, stop: Option<isize>) -> Self {
        SliceSpec {
            start,
            stop,
            step: 1,
        }
    }

    /// The whole sequence.
    pub fn full() -> Self {
        SliceSpec::between(None, None)
    }

    /// Same endpoints with a different step.
    ///
    /// A zero step is a caller bug and panics, like dividing by zero.
    pub fn with_step(mut self, step: isize) -> Self {
        assert!(step != 0, "slice step cannot be zero");
        self.step = step;
        self
    }

    /// Clamped `(start, stop, step)` for a sequence of `len` elements,
    /// following CPython `slice.indices`: for a positive step both
    /// endpoints land in `[0, len]`, for a negative step in `[-1, len-1]`
    /// (where -1 marks "before the first element").
    pub fn indices(&self, len: usize) -> (isize, isize, isize) {
        let len = len as isize;
        let step = self.step;
        let (lower, upper) = if step < 0 { (-1, len - 1) } else { (0, len) };

        let start = match self.start {
            None => {
                if step < 0 {
                    upper
                } else {
                    lower
                }
            }
            Some(mut start) => {
                if start < 0 {
                    start += len;
                }
                start.clamp(lower, upper)
            }
        };

        let stop = match self.stop {
            None => {
                if step < 0 {
                    lower
                } else {
                    upper
                }
            }
            Some(mut stop) => {
                if stop < 0 {
                    stop += len;
                }
                stop.clamp(lower, upper)
            }
        };

        (start, stop, step)
    }
}

/// Number of positions a normalized `(start, stop, step)` run visits.
pub fn run_length(start: isize, stop: isize, step: isize) -> usize {
    let adjust = if step > 0 { step - 1 } else { step + 1 };
    div_floor(stop - start + adjust, step).max(0) as usize
}

/// Floor division; differs from `/` (which truncates toward zero) on
/// mixed-sign operands.
pub(crate) fn div_floor(a: isize, b: isize) -> isize {
    let q = a / b;
    if a % b != 0 && (a < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

/// Ceiling division for a positive divisor.
pub(crate) fn div_ceil(a: isize, b: isize) -> isize {
    -div_floor(-a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_defaults() {
        assert_eq!(SliceSpec::full().indices(5), (0, 5, 1));
        assert_eq!(SliceSpec::full().with_step(-1).indices(5), (4, -1, -1));
    }

    #[test]
    fn test_indices_clamps_positive_step() {
        assert_eq!(SliceSpec::between(Some(2), Some(9)).indices(5), (2, 5, 1));
        assert_eq!(SliceSpec::between(Some(7), Some(9)).indices(5), (5, 5, 1));
        assert_eq!(SliceSpec::between(Some(-2), None).indices(5), (3, 5, 1));
        assert_eq!(SliceSpec::between(Some(-9), None).indices(5), (0, 5, 1));
    }

    #[test]
    fn test_indices_clamps_negative_step() {
        let spec = SliceSpec::between(Some(9), Some(1)).with_step(-1);
        assert_eq!(spec.indices(5), (4, 1, -1));
        let spec = SliceSpec::between(None, Some(-9)).with_step(-2);
        assert_eq!(spec.indices(5), (4, -1, -2));
    }

    #[test]
    fn test_indices_empty_sequence() {
        assert_eq!(SliceSpec::full().indices(0), (0, 0, 1));
        assert_eq!(SliceSpec::full().with_step(-1).indices(0), (-1, -1, -1));
    }

    #[test]
    fn test_run_length_matches_enumeration() {
        for len in 0..6usize {
            for start in -7..7 {
                for stop in -7..7 {
                    for step in [-3, -2, -1, 1, 2, 3] {
                        let spec =
                            SliceSpec::between(Some(start), Some(stop)).with_step(step);
                        let (s, e, st) = spec.indices(len);
                        let mut count = 0;
                        let mut p = s;
                        while (st > 0 && p < e) || (st < 0 && p > e) {
                            count += 1;
                            p += st;
                        }
                        assert_eq!(
                            run_length(s, e, st),
                            count,
                            "len={} start={} stop={} step={}",
                            len,
                            start,
                            stop,
                            step
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_div_floor() {
        assert_eq!(div_floor(7, 2), 3);
        assert_eq!(div_floor(-7, 2), -4);
        assert_eq!(div_floor(7, -2), -4);
        assert_eq!(div_floor(-7, -2), 3);
        assert_eq!(div_floor(6, 2), 3);
        assert_eq!(div_floor(-6, 2), -3);
    }

    #[test]
    fn test_div_ceil() {
        assert_eq!(div_ceil(7, 2), 4);
        assert_eq!(div_ceil(6, 2), 3);
        assert_eq!(div_ceil(-7, 2), -3);
        assert_eq!(div_ceil(0, 3), 0);
    }
}
