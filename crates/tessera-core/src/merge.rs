//! Inclusive merge dispatch
//!
//! `imerge` reconciles two partial representations of one value into
//! the most specific representation consistent with both, or fails.
//! The returned flag reports whether the left operand gained
//! information. Resolution order:
//!
//! - structural equality, then `Top` and `Default` absorption
//! - builtin pairs: sequences elementwise, byte blocks, numbers within
//!   [`FLOAT_TOLERANCE`] when a float is involved
//! - the left operand's container merge, then the right operand's
//!   reverse merge
//! - anything left over is incompatible
//!
//! Every enclosing `imerge` call adds one breadcrumb frame to a
//! failure, so the error chain reads from the outermost pair down to
//! the cells that actually conflicted.

use std::mem;

use crate::error::{MergeError, MergeResult};
use crate::record::Record;
use crate::sparse::{byte_cells, SparseBytes, SparseSeq};
use crate::value::Value;

/// Absolute tolerance for numeric comparison once a float is involved.
pub const FLOAT_TOLERANCE: f64 = 1e-6;

/// Reconcile `left` with `right`; failures gain a breadcrumb frame
/// naming both operands.
pub fn imerge(left: Value, right: &Value) -> MergeResult<(Value, bool)> {
    let left_brief = left.brief();
    let right_brief = right.brief();
    imerge_unwrapped(left, right).map_err(|source| MergeError::Inner {
        left: left_brief,
        right: right_brief,
        source: Box::new(source),
    })
}

/// Reconcile without recording a breadcrumb frame.
pub fn imerge_unwrapped(left: Value, right: &Value) -> MergeResult<(Value, bool)> {
    if left == *right {
        return Ok((left, false));
    }
    if matches!(right, Value::Top) {
        return Ok((left, false));
    }
    if matches!(left, Value::Top) {
        return Ok((right.clone(), true));
    }
    if matches!(left, Value::Default) {
        return Ok((right.clone(), true));
    }
    if matches!(right, Value::Default) {
        return Ok((left, false));
    }

    match (left, right) {
        (Value::Seq(mine), Value::Seq(theirs)) => merge_seqs(mine, theirs),
        (left @ Value::Bytes(_), Value::Bytes(_)) => Err(MergeError::ByteBlockMismatch {
            left: left.brief(),
            right: right.brief(),
        }),
        (Value::Int(a), Value::Float(b)) => merge_numeric(Value::Int(a), a as f64, *b, right),
        (Value::Float(a), Value::Int(b)) => merge_numeric(Value::Float(a), a, *b as f64, right),
        (Value::Float(a), Value::Float(b)) => merge_numeric(Value::Float(a), a, *b, right),
        (Value::Record(mine), _) => mine.merge_into(right),
        (Value::Sparse(mine), _) => mine.merge_into(right),
        (Value::SparseBytes(mine), _) => mine.merge_into(right),
        (left, Value::Record(theirs)) => theirs.merge_from(left),
        (left, Value::Sparse(theirs)) => theirs.merge_from(left),
        (left, Value::SparseBytes(theirs)) => theirs.merge_from(left),
        (left, _) => {
            tracing::trace!("no merge rule for {} against {}", left.brief(), right.brief());
            Err(MergeError::Incompatible {
                left: left.brief(),
                right: right.brief(),
            })
        }
    }
}

fn merge_seqs(mut mine: Vec<Value>, theirs: &[Value]) -> MergeResult<(Value, bool)> {
    if mine.len() != theirs.len() {
        return Err(MergeError::LengthMismatch {
            left: format!("seq(len={})", mine.len()),
            right: format!("seq(len={})", theirs.len()),
        });
    }
    let mut changed = false;
    for (slot, other) in mine.iter_mut().zip(theirs) {
        let own = mem::replace(slot, Value::Top);
        let (merged, flag) = imerge(own, other)?;
        *slot = merged;
        changed |= flag;
    }
    Ok((Value::Seq(mine), changed))
}

fn merge_numeric(left: Value, own: f64, other: f64, right: &Value) -> MergeResult<(Value, bool)> {
    if (own - other).abs() < FLOAT_TOLERANCE {
        Ok((left, false))
    } else {
        Err(MergeError::Incompatible {
            left: left.brief(),
            right: right.brief(),
        })
    }
}

/// A container that reconciles itself against other value kinds, in
/// both operand orders.
pub trait InclusiveMerge: Sized {
    /// Merge with `other` on the right of the containing `imerge`.
    fn merge_into(self, other: &Value) -> MergeResult<(Value, bool)>;

    /// Merge with `left` on the left; the flag still reports on `left`.
    fn merge_from(&self, left: Value) -> MergeResult<(Value, bool)>;
}

impl InclusiveMerge for SparseSeq {
    fn merge_into(self, other: &Value) -> MergeResult<(Value, bool)> {
        match other {
            Value::Seq(cells) => self.merge_concrete(cells),
            Value::Sparse(sparse) => self.merge_sparse(sparse),
            _ => Err(MergeError::TypeMismatch {
                left: self.brief(),
                right: other.brief(),
            }),
        }
    }

    fn merge_from(&self, left: Value) -> MergeResult<(Value, bool)> {
        match left {
            Value::Seq(cells) => self.refine_concrete(cells),
            _ => Err(MergeError::TypeMismatch {
                left: left.brief(),
                right: self.brief(),
            }),
        }
    }
}

impl InclusiveMerge for SparseBytes {
    fn merge_into(self, other: &Value) -> MergeResult<(Value, bool)> {
        match other {
            Value::Bytes(payload) => self.merge_concrete(&byte_cells(payload)),
            Value::SparseBytes(sparse) => self.merge_sparse(sparse),
            _ => Err(MergeError::TypeMismatch {
                left: self.brief(),
                right: other.brief(),
            }),
        }
    }

    fn merge_from(&self, left: Value) -> MergeResult<(Value, bool)> {
        match left {
            Value::Bytes(payload) => self.refine_concrete(byte_cells(&payload)),
            _ => Err(MergeError::TypeMismatch {
                left: left.brief(),
                right: self.brief(),
            }),
        }
    }
}

impl InclusiveMerge for Record {
    fn merge_into(self, other: &Value) -> MergeResult<(Value, bool)> {
        match other {
            Value::Record(theirs) => {
                let (merged, changed) = self.imerge(theirs)?;
                Ok((Value::Record(merged), changed))
            }
            _ => Err(MergeError::TypeMismatch {
                left: self.brief(),
                right: other.brief(),
            }),
        }
    }

    fn merge_from(&self, left: Value) -> MergeResult<(Value, bool)> {
        match left {
            Value::Record(mine) => {
                let (merged, changed) = mine.imerge(self)?;
                Ok((Value::Record(merged), changed))
            }
            _ => Err(MergeError::TypeMismatch {
                left: left.brief(),
                right: self.brief(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::Sparse;
    use bytes::Bytes;
    use tessera_sectors::SectorSet;

    fn seq(values: &[i64]) -> Value {
        Value::Seq(values.iter().map(|&v| Value::Int(v)).collect())
    }

    #[test]
    fn test_equal_values_unchanged() {
        let (value, changed) = imerge(Value::Int(3), &Value::Int(3)).unwrap();
        assert_eq!(value, Value::Int(3));
        assert!(!changed);

        let (value, changed) = imerge(seq(&[1, 2]), &seq(&[1, 2])).unwrap();
        assert_eq!(value, seq(&[1, 2]));
        assert!(!changed);
    }

    #[test]
    fn test_top_absorbs() {
        let (value, changed) = imerge(Value::Int(7), &Value::Top).unwrap();
        assert_eq!(value, Value::Int(7));
        assert!(!changed);

        let (value, changed) = imerge(Value::Top, &Value::Int(7)).unwrap();
        assert_eq!(value, Value::Int(7));
        assert!(changed);
    }

    #[test]
    fn test_default_yields_to_concrete() {
        let (value, changed) = imerge(Value::Default, &Value::Int(7)).unwrap();
        assert_eq!(value, Value::Int(7));
        assert!(changed);

        let (value, changed) = imerge(Value::Int(7), &Value::Default).unwrap();
        assert_eq!(value, Value::Int(7));
        assert!(!changed);
    }

    #[test]
    fn test_default_is_below_top() {
        let (value, changed) = imerge(Value::Default, &Value::Top).unwrap();
        assert_eq!(value, Value::Default);
        assert!(!changed);

        let (value, changed) = imerge(Value::Top, &Value::Default).unwrap();
        assert_eq!(value, Value::Default);
        assert!(changed);
    }

    #[test]
    fn test_numeric_tolerance() {
        let (value, changed) = imerge(Value::Int(3), &Value::Float(3.0000001)).unwrap();
        assert_eq!(value, Value::Int(3));
        assert!(!changed);

        let (value, _) = imerge(Value::Float(2.5), &Value::Float(2.5 + 1e-9)).unwrap();
        assert_eq!(value, Value::Float(2.5));

        let err = imerge(Value::Int(3), &Value::Float(3.5)).unwrap_err();
        assert_eq!(err.conflict(), Some(("3", "3.5")));
    }

    #[test]
    fn test_integers_have_no_tolerance() {
        let err = imerge(Value::Int(3), &Value::Int(4)).unwrap_err();
        assert_eq!(err.conflict(), Some(("3", "4")));
    }

    #[test]
    fn test_seq_merges_elementwise() {
        let left = Value::Seq(vec![Value::Int(1), Value::Top]);
        let (value, changed) = imerge(left, &seq(&[1, 2])).unwrap();
        assert_eq!(value, seq(&[1, 2]));
        assert!(changed);

        let left = Value::Seq(vec![Value::Int(1), Value::Int(2)]);
        let (value, changed) = imerge(left, &Value::Seq(vec![Value::Top, Value::Int(2)])).unwrap();
        assert_eq!(value, seq(&[1, 2]));
        assert!(!changed);
    }

    #[test]
    fn test_seq_length_mismatch() {
        let err = imerge(seq(&[1, 2]), &seq(&[1, 2, 3])).unwrap_err();
        assert!(matches!(
            err,
            MergeError::Inner { ref source, .. }
                if matches!(**source, MergeError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_nested_failure_keeps_breadcrumbs() {
        let left = Value::Seq(vec![Value::Seq(vec![Value::Int(1)])]);
        let right = Value::Seq(vec![Value::Seq(vec![Value::Int(2)])]);
        let err = imerge(left, &right).unwrap_err();
        // one frame per enclosing call: outer seq, element, inner element
        assert_eq!(err.depth(), 3);
        assert_eq!(err.conflict(), Some(("1", "2")));
        let rendered = err.to_string();
        assert!(rendered.contains("seq(len=1)"));
    }

    #[test]
    fn test_byte_blocks_merge_by_equality() {
        let left = Value::Bytes(Bytes::from_static(b"\x01\x02"));
        let (value, changed) = imerge(left.clone(), &left).unwrap();
        assert_eq!(value, left);
        assert!(!changed);

        let err = imerge(left, &Value::Bytes(Bytes::from_static(b"\x01\x03"))).unwrap_err();
        assert!(matches!(
            err,
            MergeError::Inner { ref source, .. }
                if matches!(**source, MergeError::ByteBlockMismatch { .. })
        ));
    }

    #[test]
    fn test_record_dispatch() {
        let left: Record = [("a", Value::Int(1)), ("b", Value::Top)]
            .into_iter()
            .collect();
        let right: Record = [("b", Value::Int(2))].into_iter().collect();
        let (value, changed) = imerge(Value::Record(left), &Value::Record(right)).unwrap();
        assert!(changed);
        match value {
            Value::Record(merged) => {
                assert_eq!(merged.get("a"), Some(&Value::Int(1)));
                assert_eq!(merged.get("b"), Some(&Value::Int(2)));
            }
            other => panic!("expected record, got {}", other),
        }
    }

    #[test]
    fn test_record_rejects_other_kinds() {
        let record: Record = [("a", Value::Int(1))].into_iter().collect();
        let err = imerge(Value::Record(record), &Value::Int(3)).unwrap_err();
        assert_eq!(err.conflict(), Some(("record(fields=1)", "3")));

        let record: Record = [("a", Value::Int(1))].into_iter().collect();
        let err = imerge(Value::Int(3), &Value::Record(record)).unwrap_err();
        assert_eq!(err.conflict(), Some(("3", "record(fields=1)")));
    }

    #[test]
    fn test_sparse_dispatch_left() {
        let sparse = SparseSeq::with_length(2);
        let (value, changed) =
            imerge(Value::Sparse(Box::new(sparse)), &seq(&[4, 5])).unwrap();
        assert_eq!(value, seq(&[4, 5]));
        assert!(changed);
    }

    #[test]
    fn test_sparse_dispatch_right() {
        let sparse = Sparse::new(
            vec![Value::Int(9)],
            1,
            2,
            SectorSet::from_ranges([(0usize, 1usize)]),
        );
        let (value, changed) = imerge(seq(&[9, 3]), &Value::Sparse(Box::new(sparse))).unwrap();
        assert_eq!(value, seq(&[9, 3]));
        assert!(!changed);
    }

    #[test]
    fn test_sparse_bytes_dispatch() {
        let prefix = SparseBytes::prefix(b"\x07\x08");
        let payload = Value::Bytes(Bytes::from_static(b"\x07\x08"));
        let (value, changed) =
            imerge(Value::SparseBytes(Box::new(prefix)), &payload).unwrap();
        assert_eq!(value, payload);
        assert!(changed);

        let prefix = SparseBytes::prefix(b"\x07\x08");
        let (value, changed) =
            imerge(payload.clone(), &Value::SparseBytes(Box::new(prefix))).unwrap();
        assert_eq!(value, payload);
        assert!(!changed);
    }

    #[test]
    fn test_sparse_rejects_foreign_kinds() {
        let sparse = SparseSeq::with_length(2);
        let err = imerge(
            Value::Sparse(Box::new(sparse)),
            &Value::Bytes(Bytes::from_static(b"xy")),
        )
        .unwrap_err();
        assert_eq!(err.conflict(), Some(("sparse seq[2..2]", "x\"7879\"")));
    }

    #[test]
    fn test_wrapped_entry_adds_one_frame() {
        let err = imerge(Value::Int(1), &Value::Int(2)).unwrap_err();
        assert_eq!(err.depth(), 1);
        let err = imerge_unwrapped(Value::Int(1), &Value::Int(2)).unwrap_err();
        assert_eq!(err.depth(), 0);
    }
}
