//! End-to-end reconciliation scenarios
//!
//! Exercises the public surface the way a decode pipeline does: peers
//! hold partial views of one frame, fold their knowledge together, and
//! either concretize or surface the first contradiction.

use tessera_core::{MergeResult, SparseBytes, Value};

/// Fold observations left to right, counting the steps that gained
/// information.
pub fn reconcile_chain(
    observations: impl IntoIterator<Item = Value>,
) -> MergeResult<(Value, usize)> {
    let mut resolved = Value::Top;
    let mut gains = 0;
    for observation in observations {
        let (next, changed) = resolved.imerge(&observation)?;
        resolved = next;
        if changed {
            gains += 1;
        }
    }
    Ok((resolved, gains))
}

/// A peer's view of a fixed-size frame: byte runs pinned at offsets,
/// everything in between unknown.
pub fn frame_view(frame_len: usize, runs: &[(usize, &[u8])]) -> MergeResult<SparseBytes> {
    let mut view = SparseBytes::with_length(frame_len);
    for (offset, payload) in runs {
        for (k, byte) in payload.iter().enumerate() {
            view.set((offset + k) as isize, Some(*byte))?;
        }
    }
    Ok(view)
}
