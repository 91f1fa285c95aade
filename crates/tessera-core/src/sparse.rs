//! Sparse sequences over partially decoded buffers
//!
//! A `Sparse<E>` describes a sequence whose length is only known to lie
//! in `[min_length, max_length]` and whose content is only known over
//! the touched sectors. Untouched positions read as the element filler.
//! Two instantiations cover the toolkit's needs:
//!
//! - `SparseSeq` holds nested [`Value`]s with `Value::Default` filling
//!   the gaps;
//! - `SparseBytes` holds byte cells where `None` means "one byte of
//!   unknown value".
//!
//! INVARIANTS (restored by `clean` after every mutation):
//! - `min_length <= max_length <= MAX_LENGTH`
//! - `value.len() <= max_length`
//! - the backing never ends in filler
//! - sectors lie within `[0, value.len())`

use std::mem;

use tessera_sectors::{Sector, SectorSet};

use crate::error::{MergeError, MergeResult};
use crate::slice::{self, SliceSpec, MAX_LENGTH};
use crate::value::Value;

/// Per-position adapter: what a sparse container stores, how its cells
/// merge, and how a finished backing turns back into a plain value.
pub trait Element: Clone + std::fmt::Debug {
    /// Short name used in error messages.
    const KIND: &'static str;

    /// Filler occupying untouched positions.
    fn filler() -> Self;

    /// Whether this cell carries no more information than the filler.
    fn is_filler(&self) -> bool;

    /// Whether the cell still carries unresolved content.
    fn is_abstract(&self) -> bool;

    /// Reconcile two cells.
    fn imerge(self, other: &Self) -> MergeResult<(Self, bool)>;

    /// Plain value for a fully determined backing.
    fn assemble(cells: Vec<Self>) -> Value;

    /// Wrap a still-partial container back into the value model.
    fn wrap(sparse: Sparse<Self>) -> Value;
}

impl Element for Value {
    const KIND: &'static str = "sparse seq";

    fn filler() -> Value {
        Value::Default
    }

    fn is_filler(&self) -> bool {
        matches!(self, Value::Default)
    }

    fn is_abstract(&self) -> bool {
        Value::is_abstract(self)
    }

    fn imerge(self, other: &Value) -> MergeResult<(Value, bool)> {
        crate::merge::imerge_unwrapped(self, other)
    }

    fn assemble(cells: Vec<Value>) -> Value {
        Value::Seq(cells)
    }

    fn wrap(sparse: Sparse<Value>) -> Value {
        Value::Sparse(Box::new(sparse))
    }
}

/// `None` is one byte whose value is not known yet.
impl Element for Option<u8> {
    const KIND: &'static str = "sparse bytes";

    fn filler() -> Self {
        None
    }

    fn is_filler(&self) -> bool {
        self.is_none()
    }

    fn is_abstract(&self) -> bool {
        self.is_none()
    }

    fn imerge(self, other: &Self) -> MergeResult<(Self, bool)> {
        match (self, other) {
            (cell, None) => Ok((cell, false)),
            (None, Some(byte)) => Ok((Some(*byte), true)),
            (Some(a), Some(b)) if a == *b => Ok((Some(a), false)),
            (Some(a), Some(b)) => Err(MergeError::Incompatible {
                left: a.to_string(),
                right: b.to_string(),
            }),
        }
    }

    fn assemble(cells: Vec<Self>) -> Value {
        debug_assert!(cells.iter().all(Option::is_some));
        let bytes: Vec<u8> = cells.into_iter().flatten().collect();
        Value::Bytes(bytes.into())
    }

    fn wrap(sparse: Sparse<Self>) -> Value {
        Value::SparseBytes(Box::new(sparse))
    }
}

/// Byte payload as sparse cells.
pub(crate) fn byte_cells(payload: &[u8]) -> Vec<Option<u8>> {
    payload.iter().map(|byte| Some(*byte)).collect()
}

/// Partially known sequence: backing cells, a length window, and the
/// sectors holding authoritative content.
#[derive(Clone, Debug, PartialEq)]
pub struct Sparse<E: Element> {
    value: Vec<E>,
    min_length: usize,
    max_length: usize,
    sectors: SectorSet,
}

pub type SparseSeq = Sparse<Value>;
pub type SparseBytes = Sparse<Option<u8>>;

impl<E: Element> Default for Sparse<E> {
    fn default() -> Self {
        Sparse::new(Vec::new(), 0, MAX_LENGTH, SectorSet::new())
    }
}

impl<E: Element> Sparse<E> {
    /// Build from explicit parts and normalize.
    ///
    /// An inverted length window is a caller bug and panics.
    pub fn new(value: Vec<E>, min_length: usize, max_length: usize, sectors: SectorSet) -> Self {
        let max_length = max_length.min(MAX_LENGTH);
        assert!(min_length <= max_length, "length window inverted");
        let mut sparse = Sparse {
            value,
            min_length,
            max_length,
            sectors,
        };
        sparse.clean();
        sparse
    }

    /// Whole backing authoritative, length unbounded.
    pub fn from_backing(value: Vec<E>) -> Self {
        let len = value.len();
        Sparse::new(value, 0, MAX_LENGTH, SectorSet::from_ranges([(0, len)]))
    }

    /// Known length, no known content.
    pub fn with_length(length: usize) -> Self {
        Sparse::new(Vec::new(), length, length, SectorSet::new())
    }

    pub fn length_range(&self) -> (usize, usize) {
        (self.min_length, self.max_length)
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn backing(&self) -> &[E] {
        &self.value
    }

    pub fn sectors(&self) -> &SectorSet {
        &self.sectors
    }

    /// The cell at `index` ignoring the length window.
    pub fn value_at(&self, index: usize) -> E {
        match self.value.get(index) {
            Some(cell) => cell.clone(),
            None => E::filler(),
        }
    }

    /// Restore the representation invariants after a mutation.
    fn clean(&mut self) {
        self.max_length = self.max_length.min(MAX_LENGTH);
        if self.value.len() > self.max_length {
            self.value.truncate(self.max_length);
        }
        while self.value.last().is_some_and(E::is_filler) {
            self.value.pop();
        }
        self.sectors.truncate_from(self.value.len());
    }

    /// Fixed length with every position authoritative.
    pub fn is_all_touched(&self) -> bool {
        self.value.len() == self.min_length
            && self.min_length == self.max_length
            && (self.min_length == 0 || self.sectors.contains_range(0..self.min_length))
    }

    /// Whether the container still leaves anything undetermined.
    pub fn is_abstract(&self) -> bool {
        !self.is_all_touched() || self.value.iter().any(E::is_abstract)
    }

    /// Concretize to the plain value when fully determined, wrap
    /// otherwise.
    pub fn into_value(self) -> Value {
        if self.is_abstract() {
            E::wrap(self)
        } else {
            E::assemble(self.value)
        }
    }

    pub(crate) fn brief(&self) -> String {
        if self.max_length == MAX_LENGTH {
            format!("{}[{}..]", E::KIND, self.min_length)
        } else {
            format!("{}[{}..{}]", E::KIND, self.min_length, self.max_length)
        }
    }

    // ---- indexing ----------------------------------------------------

    /// Scalar read. Fails for positions that may not exist; negative
    /// indices only resolve against a fixed length.
    pub fn get(&self, index: isize) -> MergeResult<E> {
        let mut key = index;
        if key < 0 {
            if self.min_length != self.max_length {
                return Err(MergeError::IndexOutOfRange(index));
            }
            key += self.max_length as isize;
        }
        if key < 0 || key as usize >= self.min_length {
            return Err(MergeError::IndexOutOfRange(index));
        }
        Ok(self.value_at(key as usize))
    }

    /// Slice read: the bounds are normalized under every plausible length
    /// bound; when the bounds disagree on where the slice starts, the
    /// result degrades to a pure length range.
    pub fn get_slice(&self, spec: &SliceSpec) -> Value {
        let probe = SliceProbe::new(self, spec);
        let out_min = probe.min_run();
        let out_max = probe.max_run();

        let (slice_value, slice_sectors) = match probe.consistent_start() {
            None => (Vec::new(), SectorSet::new()),
            Some(start) => {
                let step = spec.step;
                let required = ((start + 1).max(probe.max_stop()).max(0)) as usize;
                let mut cells = Vec::new();
                if step > 0 {
                    let avail = self.value.len().min(required);
                    let mut p = start as usize;
                    while p < avail {
                        cells.push(self.value[p].clone());
                        p += step as usize;
                    }
                } else {
                    let mut p = start;
                    while p >= 0 {
                        cells.push(self.value_at(p as usize));
                        p += step;
                    }
                }
                let mut projected = SectorSet::new();
                for sector in self.sectors.iter() {
                    if let Some((k0, k1)) = project_sector(sector, start, step, out_max) {
                        projected.add(k0..k1);
                    }
                }
                (cells, projected)
            }
        };

        Sparse::new(slice_value, out_min, out_max, slice_sectors).into_value()
    }

    // ---- assignment --------------------------------------------------

    /// Scalar write. Writing a negative index into a variable-length
    /// sequence cannot be placed, so it invalidates the uncertain tail
    /// instead of storing the element.
    pub fn set(&mut self, index: isize, element: E) -> MergeResult<()> {
        let key = if index < 0 {
            let key = self.min_length as isize + index;
            if key < 0 {
                return Err(MergeError::AssignmentOutOfRange(index));
            }
            if self.min_length != self.max_length {
                let key = key as usize;
                self.value.truncate(key);
                self.sectors.truncate_from(key);
                self.clean();
                return Ok(());
            }
            key as usize
        } else {
            let key = index as usize;
            if key >= self.min_length {
                return Err(MergeError::AssignmentOutOfRange(index));
            }
            key
        };
        if self.value.len() <= key {
            // extending with filler does not touch sectors
            self.value.resize(key + 1, E::filler());
        }
        self.value[key] = element;
        self.sectors.add_point(key);
        self.clean();
        Ok(())
    }

    /// Slice write with Python splice semantics over the length window.
    pub fn set_slice(&mut self, spec: &SliceSpec, payload: Vec<E>) -> MergeResult<()> {
        self.splice_slice(spec, payload, false)
    }

    /// Scalar delete; `-1` removes the uncertain tail.
    pub fn delete(&mut self, index: isize) -> MergeResult<()> {
        let spec = if index == -1 {
            SliceSpec::between(Some(-1), None)
        } else {
            SliceSpec::between(Some(index), Some(index + 1))
        };
        self.splice_slice(&spec, Vec::new(), true)
    }

    /// Slice delete.
    pub fn delete_slice(&mut self, spec: &SliceSpec) -> MergeResult<()> {
        self.splice_slice(spec, Vec::new(), true)
    }

    fn splice_slice(&mut self, spec: &SliceSpec, payload: Vec<E>, is_delete: bool) -> MergeResult<()> {
        let probe = SliceProbe::new(self, spec);
        let step = spec.step;
        let payload_len = payload.len();

        if step != 1 {
            // extended slices replace exactly their sampled positions
            if payload_len != probe.min_run() {
                return Err(MergeError::SliceSizeMismatch {
                    actual: payload_len,
                    expected: probe.min_run(),
                });
            }
            if payload_len != probe.max_run() {
                return Err(MergeError::SliceSizeMismatch {
                    actual: payload_len,
                    expected: probe.max_run(),
                });
            }
        }

        let max_start = probe.max_start();
        let max_run = probe.max_run();
        let reach = max_start.max(max_start + (max_run as isize - 1) * step) + 1;
        let required = (reach.max(0) as usize).min(self.max_length);
        if self.value.len() < required {
            // filler extension does not touch sectors
            self.value.resize(required, E::filler());
        }

        if max_start == -1 {
            // the slice has no valid start under any plausible length
            if payload_len > 0 {
                self.clean();
                return Err(MergeError::SliceSizeMismatch {
                    actual: payload_len,
                    expected: 0,
                });
            }
        } else if let Some((start, stop)) = probe.consistent_bounds() {
            let start = start as usize;
            let run = probe.min_run();
            if step == 1 {
                let hi = (stop.max(start as isize)) as usize;
                if is_delete {
                    self.value.splice(start..hi, std::iter::empty());
                } else {
                    self.value.splice(start..hi, payload);
                }
                if self.sectors.is_cutting(start..hi) {
                    self.sectors.sub(start..hi);
                }
                let shift = run as isize - payload_len as isize;
                if shift != 0 {
                    self.sectors.shift_tail(hi, -shift);
                }
                self.sectors.add(start..start + payload_len);
            } else if !is_delete {
                for (k, element) in payload.into_iter().enumerate() {
                    let p = (start as isize + k as isize * step) as usize;
                    self.value[p] = element;
                    self.sectors.add_point(p);
                }
            }
        } else {
            // bounds disagree on placement: drop the uncertain tail
            let offset = probe.uncertain_offset();
            self.value.truncate(offset);
            self.sectors.truncate_from(offset);
        }

        // the window moves by what the slice could have covered
        self.min_length =
            (self.min_length as isize - probe.max_run() as isize + payload_len as isize).max(0)
                as usize;
        self.max_length =
            (self.max_length as isize - probe.min_run() as isize + payload_len as isize).max(0)
                as usize;
        self.clean();
        Ok(())
    }

    // ---- merge -------------------------------------------------------

    /// Merge against a concrete sequence of cells. The candidate's
    /// length must fall inside the window; untouched regions adopt the
    /// candidate's cells unconditionally.
    pub fn merge_concrete(mut self, other: &[E]) -> MergeResult<(Value, bool)> {
        if self.min_length > other.len() {
            return Err(MergeError::ShorterSequence {
                left: self.brief(),
                right: format!("len {}", other.len()),
            });
        }
        if self.max_length < other.len() {
            return Err(MergeError::LongerSequence {
                left: self.brief(),
                right: format!("len {}", other.len()),
            });
        }

        let merges: Vec<E> = if other.is_empty() {
            Vec::new()
        } else if self.sectors.is_empty() {
            other.to_vec()
        } else {
            let mut merges = Vec::with_capacity(other.len());
            let mut cursor = 0usize;
            let sectors = mem::take(&mut self.sectors);
            for sector in sectors.iter() {
                let gap_end = sector.start.min(other.len());
                if cursor < gap_end {
                    merges.extend(other[cursor..gap_end].iter().cloned());
                }
                let run_end = sector.end.min(other.len());
                for i in sector.start..run_end {
                    let own = mem::replace(&mut self.value[i], E::filler());
                    let (merged, _) = own.imerge(&other[i])?;
                    merges.push(merged);
                }
                cursor = sector.end;
            }
            if cursor < other.len() {
                merges.extend(other[cursor..].iter().cloned());
            }
            merges
        };
        Ok((E::assemble(merges), true))
    }

    /// Merge with another sparse sequence: intersect the length windows
    /// and reconcile run by run. A cell conflict beyond the merged
    /// `min_length` narrows `max_length` to the conflict position instead
    /// of failing; inside it, the conflict is hard.
    pub fn merge_sparse(mut self, other: &Sparse<E>) -> MergeResult<(Value, bool)> {
        if self.min_length > other.max_length {
            return Err(MergeError::ShorterSparse {
                left: self.brief(),
                right: other.brief(),
            });
        }
        if self.max_length < other.min_length {
            return Err(MergeError::LongerSparse {
                left: self.brief(),
                right: other.brief(),
            });
        }

        let mut changed = false;
        let mut new_max = if self.max_length > other.max_length {
            changed = true;
            other.max_length
        } else {
            self.max_length
        };
        let new_min = if self.min_length < other.min_length {
            changed = true;
            other.min_length
        } else {
            self.min_length
        };

        let backing_len = self.value.len().max(other.value.len());
        let mut merges: Vec<E> = vec![E::filler(); backing_len];
        let mut merged_sectors = SectorSet::new();
        let mut first_adopted = usize::MAX;

        'runs: for (run, (mine, theirs)) in
            self.sectors.iter_joined_sectors(&other.sectors, new_max)
        {
            match (mine, theirs) {
                (true, true) => {
                    for i in run.as_range() {
                        let own = mem::replace(&mut self.value[i], E::filler());
                        match own.imerge(&other.value[i]) {
                            Ok((merged, flag)) => {
                                merges[i] = merged;
                                changed |= flag;
                            }
                            Err(err) => {
                                // inside either operand's mandatory region
                                // the conflict is real
                                if i < new_min {
                                    return Err(err);
                                }
                                // beyond both, the sequence simply cannot
                                // extend to this position
                                tracing::debug!(
                                    "sparse merge conflict at {} narrows max length: {}",
                                    i,
                                    err
                                );
                                new_max = i;
                                changed = true;
                                merged_sectors.add(run.start..i);
                                break 'runs;
                            }
                        }
                    }
                    merged_sectors.add(run.as_range());
                }
                (true, false) => {
                    for i in run.as_range() {
                        merges[i] = mem::replace(&mut self.value[i], E::filler());
                    }
                    merged_sectors.add(run.as_range());
                }
                (false, true) => {
                    for i in run.as_range() {
                        merges[i] = other.value[i].clone();
                    }
                    first_adopted = first_adopted.min(run.start);
                    merged_sectors.add(run.as_range());
                }
                (false, false) => {}
            }
        }

        self.value = merges;
        self.min_length = new_min;
        self.max_length = new_max;
        self.sectors = merged_sectors;
        self.clean();

        if first_adopted < self.value.len() {
            changed = true;
        }

        let concrete = !self.is_abstract();
        let value = self.into_value();
        Ok((value, if concrete { true } else { changed }))
    }

    /// Reverse merge: refine a concrete sequence of cells with what the
    /// sparse side knows. `changed` reflects the concrete operand.
    pub fn refine_concrete(&self, cells: Vec<E>) -> MergeResult<(Value, bool)> {
        if cells.len() < self.min_length {
            return Err(MergeError::LongerSparse {
                left: format!("len {}", cells.len()),
                right: self.brief(),
            });
        }
        if cells.len() > self.max_length {
            return Err(MergeError::ShorterSparse {
                left: format!("len {}", cells.len()),
                right: self.brief(),
            });
        }
        let mut cells = cells;
        let mut changed = false;
        for sector in self.sectors.iter() {
            let run_end = sector.end.min(cells.len());
            for i in sector.start..run_end {
                let own = mem::replace(&mut cells[i], E::filler());
                let (merged, flag) = own.imerge(&self.value[i])?;
                cells[i] = merged;
                changed |= flag;
            }
        }
        Ok((E::assemble(cells), changed))
    }

    // ---- concatenation -----------------------------------------------

    /// Append a concrete tail. A variable-length receiver cannot place
    /// the tail, so content beyond `min_length` is discarded and only
    /// the window grows.
    pub fn concat_elems(mut self, tail: &[E]) -> Sparse<E> {
        if tail.is_empty() {
            return self;
        }
        if self.min_length != self.max_length {
            let min = self.min_length;
            self.value.truncate(min);
            self.sectors.truncate_from(min);
            return Sparse::new(
                self.value,
                min + tail.len(),
                self.max_length.saturating_add(tail.len()),
                self.sectors,
            );
        }
        let min = self.min_length;
        if self.value.len() < min {
            self.value.resize(min, E::filler());
        }
        self.value.extend(tail.iter().cloned());
        self.sectors.add(min..min + tail.len());
        Sparse::new(
            self.value,
            min + tail.len(),
            self.max_length.saturating_add(tail.len()),
            self.sectors,
        )
    }

    /// Append another sparse sequence.
    pub fn concat(mut self, other: &Sparse<E>) -> Sparse<E> {
        if other.min_length == 0 && other.max_length == 0 {
            return self;
        }
        if self.min_length != self.max_length {
            let min = self.min_length;
            self.value.truncate(min);
            self.sectors.truncate_from(min);
            return Sparse::new(
                self.value,
                min + other.min_length,
                self.max_length.saturating_add(other.max_length),
                self.sectors,
            );
        }
        let min = self.min_length;
        if self.value.len() < min {
            self.value.resize(min, E::filler());
        }
        self.value.extend(other.value.iter().cloned());
        let mut sectors = self.sectors;
        for sector in other.sectors.iter() {
            sectors.add(sector.start + min..sector.end + min);
        }
        Sparse::new(
            self.value,
            min + other.min_length,
            self.max_length.saturating_add(other.max_length),
            sectors,
        )
    }

    /// Prepend a concrete head; the head region becomes authoritative.
    pub fn prepend_elems(self, head: &[E]) -> Sparse<E> {
        let n = head.len();
        let mut value: Vec<E> = Vec::with_capacity(n + self.value.len());
        value.extend(head.iter().cloned());
        value.extend(self.value);
        let mut sectors = SectorSet::new();
        for sector in self.sectors.iter() {
            sectors.add(sector.start + n..sector.end + n);
        }
        sectors.add(0..n);
        Sparse::new(
            value,
            n + self.min_length,
            self.max_length.saturating_add(n),
            sectors,
        )
    }
}

impl SparseBytes {
    /// "Starts with `payload`" without committing to a length: every
    /// prefix of the payload, including the empty one, is consistent.
    pub fn prefix(payload: &[u8]) -> SparseBytes {
        let len = payload.len();
        Sparse::new(
            byte_cells(payload),
            0,
            len,
            SectorSet::from_ranges([(0, len)]),
        )
    }

    /// Prefix form of another sparse byte string: the peer's known
    /// bytes, at any length from zero up to the peer's maximum.
    pub fn prefix_of(other: &SparseBytes) -> SparseBytes {
        Sparse::new(
            other.value.clone(),
            0,
            other.max_length,
            other.sectors.clone(),
        )
    }
}

/// Exact image of a sector under `p = start + k * step`: the touched
/// output positions are precisely those whose sampled position lies in
/// the sector.
fn project_sector(sector: Sector, start: isize, step: isize, out_len: usize) -> Option<(usize, usize)> {
    let s = sector.start as isize;
    let e = sector.end as isize;
    let (k0, k1) = if step > 0 {
        (
            slice::div_ceil(s - start, step),
            slice::div_ceil(e - start, step),
        )
    } else {
        (
            slice::div_floor(e - start, step) + 1,
            slice::div_floor(s - start, step) + 1,
        )
    };
    let k0 = k0.clamp(0, out_len as isize) as usize;
    let k1 = k1.clamp(0, out_len as isize) as usize;
    (k0 < k1).then_some((k0, k1))
}

/// Slice normalized under every plausible length. For a fixed length
/// there is one bound; otherwise the slice is probed at `min`, `min+1`,
/// `max` and `max-1`, which together detect any length dependence.
struct SliceProbe {
    bounds: Vec<(isize, isize, isize)>,
}

impl SliceProbe {
    fn new<E: Element>(sparse: &Sparse<E>, spec: &SliceSpec) -> SliceProbe {
        let bounds = if sparse.min_length == sparse.max_length {
            vec![spec.indices(sparse.min_length)]
        } else {
            vec![
                spec.indices(sparse.min_length),
                spec.indices(sparse.min_length + 1),
                spec.indices(sparse.max_length),
                spec.indices(sparse.max_length - 1),
            ]
        };
        SliceProbe { bounds }
    }

    fn runs(&self) -> impl Iterator<Item = usize> + '_ {
        self.bounds
            .iter()
            .map(|&(start, stop, step)| slice::run_length(start, stop, step))
    }

    fn min_run(&self) -> usize {
        self.runs().min().unwrap_or(0)
    }

    fn max_run(&self) -> usize {
        self.runs().max().unwrap_or(0)
    }

    fn max_start(&self) -> isize {
        self.bounds.iter().map(|b| b.0).max().unwrap_or(-1)
    }

    fn max_stop(&self) -> isize {
        self.bounds.iter().map(|b| b.1).max().unwrap_or(-1)
    }

    /// The start position when every bound agrees on one.
    fn consistent_start(&self) -> Option<isize> {
        let start = self.bounds[0].0;
        (start != -1 && self.bounds.iter().all(|b| b.0 == start)).then_some(start)
    }

    /// Both endpoints when every bound agrees; `stop` of -1 normalizes
    /// to "before the first element" for negative steps.
    fn consistent_bounds(&self) -> Option<(isize, isize)> {
        let start = self.consistent_start()?;
        let stop = self.bounds[0].1;
        self.bounds.iter().all(|b| b.1 == stop).then_some((start, stop))
    }

    /// First position whose placement the bounds disagree about.
    fn uncertain_offset(&self) -> usize {
        let min_start = self
            .bounds
            .iter()
            .map(|b| b.0)
            .filter(|&s| s != -1)
            .min()
            .unwrap_or(0);
        let min_stop = self.bounds.iter().map(|b| b.1).min().unwrap_or(-1);
        min_start.min(min_stop + 1).max(0) as usize
    }
}
