//! Sector set - disjoint sorted intervals with coalescing arithmetic

use std::fmt;
use std::iter::Peekable;
use std::ops::Range;

/// A half-open interval `[start, end)` of buffer positions.
/// INVARIANT: `end > start` for every sector stored in a set.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sector {
    pub start: usize,
    pub end: usize,
}

impl Sector {
    #[inline]
    pub fn new(start: usize, end: usize) -> Self {
        Sector { start, end }
    }

    /// Number of positions covered.
    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether `offset` falls inside the sector.
    #[inline]
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    #[inline]
    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<(usize, usize)> for Sector {
    fn from((start, end): (usize, usize)) -> Self {
        Sector { start, end }
    }
}

impl From<Range<usize>> for Sector {
    fn from(range: Range<usize>) -> Self {
        Sector {
            start: range.start,
            end: range.end,
        }
    }
}

impl fmt::Debug for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Set of disjoint sectors, sorted by start.
///
/// INVARIANT: no two sectors touch or overlap; an `add` that touches an
/// existing sector coalesces with it, so adjacent ranges always collapse
/// into one.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SectorSet {
    sectors: Vec<Sector>,
}

impl SectorSet {
    /// Create an empty set.
    pub fn new() -> Self {
        SectorSet::default()
    }

    /// Build a set from arbitrary ranges, normalizing order and overlap.
    pub fn from_ranges<I, R>(ranges: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Sector>,
    {
        let mut set = SectorSet::new();
        for range in ranges {
            let sector = range.into();
            set.add(sector.as_range());
        }
        set
    }

    /// Number of sectors (not covered positions).
    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    /// Sectors in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Sector> + '_ {
        self.sectors.iter().copied()
    }

    pub fn as_slice(&self) -> &[Sector] {
        &self.sectors
    }

    /// First sector, if any.
    pub fn first(&self) -> Option<Sector> {
        self.sectors.first().copied()
    }

    /// Last sector, if any.
    pub fn last(&self) -> Option<Sector> {
        self.sectors.last().copied()
    }

    /// Index of the first sector whose start is strictly after `offset`.
    /// Every sector before the result starts at or before `offset`.
    pub fn bisect_right(&self, offset: usize) -> usize {
        self.sectors.partition_point(|s| s.start <= offset)
    }

    /// Index of the first sector that ends strictly after `offset`.
    /// Every sector before the result lies entirely before `offset`;
    /// every sector from the result onward ends past it (and may
    /// contain it).
    pub fn bisect_left(&self, offset: usize) -> usize {
        self.sectors.partition_point(|s| s.end <= offset)
    }

    /// Whether `offset` falls inside some sector.
    pub fn contains_point(&self, offset: usize) -> bool {
        let idx = self.bisect_right(offset);
        idx > 0 && offset < self.sectors[idx - 1].end
    }

    /// Whether the whole range lies inside a single sector.
    pub fn contains_range(&self, range: Range<usize>) -> bool {
        let idx = self.bisect_right(range.start);
        idx > 0 && idx - 1 == self.sectors.partition_point(|s| s.end < range.end)
    }

    /// Whether the range overlaps authoritative data: for a non-empty
    /// range, some sector intersects it; for an empty one, the offset
    /// falls strictly inside a sector. Writing across such a range
    /// changes the apparent segmentation.
    pub fn is_cutting(&self, range: Range<usize>) -> bool {
        self.sectors.partition_point(|s| s.start < range.end)
            > self.sectors.partition_point(|s| s.end <= range.start)
    }

    /// Insert a range, coalescing with any sector it touches or overlaps.
    pub fn add(&mut self, range: Range<usize>) {
        let (mut key_start, mut key_end) = (range.start, range.end);
        if key_start >= key_end {
            return;
        }

        let mut start_idx = self.bisect_right(key_start);
        if start_idx > 0 && key_start <= self.sectors[start_idx - 1].end {
            // key_start is inside (or touching) the sector on its left
            start_idx -= 1;
            key_start = self.sectors[start_idx].start;
        }

        let mut end_idx = self.sectors.partition_point(|s| s.end < key_end);
        if end_idx < self.sectors.len() && self.sectors[end_idx].start <= key_end {
            key_end = self.sectors[end_idx].end;
            end_idx += 1;
        }

        self.sectors.splice(
            start_idx..end_idx,
            std::iter::once(Sector::new(key_start, key_end)),
        );
    }

    /// Insert a single position.
    pub fn add_point(&mut self, offset: usize) {
        self.add(offset..offset + 1);
    }

    /// Remove a range, splitting partially covered sectors into their
    /// surviving pieces.
    pub fn sub(&mut self, range: Range<usize>) {
        let (key_start, key_end) = (range.start, range.end);
        if key_start >= key_end {
            return;
        }

        let mut left_piece = None;
        let mut right_piece = None;

        let mut start_idx = self.bisect_right(key_start);
        if start_idx > 0 && key_start <= self.sectors[start_idx - 1].end {
            start_idx -= 1;
            let sector_start = self.sectors[start_idx].start;
            if key_start != sector_start {
                left_piece = Some(Sector::new(sector_start, key_start));
            }
        }

        let mut end_idx = self.sectors.partition_point(|s| s.end < key_end);
        if end_idx < self.sectors.len() && self.sectors[end_idx].start <= key_end {
            let sector_end = self.sectors[end_idx].end;
            if key_end != sector_end {
                right_piece = Some(Sector::new(key_end, sector_end));
            }
            end_idx += 1;
        }

        self.sectors
            .splice(start_idx..end_idx, left_piece.into_iter().chain(right_piece));
    }

    /// Remove a single position.
    pub fn sub_point(&mut self, offset: usize) {
        self.sub(offset..offset + 1);
    }

    /// Drop everything at or beyond `offset`, clipping a straddling
    /// sector to end there.
    pub fn truncate_from(&mut self, offset: usize) {
        self.sub(offset..usize::MAX);
    }

    /// Shift every sector that ends past `from` by `delta` positions.
    /// Used when a splice changes the length of the region before them.
    pub fn shift_tail(&mut self, from: usize, delta: isize) {
        if delta == 0 {
            return;
        }
        let moved: Vec<Sector> = self.sectors[self.bisect_left(from)..].to_vec();
        self.truncate_from(from);
        for sector in moved {
            let new_start = (sector.start as isize + delta).max(0) as usize;
            let new_end = (sector.end as isize + delta).max(0) as usize;
            self.add(new_start..new_end);
        }
    }

    /// Boundary events in ascending order, truncated at `limit`: `(offset,
    /// true)` when entering a sector, `(offset, false)` when leaving one.
    pub fn iter_indices(&self, limit: usize) -> impl Iterator<Item = (usize, bool)> + '_ {
        self.sectors
            .iter()
            .take_while(move |s| s.start < limit)
            .flat_map(move |s| [(s.start, true), (s.end.min(limit), false)])
    }

    /// Walk two sets in lockstep, yielding maximal runs `(start, end)`
    /// together with the touched flags of each side over that run. Runs
    /// begin at offset 0 and extend through the last boundary event below
    /// `limit`; a trailing region where both sides are untouched is not
    /// reported.
    pub fn iter_joined_sectors<'a>(
        &'a self,
        other: &'a SectorSet,
        limit: usize,
    ) -> impl Iterator<Item = (Sector, (bool, bool))> + 'a {
        JoinedSectors {
            left: self.iter_indices(limit).peekable(),
            right: other.iter_indices(limit).peekable(),
            left_touched: false,
            right_touched: false,
            cursor: 0,
        }
    }
}

impl fmt::Debug for SectorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.sectors.iter()).finish()
    }
}

impl FromIterator<Sector> for SectorSet {
    fn from_iter<I: IntoIterator<Item = Sector>>(iter: I) -> Self {
        SectorSet::from_ranges(iter)
    }
}

/// Merged event walk over two sector sets. Each emitted run carries the
/// flags that were in force over the whole run; flags flip only at run
/// boundaries.
struct JoinedSectors<L, R>
where
    L: Iterator<Item = (usize, bool)>,
    R: Iterator<Item = (usize, bool)>,
{
    left: Peekable<L>,
    right: Peekable<R>,
    left_touched: bool,
    right_touched: bool,
    cursor: usize,
}

impl<L, R> Iterator for JoinedSectors<L, R>
where
    L: Iterator<Item = (usize, bool)>,
    R: Iterator<Item = (usize, bool)>,
{
    type Item = (Sector, (bool, bool));

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (index, entering, from_left) =
                match (self.left.peek().copied(), self.right.peek().copied()) {
                    (None, None) => return None,
                    (Some((i, e)), None) => {
                        self.left.next();
                        (i, e, true)
                    }
                    (None, Some((i, e))) => {
                        self.right.next();
                        (i, e, false)
                    }
                    (Some((li, le)), Some((ri, _))) if li <= ri => {
                        self.left.next();
                        (li, le, true)
                    }
                    (Some(_), Some((ri, re))) => {
                        self.right.next();
                        (ri, re, false)
                    }
                };

            // The run up to this event saw the flags as they were before it.
            let run = if index > self.cursor {
                let run = (
                    Sector::new(self.cursor, index),
                    (self.left_touched, self.right_touched),
                );
                self.cursor = index;
                Some(run)
            } else {
                None
            };

            if from_left {
                self.left_touched = entering;
            } else {
                self.right_touched = entering;
            }

            if run.is_some() {
                return run;
            }
        }
    }
}
