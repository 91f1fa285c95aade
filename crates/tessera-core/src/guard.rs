//! Re-entrancy guard for traversals of possibly self-referential graphs
//!
//! Equality and printing walk nested values recursively. An embedder that
//! aliases structures into each other could otherwise send those walks
//! into unbounded recursion; the guard tracks which (receiver, argument)
//! pairs are already on the current call path and short-circuits repeats
//! to a caller-supplied fallback.

/// Address pairs currently being visited on this call path.
#[derive(Debug, Default)]
pub struct VisitSet {
    visiting: Vec<(usize, usize)>,
}

impl VisitSet {
    pub fn new() -> Self {
        VisitSet::default()
    }

    /// Identity key of a borrowed value.
    #[inline]
    pub fn key_of<T: ?Sized>(value: &T) -> usize {
        value as *const T as *const () as usize
    }

    /// Whether the pair is already in progress on this path.
    #[inline]
    pub fn is_visiting(&self, pair: (usize, usize)) -> bool {
        self.visiting.contains(&pair)
    }

    /// Run `body` with the pair marked as in progress; if the same pair
    /// is already on the path, return `fallback` without recursing.
    pub fn enter<T>(
        &mut self,
        pair: (usize, usize),
        fallback: T,
        body: impl FnOnce(&mut VisitSet) -> T,
    ) -> T {
        if self.is_visiting(pair) {
            return fallback;
        }
        self.visiting.push(pair);
        let out = body(self);
        self.visiting.pop();
        out
    }

    /// Pairs currently on the path.
    pub fn len(&self) -> usize {
        self.visiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visiting.is_empty()
    }
}
