//! Resume positions over the ordered presolving plugin lists.

/// Indices of the next presolver, propagator and constraint handler.
///
/// A round at the exhaustive tier that stops early after a successful
/// plugin records where it stopped. Rounds still begin at index zero;
/// the saved position is reported but not used to skip plugins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresolveCursor {
    pub presol: usize,
    pub prop: usize,
    pub cons: usize,
    saved: Option<(usize, usize, usize)>,
}

impl PresolveCursor {
    /// Cursor positioned at the first plugin of every list.
    pub fn start() -> Self {
        Self::default()
    }

    /// Records the current position as the resume point.
    pub fn save(&mut self) {
        self.saved = Some((self.presol, self.prop, self.cons));
    }

    /// The last recorded resume point.
    pub fn saved(&self) -> Option<(usize, usize, usize)> {
        self.saved
    }

    /// Rewinds to index zero for a new round, keeping the saved point.
    pub fn rewind(&mut self) {
        self.presol = 0;
        self.prop = 0;
        self.cons = 0;
    }
}
