//! Presolving round driver.
//!
//! A presolving phase calls the round primitive until a round finds too
//! few reductions, the round limit is hit or the problem is decided. The
//! primitive interleaves presolvers and propagators by priority, runs the
//! constraint handlers in between and escalates through the timing tiers
//! when a tier has nothing left to do.

mod cursor;
mod driver;
mod round;
mod tally;
mod timing;

pub use cursor::PresolveCursor;
pub use tally::PresolveTally;
pub use timing::{PresolveTiming, TimingMask};

pub(crate) use round::RoundOutcome;

/// What a presolving plugin sees of the current round.
#[derive(Debug, Clone, PartialEq)]
pub struct PresolveContext {
    pub timing: PresolveTiming,
    /// Number of the outer round, starting at zero.
    pub round: u32,
    /// Reductions of this presolving phase; plugins add theirs.
    pub tally: PresolveTally,
    /// Plugins should run to completion instead of stopping early.
    pub last_round: bool,
}

impl PresolveContext {
    pub fn new(timing: PresolveTiming, round: u32, tally: PresolveTally, last_round: bool) -> Self {
        Self {
            timing,
            round,
            tally,
            last_round,
        }
    }
}

#[cfg(test)]
mod tests;
