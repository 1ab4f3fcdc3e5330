//! Presolving effort tiers.

use std::fmt;

/// Effort tier of a presolving call, in escalation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PresolveTiming {
    Fast,
    Medium,
    Exhaustive,
    /// Only run in the last round of presolving.
    Final,
}

impl PresolveTiming {
    pub const ALL: [PresolveTiming; 4] = [
        PresolveTiming::Fast,
        PresolveTiming::Medium,
        PresolveTiming::Exhaustive,
        PresolveTiming::Final,
    ];

    /// The next tier, `None` after `Final`.
    pub fn next(self) -> Option<Self> {
        match self {
            PresolveTiming::Fast => Some(PresolveTiming::Medium),
            PresolveTiming::Medium => Some(PresolveTiming::Exhaustive),
            PresolveTiming::Exhaustive => Some(PresolveTiming::Final),
            PresolveTiming::Final => None,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PresolveTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PresolveTiming::Fast => "fast",
            PresolveTiming::Medium => "medium",
            PresolveTiming::Exhaustive => "exhaustive",
            PresolveTiming::Final => "final",
        })
    }
}

/// Set of tiers a plugin participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingMask(u8);

impl TimingMask {
    pub const NONE: TimingMask = TimingMask(0);
    pub const FAST: TimingMask = TimingMask(1);
    pub const MEDIUM: TimingMask = TimingMask(2);
    pub const EXHAUSTIVE: TimingMask = TimingMask(4);
    pub const FINAL: TimingMask = TimingMask(8);
    pub const ALWAYS: TimingMask = TimingMask(15);

    pub const fn union(self, other: TimingMask) -> TimingMask {
        TimingMask(self.0 | other.0)
    }

    #[inline]
    pub fn contains(self, timing: PresolveTiming) -> bool {
        self.0 & (1 << timing.index()) != 0
    }
}

impl Default for TimingMask {
    fn default() -> Self {
        TimingMask::FAST
    }
}
