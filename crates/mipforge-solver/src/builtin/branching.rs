use crate::history::BranchingHistory;
use crate::plugin::{BranchCandidate, BranchRule};
use crate::scope::SolverScope;

/// Index of the candidate whose fractional part is closest to one half.
/// Ties go to the larger pseudocost score, then to the first candidate.
///
/// Returns 0 for an empty slice.
pub fn most_fractional(cands: &[BranchCandidate], history: &BranchingHistory) -> usize {
    let mut best = 0;
    let mut best_key = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for (idx, cand) in cands.iter().enumerate() {
        let fractionality = cand.frac.min(1.0 - cand.frac);
        let key = (fractionality, history.score(cand.var, cand.frac));
        if key.0 > best_key.0 + 1e-9 || ((key.0 - best_key.0).abs() <= 1e-9 && key.1 > best_key.1) {
            best = idx;
            best_key = key;
        }
    }
    best
}

/// Branching rule choosing the most fractional candidate.
#[derive(Debug, Default)]
pub struct MostFractionalRule;

impl MostFractionalRule {
    pub fn new() -> Self {
        Self
    }
}

impl BranchRule for MostFractionalRule {
    fn name(&self) -> &str {
        "mostfrac"
    }

    fn select(&mut self, scope: &SolverScope, cands: &[BranchCandidate]) -> Option<usize> {
        if cands.is_empty() {
            return None;
        }
        Some(most_fractional(cands, scope.history()))
    }
}
