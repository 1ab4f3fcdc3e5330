//! Pseudocost branching history.

use mipforge_core::{Problem, VarId};

/// Branching direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchDir {
    Down,
    Up,
}

/// Accumulated objective gains per unit of bound change.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PseudoCost {
    pub down_sum: f64,
    pub down_count: u32,
    pub up_sum: f64,
    pub up_count: u32,
}

impl PseudoCost {
    /// Average gain per unit in `dir`, one when nothing was observed.
    pub fn value(&self, dir: BranchDir) -> f64 {
        let (sum, count) = match dir {
            BranchDir::Down => (self.down_sum, self.down_count),
            BranchDir::Up => (self.up_sum, self.up_count),
        };
        if count == 0 {
            1.0
        } else {
            sum / f64::from(count)
        }
    }

    pub fn merge(&mut self, other: &PseudoCost) {
        self.down_sum += other.down_sum;
        self.down_count += other.down_count;
        self.up_sum += other.up_sum;
        self.up_count += other.up_count;
    }
}

/// Pseudocosts indexed by transformed variable.
#[derive(Debug, Clone, Default)]
pub struct BranchingHistory {
    entries: Vec<PseudoCost>,
}

impl BranchingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry_mut(&mut self, var: VarId) -> &mut PseudoCost {
        if self.entries.len() <= var.0 {
            self.entries.resize(var.0 + 1, PseudoCost::default());
        }
        &mut self.entries[var.0]
    }

    pub fn get(&self, var: VarId) -> PseudoCost {
        self.entries.get(var.0).copied().unwrap_or_default()
    }

    /// Records the objective gain `gain` observed after moving `var` by
    /// `distance` in `dir`.
    pub fn update(&mut self, var: VarId, dir: BranchDir, gain: f64, distance: f64) {
        if distance <= 0.0 || !gain.is_finite() {
            return;
        }
        let per_unit = gain.max(0.0) / distance;
        let entry = self.entry_mut(var);
        match dir {
            BranchDir::Down => {
                entry.down_sum += per_unit;
                entry.down_count += 1;
            }
            BranchDir::Up => {
                entry.up_sum += per_unit;
                entry.up_count += 1;
            }
        }
    }

    /// Product score of the estimated gains of branching `var` at a value
    /// with fractional part `frac`.
    pub fn score(&self, var: VarId, frac: f64) -> f64 {
        let pc = self.get(var);
        let down = (pc.value(BranchDir::Down) * frac).max(1e-6);
        let up = (pc.value(BranchDir::Up) * (1.0 - frac)).max(1e-6);
        down * up
    }

    /// Entries keyed by the original variable of each transformed variable.
    pub fn to_original(&self, trans: &Problem) -> Vec<(VarId, PseudoCost)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, pc)| pc.down_count + pc.up_count > 0)
            .filter_map(|(idx, pc)| {
                let origin = trans.get_var(VarId(idx))?.origin?;
                Some((origin, *pc))
            })
            .collect()
    }

    /// Seeds entries from original-keyed history.
    pub fn seed_from_original(&mut self, entries: &[(VarId, PseudoCost)], original: &Problem) {
        for (orig, pc) in entries {
            if let Some(tvar) = original.transformed_of(*orig) {
                self.entry_mut(tvar).merge(pc);
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pseudocost_defaults_to_one() {
        let history = BranchingHistory::new();
        assert_eq!(history.get(VarId(3)).value(BranchDir::Up), 1.0);
    }

    #[test]
    fn test_update_averages_per_unit_gain() {
        let mut history = BranchingHistory::new();
        history.update(VarId(1), BranchDir::Down, 2.0, 0.5);
        history.update(VarId(1), BranchDir::Down, 1.0, 1.0);
        history.update(VarId(1), BranchDir::Up, 0.0, 0.0);

        let pc = history.get(VarId(1));
        assert_eq!(pc.down_count, 2);
        assert_eq!(pc.value(BranchDir::Down), 2.5);
        assert_eq!(pc.up_count, 0);
    }

    #[test]
    fn test_score_prefers_balanced_gains() {
        let mut history = BranchingHistory::new();
        history.update(VarId(0), BranchDir::Down, 4.0, 1.0);
        history.update(VarId(0), BranchDir::Up, 4.0, 1.0);
        assert!(history.score(VarId(0), 0.5) > history.score(VarId(1), 0.5));
    }
}
