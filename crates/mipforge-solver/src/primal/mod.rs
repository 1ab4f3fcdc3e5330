//! Primal solution store and cutoff bound maintenance.
//!
//! Stored solutions are kept sorted by internal objective value; the store
//! is bounded and evicts the worst solution when full. Every improving
//! solution lowers the upper bound and the derived cutoff bound.

mod check;
mod finite;

use mipforge_core::{Numerics, Problem, ProblemSpace, Solution, VarId};

pub use check::{check_solution, CheckFlags, CheckReport, Violation};
pub use finite::{complete_partial_sol, finite_sol_copy};

/// Largest float strictly below a finite `x`.
fn next_below(x: f64) -> f64 {
    if x == 0.0 {
        -f64::from_bits(1)
    } else if x > 0.0 {
        f64::from_bits(x.to_bits() - 1)
    } else {
        f64::from_bits(x.to_bits() + 1)
    }
}

/// Result of inserting a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub stored: bool,
    /// The solution improved the upper bound.
    pub improved: bool,
    pub cutoff_updated: bool,
}

/// Repository of feasible solutions of the transformed problem, plus
/// original-space candidates and partial hints.
#[derive(Debug, Clone)]
pub struct PrimalStore {
    sols: Vec<Solution>,
    max_sols: usize,
    upper_bound: f64,
    cutoff_bound: f64,
    n_cutoff_updates: u64,
    nsols_found: u64,
    nbest_found: u64,
    orig_candidates: Vec<Solution>,
    partials: Vec<Solution>,
    next_index: u64,
    infinity: f64,
}

impl PrimalStore {
    pub fn new(max_sols: usize, infinity: f64) -> Self {
        Self {
            sols: Vec::new(),
            max_sols: max_sols.max(1),
            upper_bound: infinity,
            cutoff_bound: infinity,
            n_cutoff_updates: 0,
            nsols_found: 0,
            nbest_found: 0,
            orig_candidates: Vec::new(),
            partials: Vec::new(),
            next_index: 0,
            infinity,
        }
    }

    /// Internal objective of the incumbent, infinity without one.
    pub fn upper_bound(&self) -> f64 {
        self.upper_bound
    }

    /// Nodes with a lower bound at or above this value are pruned.
    pub fn cutoff_bound(&self) -> f64 {
        self.cutoff_bound
    }

    /// Number of times the cutoff bound decreased through solutions.
    pub fn n_cutoff_updates(&self) -> u64 {
        self.n_cutoff_updates
    }

    pub fn nsols_found(&self) -> u64 {
        self.nsols_found
    }

    pub fn nbest_found(&self) -> u64 {
        self.nbest_found
    }

    /// Number of stored solutions.
    pub fn n_sols(&self) -> usize {
        self.sols.len()
    }

    pub fn sols(&self) -> &[Solution] {
        &self.sols
    }

    pub fn best(&self) -> Option<&Solution> {
        self.sols.first()
    }

    /// Cutoff bound derived from an upper bound.
    ///
    /// With an integral objective every solution better than `ub` is at
    /// least one unit better, so the cutoff moves down to just above the
    /// next integer.
    pub fn cutoff_for(&self, ub: f64, obj_integral: bool, num: &Numerics) -> f64 {
        if num.is_infinity(ub) {
            return ub;
        }
        if obj_integral {
            let cutoff = num.feas_ceil(ub) - (1.0 - num.cutoff_bound_delta());
            if cutoff >= ub {
                // the delta vanished at this magnitude
                next_below(ub)
            } else {
                cutoff
            }
        } else {
            ub
        }
    }

    /// Inserts a solution whose objective is cached, keeping the order.
    ///
    /// Solutions of the transformed space are materialized first so later
    /// fixings do not change their values.
    pub fn add(&mut self, mut sol: Solution, prob: &Problem, num: &Numerics) -> Admission {
        if sol.space() == ProblemSpace::Transformed {
            sol.materialize(prob);
        }
        let obj = sol.cache_objective(prob);
        let pos = self.sols.partition_point(|s| s.obj.unwrap_or(self.infinity) <= obj);
        if pos >= self.max_sols || self.contains_equal(&sol, obj, prob, num) {
            return Admission {
                stored: false,
                improved: false,
                cutoff_updated: false,
            };
        }

        sol.index = self.next_index;
        self.next_index += 1;
        self.sols.insert(pos, sol);
        self.sols.truncate(self.max_sols);
        self.nsols_found += 1;

        let improved = obj < self.upper_bound;
        let mut cutoff_updated = false;
        if improved {
            self.upper_bound = obj;
            self.nbest_found += 1;
            let cutoff = self.cutoff_for(obj, prob.is_obj_integral(), num);
            cutoff_updated = self.tighten_cutoff(cutoff);
        }
        Admission {
            stored: true,
            improved,
            cutoff_updated,
        }
    }

    /// Some stored solution has the same objective and feasibility-equal
    /// values on every variable.
    fn contains_equal(&self, sol: &Solution, obj: f64, prob: &Problem, num: &Numerics) -> bool {
        self.sols
            .iter()
            .filter(|s| s.obj.is_some_and(|o| num.is_eq(o, obj)))
            .any(|s| {
                (0..prob.arena_len())
                    .map(VarId)
                    .all(|v| num.is_feas_eq(s.val(prob, v), sol.val(prob, v)))
            })
    }

    /// Lowers the cutoff bound, counting the update. Returns true if it changed.
    pub fn tighten_cutoff(&mut self, cutoff: f64) -> bool {
        if cutoff < self.cutoff_bound {
            self.cutoff_bound = cutoff;
            self.n_cutoff_updates += 1;
            true
        } else {
            false
        }
    }

    /// Lowers the cutoff bound from a non-solution source without counting.
    pub fn seed_cutoff(&mut self, cutoff: f64) -> bool {
        if cutoff < self.cutoff_bound {
            self.cutoff_bound = cutoff;
            true
        } else {
            false
        }
    }

    /// Re-derives the cutoff bound after the objective integrality changed.
    pub fn recompute_cutoff(&mut self, obj_integral: bool, num: &Numerics) {
        let cutoff = self.cutoff_for(self.upper_bound, obj_integral, num);
        self.seed_cutoff(cutoff);
    }

    /// Recomputes stored objectives after the objective was multiplied by
    /// `scale`, then re-derives the bounds.
    pub fn rescale(&mut self, scale: f64, prob: &Problem, num: &Numerics) {
        for sol in &mut self.sols {
            sol.cache_objective(prob);
        }
        self.sols
            .sort_by(|a, b| a.obj.unwrap_or(0.0).total_cmp(&b.obj.unwrap_or(0.0)));
        if !num.is_infinite(self.upper_bound) {
            self.upper_bound *= scale;
        }
        self.cutoff_bound = self.infinity;
        self.recompute_cutoff(prob.is_obj_integral(), num);
    }

    // ---- original-space candidates and partial hints ----

    pub fn add_orig_candidate(&mut self, sol: Solution) {
        self.orig_candidates.push(sol);
    }

    pub fn orig_candidates(&self) -> &[Solution] {
        &self.orig_candidates
    }

    pub fn take_orig_candidates(&mut self) -> Vec<Solution> {
        std::mem::take(&mut self.orig_candidates)
    }

    pub fn add_partial(&mut self, sol: Solution) {
        self.partials.push(sol);
    }

    pub fn partials(&self) -> &[Solution] {
        &self.partials
    }

    pub fn take_partials(&mut self) -> Vec<Solution> {
        std::mem::take(&mut self.partials)
    }

    /// Removes every stored solution and resets the bounds, keeping
    /// candidates and partial hints.
    pub fn clear_solutions(&mut self) {
        self.sols.clear();
        self.upper_bound = self.infinity;
        self.cutoff_bound = self.infinity;
        self.n_cutoff_updates = 0;
        self.nsols_found = 0;
        self.nbest_found = 0;
    }

    /// Takes every stored solution out of the store.
    pub fn take_solutions(&mut self) -> Vec<Solution> {
        std::mem::take(&mut self.sols)
    }
}
