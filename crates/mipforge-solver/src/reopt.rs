//! Reoptimization: data carried from one run to the next when the
//! objective changes between closely related solves.
//!
//! Everything persisted is keyed by original variables so it stays valid
//! after the transformed problem is rebuilt.

use mipforge_core::{
    check_stage, BoundType, MipError, ObjSense, Operation, Result, SolOrigin, Solution,
    SolveStatus, VarId,
};

use crate::history::PseudoCost;
use crate::solver::Solver;

/// Domain restriction path of a node left open at the end of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedNode {
    pub lower_bound: f64,
    pub changes: Vec<(VarId, BoundType, f64)>,
}

/// What one completed run hands to the next.
#[derive(Debug, Clone, Default)]
pub struct SavedRun {
    pub run: u32,
    pub status: SolveStatus,
    pub open_nodes: Vec<SavedNode>,
    /// Original-space solutions, best first.
    pub solutions: Vec<Solution>,
    pub history: Vec<(VarId, PseudoCost)>,
}

/// Runs persisted while reoptimization is enabled.
#[derive(Debug, Clone, Default)]
pub struct ReoptStore {
    runs: Vec<SavedRun>,
    /// Solutions kept from a released run that were not part of a saved run.
    extra: Vec<Solution>,
}

fn same_values(a: &Solution, b: &Solution) -> bool {
    a.values().eq(b.values())
}

impl ReoptStore {
    pub fn n_saved_runs(&self) -> usize {
        self.runs.len()
    }

    pub fn runs(&self) -> &[SavedRun] {
        &self.runs
    }

    pub fn last(&self) -> Option<&SavedRun> {
        self.runs.last()
    }

    pub(crate) fn push(&mut self, run: SavedRun) {
        self.runs.push(run);
    }

    /// Keeps an original-space solution for the next run unless an equal
    /// one is already known.
    pub fn remember_solution(&mut self, sol: Solution) {
        let known = self
            .runs
            .last()
            .map(|r| r.solutions.as_slice())
            .unwrap_or_default()
            .iter()
            .chain(&self.extra)
            .any(|s| same_values(s, &sol));
        if !known {
            self.extra.push(sol);
        }
    }

    /// Solutions that seed the next run.
    pub fn seed_solutions(&self) -> Vec<Solution> {
        self.runs
            .last()
            .map(|r| r.solutions.clone())
            .unwrap_or_default()
            .into_iter()
            .chain(self.extra.iter().cloned())
            .collect()
    }

    pub fn clear(&mut self) {
        self.runs.clear();
        self.extra.clear();
    }
}

impl Solver {
    /// Replaces the objective for the next reoptimization run.
    ///
    /// Coefficients of variables not listed become zero.
    pub fn chg_reopt_objective(&mut self, sense: ObjSense, coefs: &[(VarId, f64)]) -> Result<()> {
        check_stage(Operation::ChgReoptObjective, self.scope.stage)?;
        if !self.scope.config().reoptimization.enabled {
            return Err(MipError::InvalidData(
                "reoptimization is not enabled".to_string(),
            ));
        }
        let num = *self.scope.numerics();
        for &(var, coef) in coefs {
            if self.scope.original.get_var(var).is_none() {
                return Err(MipError::InvalidData(format!("unknown variable {var}")));
            }
            if num.is_infinite(coef) || coef.is_nan() {
                return Err(MipError::InvalidData(format!("invalid objective coefficient for {var}")));
            }
        }

        let prob = &mut self.scope.original;
        prob.sense = sense;
        for idx in 0..prob.arena_len() {
            prob.var_mut(VarId(idx)).obj = 0.0;
        }
        for &(var, coef) in coefs {
            prob.var_mut(var).obj = coef;
        }
        tracing::debug!(runs = self.reopt.n_saved_runs(), nonzeros = coefs.len(), "reoptimization objective changed");
        Ok(())
    }

    /// Persists the finished run.
    pub(crate) fn save_reopt_run(&mut self) {
        let Some(trans) = self.scope.transformed.as_ref() else {
            return;
        };
        let config = &self.scope.config().reoptimization;
        let origin_of = |var: VarId| trans.get_var(var).and_then(|v| v.origin);

        let open_nodes = if config.save_open_nodes {
            self.scope
                .tree
                .open_node_paths()
                .into_iter()
                .map(|(lower_bound, changes)| SavedNode {
                    lower_bound,
                    changes: changes
                        .into_iter()
                        .filter_map(|c| Some((origin_of(c.var)?, c.side, c.value)))
                        .collect(),
                })
                .collect()
        } else {
            Vec::new()
        };
        let solutions = self
            .scope
            .primal
            .sols()
            .iter()
            .take(config.max_saved_sols)
            .map(|s| {
                let mut orig = s.retransform(&self.scope.original, trans);
                orig.origin = SolOrigin::Original;
                orig
            })
            .collect();

        let run = SavedRun {
            run: self.scope.stats.nruns,
            status: self.scope.status,
            open_nodes,
            solutions,
            history: self.scope.history.to_original(trans),
        };
        tracing::debug!(
            run = run.run,
            open_nodes = run.open_nodes.len(),
            solutions = run.solutions.len(),
            "reoptimization run saved"
        );
        self.reopt.extra.clear();
        self.reopt.push(run);
    }

    /// Seeds a fresh transformed problem with the persisted solutions and
    /// branching history.
    pub(crate) fn seed_from_reopt(&mut self) {
        if !self.scope.config().reoptimization.enabled {
            return;
        }
        for sol in self.reopt.seed_solutions() {
            self.scope.primal.add_orig_candidate(sol);
        }
        if let Some(last) = self.reopt.last() {
            self.scope
                .history
                .seed_from_original(&last.history, &self.scope.original);
        }
    }
}
