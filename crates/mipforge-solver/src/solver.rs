//! The solver instance.

use std::fmt::Debug;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use mipforge_config::SolverConfig;
use mipforge_core::{
    check_stage, ConsId, Constraint, MipError, Operation, Problem, ProblemSpace, Result,
    Solution, SolveStatus, Stage, Var, VarId,
};

use crate::bnb::BnbState;
use crate::concurrent::SyncPeer;
use crate::event::SolverEventListener;
use crate::lp::{LpOracle, MicroLpOracle};
use crate::plugin::{
    BendersDecomposition, BranchRule, ConstraintHandler, HeurTiming, Heuristic, NodeSelector,
    PluginSet, Presolver, Pricer, Propagator, Separator,
};
use crate::primal::{check_solution, finite_sol_copy, CheckFlags, CheckReport};
use crate::reopt::ReoptStore;
use crate::scope::SolverScope;
use crate::stats::SolveReport;

/// A MIP solver instance.
///
/// Owns the solving context, the registered plugins and the relaxation
/// oracle. Every public operation is gated by the current [`Stage`].
///
/// # Example
///
/// ```
/// use mipforge_config::SolverConfig;
/// use mipforge_core::{Stage, Var};
/// use mipforge_solver::solver::Solver;
///
/// let mut solver = Solver::new("example", SolverConfig::default());
/// let x = solver.add_var(Var::binary("x", 1.0)).unwrap();
/// assert_eq!(solver.stage(), Stage::Problem);
/// assert_eq!(solver.scope().original().var(x).name, "x");
/// ```
pub struct Solver {
    pub(crate) scope: SolverScope,
    pub(crate) plugins: PluginSet,
    pub(crate) oracle: Box<dyn LpOracle>,
    pub(crate) reopt: ReoptStore,
    pub(crate) bnb: BnbState,
    pub(crate) sync: Option<SyncPeer>,
}

impl Debug for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solver")
            .field("scope", &self.scope)
            .field("plugins", &self.plugins)
            .field("reopt_runs", &self.reopt.n_saved_runs())
            .finish()
    }
}

impl Solver {
    /// Creates a solver in PROBLEM stage with no plugins and the bundled
    /// LP oracle.
    pub fn new(name: impl Into<String>, config: SolverConfig) -> Self {
        Self::with_oracle(name, config, Box::new(MicroLpOracle::new()))
    }

    pub fn with_oracle(name: impl Into<String>, config: SolverConfig, oracle: Box<dyn LpOracle>) -> Self {
        Self {
            scope: SolverScope::new(name, config),
            plugins: PluginSet::new(),
            oracle,
            reopt: ReoptStore::default(),
            bnb: BnbState::default(),
            sync: None,
        }
    }

    /// Creates a solver and loads a copy of `prob` as the original problem.
    pub fn from_problem(prob: &Problem, config: SolverConfig) -> Result<Self> {
        let mut solver = Self::new(prob.name.clone(), config);
        solver.scope.load_problem(prob)?;
        Ok(solver)
    }

    pub fn scope(&self) -> &SolverScope {
        &self.scope
    }

    pub fn scope_mut(&mut self) -> &mut SolverScope {
        &mut self.scope
    }

    pub fn plugins(&self) -> &PluginSet {
        &self.plugins
    }

    pub fn plugins_mut(&mut self) -> &mut PluginSet {
        &mut self.plugins
    }

    pub fn stage(&self) -> Stage {
        self.scope.stage
    }

    pub fn status(&self) -> SolveStatus {
        self.scope.status
    }

    pub fn reopt_store(&self) -> &ReoptStore {
        &self.reopt
    }

    // ---- plugin registration ----

    pub fn include_presolver(&mut self, p: impl Presolver + 'static) -> &mut Self {
        self.plugins.add_presolver(Box::new(p));
        self
    }

    pub fn include_propagator(&mut self, p: impl Propagator + 'static) -> &mut Self {
        self.plugins.add_propagator(Box::new(p));
        self
    }

    pub fn include_conshdlr(&mut self, h: impl ConstraintHandler + 'static) -> &mut Self {
        self.plugins.add_conshdlr(Box::new(h));
        self
    }

    pub fn include_heuristic(&mut self, h: impl Heuristic + 'static) -> &mut Self {
        self.plugins.add_heuristic(Box::new(h));
        self
    }

    pub fn include_branchrule(&mut self, b: impl BranchRule + 'static) -> &mut Self {
        self.plugins.add_branchrule(Box::new(b));
        self
    }

    pub fn include_nodeselector(&mut self, n: impl NodeSelector + 'static) -> &mut Self {
        self.plugins.add_nodeselector(Box::new(n));
        self
    }

    pub fn include_separator(&mut self, s: impl Separator + 'static) -> &mut Self {
        self.plugins.add_separator(Box::new(s));
        self
    }

    pub fn include_pricer(&mut self, p: impl Pricer + 'static) -> &mut Self {
        self.plugins.add_pricer(Box::new(p));
        self
    }

    pub fn include_benders(&mut self, b: impl BendersDecomposition + 'static) -> &mut Self {
        self.plugins.add_benders(Box::new(b));
        self
    }

    pub fn add_listener(&mut self, listener: Arc<dyn SolverEventListener>) {
        self.scope.events.add_listener(listener);
    }

    // ---- problem building ----

    pub fn add_var(&mut self, var: Var) -> Result<VarId> {
        self.scope.add_var(var)
    }

    pub fn add_cons(&mut self, cons: Constraint) -> Result<ConsId> {
        self.scope.add_cons(cons)
    }

    pub fn load_problem(&mut self, prob: &Problem) -> Result<()> {
        self.scope.load_problem(prob)
    }

    // ---- control ----

    /// Asks the solve to stop at the next checkpoint with status
    /// `UserInterrupt`.
    pub fn interrupt_solve(&mut self) -> Result<()> {
        check_stage(Operation::InterruptSolve, self.scope.stage)?;
        self.scope.request_interrupt();
        Ok(())
    }

    /// Shared flag for interrupting from another thread.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.scope.interrupt_handle()
    }

    /// Asks for a restart at the next checkpoint of presolving or search.
    pub fn restart_solve(&mut self) -> Result<()> {
        check_stage(Operation::RestartSolve, self.scope.stage)?;
        self.scope.restart_requested = true;
        Ok(())
    }

    // ---- solutions ----

    /// Checks `sol` and stores it if it is feasible. Returns true if it
    /// was stored.
    ///
    /// An original-space solution is copied into the transformed space
    /// first; one that cannot be represented there is rejected.
    pub fn try_sol(&mut self, sol: Solution, flags: &CheckFlags) -> Result<bool> {
        check_stage(Operation::TrySol, self.scope.stage)?;
        if sol.is_partial() {
            return Err(MipError::InvalidData(
                "partial solutions must be completed before trying".to_string(),
            ));
        }
        let sol = match sol.space() {
            ProblemSpace::Transformed => sol,
            ProblemSpace::Original => {
                let Some(trans) = self.scope.transformed.as_ref() else {
                    return Ok(false);
                };
                let feastol = self.scope.numerics().feastol;
                match sol.to_transformed(&self.scope.original, trans, feastol) {
                    Some(t) => t,
                    None => {
                        tracing::debug!("original solution not representable in transformed space");
                        return Ok(false);
                    }
                }
            }
        };
        let report = check_solution(
            self.scope.prob(),
            self.scope.numerics(),
            &self.plugins.conshdlrs,
            &sol,
            flags,
        )?;
        if !report.is_feasible() {
            tracing::trace!(violations = report.violations.len(), "solution rejected");
            return Ok(false);
        }
        Ok(self.scope.store_sol(sol))
    }

    /// Checks `sol` against the problem of its space without storing it.
    pub fn check_sol(&self, sol: &Solution, flags: &CheckFlags) -> Result<CheckReport> {
        check_stage(Operation::CheckSol, self.scope.stage)?;
        let prob = self.problem_of(sol)?;
        check_solution(prob, self.scope.numerics(), &self.plugins.conshdlrs, sol, flags)
    }

    /// Copy of `sol` with every infinite value replaced by a finite one.
    /// `None` if no finite copy with the same objective exists.
    pub fn create_finite_sol_copy(&mut self, sol: &Solution) -> Result<Option<Solution>> {
        check_stage(Operation::CreateFiniteSolCopy, self.scope.stage)?;
        let prob = match sol.space() {
            ProblemSpace::Original => &self.scope.original,
            ProblemSpace::Transformed => self
                .scope
                .transformed
                .as_ref()
                .ok_or_else(|| MipError::InvalidData("no transformed problem".to_string()))?,
        };
        finite_sol_copy(prob, self.scope.numerics(), self.oracle.as_mut(), sol)
    }

    fn problem_of(&self, sol: &Solution) -> Result<&Problem> {
        match sol.space() {
            ProblemSpace::Original => Ok(&self.scope.original),
            ProblemSpace::Transformed => self
                .scope
                .transformed
                .as_ref()
                .ok_or_else(|| MipError::InvalidData("no transformed problem".to_string())),
        }
    }

    /// Calls the heuristics registered for `timing` and tries what they
    /// propose. Returns the number of stored solutions.
    pub(crate) fn run_heuristics(&mut self, timing: HeurTiming) -> Result<usize> {
        if !self.scope.config().heuristics.enabled {
            return Ok(0);
        }
        let mut stored = 0;
        for i in 0..self.plugins.heuristics.len() {
            if !self.plugins.heuristics[i].timing().contains(timing) {
                continue;
            }
            let result = self.plugins.heuristics[i].execute(&mut self.scope, timing)?;
            let name = self.plugins.heuristics[i].name().to_string();
            for mut sol in self.scope.take_proposed() {
                sol.provenance.heuristic = Some(name.clone());
                if self.try_sol(sol, &CheckFlags::default())? {
                    stored += 1;
                }
            }
            tracing::trace!(heuristic = %name, ?result, "heuristic called");
        }
        Ok(stored)
    }

    /// Active constraints of the working problem owned by handler `h`.
    pub(crate) fn handler_conss(&self, h: usize) -> Vec<ConsId> {
        let name = self.plugins.conshdlrs[h].name();
        self.scope
            .prob()
            .conss()
            .filter(|(_, c)| c.handler == name)
            .map(|(id, _)| id)
            .collect()
    }

    /// Summary of the current solve.
    pub fn report(&self) -> SolveReport {
        let stats = &self.scope.stats;
        let num = self.scope.numerics();
        SolveReport {
            status: self.scope.status,
            primal_bound: self.scope.primal_bound(),
            dual_bound: self
                .scope
                .prob()
                .external_obj(self.scope.internal_dual_bound(), num),
            gap: self.scope.gap(),
            nruns: stats.nruns,
            nnodes: stats.nnodes,
            ntotalnodes: stats.ntotalnodes,
            nsols: self.scope.primal.nsols_found(),
            nbestsols: self.scope.primal.nbest_found(),
            nlps: stats.nlps,
            nlpiterations: stats.nlpiterations,
            npresolrounds: stats.npresolrounds,
            presolve_seconds: stats.presolve_time().as_secs_f64(),
            solve_seconds: stats.solve_time().as_secs_f64(),
            primal_dual_integral: stats.integral.value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use mipforge_core::Var;
    use mipforge_test::{deterministic_config, small_knapsack};

    use super::*;

    #[test]
    fn test_new_solver_starts_in_problem_stage() {
        let solver = Solver::new("empty", deterministic_config());
        assert_eq!(solver.stage(), Stage::Problem);
        assert_eq!(solver.status(), SolveStatus::Unknown);
        assert!(solver.plugins().presolvers.is_empty());
    }

    #[test]
    fn test_from_problem_copies_variables() {
        let prob = small_knapsack();
        let solver = Solver::from_problem(&prob, deterministic_config()).unwrap();
        assert_eq!(solver.scope().original().n_vars(), prob.n_vars());
        assert_eq!(solver.scope().original().n_conss(), prob.n_conss());
    }

    #[test]
    fn test_try_sol_rejected_in_problem_stage() {
        let mut solver = Solver::new("p", deterministic_config());
        solver.add_var(Var::binary("x", 1.0)).unwrap();
        let sol = solver.scope().create_orig_sol().unwrap();
        let err = solver.try_sol(sol, &CheckFlags::default()).unwrap_err();
        assert!(err.is_invalid_call());
    }

    #[test]
    fn test_check_sol_in_problem_stage_uses_original() {
        let mut solver = Solver::new("p", deterministic_config());
        let x = solver.add_var(Var::integer("x", 0.0, 3.0, 1.0)).unwrap();
        let mut sol = solver.scope().create_orig_sol().unwrap();
        sol.set_val(x, 5.0);
        let report = solver.check_sol(&sol, &CheckFlags::default()).unwrap();
        assert!(!report.is_feasible());
    }

    #[test]
    fn test_restart_solve_rejected_before_presolving() {
        let mut solver = Solver::new("p", deterministic_config());
        assert!(solver.restart_solve().unwrap_err().is_invalid_call());
    }

    #[test]
    fn test_interrupt_sets_flag() {
        let mut solver = Solver::new("p", deterministic_config());
        solver.interrupt_solve().unwrap();
        assert!(solver.scope().is_interrupted());
    }
}
