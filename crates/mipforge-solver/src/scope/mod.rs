//! Solver context.
//!
//! [`SolverScope`] owns every piece of per-instance state: the original and
//! transformed problem, the search tree, the primal store, statistics,
//! events and relaxation stores. Plugins receive it by mutable reference;
//! nothing else holds it.

mod aggregate;
mod bound;
mod probing;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;

use mipforge_config::SolverConfig;
use mipforge_core::{
    check_stage, Constraint, ConsId, MipError, Numerics, Operation, Problem, ProblemSpace,
    Result, SolOrigin, SolveStatus, Solution, Stage, Var, VarId, VarStatus,
};

use crate::clique::{CliqueTable, Literal};
use crate::event::SolverEventSupport;
use crate::history::BranchingHistory;
use crate::lp::{Cut, RelaxationStores};
use crate::primal::PrimalStore;
use crate::stats::{relative_gap, SolverStats};
use crate::termination::{
    BestSolutionTermination, GapTermination, MemoryTermination, NodeTermination,
    SolutionTermination, Termination, TimeTermination, TotalNodeTermination,
};
use crate::tree::SearchTree;

pub use aggregate::AggrOutcome;
pub use bound::BoundOutcome;

/// Improved solutions in the original space with their objective value.
pub type SolutionSender = mpsc::UnboundedSender<(Solution, f64)>;

/// Per-instance solver state.
pub struct SolverScope {
    config: SolverConfig,
    num: Numerics,
    pub(crate) stage: Stage,
    pub(crate) status: SolveStatus,
    pub(crate) original: Problem,
    pub(crate) transformed: Option<Problem>,
    pub(crate) tree: SearchTree,
    pub(crate) primal: PrimalStore,
    pub(crate) stats: SolverStats,
    pub(crate) events: SolverEventSupport,
    pub(crate) cliques: CliqueTable,
    pub(crate) history: BranchingHistory,
    pub(crate) relax: RelaxationStores,
    pub(crate) lp_sol: Option<Solution>,
    terminations: Vec<Box<dyn Termination>>,
    interrupt: Arc<AtomicBool>,
    pub(crate) restart_requested: bool,
    rng: StdRng,
    pub(crate) obj_limit: Option<f64>,
    proposed: Vec<Solution>,
    sender: Option<SolutionSender>,
    memory_estimate: usize,
}

impl SolverScope {
    /// Creates a context in PROBLEM stage with an empty original problem.
    pub fn new(name: impl Into<String>, config: SolverConfig) -> Self {
        let num = config.numerics();
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let terminations = limit_terminations(&config);
        Self {
            primal: PrimalStore::new(config.misc.max_stored_sols, num.infinity),
            obj_limit: config.misc.obj_limit,
            config,
            num,
            stage: Stage::Problem,
            status: SolveStatus::Unknown,
            original: Problem::new(name),
            transformed: None,
            tree: SearchTree::new(),
            stats: SolverStats::default(),
            events: SolverEventSupport::new(),
            cliques: CliqueTable::new(),
            history: BranchingHistory::new(),
            relax: RelaxationStores::default(),
            lp_sol: None,
            terminations,
            interrupt: Arc::new(AtomicBool::new(false)),
            restart_requested: false,
            rng,
            proposed: Vec::new(),
            sender: None,
            memory_estimate: 0,
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn numerics(&self) -> &Numerics {
        &self.num
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn status(&self) -> SolveStatus {
        self.status
    }

    /// Moves to `to` and notifies listeners.
    pub(crate) fn set_stage(&mut self, to: Stage) {
        let from = self.stage;
        self.stage = to;
        tracing::trace!(%from, %to, "stage transition");
        self.events.fire_stage_changed(from, to);
    }

    // ---- problems ----

    pub fn original(&self) -> &Problem {
        &self.original
    }

    pub fn transformed(&self) -> Option<&Problem> {
        self.transformed.as_ref()
    }

    /// The problem operations act on: the original problem in PROBLEM
    /// stage, the transformed problem afterwards.
    pub fn prob(&self) -> &Problem {
        self.transformed.as_ref().unwrap_or(&self.original)
    }

    pub fn prob_mut(&mut self) -> &mut Problem {
        self.transformed.as_mut().unwrap_or(&mut self.original)
    }

    pub(crate) fn working_var_exists(&self, var: VarId) -> Result<()> {
        if self.prob().get_var(var).is_none() {
            return Err(MipError::InvalidData(format!("unknown variable {var}")));
        }
        Ok(())
    }

    /// Replaces the original problem by a copy of `prob`, normalizing
    /// bounds and sides on the way in.
    pub fn load_problem(&mut self, prob: &Problem) -> Result<()> {
        if self.stage != Stage::Problem {
            return Err(MipError::InvalidCall {
                operation: Operation::AddVar,
                stage: self.stage,
            });
        }
        let mut original = Problem::new(prob.name.clone());
        original.sense = prob.sense;
        original.obj_offset = prob.obj_offset;
        self.original = original;
        for var in prob.arena() {
            self.add_var(var.clone())?;
        }
        for (_, cons) in prob.conss() {
            let mut cons = cons.clone();
            cons.lhs = self.num.normalize(cons.lhs);
            cons.rhs = self.num.normalize(cons.rhs);
            self.add_cons(cons)?;
        }
        Ok(())
    }

    /// Adds a variable to the working problem.
    ///
    /// In PROBLEM stage it becomes an original variable; later it is added
    /// to the transformed problem as an active variable without origin.
    pub fn add_var(&mut self, mut var: Var) -> Result<VarId> {
        check_stage(Operation::AddVar, self.stage)?;
        if self.num.is_infinite(var.obj) {
            return Err(MipError::InvalidData(format!(
                "infinite objective coefficient for {}",
                var.name
            )));
        }
        let integral = var.is_integral();
        let lb = self.num.adjusted_lb(integral, self.num.normalize(var.glb));
        let ub = self.num.adjusted_ub(integral, self.num.normalize(var.gub));
        if self.num.is_gt(lb, ub) {
            return Err(MipError::InvalidData(format!(
                "crossing bounds [{lb}, {ub}] for {}",
                var.name
            )));
        }
        var.glb = lb;
        var.gub = ub;
        var.llb = lb;
        var.lub = ub;
        if self.stage == Stage::Problem {
            var.orig_lb = lb;
            var.orig_ub = ub;
            var.status = VarStatus::Original { transformed: None };
            return Ok(self.original.add_var(var));
        }
        var.status = VarStatus::Loose;
        var.origin = None;
        Ok(self.prob_mut().add_var(var))
    }

    /// Adds a constraint to the working problem and installs its locks.
    pub fn add_cons(&mut self, cons: Constraint) -> Result<ConsId> {
        check_stage(Operation::AddCons, self.stage)?;
        if let Some(v) = cons.vars.iter().find(|v| self.prob().get_var(**v).is_none()) {
            return Err(MipError::InvalidData(format!(
                "constraint {} refers to unknown variable {v}",
                cons.name
            )));
        }
        if self.num.is_gt(cons.lhs, cons.rhs) {
            return Err(MipError::InvalidData(format!(
                "constraint {} has lhs > rhs",
                cons.name
            )));
        }
        let transformed = self.transformed.is_some();
        let num = self.num;
        let prob = self.prob_mut();
        let id = prob.add_cons(cons);
        if transformed {
            prob.lock_row(id, 1, &num);
        }
        Ok(id)
    }

    /// Deletes a constraint of the working problem, releasing its locks.
    pub fn del_cons(&mut self, cons: ConsId) -> bool {
        let transformed = self.transformed.is_some();
        let num = self.num;
        let prob = self.prob_mut();
        if prob.cons(cons).deleted {
            return false;
        }
        if transformed {
            prob.lock_row(cons, -1, &num);
        }
        prob.del_cons(cons)
    }

    /// Changes the objective coefficient of a variable, given in the
    /// user's sense.
    pub fn chg_var_obj(&mut self, var: VarId, obj: f64) -> Result<()> {
        check_stage(Operation::ChgVarObj, self.stage)?;
        self.working_var_exists(var)?;
        if self.num.is_infinite(obj) {
            return Err(MipError::InvalidData(format!("infinite objective coefficient for {var}")));
        }
        match self.transformed.as_mut() {
            None => self.original.var_mut(var).obj = obj,
            Some(trans) => {
                let internal = trans.sense.sign() * obj / trans.obj_scale;
                trans.var_mut(var).obj = internal;
                trans.check_obj_integrality(&self.num);
            }
        }
        Ok(())
    }

    // ---- components ----

    pub fn tree(&self) -> &SearchTree {
        &self.tree
    }

    pub fn primal(&self) -> &PrimalStore {
        &self.primal
    }

    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    pub fn events(&self) -> &SolverEventSupport {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut SolverEventSupport {
        &mut self.events
    }

    pub fn cliques(&self) -> &CliqueTable {
        &self.cliques
    }

    pub fn history(&self) -> &BranchingHistory {
        &self.history
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Values of the last solved LP relaxation, linked to the focus node.
    pub fn lp_sol(&self) -> Option<&Solution> {
        self.lp_sol.as_ref()
    }

    /// Adds a clique over binary literals.
    pub fn add_clique(&mut self, lits: Vec<Literal>) -> Result<bool> {
        check_stage(Operation::AddClique, self.stage)?;
        for (v, _) in &lits {
            self.working_var_exists(*v)?;
        }
        Ok(self.cliques.add(lits))
    }

    /// Removes trivial cliques; the implied fixings are left to the caller.
    pub(crate) fn cleanup_cliques(&mut self) -> crate::clique::CliqueCleanup {
        let prob = self.transformed.as_ref().unwrap_or(&self.original);
        self.cliques.cleanup(prob)
    }

    /// Dual reductions are off while reoptimization is enabled.
    pub fn allow_dual_reductions(&self) -> bool {
        self.config.misc.allow_dual_reds && !self.config.reoptimization.enabled
    }

    /// Queues a cut for the current separation round.
    pub fn add_cut(&mut self, cut: Cut) -> Result<()> {
        let Some(store) = self.relax.sepastore.as_mut() else {
            return Err(MipError::InvalidCall {
                operation: Operation::AddCons,
                stage: self.stage,
            });
        };
        store.add(cut);
        Ok(())
    }

    /// Queues a priced variable; it joins the problem after pricing.
    pub fn add_priced_var(&mut self, var: Var) -> Result<()> {
        check_stage(Operation::AddVar, self.stage)?;
        let Some(store) = self.relax.pricestore.as_mut() else {
            return Err(MipError::InvalidCall {
                operation: Operation::AddVar,
                stage: self.stage,
            });
        };
        store.add(var);
        Ok(())
    }

    // ---- clocks, limits and interruption ----

    /// Presolving plus solving time of this instance.
    pub fn elapsed(&self) -> Duration {
        self.stats.presolve_time() + self.stats.solve_time()
    }

    /// Estimated memory use of the transformed problem in bytes.
    pub fn memory_estimate(&self) -> usize {
        self.memory_estimate
    }

    pub(crate) fn estimate_memory(&mut self) {
        let prob = self.prob();
        let nonzeros = prob.count_nonzeros(0).count;
        self.memory_estimate = prob.arena_len() * std::mem::size_of::<Var>()
            + prob.n_conss() * std::mem::size_of::<Constraint>()
            + nonzeros * (std::mem::size_of::<VarId>() + std::mem::size_of::<f64>());
    }

    /// Registers an additional stop predicate.
    pub fn add_termination(&mut self, termination: Box<dyn Termination>) {
        self.terminations.push(termination);
    }

    /// Shared flag; setting it interrupts solving at the next checkpoint.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
    }

    pub(crate) fn request_interrupt(&self) {
        self.interrupt.store(true, Ordering::Relaxed);
    }

    pub(crate) fn clear_interrupt(&self) {
        self.interrupt.store(false, Ordering::Relaxed);
    }

    /// Evaluates the stop predicate: user interrupt first, then limits.
    pub fn check_stop(&self) -> Option<SolveStatus> {
        if self.is_interrupted() {
            return Some(SolveStatus::UserInterrupt);
        }
        self.terminations.iter().find_map(|t| t.check(self))
    }

    // ---- bounds of the whole problem ----

    /// Primal bound in the user's sense; minus infinity for an unbounded
    /// minimization.
    pub fn primal_bound(&self) -> f64 {
        if self.status == SolveStatus::Unbounded {
            return self.prob().external_obj(-self.num.infinity, &self.num);
        }
        self.prob().external_obj(self.primal.upper_bound(), &self.num)
    }

    /// Dual bound in the internal minimization space.
    pub(crate) fn internal_dual_bound(&self) -> f64 {
        match self.status {
            SolveStatus::Infeasible => return self.num.infinity,
            SolveStatus::Unbounded | SolveStatus::InfOrUnbd => return -self.num.infinity,
            _ => {}
        }
        let ub = self.primal.upper_bound();
        match self.stage {
            Stage::Solving | Stage::Solved | Stage::ExitSolve | Stage::InitSolve => {
                match self.tree.lower_bound() {
                    Some(lb) => lb.min(ub),
                    None if self.stage == Stage::Solved => ub,
                    None => -self.num.infinity,
                }
            }
            _ => -self.num.infinity,
        }
    }

    /// Dual bound in the user's sense.
    pub fn dual_bound(&self) -> Result<f64> {
        check_stage(Operation::GetDualBound, self.stage)?;
        Ok(self.prob().external_obj(self.internal_dual_bound(), &self.num))
    }

    /// Relative gap between primal and dual bound.
    pub fn gap(&self) -> f64 {
        let primal = self.primal.upper_bound();
        let dual = self.internal_dual_bound();
        relative_gap(primal, dual, self.num.infinity)
    }

    // ---- solutions ----

    /// Creates an empty solution of the working space tagged with the
    /// current node.
    pub fn create_sol(&self, origin: SolOrigin) -> Result<Solution> {
        check_stage(Operation::CreateSol, self.stage)?;
        let space = if self.transformed.is_some() {
            ProblemSpace::Transformed
        } else {
            ProblemSpace::Original
        };
        let mut sol = Solution::new(space, origin);
        sol.provenance.run = self.stats.nruns;
        if let Some(focus) = self.tree.focus() {
            let node = self.tree.node(focus);
            sol.provenance.node = node.number;
            sol.provenance.depth = node.depth;
        }
        Ok(sol)
    }

    /// Creates a solution over the original variables.
    pub fn create_orig_sol(&self) -> Result<Solution> {
        check_stage(Operation::CreateSol, self.stage)?;
        Ok(Solution::new(ProblemSpace::Original, SolOrigin::Original))
    }

    pub fn create_partial_sol(&self) -> Result<Solution> {
        check_stage(Operation::CreatePartialSol, self.stage)?;
        Ok(Solution::new_partial())
    }

    pub fn set_sol_val(&self, sol: &mut Solution, var: VarId, value: f64) -> Result<()> {
        check_stage(Operation::SetSolVal, self.stage)?;
        let prob = match sol.space() {
            ProblemSpace::Original => &self.original,
            ProblemSpace::Transformed => self.prob(),
        };
        if prob.get_var(var).is_none() {
            return Err(MipError::InvalidData(format!("unknown variable {var}")));
        }
        sol.set_val(var, value);
        Ok(())
    }

    /// Stores a partial solution as a hint for later completion.
    pub fn add_partial_sol(&mut self, sol: Solution) -> Result<()> {
        check_stage(Operation::CreatePartialSol, self.stage)?;
        if !sol.is_partial() {
            return Err(MipError::InvalidData("solution is not partial".to_string()));
        }
        self.primal.add_partial(sol);
        Ok(())
    }

    /// Adds a solution without checking feasibility.
    ///
    /// Before the transformation it becomes a candidate of the original
    /// space; solutions with infinite values are dropped there unless the
    /// finite solution store is disabled. Afterwards an original-space
    /// solution is copied into the transformed space, or kept as a
    /// candidate if it cannot be represented. Returns true if the solution
    /// was stored.
    pub fn add_sol(&mut self, sol: Solution) -> Result<bool> {
        check_stage(Operation::AddSol, self.stage)?;
        if sol.is_partial() {
            return Err(MipError::InvalidData(
                "partial solutions must be completed before adding".to_string(),
            ));
        }
        if self.transformed.is_none() {
            let has_infinite = sol.values().any(|(_, x)| self.num.is_infinite(x));
            if has_infinite && self.config.misc.finite_sol_store {
                tracing::debug!("dropping original solution with infinite values");
                return Ok(false);
            }
            self.primal.add_orig_candidate(sol);
            return Ok(true);
        }
        let sol = match sol.space() {
            ProblemSpace::Transformed => sol,
            ProblemSpace::Original => {
                let Some(trans) = self.transformed.as_ref() else {
                    return Ok(false);
                };
                match sol.to_transformed(&self.original, trans, self.num.feastol) {
                    Some(t) => t,
                    None => {
                        self.primal.add_orig_candidate(sol);
                        return Ok(false);
                    }
                }
            }
        };
        Ok(self.store_sol(sol))
    }

    /// Inserts a transformed-space solution into the primal store.
    ///
    /// Improvements notify listeners, snapshot the gap, update the
    /// primal-dual integral during solving and are streamed to the sender.
    pub(crate) fn store_sol(&mut self, mut sol: Solution) -> bool {
        sol.gap_at_discovery = Some(self.gap());
        let admission = {
            let Some(trans) = self.transformed.as_ref() else {
                return false;
            };
            self.primal.add(sol, trans, &self.num)
        };
        if !admission.improved {
            return admission.stored;
        }

        let obj = self.primal_bound();
        if self.stage == Stage::Solving && self.config.misc.calc_integral {
            let dual = self.internal_dual_bound();
            self.stats
                .integral
                .update(self.primal.upper_bound(), dual, self.num.infinity);
        }
        let (best_orig, depth) = {
            let Some(best) = self.primal.best() else {
                return admission.stored;
            };
            let Some(trans) = self.transformed.as_ref() else {
                return admission.stored;
            };
            (best.retransform(&self.original, trans), best.provenance.depth)
        };
        tracing::info!(
            event = "new_incumbent",
            obj,
            depth,
            heuristic = best_orig.provenance.heuristic.as_deref().unwrap_or("relaxation"),
            nsols = self.primal.nsols_found(),
        );
        self.events.fire_best_solution_found(obj, &best_orig);
        if let Some(sender) = &self.sender {
            if sender.send((best_orig, obj)).is_err() {
                tracing::debug!("solution receiver dropped");
                self.sender = None;
            }
        }
        admission.stored
    }

    /// Hands a heuristic solution to the driver, which checks and stores it
    /// after the heuristic returns.
    pub fn propose_sol(&mut self, sol: Solution) {
        self.proposed.push(sol);
    }

    pub(crate) fn take_proposed(&mut self) -> Vec<Solution> {
        std::mem::take(&mut self.proposed)
    }

    /// Best stored solution; in PROBLEM stage the first original candidate.
    pub fn best_sol(&self) -> Result<Option<&Solution>> {
        check_stage(Operation::GetBestSol, self.stage)?;
        if self.transformed.is_none() {
            return Ok(self.primal.orig_candidates().first());
        }
        Ok(self.primal.best())
    }

    /// Best stored solution mapped to the original variables.
    pub fn best_sol_original(&self) -> Result<Option<Solution>> {
        let Some(best) = self.best_sol()? else {
            return Ok(None);
        };
        Ok(match (best.space(), self.transformed.as_ref()) {
            (ProblemSpace::Transformed, Some(trans)) => Some(best.retransform(&self.original, trans)),
            _ => Some(best.clone()),
        })
    }

    /// Streams every improving solution to `sender`.
    pub fn set_solution_sender(&mut self, sender: SolutionSender) {
        self.sender = Some(sender);
    }

    /// Sets an objective limit in the user's sense, applied as cutoff bound.
    pub fn set_obj_limit(&mut self, limit: f64) -> Result<()> {
        check_stage(Operation::SetObjLimit, self.stage)?;
        self.obj_limit = Some(limit);
        Ok(())
    }

    pub(crate) fn reset_for_problem(&mut self) {
        self.transformed = None;
        self.tree.clear();
        self.cliques.clear();
        self.history.clear();
        self.lp_sol = None;
        self.proposed.clear();
        self.memory_estimate = 0;
    }
}

impl std::fmt::Debug for SolverScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolverScope")
            .field("stage", &self.stage)
            .field("status", &self.status)
            .field("nvars", &self.prob().n_vars())
            .field("nconss", &self.prob().n_conss())
            .field("nsols", &self.primal.n_sols())
            .finish()
    }
}

/// Stop predicates for the configured limits.
fn limit_terminations(config: &SolverConfig) -> Vec<Box<dyn Termination>> {
    let limits = &config.limits;
    let mut terms: Vec<Box<dyn Termination>> = Vec::new();
    if let Some(ms) = limits.milliseconds_spent_limit {
        terms.push(Box::new(TimeTermination::millis(ms)));
    } else if let Some(secs) = limits.seconds_spent_limit {
        terms.push(Box::new(TimeTermination::seconds(secs)));
    }
    if let Some(n) = limits.node_limit {
        terms.push(Box::new(NodeTermination::new(n)));
    }
    if let Some(n) = limits.total_node_limit {
        terms.push(Box::new(TotalNodeTermination::new(n)));
    }
    if let Some(n) = limits.solution_limit {
        terms.push(Box::new(SolutionTermination::new(n)));
    }
    if let Some(n) = limits.best_solution_limit {
        terms.push(Box::new(BestSolutionTermination::new(n)));
    }
    if let Some(gap) = limits.gap_limit {
        terms.push(Box::new(GapTermination::new(gap)));
    }
    if let Some(mb) = limits.memory_limit_mb {
        terms.push(Box::new(MemoryTermination::new(mb)));
    }
    terms
}

#[cfg(test)]
mod tests;
