//! Branch-and-bound: node selection, node processing and branching.
//!
//! A node is processed by activating its root path, propagating, solving
//! the LP relaxation with separation and pricing rounds, and finally
//! either storing an integral relaxation solution, branching on a
//! fractional variable or pruning.

use std::collections::HashMap;

use mipforge_core::{
    active_linear_terms, BoundType, ConsId, PluginResult, Result, SolOrigin, Solution,
    SolveStatus, VarId,
};

use crate::builtin::most_fractional;
use crate::history::BranchDir;
use crate::lp::{Conflict, Cut, LpRequest, LpRow, LpStatus};
use crate::plugin::{BranchCandidate, HeurTiming};
use crate::primal::CheckFlags;
use crate::solver::Solver;
use crate::tree::{BoundChange, NodeId, Provenance};

/// Propagation passes per node.
const MAX_PROP_ROUNDS: usize = 5;
/// Re-solves after an enforcement changed the node.
const MAX_RESOLVES: usize = 3;
/// Pricing rounds per LP.
const MAX_PRICE_ROUNDS: usize = 20;

/// The branching decision that created a node, for pseudocost updates.
#[derive(Debug, Clone, Copy)]
struct Branching {
    var: VarId,
    dir: BranchDir,
    distance: f64,
    parent_lb: f64,
}

/// Search state of the current run.
#[derive(Debug, Default)]
pub(crate) struct BnbState {
    branchings: HashMap<NodeId, Branching>,
    /// Cuts valid at the focus node only.
    local_cuts: Vec<Cut>,
    /// Nodes dropped without a relaxation bound or a proof.
    unresolved_leaves: u64,
}

impl BnbState {
    pub(crate) fn clear(&mut self) {
        self.branchings.clear();
        self.local_cuts.clear();
        self.unresolved_leaves = 0;
    }
}

/// Relaxation result of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
enum LpOutcome {
    /// Trusted bound; the LP solution is in the scope.
    Solved(f64),
    Cutoff,
    Unbounded,
    /// No trustworthy bound (limit or repeated errors).
    Unresolved,
    Disabled,
}

/// What to do with a processed node.
#[derive(Debug, Clone, PartialEq)]
enum NodeDecision {
    Cutoff,
    Unbounded,
    /// The relaxation solution is feasible.
    Feasible,
    Branch(Vec<BranchCandidate>),
    /// Branch on the domain of an unfixed integer variable.
    Pseudo,
}

/// Verdict of the enforcement pass over an integral relaxation solution.
enum Enforcement {
    Feasible,
    Cutoff,
    Branch,
    Resolve,
}

impl Solver {
    /// Runs the search until the tree is empty, a limit is hit or a
    /// restart is requested. Ends in SOLVED unless a restart is pending.
    pub(crate) fn run_search(&mut self) -> Result<()> {
        loop {
            if let Some(status) = self.scope.check_stop() {
                tracing::info!(event = "search_stopped", %status, nodes = self.scope.stats.nnodes);
                self.scope.status = status;
                break;
            }
            if self.scope.restart_requested {
                return Ok(());
            }
            self.sync_checkpoint()?;

            let cutoff = self.scope.primal.cutoff_bound();
            let pruned = self.scope.tree.cutoff_open(cutoff);
            if pruned > 0 {
                tracing::trace!(pruned, cutoff, "open nodes pruned");
            }
            let Some(node) = self.select_node() else {
                self.scope.status = if self.bnb.unresolved_leaves > 0 {
                    tracing::warn!(
                        leaves = self.bnb.unresolved_leaves,
                        "search ended with unresolved nodes"
                    );
                    SolveStatus::Unknown
                } else if self.scope.primal.n_sols() > 0 {
                    SolveStatus::Optimal
                } else {
                    SolveStatus::Infeasible
                };
                break;
            };
            self.process_node(node)?;
            if self.scope.status.is_terminal() {
                break;
            }
            if self.scope.stats.nnodes == 1 && self.root_restart_due() {
                tracing::debug!(
                    fixings = self.scope.stats.nrootintfixings_run,
                    "root fixings trigger a restart"
                );
                self.scope.restart_requested = true;
                return Ok(());
            }
        }
        self.finish_search();
        Ok(())
    }

    fn select_node(&mut self) -> Option<NodeId> {
        if self.scope.tree.n_open() == 0 {
            return None;
        }
        for sel in &mut self.plugins.nodeselectors {
            if let Some(id) = sel.select(&self.scope.tree) {
                if self.scope.tree.open_nodes().contains(&id) {
                    return Some(id);
                }
            }
        }
        self.scope.tree.open_nodes().first().copied()
    }

    /// Enough integer variables were fixed at the root to make a restart
    /// worthwhile.
    fn root_restart_due(&self) -> bool {
        let presolving = &self.scope.config().presolving;
        if presolving.restart_fac <= 0.0 || self.scope.tree.n_open() == 0 {
            return false;
        }
        if presolving
            .max_restarts
            .is_some_and(|max| self.scope.stats.nrestarts >= max)
        {
            return false;
        }
        let nint = self.scope.prob().var_counts().non_continuous();
        nint > 0
            && self.scope.stats.nrootintfixings_run as f64 > presolving.restart_fac * nint as f64
    }

    fn process_node(&mut self, node: NodeId) -> Result<()> {
        self.scope.tree.focus_node(node);
        if let Some(prob) = self.scope.transformed.as_mut() {
            self.scope.tree.activate(node, prob);
        }
        let depth = self.scope.tree.node(node).depth;
        self.scope.stats.record_node(depth);
        self.scope.lp_sol = None;
        self.bnb.local_cuts.clear();

        let num = *self.scope.numerics();
        let decision = if num.is_ge(
            self.scope.tree.node(node).lower_bound,
            self.scope.primal.cutoff_bound(),
        ) {
            NodeDecision::Cutoff
        } else {
            self.run_heuristics(HeurTiming::BEFORE_NODE)?;
            self.evaluate_node(node, depth)?
        };

        match decision {
            NodeDecision::Cutoff => {
                tracing::trace!(node = %node, "node pruned");
            }
            NodeDecision::Unbounded => {
                self.scope.status = if self.scope.primal.n_sols() > 0 {
                    SolveStatus::Unbounded
                } else {
                    SolveStatus::InfOrUnbd
                };
            }
            NodeDecision::Feasible => {
                if let Some(mut sol) = self.scope.lp_sol.take() {
                    sol.unlink();
                    self.try_sol(sol, &CheckFlags::default())?;
                }
            }
            NodeDecision::Branch(cands) => {
                self.run_heuristics(HeurTiming::AFTER_LP_NODE)?;
                let lb = self.scope.tree.node(node).lower_bound;
                if num.is_lt(lb, self.scope.primal.cutoff_bound()) {
                    let idx = self.select_branching(&cands);
                    let cand = cands[idx];
                    self.branch(node, cand.var, cand.value, lb);
                }
            }
            NodeDecision::Pseudo => self.pseudo_branch(node)?,
        }

        if self.scope.status != SolveStatus::Unbounded && self.scope.status != SolveStatus::InfOrUnbd {
            self.run_heuristics(HeurTiming::AFTER_NODE)?;
        }
        let lb = self.scope.tree.node(node).lower_bound;
        self.scope.tree.release_focus();
        if self.scope.config().misc.calc_integral {
            let ub = self.scope.primal.upper_bound();
            let dual = self.scope.internal_dual_bound();
            self.scope.stats.integral.update(ub, dual, num.infinity);
        }
        self.scope.events.fire_node_solved(node, depth, lb);
        tracing::debug!(
            event = "node_solved",
            node = %node,
            depth,
            lower_bound = lb,
            open = self.scope.tree.n_open(),
            primal_bound = self.scope.primal.upper_bound(),
        );
        Ok(())
    }

    fn evaluate_node(&mut self, node: NodeId, depth: u32) -> Result<NodeDecision> {
        let lp_enabled = self.scope.config().lp.enabled;
        let mut resolves = 0;
        loop {
            if self.propagate_node()? {
                return Ok(NodeDecision::Cutoff);
            }
            let outcome = if lp_enabled {
                self.solve_node_lp(node, depth)?
            } else {
                LpOutcome::Disabled
            };
            match outcome {
                LpOutcome::Cutoff => {
                    self.record_conflict(node, depth);
                    return Ok(NodeDecision::Cutoff);
                }
                LpOutcome::Unbounded if depth == 0 => return Ok(NodeDecision::Unbounded),
                LpOutcome::Unbounded | LpOutcome::Unresolved | LpOutcome::Disabled => {
                    return Ok(NodeDecision::Pseudo)
                }
                LpOutcome::Solved(bound) => {
                    self.update_pseudocosts(node, bound);
                    let cands = self.branch_candidates();
                    if !cands.is_empty() {
                        return Ok(NodeDecision::Branch(cands));
                    }
                    match self.enforce_relaxation()? {
                        Enforcement::Feasible => return Ok(NodeDecision::Feasible),
                        Enforcement::Cutoff => return Ok(NodeDecision::Cutoff),
                        Enforcement::Branch => return Ok(NodeDecision::Pseudo),
                        Enforcement::Resolve if resolves < MAX_RESOLVES => resolves += 1,
                        Enforcement::Resolve => return Ok(NodeDecision::Pseudo),
                    }
                }
            }
        }
    }

    /// Runs propagators and constraint propagation until nothing changes.
    /// Returns true if the node is infeasible.
    fn propagate_node(&mut self) -> Result<bool> {
        for _ in 0..MAX_PROP_ROUNDS {
            let mut reduced = false;
            for i in 0..self.plugins.propagators.len() {
                let result = self.plugins.propagators[i].propagate(&mut self.scope)?;
                if result.is_cutoff() {
                    return Ok(true);
                }
                reduced |= result == PluginResult::ReducedDom;
            }
            for h in 0..self.plugins.conshdlrs.len() {
                let conss: Vec<ConsId> = self
                    .handler_conss(h)
                    .into_iter()
                    .filter(|c| self.scope.prob().cons(*c).flags.propagate)
                    .collect();
                if conss.is_empty() && self.plugins.conshdlrs[h].needs_constraints() {
                    continue;
                }
                let result = self.plugins.conshdlrs[h].propagate(&mut self.scope, &conss)?;
                if result.is_cutoff() {
                    return Ok(true);
                }
                reduced |= result == PluginResult::ReducedDom;
            }
            if !reduced {
                break;
            }
        }
        Ok(false)
    }

    /// Solves the node LP, then alternates pricing and separation with
    /// re-solves.
    fn solve_node_lp(&mut self, node: NodeId, depth: u32) -> Result<LpOutcome> {
        let num = *self.scope.numerics();
        let max_errors = self.scope.config().lp.max_errors_per_node;
        let separating = &self.scope.config().separating;
        let max_sepa_rounds = if depth == 0 {
            separating.max_rounds_root
        } else {
            separating.max_rounds
        };
        let mut errors = 0;
        let mut sepa_rounds = 0;
        let mut price_rounds = 0;
        loop {
            let request = self.build_lp_request();
            let result = self.oracle.solve(&request, &num);
            self.scope.stats.record_lp(result.iterations);
            match result.status {
                LpStatus::Optimal => {}
                LpStatus::Infeasible => return Ok(LpOutcome::Cutoff),
                LpStatus::Unbounded => return Ok(LpOutcome::Unbounded),
                LpStatus::IterLimit | LpStatus::TimeLimit => {
                    let estimate = result.objective;
                    if estimate.is_finite() {
                        self.scope.tree.node_mut(node).estimate = estimate;
                    }
                    self.scope.stats.record_unresolved();
                    return Ok(LpOutcome::Unresolved);
                }
                LpStatus::Error | LpStatus::NotSolved => {
                    self.scope.stats.record_lp_error();
                    errors += 1;
                    if errors < max_errors {
                        tracing::debug!(node = %node, errors, "LP error, solving again");
                        continue;
                    }
                    tracing::debug!(node = %node, "LP errors exhausted, node left unresolved");
                    self.scope.stats.record_unresolved();
                    return Ok(LpOutcome::Unresolved);
                }
            }

            let bound = result.objective;
            self.scope.tree.update_lower_bound(node, bound);
            let mut sol = Solution::linked(
                SolOrigin::Lp,
                request.cols.iter().copied().zip(result.primal.iter().copied()),
            );
            let n = self.scope.tree.node(node);
            sol.provenance.node = n.number;
            sol.provenance.depth = n.depth;
            sol.provenance.run = self.scope.stats.nruns;
            self.scope.lp_sol = Some(sol);

            if price_rounds < MAX_PRICE_ROUNDS && self.price()? > 0 {
                price_rounds += 1;
                continue;
            }
            if num.is_ge(bound, self.scope.primal.cutoff_bound()) {
                return Ok(LpOutcome::Cutoff);
            }
            if sepa_rounds >= max_sepa_rounds || self.plugins.separators.is_empty() {
                return Ok(LpOutcome::Solved(bound));
            }
            sepa_rounds += 1;
            let ncuts = self.separate()?;
            self.scope.stats.record_separation_round(ncuts);
            if ncuts == 0 {
                return Ok(LpOutcome::Solved(bound));
            }
        }
    }

    /// Active variables at their local bounds, constraint rows, pooled and
    /// local cuts.
    fn build_lp_request(&self) -> LpRequest {
        let prob = self.scope.prob();
        let mut request = LpRequest {
            obj_offset: prob.obj_offset,
            ..LpRequest::default()
        };
        let mut cols: HashMap<VarId, usize> = HashMap::with_capacity(prob.n_vars());
        for &var in prob.active_vars() {
            let v = prob.var(var);
            cols.insert(var, request.add_col(var, v.obj, v.llb, v.lub));
        }
        let mut rows: Vec<Cut> = Vec::new();
        for (id, cons) in prob.conss() {
            if let Some(h) = self.plugins.find_conshdlr(&cons.handler) {
                rows.extend(self.plugins.conshdlrs[h].lp_rows(prob, id));
            }
        }
        let pooled = self.scope.relax.cutpool.iter().flat_map(|p| p.cuts());
        for cut in rows.iter().chain(pooled).chain(self.bnb.local_cuts.iter()) {
            let (terms, constant) = active_linear_terms(prob, &cut.terms);
            let coefs: Vec<(usize, f64)> = terms
                .iter()
                .filter_map(|(v, c)| cols.get(v).map(|j| (*j, *c)))
                .collect();
            let shift = |side: f64| {
                if side.is_infinite() || self.scope.numerics().is_infinite(side) {
                    side
                } else {
                    side - constant
                }
            };
            request.rows.push(LpRow {
                coefs,
                lhs: shift(cut.lhs),
                rhs: shift(cut.rhs),
            });
        }
        request
    }

    /// Calls the active pricers and adds the columns they found.
    fn price(&mut self) -> Result<usize> {
        if self.plugins.n_active_pricers() == 0 {
            return Ok(0);
        }
        for i in 0..self.plugins.pricers.len() {
            if self.plugins.pricers[i].is_active() {
                self.plugins.pricers[i].price(&mut self.scope)?;
            }
        }
        let vars = self
            .scope
            .relax
            .pricestore
            .as_mut()
            .map(|s| s.drain())
            .unwrap_or_default();
        let added = vars.len();
        for var in vars {
            self.scope.add_var(var)?;
        }
        if added > 0 {
            tracing::trace!(added, "priced variables");
        }
        Ok(added)
    }

    /// Runs the separators and applies the violated cuts. Returns the
    /// number of applied cuts.
    fn separate(&mut self) -> Result<usize> {
        for i in 0..self.plugins.separators.len() {
            let result = self.plugins.separators[i].separate(&mut self.scope)?;
            tracing::trace!(separator = self.plugins.separators[i].name(), ?result, "separator called");
        }
        let cuts = self
            .scope
            .relax
            .sepastore
            .as_mut()
            .map(|s| s.drain())
            .unwrap_or_default();
        let feastol = self.scope.numerics().feastol;
        let mut applied = 0;
        for cut in cuts {
            let violated = match (self.scope.lp_sol.as_ref(), self.scope.transformed.as_ref()) {
                (Some(sol), Some(prob)) => cut.violation(|v| sol.val(prob, v)) > feastol,
                _ => false,
            };
            if !violated {
                continue;
            }
            if cut.local {
                self.bnb.local_cuts.push(cut);
                applied += 1;
            } else if let Some(pool) = self.scope.relax.cutpool.as_mut() {
                if pool.add(cut) {
                    applied += 1;
                }
            }
        }
        Ok(applied)
    }

    fn record_conflict(&mut self, node: NodeId, depth: u32) {
        if depth == 0 {
            return;
        }
        let changes: Vec<BoundChange> = self
            .scope
            .tree
            .path_changes(node)
            .into_iter()
            .filter(|c| c.provenance == Provenance::Branching)
            .collect();
        if let Some(store) = self.scope.relax.conflict.as_mut() {
            store.add(Conflict { changes, depth });
        }
    }

    /// Fractional integer variables of the LP solution.
    fn branch_candidates(&self) -> Vec<BranchCandidate> {
        let Some(lp) = self.scope.lp_sol.as_ref() else {
            return Vec::new();
        };
        let prob = self.scope.prob();
        let num = self.scope.numerics();
        prob.active_vars()
            .iter()
            .filter(|v| prob.var(**v).is_integral())
            .filter_map(|&var| {
                let value = lp.val(prob, var);
                (!num.is_feas_integral(value)).then(|| BranchCandidate {
                    var,
                    value,
                    frac: num.feas_frac(value),
                })
            })
            .collect()
    }

    /// Asks the constraint handlers about an integral relaxation solution.
    fn enforce_relaxation(&mut self) -> Result<Enforcement> {
        let Some(sol) = self.scope.lp_sol.clone() else {
            return Ok(Enforcement::Branch);
        };
        let mut verdict = Enforcement::Feasible;
        for h in 0..self.plugins.conshdlrs.len() {
            let conss: Vec<ConsId> = self
                .handler_conss(h)
                .into_iter()
                .filter(|c| self.scope.prob().cons(*c).flags.enforce)
                .collect();
            if conss.is_empty() && self.plugins.conshdlrs[h].needs_constraints() {
                continue;
            }
            match self.plugins.conshdlrs[h].enforce(&mut self.scope, &conss, &sol)? {
                PluginResult::Cutoff => return Ok(Enforcement::Cutoff),
                PluginResult::ReducedDom | PluginResult::ConsAdded | PluginResult::Separated => {
                    verdict = Enforcement::Resolve;
                }
                PluginResult::Infeasible => {
                    if !matches!(verdict, Enforcement::Resolve) {
                        verdict = Enforcement::Branch;
                    }
                }
                _ => {}
            }
        }
        Ok(verdict)
    }

    /// Branching candidate chosen by the rules, most fractional otherwise.
    fn select_branching(&mut self, cands: &[BranchCandidate]) -> usize {
        for rule in &mut self.plugins.branchrules {
            if let Some(idx) = rule.select(&self.scope, cands) {
                if idx < cands.len() {
                    return idx;
                }
            }
        }
        most_fractional(cands, &self.scope.history)
    }

    /// Creates the children `var <= floor(value)` and `var >= ceil(value)`.
    fn branch(&mut self, node: NodeId, var: VarId, value: f64, lb: f64) {
        let num = *self.scope.numerics();
        let down_ub = num.feas_floor(value);
        let up_lb = down_ub + 1.0;
        self.create_children(node, var, value, down_ub, up_lb, lb);
    }

    fn create_children(&mut self, node: NodeId, var: VarId, value: f64, down_ub: f64, up_lb: f64, lb: f64) {
        let pc = self.scope.history.get(var);
        let (down_dist, up_dist) = ((value - down_ub).max(0.0), (up_lb - value).max(0.0));
        let down_est = lb + pc.value(BranchDir::Down) * down_dist;
        let up_est = lb + pc.value(BranchDir::Up) * up_dist;

        let down = self.scope.tree.add_child(node, lb, down_est);
        self.scope
            .tree
            .record_change(down, BoundChange::new(var, BoundType::Upper, down_ub, Provenance::Branching));
        let up = self.scope.tree.add_child(node, lb, up_est);
        self.scope
            .tree
            .record_change(up, BoundChange::new(var, BoundType::Lower, up_lb, Provenance::Branching));

        for (child, dir, distance) in [(down, BranchDir::Down, down_dist), (up, BranchDir::Up, up_dist)] {
            self.bnb.branchings.insert(
                child,
                Branching {
                    var,
                    dir,
                    distance,
                    parent_lb: lb,
                },
            );
        }
        tracing::trace!(var = %var, value, down_ub, up_lb, "branched");
    }

    fn update_pseudocosts(&mut self, node: NodeId, bound: f64) {
        let Some(b) = self.bnb.branchings.remove(&node) else {
            return;
        };
        if !self.scope.numerics().is_infinite(b.parent_lb) {
            self.scope
                .history
                .update(b.var, b.dir, bound - b.parent_lb, b.distance);
        }
    }

    /// Handles a node without a usable relaxation: bounds it by the pseudo
    /// objective, then splits the domain of an unfixed integer variable or,
    /// when every integer variable is fixed, tries the pseudo solution.
    fn pseudo_branch(&mut self, node: NodeId) -> Result<()> {
        let num = *self.scope.numerics();
        let (pseudo_obj, pseudo_sol) = self.pseudo_solution();
        if let Some(obj) = pseudo_obj {
            self.scope.tree.update_lower_bound(node, obj);
            if num.is_ge(obj, self.scope.primal.cutoff_bound()) {
                return Ok(());
            }
        }
        let lb = self.scope.tree.node(node).lower_bound;
        let prob = self.scope.prob();
        let unfixed = prob
            .active_vars()
            .iter()
            .copied()
            .filter(|v| {
                let var = prob.var(*v);
                var.is_integral() && num.is_lt(var.llb, var.lub)
            })
            .max_by(|a, b| prob.var(*a).obj.abs().total_cmp(&prob.var(*b).obj.abs()));
        match unfixed {
            Some(var) => {
                let v = prob.var(var);
                let (l, u) = (v.llb, v.lub);
                let down_ub = match (num.is_infinite(l), num.is_infinite(u)) {
                    (false, false) => num.feas_floor((l + u) / 2.0),
                    (false, true) => l,
                    (true, false) => u - 1.0,
                    (true, true) => 0.0,
                };
                let value = down_ub + 0.5;
                self.create_children(node, var, value, down_ub, down_ub + 1.0, lb);
            }
            None => {
                // with a continuous variable left free the pseudo solution
                // is one point of the node, not a proof of its infeasibility
                let open_continuous = prob.active_vars().iter().any(|v| {
                    let var = prob.var(*v);
                    !var.is_integral() && num.is_lt(var.llb, var.lub)
                });
                let mut sol = pseudo_sol;
                sol.unlink();
                let flags = CheckFlags::default();
                // a feasible duplicate is not stored again
                let feasible = self.check_sol(&sol, &flags)?.is_feasible();
                if feasible {
                    self.try_sol(sol, &flags)?;
                } else {
                    tracing::trace!(node = %node, "pseudo solution infeasible");
                }
                if open_continuous && (!feasible || pseudo_obj.is_none()) {
                    self.bnb.unresolved_leaves += 1;
                }
            }
        }
        Ok(())
    }

    /// Every active variable at its local bound with the better objective.
    /// The objective is `None` when such a bound is infinite.
    fn pseudo_solution(&self) -> (Option<f64>, Solution) {
        let prob = self.scope.prob();
        let num = self.scope.numerics();
        let mut obj = Some(prob.obj_offset);
        let mut values = Vec::with_capacity(prob.n_vars());
        for &id in prob.active_vars() {
            let var = prob.var(id);
            let bound = if var.obj >= 0.0 { var.llb } else { var.lub };
            let value = if num.is_infinite(bound) {
                if num.is_zero(var.obj) {
                    0.0_f64.max(var.llb).min(var.lub)
                } else {
                    obj = None;
                    if var.obj > 0.0 { var.lub.min(0.0) } else { var.llb.max(0.0) }
                }
            } else {
                bound
            };
            if let Some(total) = obj.as_mut() {
                *total += var.obj * value;
            }
            values.push((id, value));
        }
        (obj, Solution::linked(SolOrigin::Pseudo, values))
    }
}

#[cfg(test)]
mod tests {
    use mipforge_core::{Constraint, Numerics, Problem, SolveStatus, Stage, Var};
    use mipforge_test::{deterministic_config, quiet_config, small_knapsack, vertex_cover_triangle};

    use crate::builtin::{BestFirstSelector, DepthFirstSelector, IntegralityHandler, LinearHandler};
    use crate::lp::{LpOracle, LpRequest, LpResult, LpStatus};
    use crate::solver::Solver;

    /// Fails every relaxation.
    #[derive(Debug)]
    struct FailingOracle;

    impl LpOracle for FailingOracle {
        fn solve(&mut self, _request: &LpRequest, _num: &Numerics) -> LpResult {
            LpResult::with_status(LpStatus::Error)
        }
    }

    fn solver_for(prob: &mipforge_core::Problem, config: mipforge_config::SolverConfig) -> Solver {
        let mut solver = Solver::from_problem(prob, config).unwrap();
        solver
            .include_conshdlr(LinearHandler::new())
            .include_conshdlr(IntegralityHandler::new())
            .include_nodeselector(BestFirstSelector::new());
        solver
    }

    #[test]
    fn test_knapsack_optimum_by_branching() {
        let mut solver = solver_for(&small_knapsack(), quiet_config());
        assert_eq!(solver.solve().unwrap(), SolveStatus::Optimal);
        assert!((solver.scope().primal_bound() - 9.0).abs() < 1e-6);
        assert!(solver.scope().stats().nnodes >= 1);
    }

    #[test]
    fn test_vertex_cover_needs_branching() {
        let mut solver = solver_for(&vertex_cover_triangle(), quiet_config());
        assert_eq!(solver.solve().unwrap(), SolveStatus::Optimal);
        assert!((solver.scope().primal_bound() - 2.0).abs() < 1e-6);
        assert!(solver.scope().stats().nnodes > 1);
    }

    #[test]
    fn test_depth_first_finds_same_optimum() {
        let mut solver = Solver::from_problem(&vertex_cover_triangle(), quiet_config()).unwrap();
        solver
            .include_conshdlr(LinearHandler::new())
            .include_conshdlr(IntegralityHandler::new())
            .include_nodeselector(DepthFirstSelector::new());
        assert_eq!(solver.solve().unwrap(), SolveStatus::Optimal);
        assert!((solver.scope().primal_bound() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_node_limit_stops_search() {
        let config = quiet_config().with_node_limit(1);
        let mut solver = solver_for(&vertex_cover_triangle(), config);
        assert_eq!(solver.solve().unwrap(), SolveStatus::NodeLimit);
        assert_eq!(solver.stage(), Stage::Solved);
        assert!(solver.scope().tree().n_open() > 0);
    }

    #[test]
    fn test_search_without_lp_uses_pseudo_branching() {
        let mut config = deterministic_config();
        config.lp.enabled = false;
        config.heuristics.enabled = false;
        let mut solver = solver_for(&small_knapsack(), config);
        assert_eq!(solver.solve().unwrap(), SolveStatus::Optimal);
        assert!((solver.scope().primal_bound() - 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_pseudocosts_recorded_after_branching() {
        let mut solver = solver_for(&vertex_cover_triangle(), quiet_config());
        solver.solve().unwrap();
        let trans = solver.scope().transformed().unwrap();
        let observed = trans
            .active_vars()
            .iter()
            .map(|v| solver.scope().history().get(*v))
            .any(|pc| pc.down_count + pc.up_count > 0);
        assert!(observed);
    }

    #[test]
    fn test_unbounded_root_relaxation() {
        let mut solver = Solver::new("u", quiet_config());
        solver.add_var(Var::integer("x", 0.0, f64::INFINITY, -1.0)).unwrap();
        solver
            .include_conshdlr(IntegralityHandler::new())
            .include_nodeselector(BestFirstSelector::new());
        let status = solver.solve().unwrap();
        assert!(matches!(status, SolveStatus::Unbounded | SolveStatus::InfOrUnbd));
    }

    #[test]
    fn test_failed_relaxation_is_not_a_proof() {
        let mut prob = Problem::new("split");
        let vars: Vec<_> = ["x", "y", "z"]
            .iter()
            .map(|name| prob.add_var(Var::continuous(*name, 0.0, 10.0, 0.0)))
            .collect();
        let terms: Vec<_> = vars.iter().map(|v| (*v, 1.0)).collect();
        prob.add_cons(Constraint::linear("sum", &terms, 5.0, 5.0));

        let config = quiet_config().with_max_presolve_rounds(0);
        let mut solver = Solver::with_oracle("split", config, Box::new(FailingOracle));
        solver.load_problem(&prob).unwrap();
        solver
            .include_conshdlr(LinearHandler::new())
            .include_conshdlr(IntegralityHandler::new())
            .include_nodeselector(BestFirstSelector::new());

        let status = solver.solve().unwrap();
        assert_eq!(status, SolveStatus::Unknown);
        assert_eq!(solver.stage(), Stage::Solved);
        assert!(solver.scope().stats().nunresolved > 0);
    }

    #[test]
    fn test_failed_relaxation_on_integers_still_branches() {
        let mut solver = Solver::with_oracle("knap", quiet_config(), Box::new(FailingOracle));
        solver.load_problem(&small_knapsack()).unwrap();
        solver
            .include_conshdlr(LinearHandler::new())
            .include_conshdlr(IntegralityHandler::new())
            .include_nodeselector(BestFirstSelector::new());

        assert_eq!(solver.solve().unwrap(), SolveStatus::Optimal);
        assert!((solver.scope().primal_bound() - 9.0).abs() < 1e-6);
    }
}
