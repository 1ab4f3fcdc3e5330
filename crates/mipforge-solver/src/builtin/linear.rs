//! Linear constraints `lhs <= sum(a_j * x_j) <= rhs`.

use std::collections::HashSet;

use mipforge_core::{
    active_linear_terms, ConsId, Numerics, PluginResult, Problem, Result, Solution, VarId,
    VarType,
};

use crate::lp::Cut;
use crate::plugin::ConstraintHandler;
use crate::presolve::{PresolveContext, PresolveTiming, TimingMask};
use crate::primal::{CheckFlags, Violation};
use crate::scope::{BoundOutcome, SolverScope};
use crate::tree::Provenance;

/// Handler of the `linear` constraints.
#[derive(Debug, Default)]
pub struct LinearHandler {
    /// Rows already turned into cliques.
    cliqued: HashSet<ConsId>,
}

impl LinearHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Activity bounds of a row: finite parts and the number of infinite
/// contributions.
#[derive(Debug, Clone, Copy, Default)]
struct Activity {
    min: f64,
    max: f64,
    min_inf: usize,
    max_inf: usize,
}

impl Activity {
    fn of(prob: &Problem, num: &Numerics, terms: &[(VarId, f64)], global: bool) -> Self {
        let mut act = Activity::default();
        for &(var, coef) in terms {
            let (lo, hi) = contributions(prob, num, var, coef, global);
            match lo {
                Some(c) => act.min += c,
                None => act.min_inf += 1,
            }
            match hi {
                Some(c) => act.max += c,
                None => act.max_inf += 1,
            }
        }
        act
    }

    /// Minimum activity without the term whose minimal contribution is `lo`.
    fn residual_min(&self, lo: Option<f64>) -> Option<f64> {
        match lo {
            Some(c) if self.min_inf == 0 => Some(self.min - c),
            None if self.min_inf == 1 => Some(self.min),
            _ => None,
        }
    }

    fn residual_max(&self, hi: Option<f64>) -> Option<f64> {
        match hi {
            Some(c) if self.max_inf == 0 => Some(self.max - c),
            None if self.max_inf == 1 => Some(self.max),
            _ => None,
        }
    }

    fn finite_min(&self) -> Option<f64> {
        (self.min_inf == 0).then_some(self.min)
    }

    fn finite_max(&self) -> Option<f64> {
        (self.max_inf == 0).then_some(self.max)
    }
}

/// Minimal and maximal contribution of `coef * var`, `None` if infinite.
fn contributions(prob: &Problem, num: &Numerics, var: VarId, coef: f64, global: bool) -> (Option<f64>, Option<f64>) {
    let v = prob.var(var);
    let (lb, ub) = if global { (v.glb, v.gub) } else { (v.llb, v.lub) };
    let (lo_bound, hi_bound) = if coef > 0.0 { (lb, ub) } else { (ub, lb) };
    let finite = |b: f64| (!num.is_infinite(b)).then(|| coef * b);
    (finite(lo_bound), finite(hi_bound))
}

/// Row over active variables with sides shifted by the resolved constant.
struct ActiveRow {
    terms: Vec<(VarId, f64)>,
    lhs: f64,
    rhs: f64,
}

impl ActiveRow {
    fn of(prob: &Problem, num: &Numerics, id: ConsId) -> Self {
        let cons = prob.cons(id);
        let raw: Vec<(VarId, f64)> = cons.terms().collect();
        let (terms, constant) = active_linear_terms(prob, &raw);
        let shift = |side: f64| {
            if num.is_infinite(side) {
                side
            } else {
                side - constant
            }
        };
        Self {
            terms: terms.into_iter().filter(|(_, c)| !num.is_zero(*c)).collect(),
            lhs: shift(cons.lhs),
            rhs: shift(cons.rhs),
        }
    }

    fn is_infeasible(&self, act: &Activity, num: &Numerics) -> bool {
        let above = act
            .finite_min()
            .is_some_and(|min| !num.is_infinity(self.rhs) && num.is_feas_gt(min, self.rhs));
        let below = act
            .finite_max()
            .is_some_and(|max| !num.is_neg_infinity(self.lhs) && num.is_feas_lt(max, self.lhs));
        above || below
    }

    fn is_redundant(&self, act: &Activity, num: &Numerics) -> bool {
        let lhs_ok = num.is_neg_infinity(self.lhs)
            || act.finite_min().is_some_and(|min| num.is_feas_ge(min, self.lhs));
        let rhs_ok = num.is_infinity(self.rhs)
            || act.finite_max().is_some_and(|max| num.is_feas_le(max, self.rhs));
        lhs_ok && rhs_ok
    }

    /// Bounds implied for every variable by the other terms.
    fn implied_bounds(&self, prob: &Problem, num: &Numerics, act: &Activity, global: bool) -> Vec<(VarId, Option<f64>, Option<f64>)> {
        let mut implied = Vec::new();
        for &(var, coef) in &self.terms {
            let (lo, hi) = contributions(prob, num, var, coef, global);
            let mut new_lb = None;
            let mut new_ub = None;
            if !num.is_infinity(self.rhs) {
                if let Some(rest) = act.residual_min(lo) {
                    let bound = (self.rhs - rest) / coef;
                    if coef > 0.0 {
                        new_ub = Some(bound);
                    } else {
                        new_lb = Some(bound);
                    }
                }
            }
            if !num.is_neg_infinity(self.lhs) {
                if let Some(rest) = act.residual_max(hi) {
                    let bound = (self.lhs - rest) / coef;
                    if coef > 0.0 {
                        new_lb = Some(bound);
                    } else {
                        new_ub = Some(bound);
                    }
                }
            }
            if new_lb.is_some() || new_ub.is_some() {
                implied.push((var, new_lb, new_ub));
            }
        }
        implied
    }

    /// Set-packing row `sum(x_j) <= 1` over binaries.
    fn is_set_packing(&self, prob: &Problem, num: &Numerics) -> bool {
        self.terms.len() >= 2
            && num.is_eq(self.rhs, 1.0)
            && (num.is_neg_infinity(self.lhs) || num.is_le(self.lhs, 0.0) || num.is_eq(self.lhs, 1.0))
            && self
                .terms
                .iter()
                .all(|(v, c)| num.is_eq(*c, 1.0) && prob.var(*v).vartype == VarType::Binary)
    }
}

impl LinearHandler {
    /// Tightens bounds from one row. Returns the merged outcome and the
    /// number of changed bounds.
    fn tighten_row(
        scope: &mut SolverScope,
        id: ConsId,
        row: &ActiveRow,
        act: &Activity,
        presolving: bool,
    ) -> Result<(BoundOutcome, u64)> {
        let num = *scope.numerics();
        let implied = row.implied_bounds(scope.prob(), &num, act, presolving);
        let mut outcome = BoundOutcome::UNCHANGED;
        let mut changes = 0;
        for (var, lb, ub) in implied {
            for (value, lower) in [(lb, true), (ub, false)] {
                let Some(value) = value else { continue };
                if num.is_infinite(value) {
                    continue;
                }
                let step = match (presolving, lower) {
                    (true, true) => scope.tighten_var_lb(var, value, false)?,
                    (true, false) => scope.tighten_var_ub(var, value, false)?,
                    (false, true) => scope.infer_var_lb(var, value, Provenance::Constraint(id))?,
                    (false, false) => scope.infer_var_ub(var, value, Provenance::Constraint(id))?,
                };
                if step.changed {
                    changes += 1;
                }
                outcome = outcome.merge(step);
                if outcome.infeasible {
                    return Ok((outcome, changes));
                }
            }
        }
        Ok((outcome, changes))
    }
}

impl ConstraintHandler for LinearHandler {
    fn name(&self) -> &str {
        "linear"
    }

    fn check_priority(&self) -> i32 {
        -1_000_000
    }

    fn presol_timing(&self) -> TimingMask {
        TimingMask::FAST.union(TimingMask::MEDIUM)
    }

    fn check(
        &self,
        prob: &Problem,
        num: &Numerics,
        conss: &[ConsId],
        sol: &Solution,
        flags: &CheckFlags,
    ) -> Vec<Violation> {
        let mut violations = Vec::new();
        for &id in conss {
            let cons = prob.cons(id);
            let activity = cons.activity(|v| sol.val(prob, v));
            let lhs_ok = num.is_neg_infinity(cons.lhs) || num.is_feas_ge(activity, cons.lhs);
            let rhs_ok = num.is_infinity(cons.rhs) || num.is_feas_le(activity, cons.rhs);
            if !(lhs_ok && rhs_ok) {
                violations.push(Violation::Constraint {
                    cons: id,
                    activity,
                    lhs: cons.lhs,
                    rhs: cons.rhs,
                });
                if !flags.completely {
                    break;
                }
            }
        }
        violations
    }

    fn propagate(&mut self, scope: &mut SolverScope, conss: &[ConsId]) -> Result<PluginResult> {
        let num = *scope.numerics();
        let mut result = PluginResult::DidNotFind;
        for &id in conss {
            let row = ActiveRow::of(scope.prob(), &num, id);
            let act = Activity::of(scope.prob(), &num, &row.terms, false);
            if row.is_infeasible(&act, &num) {
                return Ok(PluginResult::Cutoff);
            }
            let (outcome, _) = Self::tighten_row(scope, id, &row, &act, false)?;
            if outcome.infeasible {
                return Ok(PluginResult::Cutoff);
            }
            if outcome.changed {
                result = PluginResult::ReducedDom;
            }
        }
        Ok(result)
    }

    fn presolve(
        &mut self,
        scope: &mut SolverScope,
        conss: &[ConsId],
        ctx: &mut PresolveContext,
    ) -> Result<PluginResult> {
        let num = *scope.numerics();
        let mut result = PluginResult::DidNotFind;
        for &id in conss {
            if scope.prob().cons(id).deleted {
                continue;
            }
            let row = ActiveRow::of(scope.prob(), &num, id);
            let act = Activity::of(scope.prob(), &num, &row.terms, true);
            if row.is_infeasible(&act, &num) {
                tracing::debug!(cons = %id, "infeasible linear row");
                return Ok(PluginResult::Cutoff);
            }
            if row.is_redundant(&act, &num) {
                scope.del_cons(id);
                ctx.tally.del_conss += 1;
                result = PluginResult::Success;
                continue;
            }

            let (outcome, changes) = Self::tighten_row(scope, id, &row, &act, true)?;
            if outcome.infeasible {
                return Ok(PluginResult::Cutoff);
            }
            ctx.tally.chg_bds += changes;
            if changes > 0 {
                result = PluginResult::Success;
            }
            if row.terms.len() == 1 {
                // the bounds now carry the row
                scope.del_cons(id);
                ctx.tally.del_conss += 1;
                result = PluginResult::Success;
                continue;
            }
            if ctx.timing == PresolveTiming::Fast {
                continue;
            }

            if row.terms.len() == 2 && num.is_eq(row.lhs, row.rhs) && !num.is_infinite(row.rhs) {
                let ((x, ax), (y, ay)) = (row.terms[0], row.terms[1]);
                let aggr = scope.aggregate_vars(x, y, ax, ay, row.rhs)?;
                if aggr.infeasible {
                    return Ok(PluginResult::Cutoff);
                }
                if aggr.aggregated || aggr.redundant {
                    if aggr.aggregated {
                        ctx.tally.aggr_vars += 1;
                    }
                    scope.del_cons(id);
                    ctx.tally.del_conss += 1;
                    result = PluginResult::Success;
                    continue;
                }
            }
            if row.is_set_packing(scope.prob(), &num) && self.cliqued.insert(id) {
                let lits = row.terms.iter().map(|(v, _)| (*v, true)).collect();
                if scope.add_clique(lits)? {
                    result = PluginResult::Success;
                }
            }
        }
        Ok(result)
    }

    fn lp_rows(&self, prob: &Problem, cons: ConsId) -> Vec<Cut> {
        let c = prob.cons(cons);
        vec![Cut::new(c.name.clone(), c.terms().collect(), c.lhs, c.rhs)]
    }

    fn enforce(&mut self, scope: &mut SolverScope, conss: &[ConsId], sol: &Solution) -> Result<PluginResult> {
        let prob = scope.prob();
        let violated = self.check(prob, scope.numerics(), conss, sol, &CheckFlags::default());
        Ok(if violated.is_empty() {
            PluginResult::Feasible
        } else {
            PluginResult::Infeasible
        })
    }
}
