//! Fixing, aggregation, multi-aggregation, type changes and negation.
//!
//! During presolving these operations change the status of variables:
//! a fixed or aggregated variable leaves the active set and its objective
//! coefficient and rounding locks move to the variables it now depends on.
//! Later the same requests are expressed as bound changes.

use mipforge_core::{
    active_linear_terms, check_stage, probvar_sum, BoundType, Constraint, MipError, Operation,
    Result, Stage, Var, VarId, VarStatus, VarType,
};

use super::{BoundOutcome, SolverScope};

/// Result of an aggregation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggrOutcome {
    /// The equation has no solution within the bounds.
    pub infeasible: bool,
    /// The equation is implied by fixings and can be dropped.
    pub redundant: bool,
    /// A variable was replaced.
    pub aggregated: bool,
}

impl AggrOutcome {
    fn from_fixing(fix: BoundOutcome) -> AggrOutcome {
        AggrOutcome {
            infeasible: fix.infeasible,
            redundant: !fix.infeasible,
            aggregated: false,
        }
    }
}

impl SolverScope {
    /// Fixes a variable to `value`.
    ///
    /// In PROBLEM stage both bounds are set. In presolving the variable
    /// (or the variable it resolves to) becomes fixed and leaves the
    /// problem. While solving or probing both local bounds are tightened.
    pub fn fix_var(&mut self, var: VarId, value: f64) -> Result<BoundOutcome> {
        check_stage(Operation::FixVar, self.stage)?;
        self.working_var_exists(var)?;
        if value.is_nan() || self.num.is_infinite(value) {
            return Err(MipError::InvalidData(format!("cannot fix {var} to {value}")));
        }
        let num = self.num;
        let v = self.prob().var(var);
        if v.is_integral() && !num.is_feas_integral(value) {
            return Ok(BoundOutcome::INFEASIBLE);
        }

        match self.stage {
            Stage::Problem => {
                if num.is_feas_lt(value, v.glb) || num.is_feas_gt(value, v.gub) {
                    return Ok(BoundOutcome::INFEASIBLE);
                }
                let low = self.chg_var_lb(var, value)?;
                Ok(low.merge(self.chg_var_ub(var, value)?))
            }
            Stage::Presolving if !self.tree.in_probing() => self.fix_global(var, value),
            _ => {
                let low = self.tighten_var_lb(var, value, true)?;
                if low.infeasible {
                    return Ok(low);
                }
                let up = self.tighten_var_ub(var, value, true)?;
                Ok(low.merge(up))
            }
        }
    }

    /// Fixes the variable `var` resolves to so that `var == value`.
    pub(crate) fn fix_global(&mut self, var: VarId, value: f64) -> Result<BoundOutcome> {
        let num = self.num;
        let prob = self.prob();
        let (base, scalar, constant) = if prob.var(var).status.is_unresolved() {
            (var, 1.0, 0.0)
        } else {
            probvar_sum(prob, var, 1.0, 0.0)
        };
        if scalar == 0.0 {
            return Ok(if num.is_feas_eq(constant, value) {
                BoundOutcome::UNCHANGED
            } else {
                BoundOutcome::INFEASIBLE
            });
        }
        let target = (value - constant) / scalar;
        let b = prob.var(base);
        if matches!(b.status, VarStatus::MultiAggregated { .. }) {
            let low = self.tighten_var_lb(base, target, true)?;
            if low.infeasible {
                return Ok(low);
            }
            return Ok(low.merge(self.tighten_var_ub(base, target, true)?));
        }
        if b.is_integral() && !num.is_feas_integral(target) {
            return Ok(BoundOutcome::INFEASIBLE);
        }
        if num.is_feas_lt(target, b.glb) || num.is_feas_gt(target, b.gub) {
            return Ok(BoundOutcome::INFEASIBLE);
        }
        let target = if b.is_integral() {
            num.feas_round(target)
        } else {
            target.max(b.glb).min(b.gub)
        };
        let obj = b.obj;

        self.set_global_bound_unchecked(base, BoundType::Lower, target);
        self.set_global_bound_unchecked(base, BoundType::Upper, target);
        let prob = self.prob_mut();
        prob.add_obj_offset(obj * target);
        let v = prob.var_mut(base);
        v.obj = 0.0;
        v.status = VarStatus::Fixed;
        prob.mark_var_for_deletion(base);
        tracing::debug!(var = %base, value = target, "fixed variable");
        Ok(BoundOutcome::CHANGED)
    }

    /// Aggregates `ax * x + ay * y == rhs` by replacing one variable.
    ///
    /// Constants from fixed or aggregated inputs are moved to the right
    /// hand side first. If one side is fixed the other variable is fixed.
    /// The eliminated variable is preferably continuous; two integral
    /// variables are aggregated only with an integral scalar and constant.
    pub fn aggregate_vars(
        &mut self,
        x: VarId,
        y: VarId,
        ax: f64,
        ay: f64,
        rhs: f64,
    ) -> Result<AggrOutcome> {
        check_stage(Operation::AggregateVars, self.stage)?;
        self.working_var_exists(x)?;
        self.working_var_exists(y)?;
        if self.config().presolving.donot_aggr {
            return Ok(AggrOutcome::default());
        }
        let num = self.num;
        let prob = self.prob();
        let (x, sx, cx) = probvar_sum(prob, x, ax, 0.0);
        let (y, sy, cy) = probvar_sum(prob, y, ay, 0.0);
        let rhs = rhs - cx - cy;

        match (num.is_zero(sx), num.is_zero(sy)) {
            (true, true) => {
                return Ok(AggrOutcome {
                    infeasible: !num.is_feas_eq(rhs, 0.0),
                    redundant: num.is_feas_eq(rhs, 0.0),
                    aggregated: false,
                })
            }
            (true, false) => return Ok(AggrOutcome::from_fixing(self.fix_global(y, rhs / sy)?)),
            (false, true) => return Ok(AggrOutcome::from_fixing(self.fix_global(x, rhs / sx)?)),
            (false, false) => {}
        }
        if x == y {
            let s = sx + sy;
            if num.is_zero(s) {
                return Ok(AggrOutcome {
                    infeasible: !num.is_feas_eq(rhs, 0.0),
                    redundant: num.is_feas_eq(rhs, 0.0),
                    aggregated: false,
                });
            }
            return Ok(AggrOutcome::from_fixing(self.fix_global(x, rhs / s)?));
        }

        let is_multi = |v: VarId| matches!(prob.var(v).status, VarStatus::MultiAggregated { .. });
        if is_multi(x) || is_multi(y) {
            return Ok(AggrOutcome::default());
        }

        // eliminate a continuous variable when there is one
        let (x, y, sx, sy) = if prob.var(x).is_integral() && !prob.var(y).is_integral() {
            (y, x, sy, sx)
        } else {
            (x, y, sx, sy)
        };
        let mut elim = (x, y, -sy / sx, rhs / sx);
        if prob.var(x).is_integral() {
            let integral = |a: f64, b: f64| num.is_integral(a) && num.is_integral(b);
            if !integral(elim.2, elim.3) {
                let swapped = (y, x, -sx / sy, rhs / sy);
                if !integral(swapped.2, swapped.3) {
                    tracing::trace!(%x, %y, "aggregation would lose integrality");
                    return Ok(AggrOutcome::default());
                }
                elim = swapped;
            }
        }
        let (x, y, a, b) = elim;
        let (a, b) = if prob.var(x).is_integral() {
            (num.feas_round(a), num.feas_round(b))
        } else {
            (a, b)
        };
        self.aggregate_into(x, y, a, b)
    }

    /// Replaces `x` by `a * y + b`.
    fn aggregate_into(&mut self, x: VarId, y: VarId, a: f64, b: f64) -> Result<AggrOutcome> {
        let num = self.num;
        let prob = self.prob();
        let xv = prob.var(x);
        let yv = prob.var(y);
        let (xlb, xub, xobj) = (xv.glb, xv.gub, xv.obj);
        let (xdown, xup) = (xv.locks_down, xv.locks_up);
        let (y_glb, y_gub, y_integral) = (yv.glb, yv.gub, yv.is_integral());

        // x in [xlb, xub] implies bounds on y
        let map = |bound: f64| {
            if num.is_infinite(bound) {
                bound.signum() * a.signum() * num.infinity
            } else {
                (bound - b) / a
            }
        };
        let (from_lb, from_ub) = if a > 0.0 {
            (map(xlb), map(xub))
        } else {
            (map(xub), map(xlb))
        };
        let new_lb = num.adjusted_lb(y_integral, from_lb).max(y_glb);
        let new_ub = num.adjusted_ub(y_integral, from_ub).min(y_gub);
        if num.is_feas_gt(new_lb, new_ub) {
            return Ok(AggrOutcome {
                infeasible: true,
                ..AggrOutcome::default()
            });
        }
        let new_ub = new_ub.max(new_lb);
        if new_lb > y_glb {
            self.set_global_bound_unchecked(y, BoundType::Lower, new_lb);
        }
        if new_ub < y_gub {
            self.set_global_bound_unchecked(y, BoundType::Upper, new_ub);
        }

        let prob = self.prob_mut();
        prob.add_obj_offset(xobj * b);
        let yv = prob.var_mut(y);
        yv.obj += xobj * a;
        if a > 0.0 {
            yv.locks_down += xdown;
            yv.locks_up += xup;
        } else {
            yv.locks_down += xup;
            yv.locks_up += xdown;
        }
        let xv = prob.var_mut(x);
        xv.obj = 0.0;
        xv.status = VarStatus::Aggregated {
            var: y,
            scalar: a,
            constant: b,
        };
        prob.mark_var_for_deletion(x);
        tracing::debug!(%x, %y, scalar = a, constant = b, "aggregated variable");
        Ok(AggrOutcome {
            aggregated: true,
            ..AggrOutcome::default()
        })
    }

    /// Replaces the active variable `x` by `sum(terms) + constant`.
    ///
    /// With several terms the bounds of `x` survive as a linear row named
    /// `<name>_bnd`. Requests that would create a cycle, lose integrality
    /// or target an inactive variable are refused (`aggregated == false`).
    pub fn multiaggregate_var(
        &mut self,
        x: VarId,
        terms: &[(VarId, f64)],
        constant: f64,
    ) -> Result<AggrOutcome> {
        check_stage(Operation::MultiaggregateVar, self.stage)?;
        self.working_var_exists(x)?;
        for (v, _) in terms {
            self.working_var_exists(*v)?;
        }
        if self.config().presolving.donot_multaggr {
            return Ok(AggrOutcome::default());
        }
        let num = self.num;
        let prob = self.prob();
        let xv = prob.var(x);
        if !xv.status.is_active() {
            return Ok(AggrOutcome::default());
        }
        let (resolved, extra) = active_linear_terms(prob, terms);
        let constant = constant + extra;
        if resolved.iter().any(|(v, _)| *v == x) {
            tracing::trace!(%x, "cyclic multi-aggregation refused");
            return Ok(AggrOutcome::default());
        }
        if xv.is_integral() {
            let keeps_integrality = num.is_integral(constant)
                && resolved
                    .iter()
                    .all(|(v, s)| prob.var(*v).is_integral() && num.is_integral(*s));
            if !keeps_integrality {
                return Ok(AggrOutcome::default());
            }
        }

        match resolved.as_slice() {
            [] => return Ok(AggrOutcome::from_fixing(self.fix_global(x, constant)?)),
            [(y, a)] => return self.aggregate_into(x, *y, *a, constant),
            _ => {}
        }

        let (xlb, xub, xobj) = (xv.glb, xv.gub, xv.obj);
        let (xdown, xup) = (xv.locks_down, xv.locks_up);
        let name = format!("{}_bnd", xv.name);
        let prob = self.prob_mut();
        prob.add_obj_offset(xobj * constant);
        for &(v, s) in &resolved {
            let var = prob.var_mut(v);
            var.obj += xobj * s;
            if s > 0.0 {
                var.locks_down += xdown;
                var.locks_up += xup;
            } else {
                var.locks_down += xup;
                var.locks_up += xdown;
            }
        }
        let xv = prob.var_mut(x);
        xv.obj = 0.0;
        xv.status = VarStatus::MultiAggregated {
            vars: resolved.iter().map(|(v, _)| *v).collect(),
            scalars: resolved.iter().map(|(_, s)| *s).collect(),
            constant,
        };
        prob.mark_var_for_deletion(x);

        if !num.is_neg_infinity(xlb) || !num.is_infinity(xub) {
            let lhs = if num.is_neg_infinity(xlb) {
                -num.infinity
            } else {
                xlb - constant
            };
            let rhs = if num.is_infinity(xub) {
                num.infinity
            } else {
                xub - constant
            };
            let id = prob.add_cons(Constraint::linear(name, &resolved, lhs, rhs));
            prob.lock_row(id, 1, &num);
        }
        tracing::debug!(%x, nterms = resolved.len(), "multi-aggregated variable");
        Ok(AggrOutcome {
            aggregated: true,
            ..AggrOutcome::default()
        })
    }

    /// Changes the type of a variable, rounding the bounds when it
    /// becomes integral. Crossing rounded bounds report infeasibility and
    /// leave the variable unchanged.
    pub fn chg_var_type(&mut self, var: VarId, vartype: VarType) -> Result<BoundOutcome> {
        check_stage(Operation::ChgVarType, self.stage)?;
        self.working_var_exists(var)?;
        let num = self.num;
        let v = self.prob().var(var);
        if v.vartype == vartype {
            return Ok(BoundOutcome::UNCHANGED);
        }
        if vartype == VarType::Binary && (num.is_lt(v.glb, 0.0) || num.is_gt(v.gub, 1.0)) {
            return Err(MipError::InvalidData(format!(
                "{var} has bounds [{}, {}] outside of [0, 1]",
                v.glb, v.gub
            )));
        }
        let integral = vartype.is_integral();
        let lb = num.adjusted_lb(integral, v.glb);
        let ub = num.adjusted_ub(integral, v.gub);
        if num.is_feas_gt(lb, ub) {
            return Ok(BoundOutcome::INFEASIBLE);
        }
        let (llb, lub) = (
            num.adjusted_lb(integral, v.llb).max(lb),
            num.adjusted_ub(integral, v.lub).min(ub),
        );

        let problem_stage = self.stage == Stage::Problem;
        let transformed = self.transformed.is_some();
        let prob = self.prob_mut();
        let v = prob.var_mut(var);
        v.vartype = vartype;
        v.glb = lb;
        v.gub = ub;
        v.llb = llb;
        v.lub = lub.max(llb);
        if problem_stage {
            v.orig_lb = lb;
            v.orig_ub = ub;
        }
        if transformed {
            prob.check_obj_integrality(&num);
        }
        Ok(BoundOutcome::CHANGED)
    }

    /// Returns the negated counterpart `constant - var`, creating it on
    /// first use. The constant is `lb + ub`, or zero for unbounded domains.
    pub fn get_negated_var(&mut self, var: VarId) -> Result<VarId> {
        check_stage(Operation::GetNegatedVar, self.stage)?;
        self.working_var_exists(var)?;
        let num = self.num;
        let v = self.prob().var(var);
        if let Some(neg) = v.negation {
            return Ok(neg);
        }
        let constant = if num.is_infinite(v.glb) || num.is_infinite(v.gub) {
            0.0
        } else {
            v.glb + v.gub
        };
        let flip = |bound: f64| {
            if num.is_infinite(bound) {
                -bound
            } else {
                constant - bound
            }
        };
        let neg = Var {
            name: format!("{}_neg", v.name),
            vartype: v.vartype,
            obj: 0.0,
            glb: flip(v.gub),
            gub: flip(v.glb),
            llb: flip(v.lub),
            lub: flip(v.llb),
            orig_lb: flip(v.orig_ub),
            orig_ub: flip(v.orig_lb),
            locks_down: v.locks_up,
            locks_up: v.locks_down,
            status: VarStatus::Negated { var, constant },
            origin: None,
            negation: Some(var),
        };
        let prob = self.prob_mut();
        let id = prob.add_inactive_var(neg);
        prob.var_mut(var).negation = Some(id);
        Ok(id)
    }
}
