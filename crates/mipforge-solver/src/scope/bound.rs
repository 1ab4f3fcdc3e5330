//! Bound changes with stage-dependent dispatch.
//!
//! Every request is first redirected to an unresolved variable, then
//! rounded for integral variables and finally applied according to the
//! stage:
//!
//! - PROBLEM: global, local and original bound together
//! - between transformation and solving: the global bound
//! - PRESOLVING: the global bound, recorded on the presolving root
//!   (inference changes are not recorded)
//! - SOLVING: the local bound, recorded on the focus node; at the root
//!   node the change is global as well
//! - probing: the local bound, recorded on the probing trail

use mipforge_core::{check_stage, probvar_sum, BoundType, MipError, Operation, Result, Stage, VarId};

use super::SolverScope;
use crate::tree::{BoundChange, Provenance};

/// Result of a bound operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundOutcome {
    /// The domain became empty; nothing was applied.
    pub infeasible: bool,
    pub changed: bool,
}

impl BoundOutcome {
    pub const UNCHANGED: BoundOutcome = BoundOutcome {
        infeasible: false,
        changed: false,
    };
    pub const CHANGED: BoundOutcome = BoundOutcome {
        infeasible: false,
        changed: true,
    };
    pub const INFEASIBLE: BoundOutcome = BoundOutcome {
        infeasible: true,
        changed: false,
    };

    /// Combines two outcomes of one logical operation.
    pub fn merge(self, other: BoundOutcome) -> BoundOutcome {
        BoundOutcome {
            infeasible: self.infeasible || other.infeasible,
            changed: self.changed || other.changed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Sets the bound, loosening allowed; crossing is invalid data.
    Chg { global: bool },
    /// Only strengthens; crossing reports infeasibility.
    Tighten { force: bool },
    /// Like `Tighten`, with provenance and without presolving records.
    Infer { force: bool },
}

impl Mode {
    fn force(self) -> bool {
        match self {
            Mode::Chg { .. } => true,
            Mode::Tighten { force } | Mode::Infer { force } => force,
        }
    }
}

enum Target {
    Var(VarId, BoundType, f64),
    /// The variable resolves to a constant.
    Fixed(f64),
}

impl SolverScope {
    /// Changes the local lower bound; in PROBLEM stage and before solving
    /// the global one.
    pub fn chg_var_lb(&mut self, var: VarId, value: f64) -> Result<BoundOutcome> {
        let prov = self.default_provenance();
        self.change_bound(Operation::ChgVarLb, var, BoundType::Lower, value, Mode::Chg { global: false }, prov)
    }

    pub fn chg_var_ub(&mut self, var: VarId, value: f64) -> Result<BoundOutcome> {
        let prov = self.default_provenance();
        self.change_bound(Operation::ChgVarUb, var, BoundType::Upper, value, Mode::Chg { global: false }, prov)
    }

    /// Changes the global lower bound.
    pub fn chg_var_lb_global(&mut self, var: VarId, value: f64) -> Result<BoundOutcome> {
        let prov = self.default_provenance();
        self.change_bound(Operation::ChgVarLbGlobal, var, BoundType::Lower, value, Mode::Chg { global: true }, prov)
    }

    pub fn chg_var_ub_global(&mut self, var: VarId, value: f64) -> Result<BoundOutcome> {
        let prov = self.default_provenance();
        self.change_bound(Operation::ChgVarUbGlobal, var, BoundType::Upper, value, Mode::Chg { global: true }, prov)
    }

    /// Raises the lower bound if the change is significant (or `force`).
    ///
    /// A bound above the upper bound reports infeasibility and changes
    /// nothing.
    pub fn tighten_var_lb(&mut self, var: VarId, value: f64, force: bool) -> Result<BoundOutcome> {
        let prov = self.default_provenance();
        self.change_bound(Operation::TightenVarLb, var, BoundType::Lower, value, Mode::Tighten { force }, prov)
    }

    pub fn tighten_var_ub(&mut self, var: VarId, value: f64, force: bool) -> Result<BoundOutcome> {
        let prov = self.default_provenance();
        self.change_bound(Operation::TightenVarUb, var, BoundType::Upper, value, Mode::Tighten { force }, prov)
    }

    /// Tightens the lower bound as a deduction of `provenance`.
    pub fn infer_var_lb(&mut self, var: VarId, value: f64, provenance: Provenance) -> Result<BoundOutcome> {
        self.change_bound(Operation::InferVarLb, var, BoundType::Lower, value, Mode::Infer { force: false }, provenance)
    }

    pub fn infer_var_ub(&mut self, var: VarId, value: f64, provenance: Provenance) -> Result<BoundOutcome> {
        self.change_bound(Operation::InferVarUb, var, BoundType::Upper, value, Mode::Infer { force: false }, provenance)
    }

    /// Fixes a binary variable with a single bound change.
    pub fn infer_binvar(&mut self, var: VarId, value: bool, provenance: Provenance) -> Result<BoundOutcome> {
        check_stage(Operation::InferBinvar, self.stage)?;
        self.working_var_exists(var)?;
        let v = self.prob().var(var);
        if !v.is_integral() || self.num.is_lt(v.glb, 0.0) || self.num.is_gt(v.gub, 1.0) {
            return Err(MipError::InvalidData(format!("{var} is not binary")));
        }
        let (side, bound) = if value {
            (BoundType::Lower, 1.0)
        } else {
            (BoundType::Upper, 0.0)
        };
        self.change_bound(Operation::InferBinvar, var, side, bound, Mode::Infer { force: true }, provenance)
    }

    pub(crate) fn default_provenance(&self) -> Provenance {
        if self.stage == Stage::Presolving {
            Provenance::Presolve
        } else {
            Provenance::User
        }
    }

    fn change_bound(
        &mut self,
        op: Operation,
        var: VarId,
        side: BoundType,
        value: f64,
        mode: Mode,
        provenance: Provenance,
    ) -> Result<BoundOutcome> {
        check_stage(op, self.stage)?;
        self.working_var_exists(var)?;
        if value.is_nan() {
            return Err(MipError::InvalidData(format!("NaN bound for {var}")));
        }
        if self.is_infinite_push(var, side, value) {
            return Ok(BoundOutcome::UNCHANGED);
        }

        let (var, side, value) = match self.resolve_target(var, side, value) {
            Target::Var(v, s, x) => (v, s, x),
            Target::Fixed(fixed) => return Ok(self.against_fixed(side, value, fixed, mode)),
        };
        if self.is_infinite_push(var, side, value) {
            return Ok(BoundOutcome::UNCHANGED);
        }

        let num = self.num;
        let global = self.is_global_change(mode);
        let v = self.prob().var(var);
        let value = match side {
            BoundType::Lower => num.adjusted_lb(v.is_integral(), value),
            BoundType::Upper => num.adjusted_ub(v.is_integral(), value),
        };
        let (lb, ub) = if global { (v.glb, v.gub) } else { (v.llb, v.lub) };
        let (glb, gub) = (v.glb, v.gub);

        let value = match mode {
            Mode::Chg { .. } => {
                let crossing = match side {
                    BoundType::Lower => num.is_gt(value, ub),
                    BoundType::Upper => num.is_lt(value, lb),
                };
                if crossing {
                    return Err(MipError::InvalidData(format!(
                        "bound {value} crosses the opposite bound of {var}"
                    )));
                }
                // local bounds never leave the global domain
                let value = match (global, side) {
                    (false, BoundType::Lower) => value.max(glb).min(ub),
                    (false, BoundType::Upper) => value.min(gub).max(lb),
                    (true, BoundType::Lower) => value.min(ub),
                    (true, BoundType::Upper) => value.max(lb),
                };
                let current = if side == BoundType::Lower { lb } else { ub };
                if value == current {
                    return Ok(BoundOutcome::UNCHANGED);
                }
                value
            }
            Mode::Tighten { .. } | Mode::Infer { .. } => match side {
                BoundType::Lower => {
                    if num.is_feas_gt(value, ub) {
                        return Ok(BoundOutcome::INFEASIBLE);
                    }
                    if value <= lb || (!mode.force() && !num.is_lb_better(value, lb, ub)) {
                        return Ok(BoundOutcome::UNCHANGED);
                    }
                    value.min(ub)
                }
                BoundType::Upper => {
                    if num.is_feas_lt(value, lb) {
                        return Ok(BoundOutcome::INFEASIBLE);
                    }
                    if value >= ub || (!mode.force() && !num.is_ub_better(value, lb, ub)) {
                        return Ok(BoundOutcome::UNCHANGED);
                    }
                    value.max(lb)
                }
            },
        };

        let record = !matches!(mode, Mode::Infer { .. }) || self.stage == Stage::Solving;
        self.commit_bound(var, side, value, global, record, provenance)?;
        Ok(BoundOutcome::CHANGED)
    }

    /// Lower bounds pushed to `+inf` and upper bounds pushed to `-inf`
    /// are ignored while solving.
    fn is_infinite_push(&self, var: VarId, side: BoundType, value: f64) -> bool {
        if self.stage != Stage::Solving {
            return false;
        }
        let push = match side {
            BoundType::Lower => self.num.is_infinity(value),
            BoundType::Upper => self.num.is_neg_infinity(value),
        };
        if push {
            tracing::warn!(%var, ?side, value, "ignoring infinite bound push during solving");
        }
        push
    }

    /// Maps a bound on `var` to a bound on the variable it resolves to.
    fn resolve_target(&self, var: VarId, side: BoundType, value: f64) -> Target {
        let prob = self.prob();
        if prob.var(var).status.is_unresolved() {
            return Target::Var(var, side, value);
        }
        let (base, scalar, constant) = probvar_sum(prob, var, 1.0, 0.0);
        if scalar == 0.0 {
            return Target::Fixed(constant);
        }
        let mapped = if self.num.is_infinite(value) {
            value.signum() * scalar.signum() * self.num.infinity
        } else {
            (value - constant) / scalar
        };
        let side = if scalar < 0.0 { side.flip() } else { side };
        Target::Var(base, side, mapped)
    }

    fn against_fixed(&self, side: BoundType, value: f64, fixed: f64, mode: Mode) -> BoundOutcome {
        let violated = match side {
            BoundType::Lower => self.num.is_feas_gt(value, fixed),
            BoundType::Upper => self.num.is_feas_lt(value, fixed),
        };
        match (violated, mode) {
            (true, Mode::Chg { .. }) => {
                tracing::debug!(value, fixed, "bound change on a fixed variable ignored");
                BoundOutcome::UNCHANGED
            }
            (true, _) => BoundOutcome::INFEASIBLE,
            (false, _) => BoundOutcome::UNCHANGED,
        }
    }

    fn is_global_change(&self, mode: Mode) -> bool {
        match self.stage {
            Stage::Presolving => !self.tree.in_probing(),
            Stage::Solving => {
                if self.tree.in_probing() {
                    return false;
                }
                if matches!(mode, Mode::Chg { global: true }) {
                    return true;
                }
                match self.tree.focus() {
                    Some(focus) => self.tree.node(focus).depth == 0,
                    None => true,
                }
            }
            _ => true,
        }
    }

    /// Applies an already validated bound.
    fn commit_bound(
        &mut self,
        var: VarId,
        side: BoundType,
        value: f64,
        global: bool,
        record: bool,
        provenance: Provenance,
    ) -> Result<()> {
        let stage = self.stage;
        if stage == Stage::Problem {
            let v = self.original.var_mut(var);
            let old = v.global_bound(side);
            match side {
                BoundType::Lower => {
                    v.glb = value;
                    v.llb = value;
                    v.orig_lb = value;
                }
                BoundType::Upper => {
                    v.gub = value;
                    v.lub = value;
                    v.orig_ub = value;
                }
            }
            self.events.fire_bound_changed(var, side, old, value, true);
            return Ok(());
        }

        let Some(prob) = self.transformed.as_mut() else {
            return Err(MipError::Internal("no transformed problem".to_string()));
        };
        let v = prob.var_mut(var);

        if self.tree.in_probing() {
            let old = v.local_bound(side);
            v.set_local_bound(side, value);
            if let Some(p) = self.tree.probing_mut() {
                p.record(var, side, old);
            }
            self.events.fire_bound_changed(var, side, old, value, false);
            return Ok(());
        }

        let change = BoundChange::new(var, side, value, provenance);
        if global {
            let old = v.global_bound(side);
            let was_fixed = v.glb == v.gub;
            v.set_global_bound(side, value);
            if stage != Stage::Solving {
                v.set_local_bound(side, value);
            }
            let int_fixing = v.is_integral() && v.glb == v.gub && !was_fixed;

            match stage {
                Stage::Presolving if record => self.tree.record_root_change(change),
                Stage::Solving => {
                    if let Some(focus) = self.tree.focus() {
                        if self.tree.node(focus).depth == 0 {
                            self.tree.record_change(focus, change);
                        }
                    }
                    if int_fixing {
                        self.stats.record_root_int_fixing();
                    }
                }
                _ => {}
            }
            self.events.fire_bound_changed(var, side, old, value, true);
        } else {
            let old = v.local_bound(side);
            v.set_local_bound(side, value);
            if let Some(focus) = self.tree.focus() {
                if record {
                    self.tree.record_change(focus, change);
                }
            }
            self.events.fire_bound_changed(var, side, old, value, false);
        }
        Ok(())
    }

    /// Sets a global bound of the transformed problem without validation
    /// or records. Used by aggregation to move bounds between variables.
    pub(crate) fn set_global_bound_unchecked(&mut self, var: VarId, side: BoundType, value: f64) {
        let solving = self.stage == Stage::Solving;
        let Some(prob) = self.transformed.as_mut() else {
            return;
        };
        let v = prob.var_mut(var);
        let old = v.global_bound(side);
        if old == value {
            return;
        }
        v.set_global_bound(side, value);
        if !solving {
            v.set_local_bound(side, value);
        }
        self.events.fire_bound_changed(var, side, old, value, true);
    }
}
