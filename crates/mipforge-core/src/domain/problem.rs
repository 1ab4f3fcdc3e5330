//! Problem container for the original and the transformed space.

use std::collections::BTreeSet;

use num_traits::ToPrimitive;

use super::resolve::active_linear_terms;
use super::{ConsId, Constraint, Var, VarId, VarStatus, VarType};
use crate::numerics::Numerics;

/// Optimization direction of the original problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ObjSense {
    #[default]
    Minimize,
    Maximize,
}

impl ObjSense {
    /// `+1` for minimization, `-1` for maximization.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            ObjSense::Minimize => 1.0,
            ObjSense::Maximize => -1.0,
        }
    }
}

/// Which variable space a problem or solution lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProblemSpace {
    Original,
    Transformed,
}

/// Active variable counts by type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VarCounts {
    pub binary: usize,
    pub integer: usize,
    pub implicit: usize,
    pub continuous: usize,
}

impl VarCounts {
    pub fn total(&self) -> usize {
        self.binary + self.integer + self.implicit + self.continuous
    }

    /// Variables with an integrality requirement of any kind.
    pub fn non_continuous(&self) -> usize {
        self.binary + self.integer + self.implicit
    }
}

/// Result of a bounded nonzero count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonzeroCount {
    pub count: usize,
    /// False if the count was extrapolated from a sample.
    pub exact: bool,
}

/// Variables, constraints and objective of one problem space.
///
/// Variables live in an append-only arena indexed by [`VarId`]; the ordered
/// active list holds the variables still taking part in the problem.
/// Deletions are deferred: callers mark variables and a later
/// [`Problem::sweep_deleted_vars`] removes them from the active list.
///
/// In the transformed space the objective is always a minimization:
/// `internal = sum(obj * x) + obj_offset` over active variables and
/// `external = sense * obj_scale * internal`.
#[derive(Debug, Clone)]
pub struct Problem {
    pub name: String,
    space: ProblemSpace,
    vars: Vec<Var>,
    active: Vec<VarId>,
    marked_for_deletion: BTreeSet<VarId>,
    conss: Vec<Constraint>,
    active_conss: Vec<ConsId>,
    pub sense: ObjSense,
    pub obj_offset: f64,
    pub obj_scale: f64,
    obj_integral: bool,
    pub nlp_enabled: bool,
}

impl Problem {
    /// Creates an empty original-space problem.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_space(name, ProblemSpace::Original)
    }

    fn with_space(name: impl Into<String>, space: ProblemSpace) -> Self {
        Self {
            name: name.into(),
            space,
            vars: Vec::new(),
            active: Vec::new(),
            marked_for_deletion: BTreeSet::new(),
            conss: Vec::new(),
            active_conss: Vec::new(),
            sense: ObjSense::Minimize,
            obj_offset: 0.0,
            obj_scale: 1.0,
            obj_integral: false,
            nlp_enabled: false,
        }
    }

    pub fn space(&self) -> ProblemSpace {
        self.space
    }

    // ---- variables ----

    /// Appends a variable to the arena and the active list.
    pub fn add_var(&mut self, var: Var) -> VarId {
        let id = VarId(self.vars.len());
        self.vars.push(var);
        self.active.push(id);
        id
    }

    /// Appends a variable that is not active (negations, fixed helpers).
    pub fn add_inactive_var(&mut self, var: Var) -> VarId {
        let id = VarId(self.vars.len());
        self.vars.push(var);
        id
    }

    #[inline]
    pub fn var(&self, id: VarId) -> &Var {
        &self.vars[id.0]
    }

    #[inline]
    pub fn var_mut(&mut self, id: VarId) -> &mut Var {
        &mut self.vars[id.0]
    }

    pub fn get_var(&self, id: VarId) -> Option<&Var> {
        self.vars.get(id.0)
    }

    /// All variables ever created in this space.
    pub fn arena(&self) -> &[Var] {
        &self.vars
    }

    pub fn arena_len(&self) -> usize {
        self.vars.len()
    }

    /// The ordered active variable list.
    pub fn active_vars(&self) -> &[VarId] {
        &self.active
    }

    pub fn n_vars(&self) -> usize {
        self.active.len()
    }

    pub fn find_var(&self, name: &str) -> Option<VarId> {
        self.vars.iter().position(|v| v.name == name).map(VarId)
    }

    pub fn var_counts(&self) -> VarCounts {
        let mut counts = VarCounts::default();
        for id in &self.active {
            match self.vars[id.0].vartype {
                VarType::Binary => counts.binary += 1,
                VarType::Integer => counts.integer += 1,
                VarType::Implicit => counts.implicit += 1,
                VarType::Continuous => counts.continuous += 1,
            }
        }
        counts
    }

    /// Number of arena variables that were fixed, aggregated or multi-aggregated.
    pub fn n_resolved_vars(&self) -> usize {
        self.vars
            .iter()
            .filter(|v| {
                matches!(
                    v.status,
                    VarStatus::Fixed
                        | VarStatus::Aggregated { .. }
                        | VarStatus::MultiAggregated { .. }
                )
            })
            .count()
    }

    /// Marks a variable for removal from the active list.
    ///
    /// Returns false if it was already marked.
    pub fn mark_var_for_deletion(&mut self, id: VarId) -> bool {
        self.marked_for_deletion.insert(id)
    }

    pub fn marked_for_deletion(&self) -> &BTreeSet<VarId> {
        &self.marked_for_deletion
    }

    /// Removes all marked variables from the active list.
    ///
    /// Returns the number of variables removed.
    pub fn sweep_deleted_vars(&mut self) -> usize {
        if self.marked_for_deletion.is_empty() {
            return 0;
        }
        let marked = std::mem::take(&mut self.marked_for_deletion);
        let before = self.active.len();
        self.active.retain(|id| !marked.contains(id));
        before - self.active.len()
    }

    /// Restores the canonical order: binary, integer, implicit, continuous.
    pub fn sort_vars_by_type(&mut self) {
        let vars = &self.vars;
        self.active.sort_by_key(|id| vars[id.0].vartype);
    }

    // ---- constraints ----

    pub fn add_cons(&mut self, cons: Constraint) -> ConsId {
        let id = ConsId(self.conss.len());
        self.conss.push(cons);
        self.active_conss.push(id);
        id
    }

    #[inline]
    pub fn cons(&self, id: ConsId) -> &Constraint {
        &self.conss[id.0]
    }

    #[inline]
    pub fn cons_mut(&mut self, id: ConsId) -> &mut Constraint {
        &mut self.conss[id.0]
    }

    pub fn active_conss(&self) -> &[ConsId] {
        &self.active_conss
    }

    pub fn n_conss(&self) -> usize {
        self.active_conss.len()
    }

    /// Iterates active constraints with their ids.
    pub fn conss(&self) -> impl Iterator<Item = (ConsId, &Constraint)> + '_ {
        self.active_conss.iter().map(move |id| (*id, &self.conss[id.0]))
    }

    /// Removes a constraint from the active list. Returns false if already deleted.
    pub fn del_cons(&mut self, id: ConsId) -> bool {
        let cons = &mut self.conss[id.0];
        if cons.deleted {
            return false;
        }
        cons.deleted = true;
        self.active_conss.retain(|c| *c != id);
        true
    }

    /// Adds `delta` rounding locks to the active variables of a row.
    ///
    /// A finite left-hand side blocks rounding against positive
    /// coefficients, a finite right-hand side rounding along them.
    pub fn lock_row(&mut self, id: ConsId, delta: i32, num: &Numerics) {
        let cons = &self.conss[id.0];
        let (has_lhs, has_rhs) = (!num.is_neg_infinity(cons.lhs), !num.is_infinity(cons.rhs));
        let terms: Vec<(VarId, f64)> = cons.terms().collect();
        let (active, _) = active_linear_terms(self, &terms);
        for (var, coef) in active {
            let (down, up) = if coef > 0.0 {
                (has_lhs, has_rhs)
            } else {
                (has_rhs, has_lhs)
            };
            let v = &mut self.vars[var.0];
            if down {
                v.locks_down = v.locks_down.saturating_add_signed(delta);
            }
            if up {
                v.locks_up = v.locks_up.saturating_add_signed(delta);
            }
        }
    }

    /// Counts nonzeros of active constraints, extrapolating from the first
    /// `max_sample` constraints when the problem is larger.
    pub fn count_nonzeros(&self, max_sample: usize) -> NonzeroCount {
        let n = self.active_conss.len();
        if n <= max_sample || max_sample == 0 {
            let count = self.conss().map(|(_, c)| c.len()).sum();
            return NonzeroCount { count, exact: true };
        }
        let sampled: usize = self.active_conss[..max_sample]
            .iter()
            .map(|id| self.conss[id.0].len())
            .sum();
        let count = (sampled as f64 / max_sample as f64 * n as f64).round() as usize;
        NonzeroCount {
            count,
            exact: false,
        }
    }

    // ---- objective ----

    pub fn is_obj_integral(&self) -> bool {
        self.obj_integral
    }

    pub fn set_obj_integral(&mut self, integral: bool) {
        self.obj_integral = integral;
    }

    pub fn add_obj_offset(&mut self, delta: f64) {
        self.obj_offset += delta;
    }

    /// Maps an internal objective value to the user's space.
    pub fn external_obj(&self, internal: f64, num: &Numerics) -> f64 {
        if num.is_infinite(internal) {
            return self.sense.sign() * internal.signum() * num.infinity;
        }
        match self.space {
            ProblemSpace::Original => internal,
            ProblemSpace::Transformed => self.sense.sign() * self.obj_scale * internal,
        }
    }

    /// Maps a user-space objective value to the internal minimization space.
    pub fn internal_obj(&self, external: f64, num: &Numerics) -> f64 {
        if num.is_infinite(external) {
            return self.sense.sign() * external.signum() * num.infinity;
        }
        match self.space {
            ProblemSpace::Original => external,
            ProblemSpace::Transformed => self.sense.sign() * external / self.obj_scale,
        }
    }

    /// Objective value of an assignment to the active variables.
    pub fn obj_value(&self, mut value: impl FnMut(VarId) -> f64) -> f64 {
        self.active
            .iter()
            .filter(|id| self.vars[id.0].obj != 0.0)
            .map(|id| self.vars[id.0].obj * value(*id))
            .sum::<f64>()
            + self.obj_offset
    }

    /// Recomputes whether every feasible objective value is integral.
    pub fn check_obj_integrality(&mut self, num: &Numerics) -> bool {
        let integral = num.is_integral(self.obj_offset)
            && self.active.iter().all(|id| {
                let var = &self.vars[id.0];
                if var.obj == 0.0 {
                    true
                } else if var.is_integral() {
                    num.is_integral(var.obj)
                } else {
                    false
                }
            });
        self.obj_integral = integral;
        integral
    }

    /// Scales the objective to integral coefficients with gcd 1 when every
    /// coefficient is rational with denominator at most `max_denominator`.
    ///
    /// Returns the applied factor (1.0 when nothing changed).
    pub fn scale_objective(&mut self, num: &Numerics, max_denominator: u32) -> f64 {
        let coefs: Vec<f64> = self
            .active
            .iter()
            .map(|id| &self.vars[id.0])
            .filter(|v| v.obj != 0.0)
            .map(|v| if v.is_integral() { v.obj } else { f64::NAN })
            .collect();
        if coefs.is_empty() || coefs.iter().any(|c| c.is_nan()) {
            return 1.0;
        }

        let mut multiplier: i64 = 1;
        for &c in &coefs {
            let Some(den) = (1..=i64::from(max_denominator))
                .find(|d| num.is_integral(c * (multiplier * d) as f64))
            else {
                return 1.0;
            };
            multiplier = match multiplier.checked_mul(den) {
                Some(m) if m <= i64::from(max_denominator) => m,
                _ => return 1.0,
            };
        }

        let mut divisor: i64 = 0;
        for &c in &coefs {
            let Some(n) = (c * multiplier as f64).round().to_i64() else {
                return 1.0;
            };
            divisor = gcd(divisor, n.abs());
        }
        if divisor == 0 {
            return 1.0;
        }
        let scale = multiplier as f64 / divisor as f64;
        if scale == 1.0 {
            return 1.0;
        }

        for id in &self.active {
            let var = &mut self.vars[id.0];
            var.obj = (var.obj * scale).round();
        }
        self.obj_offset *= scale;
        self.obj_scale /= scale;
        scale
    }

    // ---- transformation ----

    /// Derives the transformed problem from this original problem.
    ///
    /// Every arena variable gets a transformed copy at the same index, the
    /// objective is folded into a minimization and bounds of integral
    /// variables are rounded. Links in both directions are set.
    pub fn transform(&mut self, num: &Numerics) -> Problem {
        let sign = self.sense.sign();
        let mut trans = Problem::with_space(format!("t_{}", self.name), ProblemSpace::Transformed);
        trans.sense = self.sense;
        trans.obj_offset = sign * self.obj_offset;
        trans.nlp_enabled = self.nlp_enabled;

        for (idx, orig) in self.vars.iter_mut().enumerate() {
            let integral = orig.is_integral();
            let lb = num.adjusted_lb(integral, orig.glb);
            let ub = num.adjusted_ub(integral, orig.gub);
            let copy = Var {
                name: format!("t_{}", orig.name),
                vartype: orig.vartype,
                obj: sign * orig.obj,
                glb: lb,
                gub: ub,
                llb: lb,
                lub: ub,
                orig_lb: orig.orig_lb,
                orig_ub: orig.orig_ub,
                locks_down: 0,
                locks_up: 0,
                status: VarStatus::Loose,
                origin: Some(VarId(idx)),
                negation: None,
            };
            let tid = VarId(trans.vars.len());
            trans.vars.push(copy);
            orig.status = VarStatus::Original {
                transformed: Some(tid),
            };
        }
        trans.active = self.active.clone();

        for (idx, cons) in self.conss.iter().enumerate() {
            let mut copy = cons.clone();
            copy.name = format!("t_{}", cons.name);
            trans.conss.push(copy);
            if !cons.deleted {
                trans.active_conss.push(ConsId(idx));
            }
        }
        trans
    }

    /// Drops the links from original variables to the transformed space.
    pub fn unlink_transformed(&mut self) {
        for var in &mut self.vars {
            var.status = VarStatus::Original { transformed: None };
        }
    }

    /// Returns the transformed counterpart of an original variable.
    pub fn transformed_of(&self, id: VarId) -> Option<VarId> {
        match self.vars.get(id.0)?.status {
            VarStatus::Original { transformed } => transformed,
            _ => None,
        }
    }
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.abs()
}
