use mipforge_core::{Numerics, PluginResult, Result, SolOrigin, Var, VarId};

use crate::plugin::{HeurTiming, Heuristic};
use crate::scope::SolverScope;

/// Tries the all-zero point, the lower and upper bound corners and the
/// point suggested by the rounding locks.
#[derive(Debug, Default)]
pub struct TrivialHeuristic;

impl TrivialHeuristic {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone, Copy)]
enum Corner {
    Zero,
    Lower,
    Upper,
    Locks,
}

fn corner_value(num: &Numerics, var: &Var, corner: Corner) -> Option<f64> {
    let (lb, ub) = (var.llb, var.lub);
    let clamp_zero = || {
        if !num.is_infinite(lb) && lb > 0.0 {
            lb
        } else if !num.is_infinite(ub) && ub < 0.0 {
            ub
        } else {
            0.0
        }
    };
    let finite = |b: f64| (!num.is_infinite(b)).then_some(b);
    match corner {
        Corner::Zero => Some(clamp_zero()),
        Corner::Lower => finite(lb),
        Corner::Upper => finite(ub),
        Corner::Locks => {
            let down = var.locks_down < var.locks_up || (var.locks_down == var.locks_up && var.obj >= 0.0);
            let preferred = if down { lb } else { ub };
            Some(finite(preferred).unwrap_or_else(clamp_zero))
        }
    }
}

impl Heuristic for TrivialHeuristic {
    fn name(&self) -> &str {
        "trivial"
    }

    fn priority(&self) -> i32 {
        10_000
    }

    fn timing(&self) -> HeurTiming {
        HeurTiming::BEFORE_PRESOL.union(HeurTiming::BEFORE_NODE)
    }

    fn execute(&mut self, scope: &mut SolverScope, timing: HeurTiming) -> Result<PluginResult> {
        if timing == HeurTiming::BEFORE_NODE && scope.tree().focus_depth() > 0 {
            return Ok(PluginResult::DidNotRun);
        }
        let num = *scope.numerics();
        let vars: Vec<VarId> = scope.prob().active_vars().to_vec();
        let mut proposed = 0;
        for corner in [Corner::Zero, Corner::Lower, Corner::Upper, Corner::Locks] {
            let mut sol = scope.create_sol(SolOrigin::Unknown)?;
            let mut complete = true;
            for &var in &vars {
                match corner_value(&num, scope.prob().var(var), corner) {
                    Some(value) => sol.set_val(var, value),
                    None => {
                        complete = false;
                        break;
                    }
                }
            }
            if complete {
                scope.propose_sol(sol);
                proposed += 1;
            }
        }
        Ok(if proposed > 0 {
            PluginResult::Success
        } else {
            PluginResult::DidNotFind
        })
    }
}

/// Rounds the fractional values of the LP solution in a direction in
/// which no constraint locks the variable.
#[derive(Debug, Default)]
pub struct RoundingHeuristic;

impl RoundingHeuristic {
    pub fn new() -> Self {
        Self
    }
}

impl Heuristic for RoundingHeuristic {
    fn name(&self) -> &str {
        "rounding"
    }

    fn priority(&self) -> i32 {
        -1_000
    }

    fn timing(&self) -> HeurTiming {
        HeurTiming::AFTER_LP_NODE
    }

    fn execute(&mut self, scope: &mut SolverScope, _timing: HeurTiming) -> Result<PluginResult> {
        let Some(lp_sol) = scope.lp_sol() else {
            return Ok(PluginResult::DidNotRun);
        };
        let num = *scope.numerics();
        let prob = scope.prob();
        let mut sol = scope.create_sol(SolOrigin::Unknown)?;
        for &id in prob.active_vars() {
            let var = prob.var(id);
            let value = lp_sol.val(prob, id);
            if !var.is_integral() || num.is_feas_integral(value) {
                sol.set_val(id, if var.is_integral() { num.feas_round(value) } else { value });
                continue;
            }
            let rounded = if var.may_round_down() {
                num.feas_floor(value)
            } else if var.may_round_up() {
                num.feas_ceil(value)
            } else {
                return Ok(PluginResult::DidNotFind);
            };
            sol.set_val(id, rounded);
        }
        scope.propose_sol(sol);
        Ok(PluginResult::Success)
    }
}
