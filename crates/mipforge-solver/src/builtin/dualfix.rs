use mipforge_core::{PluginResult, Result, VarId};

use crate::plugin::Propagator;
use crate::presolve::{PresolveContext, TimingMask};
use crate::scope::SolverScope;

/// Fixes variables that no constraint prevents from moving in their
/// improving objective direction.
#[derive(Debug, Default)]
pub struct DualFixPropagator;

impl DualFixPropagator {
    pub fn new() -> Self {
        Self
    }
}

enum DualFix {
    Value(f64),
    Unbounded,
}

/// The value `var` can be fixed to by dual arguments, if any.
fn dual_fix_value(scope: &SolverScope, var: VarId) -> Option<DualFix> {
    let num = scope.numerics();
    let v = scope.prob().var(var);
    let (lb, ub) = (v.llb, v.lub);
    if num.is_eq(lb, ub) {
        return None;
    }
    if v.locks_down == 0 && !num.is_lt(v.obj, 0.0) {
        if !num.is_zero(v.obj) || !num.is_infinite(lb) {
            return Some(if num.is_infinite(lb) {
                DualFix::Unbounded
            } else {
                DualFix::Value(lb)
            });
        }
        if v.locks_up == 0 {
            return Some(DualFix::Value(if num.is_infinite(ub) { 0.0 } else { ub }));
        }
        return None;
    }
    if v.locks_up == 0 && !num.is_gt(v.obj, 0.0) {
        if !num.is_zero(v.obj) || !num.is_infinite(ub) {
            return Some(if num.is_infinite(ub) {
                DualFix::Unbounded
            } else {
                DualFix::Value(ub)
            });
        }
    }
    None
}

impl DualFixPropagator {
    /// Number of fixings, or the result that ends the call early.
    fn run(&self, scope: &mut SolverScope) -> Result<std::result::Result<u64, PluginResult>> {
        if !scope.allow_dual_reductions() {
            return Ok(Err(PluginResult::DidNotRun));
        }
        let vars: Vec<VarId> = scope.prob().active_vars().to_vec();
        let mut fixed = 0;
        for var in vars {
            if !scope.prob().var(var).is_active() {
                continue;
            }
            match dual_fix_value(scope, var) {
                None => {}
                Some(DualFix::Unbounded) => {
                    tracing::debug!(var = %var, "unbounded dual fixing direction");
                    return Ok(Err(PluginResult::Unbounded));
                }
                Some(DualFix::Value(value)) => {
                    let outcome = scope.fix_var(var, value)?;
                    if outcome.infeasible {
                        return Ok(Err(PluginResult::Cutoff));
                    }
                    if outcome.changed {
                        fixed += 1;
                    }
                }
            }
        }
        Ok(Ok(fixed))
    }
}

impl Propagator for DualFixPropagator {
    fn name(&self) -> &str {
        "dualfix"
    }

    fn priority(&self) -> i32 {
        8_000_000
    }

    fn presol_priority(&self) -> i32 {
        8_000_000
    }

    fn presol_timing(&self) -> TimingMask {
        TimingMask::FAST
    }

    fn presolve(&mut self, scope: &mut SolverScope, ctx: &mut PresolveContext) -> Result<PluginResult> {
        Ok(match self.run(scope)? {
            Ok(0) => PluginResult::DidNotFind,
            Ok(n) => {
                ctx.tally.fixed_vars += n;
                PluginResult::Success
            }
            Err(result) => result,
        })
    }

    fn propagate(&mut self, scope: &mut SolverScope) -> Result<PluginResult> {
        if scope.tree().focus_depth() > 0 || scope.tree().in_probing() {
            return Ok(PluginResult::DidNotRun);
        }
        Ok(match self.run(scope)? {
            Ok(0) => PluginResult::DidNotFind,
            Ok(_) => PluginResult::ReducedDom,
            Err(result) => result,
        })
    }
}
