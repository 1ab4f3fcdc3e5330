use mipforge_core::{PluginResult, Result, VarId};

use crate::plugin::Presolver;
use crate::presolve::{PresolveContext, TimingMask};
use crate::scope::SolverScope;

/// Removes active variables whose global bounds coincide.
#[derive(Debug, Default)]
pub struct TrivialPresolver;

impl TrivialPresolver {
    pub fn new() -> Self {
        Self
    }
}

impl Presolver for TrivialPresolver {
    fn name(&self) -> &str {
        "trivial"
    }

    fn priority(&self) -> i32 {
        9_000_000
    }

    fn timing(&self) -> TimingMask {
        TimingMask::FAST
    }

    fn execute(&mut self, scope: &mut SolverScope, ctx: &mut PresolveContext) -> Result<PluginResult> {
        let num = *scope.numerics();
        let fixed: Vec<(VarId, f64)> = scope
            .prob()
            .active_vars()
            .iter()
            .map(|&id| (id, scope.prob().var(id)))
            .filter(|(_, v)| v.is_active() && !num.is_infinite(v.glb) && num.is_eq(v.glb, v.gub))
            .map(|(id, v)| (id, v.glb))
            .collect();
        if fixed.is_empty() {
            return Ok(PluginResult::DidNotFind);
        }
        for (var, value) in fixed {
            let outcome = scope.fix_var(var, value)?;
            if outcome.infeasible {
                return Ok(PluginResult::Cutoff);
            }
            if outcome.changed {
                ctx.tally.fixed_vars += 1;
            }
        }
        Ok(PluginResult::Success)
    }
}
