use mipforge_core::{ConsId, Numerics, PluginResult, Problem, Result, Solution};

use crate::plugin::ConstraintHandler;
use crate::primal::{CheckFlags, Violation};
use crate::scope::SolverScope;

/// Integrality of the integer, binary and implicit integer variables.
///
/// Owns no constraints; checked before all explicit rows.
#[derive(Debug, Default)]
pub struct IntegralityHandler;

impl IntegralityHandler {
    pub fn new() -> Self {
        Self
    }

    fn fractional(prob: &Problem, num: &Numerics, sol: &Solution, completely: bool) -> Vec<Violation> {
        let mut violations = Vec::new();
        for &var in prob.active_vars() {
            if !prob.var(var).is_integral() {
                continue;
            }
            let value = sol.val(prob, var);
            if !num.is_feas_integral(value) {
                violations.push(Violation::Integrality { var, value });
                if !completely {
                    break;
                }
            }
        }
        violations
    }
}

impl ConstraintHandler for IntegralityHandler {
    fn name(&self) -> &str {
        "integrality"
    }

    fn needs_constraints(&self) -> bool {
        false
    }

    fn check(
        &self,
        prob: &Problem,
        num: &Numerics,
        _conss: &[ConsId],
        sol: &Solution,
        flags: &CheckFlags,
    ) -> Vec<Violation> {
        if !flags.integrality {
            return Vec::new();
        }
        Self::fractional(prob, num, sol, flags.completely)
    }

    fn enforce(&mut self, scope: &mut SolverScope, _conss: &[ConsId], sol: &Solution) -> Result<PluginResult> {
        let fractional = Self::fractional(scope.prob(), scope.numerics(), sol, false);
        Ok(if fractional.is_empty() {
            PluginResult::Feasible
        } else {
            PluginResult::Infeasible
        })
    }
}
