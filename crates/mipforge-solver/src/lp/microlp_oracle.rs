//! [`LpOracle`] backed by the `microlp` simplex.

use microlp::{ComparisonOp, OptimizationDirection, Problem as MicroProblem};
use mipforge_core::Numerics;

use super::{LpOracle, LpRequest, LpResult, LpStatus};

/// Dense simplex from the `microlp` crate.
///
/// It reports neither duals nor iteration counts; iterations read as zero.
#[derive(Debug, Clone, Default)]
pub struct MicroLpOracle;

impl MicroLpOracle {
    pub fn new() -> Self {
        Self
    }
}

fn to_float(num: &Numerics, value: f64) -> f64 {
    if num.is_infinity(value) {
        f64::INFINITY
    } else if num.is_neg_infinity(value) {
        f64::NEG_INFINITY
    } else {
        value
    }
}

impl LpOracle for MicroLpOracle {
    fn solve(&mut self, request: &LpRequest, num: &Numerics) -> LpResult {
        for (lb, ub) in request.lb.iter().zip(&request.ub) {
            if num.is_gt(*lb, *ub) {
                return LpResult::with_status(LpStatus::Infeasible);
            }
        }

        let mut problem = MicroProblem::new(OptimizationDirection::Minimize);
        let vars: Vec<_> = (0..request.n_cols())
            .map(|j| {
                problem.add_var(
                    request.obj[j],
                    (to_float(num, request.lb[j]), to_float(num, request.ub[j])),
                )
            })
            .collect();

        for row in &request.rows {
            let expr: Vec<_> = row.coefs.iter().map(|(j, c)| (vars[*j], *c)).collect();
            let lhs_finite = !num.is_neg_infinity(row.lhs);
            let rhs_finite = !num.is_infinity(row.rhs);
            if expr.is_empty() {
                if (lhs_finite && num.is_feas_gt(row.lhs, 0.0))
                    || (rhs_finite && num.is_feas_lt(row.rhs, 0.0))
                {
                    return LpResult::with_status(LpStatus::Infeasible);
                }
                continue;
            }
            if lhs_finite && rhs_finite && row.lhs == row.rhs {
                problem.add_constraint(expr.as_slice(), ComparisonOp::Eq, row.rhs);
                continue;
            }
            if lhs_finite {
                problem.add_constraint(expr.as_slice(), ComparisonOp::Ge, row.lhs);
            }
            if rhs_finite {
                problem.add_constraint(expr.as_slice(), ComparisonOp::Le, row.rhs);
            }
        }

        match problem.solve() {
            Ok(solution) => LpResult {
                status: LpStatus::Optimal,
                objective: solution.objective() + request.obj_offset,
                primal: vars.iter().map(|v| solution[*v]).collect(),
                duals: None,
                reduced_costs: None,
                iterations: 0,
            },
            Err(microlp::Error::Infeasible) => LpResult::with_status(LpStatus::Infeasible),
            Err(microlp::Error::Unbounded) => LpResult::with_status(LpStatus::Unbounded),
            Err(err) => {
                tracing::debug!(error = %err, "LP oracle failed");
                LpResult::with_status(LpStatus::Error)
            }
        }
    }
}
