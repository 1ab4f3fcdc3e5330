//! Completion procedures that turn hints into checkable solutions.
//!
//! Both procedures solve a restricted LP over a subset of the variables of
//! `prob` with every other variable fixed to its value in the solution.
//! Constraints are resolved to unresolved variables and the fixed part is
//! moved to the sides.

use mipforge_core::{active_linear_terms, Numerics, Problem, Result, SolOrigin, Solution, VarId};

use crate::lp::{LpOracle, LpRequest, LpRow, LpStatus};

/// Builds the rows of `prob` restricted to the columns of `request`.
///
/// `fixed` yields the value of every variable that is not a column.
fn restricted_rows(
    prob: &Problem,
    num: &Numerics,
    request: &LpRequest,
    mut fixed: impl FnMut(VarId) -> f64,
) -> Vec<LpRow> {
    let mut rows = Vec::new();
    for (_, cons) in prob.conss() {
        let terms: Vec<(VarId, f64)> = cons.terms().collect();
        let (active, constant) = active_linear_terms(prob, &terms);
        let mut shift = constant;
        let mut coefs = Vec::new();
        for (var, coef) in active {
            match request.col_of(var) {
                Some(col) => coefs.push((col, coef)),
                None => shift += coef * fixed(var),
            }
        }
        if coefs.is_empty() {
            continue;
        }
        let lhs = if num.is_neg_infinity(cons.lhs) {
            -num.infinity
        } else {
            cons.lhs - shift
        };
        let rhs = if num.is_infinity(cons.rhs) {
            num.infinity
        } else {
            cons.rhs - shift
        };
        rows.push(LpRow { coefs, lhs, rhs });
    }
    rows
}

/// Returns a copy of `sol` in which every variable with an infinite value
/// is replaced by a finite value of minimal absolute size.
///
/// Variables with finite values stay fixed. The auxiliary LP minimizes the
/// sum of absolute values of the previously infinite variables, so the
/// objective is unchanged whenever those variables have zero objective.
/// Returns `Ok(None)` when an infinite variable carries an objective
/// coefficient or the auxiliary LP has no optimal solution.
pub fn finite_sol_copy(
    prob: &Problem,
    num: &Numerics,
    oracle: &mut dyn LpOracle,
    sol: &Solution,
) -> Result<Option<Solution>> {
    let infinite: Vec<VarId> = prob
        .active_vars()
        .iter()
        .copied()
        .filter(|v| num.is_infinite(sol.val(prob, *v)))
        .collect();
    if infinite.is_empty() {
        return Ok(Some(sol.clone()));
    }
    if infinite.iter().any(|v| prob.var(*v).obj != 0.0) {
        return Ok(None);
    }

    let mut request = LpRequest::default();
    for &var in &infinite {
        let v = prob.var(var);
        request.add_col(var, 0.0, v.glb, v.gub);
    }
    let mut rows = restricted_rows(prob, num, &request, |v| sol.val(prob, v));

    // t_j >= |x_j|
    for (j, &var) in infinite.iter().enumerate() {
        let t = request.add_col(var, 1.0, 0.0, num.infinity);
        rows.push(LpRow {
            coefs: vec![(t, 1.0), (j, -1.0)],
            lhs: 0.0,
            rhs: num.infinity,
        });
        rows.push(LpRow {
            coefs: vec![(t, 1.0), (j, 1.0)],
            lhs: 0.0,
            rhs: num.infinity,
        });
    }
    request.rows = rows;

    let result = oracle.solve(&request, num);
    if result.status != LpStatus::Optimal {
        tracing::debug!(status = ?result.status, "finite solution copy failed");
        return Ok(None);
    }

    let mut copy = sol.clone();
    for (j, &var) in infinite.iter().enumerate() {
        let value = result.primal.get(j).copied().unwrap_or(0.0);
        let value = if prob.var(var).is_integral() {
            num.feas_round(value)
        } else {
            value
        };
        copy.set_val(var, value);
    }
    Ok(Some(copy))
}

/// Completes a partial solution by optimizing the unassigned variables
/// over an LP with the assigned ones fixed.
///
/// Integral columns are rounded to the nearest integer. Returns `Ok(None)`
/// if the restricted LP is not solved to optimality.
pub fn complete_partial_sol(
    prob: &Problem,
    num: &Numerics,
    oracle: &mut dyn LpOracle,
    partial: &Solution,
) -> Result<Option<Solution>> {
    let unassigned: Vec<VarId> = prob
        .active_vars()
        .iter()
        .copied()
        .filter(|v| partial.get_stored(*v).is_none())
        .collect();

    let mut complete = partial.clone();
    complete.mark_complete();
    complete.origin = SolOrigin::Original;
    if unassigned.is_empty() {
        return Ok(Some(complete));
    }

    let mut request = LpRequest::default();
    for &var in &unassigned {
        let v = prob.var(var);
        request.add_col(var, v.obj, v.glb, v.gub);
    }
    request.rows = restricted_rows(prob, num, &request, |v| partial.raw_val(v));

    let result = oracle.solve(&request, num);
    if result.status != LpStatus::Optimal {
        tracing::debug!(status = ?result.status, "partial solution completion failed");
        return Ok(None);
    }
    for (j, &var) in unassigned.iter().enumerate() {
        let value = result.primal.get(j).copied().unwrap_or(0.0);
        let value = if prob.var(var).is_integral() {
            num.feas_round(value)
        } else {
            value
        };
        complete.set_val(var, value);
    }
    Ok(Some(complete))
}
