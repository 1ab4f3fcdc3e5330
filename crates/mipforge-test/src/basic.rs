//! Tiny problems with a known outcome.

use mipforge_core::{Constraint, Problem, Var};

/// Binary `x` with the row `x >= 2`: infeasible.
pub fn infeasible_binary() -> Problem {
    let mut prob = Problem::new("infeasible_binary");
    let x = prob.add_var(Var::binary("x", 1.0));
    prob.add_cons(Constraint::linear("x_ge_2", &[(x, 1.0)], 2.0, f64::INFINITY));
    prob
}

/// `min -x` with `x >= 0` continuous and unbounded above.
pub fn unbounded_continuous() -> Problem {
    let mut prob = Problem::new("unbounded_continuous");
    prob.add_var(Var::continuous("x", 0.0, f64::INFINITY, -1.0));
    prob
}

/// `min x + y` s.t. `x + y >= 1`, binary: optimum 1 found at the root.
pub fn root_optimal_cover() -> Problem {
    let mut prob = Problem::new("root_optimal_cover");
    let x = prob.add_var(Var::binary("x", 1.0));
    let y = prob.add_var(Var::binary("y", 1.0));
    prob.add_cons(Constraint::linear("cover", &[(x, 1.0), (y, 1.0)], 1.0, f64::INFINITY));
    prob
}

/// Integers `x, y` in `[0, 10]` with `x - y = 1` and `min x`.
pub fn chain_equality() -> Problem {
    let mut prob = Problem::new("chain_equality");
    let x = prob.add_var(Var::integer("x", 0.0, 10.0, 1.0));
    let y = prob.add_var(Var::integer("y", 0.0, 10.0, 0.0));
    prob.add_cons(Constraint::linear("x_eq_y_plus_1", &[(x, 1.0), (y, -1.0)], 1.0, 1.0));
    prob
}
