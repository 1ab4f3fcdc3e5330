//! Set covering instances.

use mipforge_core::{Constraint, Problem, Var};

/// Vertex cover of a triangle with unit weights.
///
/// The LP relaxation takes every vertex at one half (value 1.5); the
/// integer optimum is 2, so solving needs branching.
pub fn vertex_cover_triangle() -> Problem {
    let mut prob = Problem::new("vertex_cover_triangle");
    let a = prob.add_var(Var::binary("a", 1.0));
    let b = prob.add_var(Var::binary("b", 1.0));
    let c = prob.add_var(Var::binary("c", 1.0));
    for (name, u, v) in [("ab", a, b), ("bc", b, c), ("ca", c, a)] {
        prob.add_cons(Constraint::linear(name, &[(u, 1.0), (v, 1.0)], 1.0, f64::INFINITY));
    }
    prob
}
