//! MipForge - A Mixed-Integer Programming Solver Core in Rust
//!
//! Build a problem, hand it to [`default_solver`] and call `solve`.
//!
//! # Example
//!
//! ```rust
//! use mipforge::prelude::*;
//!
//! let mut prob = Problem::new("cover");
//! let x = prob.add_var(Var::binary("x", 1.0));
//! let y = prob.add_var(Var::binary("y", 1.0));
//! prob.add_cons(Constraint::linear("c", &[(x, 1.0), (y, 1.0)], 1.0, f64::INFINITY));
//!
//! let mut solver = default_solver(&prob, SolverConfig::default()).unwrap();
//! assert_eq!(solver.solve().unwrap(), SolveStatus::Optimal);
//! assert_eq!(solver.scope().primal_bound(), 1.0);
//! ```

// Data model
pub use mipforge_core::{
    BoundType, ConsFlags, ConsId, Constraint, MipError, Numerics, ObjSense, PluginResult, Problem,
    ProblemSpace, Result, SolOrigin, Solution, SolveStatus, Stage, Var, VarId, VarStatus, VarType,
};

pub use mipforge_config::SolverConfig;

// Solver and plugin contracts
pub use mipforge_solver::{
    builtin, CheckFlags, ConcurrentResult, ConcurrentSolver, ConstraintHandler, Heuristic,
    NodeSelector, Presolver, Propagator, SolveReport, Solver, SolverEventListener, Termination,
};

#[cfg(feature = "console")]
pub mod console;

mod solver;
pub use solver::{default_concurrent_solver, default_solver, include_default_plugins, solve_streaming};

pub mod prelude {
    pub use super::{default_solver, include_default_plugins};
    pub use super::{Constraint, ObjSense, Problem, SolveStatus, Solution, Var, VarId, VarType};
    pub use super::{Solver, SolverConfig};
}
