//! Problem data model
//!
//! - `Problem`: variables, constraints and objective of one space
//! - `Var` and `VarStatus`: decision variables and their resolution state
//! - `Constraint`: linear rows owned by named handlers
//! - `Solution`: assignments with origin and provenance
//! - `resolve`: active-representative resolution and flattening

mod constraint;
mod problem;
pub mod resolve;
mod solution;
mod variable;

pub use constraint::{ConsFlags, ConsId, Constraint};
pub use problem::{NonzeroCount, ObjSense, Problem, ProblemSpace, VarCounts};
pub use resolve::{active_linear_terms, active_representatives, probvar_sum, Representation};
pub use solution::{SolLinkage, SolOrigin, SolProvenance, Solution};
pub use variable::{BoundType, Var, VarId, VarStatus, VarType};

#[cfg(test)]
mod tests;
