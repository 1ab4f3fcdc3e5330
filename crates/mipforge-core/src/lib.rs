//! MipForge Core - core types for the branch-and-bound solving core
//!
//! This crate provides the leaf data model shared by every other crate:
//! - Solver stages and the declarative stage-gating table
//! - Error taxonomy and solve status codes
//! - Numerical tolerances
//! - Variables, constraints, problems and solutions
//! - Resolution of variables to their active representatives

pub mod domain;
pub mod error;
pub mod numerics;
pub mod stage;
pub mod status;

pub use domain::resolve::{flatten_multi_aggregations, is_flat};
pub use domain::{
    active_linear_terms, active_representatives, probvar_sum, BoundType, ConsFlags, ConsId,
    Constraint, NonzeroCount, ObjSense, Problem, ProblemSpace, Representation, SolLinkage,
    SolOrigin, SolProvenance, Solution, Var, VarCounts, VarId, VarStatus, VarType,
};
pub use error::{MipError, Result};
pub use numerics::Numerics;
pub use stage::{check_stage, Operation, Stage, StageSet};
pub use status::{PluginResult, SolveStatus};
