//! LP relaxation contract and relaxation stores.
//!
//! The relaxation solver is a black box behind [`LpOracle`]. Requests are
//! built from the active variables of the transformed problem at their
//! local bounds; rows are resolved to active variables beforehand.

mod microlp_oracle;
mod relax;

use std::fmt::Debug;

use mipforge_core::{Numerics, VarId};

pub use microlp_oracle::MicroLpOracle;
pub use relax::{Conflict, ConflictStore, Cut, CutPool, PriceStore, RelaxationStores, SepaStore};

/// Outcome class of an LP solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LpStatus {
    /// Trusted optimum.
    Optimal,
    Infeasible,
    Unbounded,
    /// Stopped early; the objective is an estimate, not a proof.
    IterLimit,
    TimeLimit,
    /// The oracle failed; the node is handled conservatively.
    Error,
    NotSolved,
}

impl LpStatus {
    /// Returns true if the objective value proves a lower bound.
    pub fn is_proof(self) -> bool {
        matches!(self, LpStatus::Optimal | LpStatus::Infeasible)
    }
}

/// A row `lhs <= sum(coef * col) <= rhs` over request columns.
#[derive(Debug, Clone, PartialEq)]
pub struct LpRow {
    pub coefs: Vec<(usize, f64)>,
    pub lhs: f64,
    pub rhs: f64,
}

/// A minimization LP over columns `0..cols.len()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LpRequest {
    /// Variable of each column.
    pub cols: Vec<VarId>,
    pub obj: Vec<f64>,
    pub lb: Vec<f64>,
    pub ub: Vec<f64>,
    pub rows: Vec<LpRow>,
    /// Constant added to the objective value.
    pub obj_offset: f64,
    pub iteration_limit: Option<u64>,
}

impl LpRequest {
    /// Appends a column and returns its index.
    pub fn add_col(&mut self, var: VarId, obj: f64, lb: f64, ub: f64) -> usize {
        self.cols.push(var);
        self.obj.push(obj);
        self.lb.push(lb);
        self.ub.push(ub);
        self.cols.len() - 1
    }

    pub fn n_cols(&self) -> usize {
        self.cols.len()
    }

    /// Column index of `var`, if it is a column.
    pub fn col_of(&self, var: VarId) -> Option<usize> {
        self.cols.iter().position(|v| *v == var)
    }
}

/// Result of an LP solve.
#[derive(Debug, Clone, PartialEq)]
pub struct LpResult {
    pub status: LpStatus,
    /// Objective value including the request's offset.
    pub objective: f64,
    /// Column values, empty unless optimal or limited.
    pub primal: Vec<f64>,
    pub duals: Option<Vec<f64>>,
    pub reduced_costs: Option<Vec<f64>>,
    pub iterations: u64,
}

impl LpResult {
    pub fn with_status(status: LpStatus) -> Self {
        Self {
            status,
            objective: 0.0,
            primal: Vec::new(),
            duals: None,
            reduced_costs: None,
            iterations: 0,
        }
    }
}

/// A relaxation solver.
pub trait LpOracle: Send + Debug {
    fn solve(&mut self, request: &LpRequest, num: &Numerics) -> LpResult;
}
