//! Plugin contracts.
//!
//! Presolvers, propagators, constraint handlers, heuristics, branching
//! rules, node selectors, separators, pricers and Benders decompositions
//! are strategy objects called synchronously with the solver scope. They
//! report a [`PluginResult`]; cutoff, infeasible and unbounded results end
//! the current round or node.

mod registry;

use std::fmt::Debug;

use mipforge_core::{ConsId, Numerics, PluginResult, Problem, Result, Solution, VarId};

use crate::lp::Cut;
use crate::presolve::{PresolveContext, TimingMask};
use crate::primal::{CheckFlags, Violation};
use crate::scope::SolverScope;
use crate::tree::{NodeId, SearchTree};

pub use registry::PluginSet;

/// A presolving plugin.
pub trait Presolver: Send + Debug {
    fn name(&self) -> &str;

    /// Higher priorities run first; negative ones after the constraint handlers.
    fn priority(&self) -> i32 {
        0
    }

    fn timing(&self) -> TimingMask {
        TimingMask::FAST
    }

    /// Called once at the start of every presolving phase.
    fn init_presolve(&mut self, _scope: &mut SolverScope) -> Result<()> {
        Ok(())
    }

    /// Performs reductions and counts them in `ctx.tally`.
    fn execute(&mut self, scope: &mut SolverScope, ctx: &mut PresolveContext) -> Result<PluginResult>;
}

/// A domain propagator, optionally also active in presolving.
pub trait Propagator: Send + Debug {
    fn name(&self) -> &str;

    /// Order of propagation at nodes.
    fn priority(&self) -> i32 {
        0
    }

    /// Position in the merged presolving order.
    fn presol_priority(&self) -> i32 {
        0
    }

    /// Tiers in which [`Propagator::presolve`] runs; empty by default.
    fn presol_timing(&self) -> TimingMask {
        TimingMask::NONE
    }

    fn presolve(&mut self, _scope: &mut SolverScope, _ctx: &mut PresolveContext) -> Result<PluginResult> {
        Ok(PluginResult::DidNotRun)
    }

    /// Tightens local domains at the focus node.
    fn propagate(&mut self, scope: &mut SolverScope) -> Result<PluginResult>;
}

/// Semantics of one kind of constraint.
pub trait ConstraintHandler: Send + Debug {
    fn name(&self) -> &str;

    /// Non-negative handlers are checked before explicit constraints,
    /// negative ones last.
    fn check_priority(&self) -> i32 {
        0
    }

    /// False for handlers that check a global property without constraints.
    fn needs_constraints(&self) -> bool {
        true
    }

    fn presol_timing(&self) -> TimingMask {
        TimingMask::FAST
    }

    /// Returns the violations of `sol` for the given constraints.
    fn check(
        &self,
        prob: &Problem,
        num: &Numerics,
        conss: &[ConsId],
        sol: &Solution,
        flags: &CheckFlags,
    ) -> Vec<Violation>;

    fn propagate(&mut self, _scope: &mut SolverScope, _conss: &[ConsId]) -> Result<PluginResult> {
        Ok(PluginResult::DidNotRun)
    }

    fn presolve(
        &mut self,
        _scope: &mut SolverScope,
        _conss: &[ConsId],
        _ctx: &mut PresolveContext,
    ) -> Result<PluginResult> {
        Ok(PluginResult::DidNotRun)
    }

    /// Rows of the LP relaxation of a constraint.
    fn lp_rows(&self, _prob: &Problem, _cons: ConsId) -> Vec<Cut> {
        Vec::new()
    }

    /// Enforces constraints that the relaxation solution violates and the
    /// LP does not represent. `Infeasible` asks for branching.
    fn enforce(&mut self, _scope: &mut SolverScope, _conss: &[ConsId], _sol: &Solution) -> Result<PluginResult> {
        Ok(PluginResult::Feasible)
    }
}

/// When a heuristic is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeurTiming(u8);

impl HeurTiming {
    pub const BEFORE_PRESOL: HeurTiming = HeurTiming(1);
    pub const DURING_PRESOL: HeurTiming = HeurTiming(2);
    pub const BEFORE_NODE: HeurTiming = HeurTiming(4);
    pub const AFTER_LP_NODE: HeurTiming = HeurTiming(8);
    pub const AFTER_NODE: HeurTiming = HeurTiming(16);

    pub const fn union(self, other: HeurTiming) -> HeurTiming {
        HeurTiming(self.0 | other.0)
    }

    pub fn contains(self, other: HeurTiming) -> bool {
        self.0 & other.0 == other.0
    }
}

/// A primal heuristic. Solutions are handed in with [`SolverScope::propose_sol`].
pub trait Heuristic: Send + Debug {
    fn name(&self) -> &str;

    fn priority(&self) -> i32 {
        0
    }

    fn timing(&self) -> HeurTiming;

    fn execute(&mut self, scope: &mut SolverScope, timing: HeurTiming) -> Result<PluginResult>;
}

/// A fractional integer variable of the relaxation solution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchCandidate {
    pub var: VarId,
    pub value: f64,
    pub frac: f64,
}

/// Selects the variable to branch on.
pub trait BranchRule: Send + Debug {
    fn name(&self) -> &str;

    fn priority(&self) -> i32 {
        0
    }

    /// Index into `cands`, `None` to defer to the next rule.
    fn select(&mut self, scope: &SolverScope, cands: &[BranchCandidate]) -> Option<usize>;
}

/// Picks the next open node to process.
pub trait NodeSelector: Send + Debug {
    fn name(&self) -> &str;

    fn priority(&self) -> i32 {
        0
    }

    fn select(&mut self, tree: &SearchTree) -> Option<NodeId>;
}

/// Cutting plane separator. Cuts go to [`SolverScope::add_cut`].
pub trait Separator: Send + Debug {
    fn name(&self) -> &str;

    fn priority(&self) -> i32 {
        0
    }

    fn separate(&mut self, scope: &mut SolverScope) -> Result<PluginResult>;
}

/// Column generator. New variables go to [`SolverScope::add_priced_var`].
pub trait Pricer: Send + Debug {
    fn name(&self) -> &str;

    fn priority(&self) -> i32 {
        0
    }

    fn is_active(&self) -> bool {
        true
    }

    fn price(&mut self, scope: &mut SolverScope) -> Result<PluginResult>;
}

/// A Benders decomposition with external subproblems.
pub trait BendersDecomposition: Send + Debug {
    fn name(&self) -> &str;

    fn n_subproblems(&self) -> usize;
}
