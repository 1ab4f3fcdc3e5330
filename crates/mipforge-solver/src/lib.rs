//! MipForge Solver - the branch-and-bound solving core
//!
//! This crate provides:
//! - [`Solver`], the stage machine driving transformation, presolving and search
//! - The presolving round driver with timing tiers
//! - Bound, fixing and aggregation operations on the working problem
//! - The search tree with probing and the node processing loop
//! - Primal solution store with cutoff maintenance
//! - Plugin contracts and bundled plugins
//! - Events, statistics and termination predicates
//! - Reoptimization across runs and the concurrent driver

pub mod builtin;
pub mod clique;
pub mod concurrent;
pub mod event;
pub mod history;
pub mod lp;
pub mod plugin;
pub mod presolve;
pub mod primal;
pub mod reopt;
pub mod scope;
pub mod solver;
pub mod stats;
pub mod termination;
pub mod tree;

mod bnb;
mod solve;
mod transform;

pub use concurrent::{ConcurrentResult, ConcurrentSolver, SyncSnapshot};
pub use event::{CountingEventListener, LoggingEventListener, SolverEventListener, SolverEventSupport};
pub use history::{BranchDir, BranchingHistory, PseudoCost};
pub use lp::{Cut, LpOracle, LpRequest, LpResult, LpStatus, MicroLpOracle};
pub use plugin::{
    BendersDecomposition, BranchCandidate, BranchRule, ConstraintHandler, HeurTiming, Heuristic,
    NodeSelector, PluginSet, Presolver, Pricer, Propagator, Separator,
};
pub use presolve::{PresolveContext, PresolveTally, PresolveTiming, TimingMask};
pub use primal::{Admission, CheckFlags, CheckReport, PrimalStore, Violation};
pub use reopt::{ReoptStore, SavedNode, SavedRun};
pub use scope::{AggrOutcome, BoundOutcome, SolverScope};
pub use solver::Solver;
pub use stats::{SolveReport, SolverStats};
pub use termination::{
    AndTermination, BestSolutionTermination, ExternalTermination, GapTermination,
    MemoryTermination, NodeTermination, OrTermination, SolutionTermination, Termination,
    TimeTermination, TotalNodeTermination,
};
pub use tree::{BoundChange, Node, NodeId, NodeKind, Provenance, SearchTree};
