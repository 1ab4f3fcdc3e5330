//! Count and gap limits.

use mipforge_core::SolveStatus;

use super::Termination;
use crate::scope::SolverScope;

/// Stops after a number of nodes in the current run.
#[derive(Debug, Clone)]
pub struct NodeTermination {
    limit: u64,
}

impl NodeTermination {
    pub fn new(limit: u64) -> Self {
        Self { limit }
    }
}

impl Termination for NodeTermination {
    fn check(&self, scope: &SolverScope) -> Option<SolveStatus> {
        (scope.stats().nnodes >= self.limit).then_some(SolveStatus::NodeLimit)
    }
}

/// Stops after a number of nodes over all runs.
#[derive(Debug, Clone)]
pub struct TotalNodeTermination {
    limit: u64,
}

impl TotalNodeTermination {
    pub fn new(limit: u64) -> Self {
        Self { limit }
    }
}

impl Termination for TotalNodeTermination {
    fn check(&self, scope: &SolverScope) -> Option<SolveStatus> {
        (scope.stats().ntotalnodes >= self.limit).then_some(SolveStatus::TotalNodeLimit)
    }
}

/// Stops once the given number of solutions was found.
#[derive(Debug, Clone)]
pub struct SolutionTermination {
    limit: u64,
}

impl SolutionTermination {
    pub fn new(limit: u64) -> Self {
        Self { limit }
    }
}

impl Termination for SolutionTermination {
    fn check(&self, scope: &SolverScope) -> Option<SolveStatus> {
        (scope.primal().nsols_found() >= self.limit).then_some(SolveStatus::SolLimit)
    }
}

/// Stops once the incumbent improved the given number of times.
#[derive(Debug, Clone)]
pub struct BestSolutionTermination {
    limit: u64,
}

impl BestSolutionTermination {
    pub fn new(limit: u64) -> Self {
        Self { limit }
    }
}

impl Termination for BestSolutionTermination {
    fn check(&self, scope: &SolverScope) -> Option<SolveStatus> {
        (scope.primal().nbest_found() >= self.limit).then_some(SolveStatus::BestSolLimit)
    }
}

/// Stops when the relative primal-dual gap drops to the limit.
#[derive(Debug, Clone)]
pub struct GapTermination {
    limit: f64,
}

impl GapTermination {
    pub fn new(limit: f64) -> Self {
        Self { limit }
    }
}

impl Termination for GapTermination {
    fn check(&self, scope: &SolverScope) -> Option<SolveStatus> {
        if scope.primal().nsols_found() == 0 {
            return None;
        }
        (scope.gap() <= self.limit).then_some(SolveStatus::GapLimit)
    }
}

/// Stops when the estimated memory use exceeds a limit in megabytes.
#[derive(Debug, Clone)]
pub struct MemoryTermination {
    limit_mb: u64,
}

impl MemoryTermination {
    pub fn new(limit_mb: u64) -> Self {
        Self { limit_mb }
    }
}

impl Termination for MemoryTermination {
    fn check(&self, scope: &SolverScope) -> Option<SolveStatus> {
        let mb = scope.memory_estimate() as u64 / (1024 * 1024);
        (mb >= self.limit_mb).then_some(SolveStatus::MemLimit)
    }
}
