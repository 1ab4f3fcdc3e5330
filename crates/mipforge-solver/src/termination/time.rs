//! Time-based termination.

use std::time::Duration;

use mipforge_core::SolveStatus;

use super::Termination;
use crate::scope::SolverScope;

/// Stops after the presolving plus solving clocks exceed a limit.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use mipforge_solver::termination::TimeTermination;
///
/// let term = TimeTermination::new(Duration::from_secs(30));
/// let term = TimeTermination::seconds(30);
/// let term = TimeTermination::millis(500);
/// ```
#[derive(Debug, Clone)]
pub struct TimeTermination {
    limit: Duration,
}

impl TimeTermination {
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }

    pub fn millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn seconds(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }
}

impl Termination for TimeTermination {
    fn check(&self, scope: &SolverScope) -> Option<SolveStatus> {
        (scope.elapsed() >= self.limit).then_some(SolveStatus::TimeLimit)
    }
}
