//! Stop predicates polled at solving checkpoints.

mod composite;
mod external;
mod limits;
mod time;

use std::fmt::Debug;

use mipforge_core::SolveStatus;

use crate::scope::SolverScope;

pub use composite::{AndTermination, OrTermination};
pub use external::ExternalTermination;
pub use limits::{
    BestSolutionTermination, GapTermination, MemoryTermination, NodeTermination,
    SolutionTermination, TotalNodeTermination,
};
pub use time::TimeTermination;

/// Decides whether solving should stop at a checkpoint.
///
/// Returns the limit status to report, `None` to continue.
pub trait Termination: Send + Debug {
    fn check(&self, scope: &SolverScope) -> Option<SolveStatus>;
}

impl<T: Termination + ?Sized> Termination for Box<T> {
    fn check(&self, scope: &SolverScope) -> Option<SolveStatus> {
        (**self).check(scope)
    }
}

#[cfg(test)]
mod tests;
