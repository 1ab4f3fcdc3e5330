//! External termination via a shared `AtomicBool` flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mipforge_core::SolveStatus;

use super::Termination;
use crate::scope::SolverScope;

/// Stops with `UserInterrupt` once the shared flag is set.
///
/// # Example
///
/// ```
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use mipforge_solver::termination::ExternalTermination;
///
/// let flag = Arc::new(AtomicBool::new(false));
/// let term = ExternalTermination::new(flag.clone());
///
/// // Later, from another thread:
/// flag.store(true, Ordering::SeqCst);
/// ```
#[derive(Debug, Clone)]
pub struct ExternalTermination {
    flag: Arc<AtomicBool>,
}

impl ExternalTermination {
    pub fn new(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }
}

impl Termination for ExternalTermination {
    fn check(&self, _scope: &SolverScope) -> Option<SolveStatus> {
        self.flag
            .load(Ordering::Relaxed)
            .then_some(SolveStatus::UserInterrupt)
    }
}
