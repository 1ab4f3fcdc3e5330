//! Solve status and plugin result codes.

use std::fmt;

/// Terminal (or current) status of a solve.
///
/// Limits, infeasibility and unboundedness are outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolveStatus {
    /// Nothing is known yet.
    #[default]
    Unknown,
    /// The user interrupted the solve.
    UserInterrupt,
    /// Node limit of the current run reached.
    NodeLimit,
    /// Node limit over all runs reached.
    TotalNodeLimit,
    /// Time limit reached.
    TimeLimit,
    /// Memory limit reached.
    MemLimit,
    /// Relative gap limit reached.
    GapLimit,
    /// Limit on the number of found solutions reached.
    SolLimit,
    /// Limit on the number of improving solutions reached.
    BestSolLimit,
    /// Restart limit reached.
    RestartLimit,
    /// An optimal solution was found and proven.
    Optimal,
    /// The problem was proven infeasible.
    Infeasible,
    /// The problem was proven unbounded.
    Unbounded,
    /// The problem is infeasible or unbounded.
    InfOrUnbd,
    /// Solving was terminated from outside the limit system.
    Terminate,
}

impl SolveStatus {
    /// Returns true if this status ends the solve.
    pub fn is_terminal(self) -> bool {
        !matches!(self, SolveStatus::Unknown)
    }

    /// Returns true if this status is a mathematical proof rather than a limit.
    pub fn is_proven(self) -> bool {
        matches!(
            self,
            SolveStatus::Optimal
                | SolveStatus::Infeasible
                | SolveStatus::Unbounded
                | SolveStatus::InfOrUnbd
        )
    }

    /// Returns true if this status was caused by a limit or interrupt.
    pub fn is_limit(self) -> bool {
        self.is_terminal() && !self.is_proven()
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SolveStatus::Unknown => "unknown",
            SolveStatus::UserInterrupt => "user interrupt",
            SolveStatus::NodeLimit => "node limit reached",
            SolveStatus::TotalNodeLimit => "total node limit reached",
            SolveStatus::TimeLimit => "time limit reached",
            SolveStatus::MemLimit => "memory limit reached",
            SolveStatus::GapLimit => "gap limit reached",
            SolveStatus::SolLimit => "solution limit reached",
            SolveStatus::BestSolLimit => "solution improvement limit reached",
            SolveStatus::RestartLimit => "restart limit reached",
            SolveStatus::Optimal => "optimal solution found",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Unbounded => "unbounded",
            SolveStatus::InfOrUnbd => "infeasible or unbounded",
            SolveStatus::Terminate => "terminated",
        };
        f.write_str(text)
    }
}

/// Result code returned by plugin callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginResult {
    DidNotRun,
    DidNotFind,
    Feasible,
    Infeasible,
    Cutoff,
    Unbounded,
    Success,
    ConsAdded,
    ReducedDom,
    Separated,
    NewRound,
    Delayed,
}

impl PluginResult {
    /// Returns true if the result ends a presolving round or a node.
    pub fn is_abnormal(self) -> bool {
        matches!(
            self,
            PluginResult::Cutoff | PluginResult::Infeasible | PluginResult::Unbounded
        )
    }

    /// Returns true if the plugin reports infeasibility of the current domain.
    pub fn is_cutoff(self) -> bool {
        matches!(self, PluginResult::Cutoff | PluginResult::Infeasible)
    }

    /// Returns true if the plugin found something.
    pub fn is_success(self) -> bool {
        matches!(
            self,
            PluginResult::Success
                | PluginResult::ConsAdded
                | PluginResult::ReducedDom
                | PluginResult::Separated
                | PluginResult::NewRound
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classes() {
        assert!(!SolveStatus::Unknown.is_terminal());
        assert!(SolveStatus::Optimal.is_proven());
        assert!(SolveStatus::TimeLimit.is_limit());
        assert!(!SolveStatus::InfOrUnbd.is_limit());
    }

    #[test]
    fn test_plugin_result_classes() {
        assert!(PluginResult::Cutoff.is_abnormal());
        assert!(PluginResult::Unbounded.is_abnormal());
        assert!(!PluginResult::Unbounded.is_cutoff());
        assert!(PluginResult::ReducedDom.is_success());
        assert!(!PluginResult::DidNotFind.is_success());
    }
}
