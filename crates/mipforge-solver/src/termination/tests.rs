use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mipforge_core::SolveStatus;
use mipforge_test::deterministic_config;

use super::*;
use crate::scope::SolverScope;

fn scope() -> SolverScope {
    SolverScope::new("t", deterministic_config())
}

#[test]
fn test_node_termination() {
    let mut scope = scope();
    let term = NodeTermination::new(3);
    scope.stats.nnodes = 2;
    assert_eq!(term.check(&scope), None);
    scope.stats.nnodes = 3;
    assert_eq!(term.check(&scope), Some(SolveStatus::NodeLimit));
}

#[test]
fn test_total_node_termination_counts_all_runs() {
    let mut scope = scope();
    let term = TotalNodeTermination::new(5);
    scope.stats.nnodes = 1;
    scope.stats.ntotalnodes = 5;
    assert_eq!(term.check(&scope), Some(SolveStatus::TotalNodeLimit));
}

#[test]
fn test_solution_terminations_without_solutions() {
    let scope = scope();
    assert_eq!(SolutionTermination::new(1).check(&scope), None);
    assert_eq!(BestSolutionTermination::new(1).check(&scope), None);
    assert_eq!(GapTermination::new(1.0).check(&scope), None);
}

#[test]
fn test_time_termination_zero_limit_fires() {
    let scope = scope();
    assert_eq!(
        TimeTermination::new(Duration::ZERO).check(&scope),
        Some(SolveStatus::TimeLimit)
    );
    assert_eq!(TimeTermination::seconds(3600).check(&scope), None);
}

#[test]
fn test_external_termination_follows_flag() {
    let scope = scope();
    let flag = Arc::new(AtomicBool::new(false));
    let term = ExternalTermination::new(flag.clone());
    assert_eq!(term.check(&scope), None);
    flag.store(true, Ordering::SeqCst);
    assert_eq!(term.check(&scope), Some(SolveStatus::UserInterrupt));
}

#[test]
fn test_or_termination_first_firing_child_wins() {
    let mut scope = scope();
    scope.stats.nnodes = 10;
    let term = OrTermination((TimeTermination::seconds(3600), NodeTermination::new(10)));
    assert_eq!(term.check(&scope), Some(SolveStatus::NodeLimit));
}

#[test]
fn test_and_termination_needs_every_child() {
    let mut scope = scope();
    scope.stats.nnodes = 10;
    let both = AndTermination((NodeTermination::new(10), TotalNodeTermination::new(100)));
    assert_eq!(both.check(&scope), None);
    scope.stats.ntotalnodes = 100;
    assert_eq!(both.check(&scope), Some(SolveStatus::NodeLimit));
}

#[test]
fn test_scope_interrupt_precedes_limits() {
    let mut scope = scope();
    scope.add_termination(Box::new(NodeTermination::new(0)));
    assert_eq!(scope.check_stop(), Some(SolveStatus::NodeLimit));
    scope.interrupt_handle().store(true, Ordering::SeqCst);
    assert_eq!(scope.check_stop(), Some(SolveStatus::UserInterrupt));
}
