//! Tests for the event system.

use std::sync::Mutex;

use mipforge_core::{ProblemSpace, SolOrigin};

use super::*;

#[test]
fn test_event_support_new() {
    let support = SolverEventSupport::new();

    assert_eq!(support.listener_count(), 0);
    assert!(!support.has_listeners());
}

#[test]
fn test_event_support_fire_events() {
    let mut support = SolverEventSupport::new();
    let listener = Arc::new(CountingEventListener::new());
    support.add_listener(listener.clone());

    let solution = Solution::new(ProblemSpace::Transformed, SolOrigin::Lp);

    support.fire_solving_started();
    support.fire_stage_changed(Stage::Presolved, Stage::InitSolve);
    support.fire_presolve_round(1, &PresolveTally::default());
    support.fire_bound_changed(VarId(0), BoundType::Lower, 0.0, 1.0, true);
    support.fire_node_solved(NodeId(0), 0, 1.0);
    support.fire_best_solution_found(1.0, &solution);
    support.fire_restart(2);
    support.fire_solving_ended(SolveStatus::Optimal);

    assert_eq!(listener.solving_started_count(), 1);
    assert_eq!(listener.stage_changed_count(), 1);
    assert_eq!(listener.presolve_round_count(), 1);
    assert_eq!(listener.bound_changed_count(), 1);
    assert_eq!(listener.node_solved_count(), 1);
    assert_eq!(listener.best_solution_count(), 1);
    assert_eq!(listener.restart_count(), 1);
    assert_eq!(listener.solving_ended_count(), 1);
}

#[test]
fn test_event_support_clear_listeners() {
    let mut support = SolverEventSupport::new();
    support.add_listener(Arc::new(CountingEventListener::new()));
    assert!(support.has_listeners());

    support.clear_listeners();

    assert!(!support.has_listeners());
    assert_eq!(support.listener_count(), 0);
}

#[test]
fn test_counting_listener_reset() {
    let listener = CountingEventListener::new();
    listener.best_solution_count.store(5, Ordering::SeqCst);
    listener.stage_changed_count.store(3, Ordering::SeqCst);

    listener.reset();

    assert_eq!(listener.best_solution_count(), 0);
    assert_eq!(listener.stage_changed_count(), 0);
}

#[test]
fn test_logging_listener_creation() {
    let listener = LoggingEventListener::new();
    assert_eq!(listener.prefix, "");

    let listener_with_prefix = LoggingEventListener::with_prefix("[worker 1] ");
    assert_eq!(listener_with_prefix.prefix, "[worker 1] ");
}

#[test]
fn test_event_support_debug() {
    let support = SolverEventSupport::new();
    let debug = format!("{:?}", support);

    assert!(debug.contains("SolverEventSupport"));
    assert!(debug.contains("listeners"));
}

#[derive(Debug, Default)]
struct StageRecorder {
    seen: Mutex<Vec<Stage>>,
}

impl SolverEventListener for StageRecorder {
    fn on_stage_changed(&self, _from: Stage, to: Stage) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(to);
        }
    }
}

#[test]
fn test_listeners_called_in_registration_order() {
    let mut support = SolverEventSupport::new();
    let first = Arc::new(StageRecorder::default());
    let second = Arc::new(CountingEventListener::new());
    support.add_listener(first.clone());
    support.add_listener(second.clone());

    support.fire_stage_changed(Stage::Problem, Stage::Transforming);
    support.fire_stage_changed(Stage::Transforming, Stage::Transformed);

    assert_eq!(
        *first.seen.lock().unwrap(),
        vec![Stage::Transforming, Stage::Transformed]
    );
    assert_eq!(second.stage_changed_count(), 2);
}
