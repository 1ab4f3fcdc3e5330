//! Event system for solver monitoring and extensibility.
//!
//! Listeners registered on a [`SolverEventSupport`] are notified about
//! stage transitions, presolving rounds, bound changes, solved nodes,
//! new incumbents and restarts.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use mipforge_core::Stage;
//! use mipforge_solver::event::{SolverEventListener, SolverEventSupport};
//!
//! #[derive(Debug)]
//! struct StageLogger;
//! impl SolverEventListener for StageLogger {
//!     fn on_stage_changed(&self, from: Stage, to: Stage) {
//!         println!("{from} -> {to}");
//!     }
//! }
//!
//! let mut support = SolverEventSupport::new();
//! support.add_listener(Arc::new(StageLogger));
//! assert_eq!(support.listener_count(), 1);
//! ```

use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use mipforge_core::{BoundType, SolveStatus, Solution, Stage, VarId};

use crate::presolve::PresolveTally;
use crate::tree::NodeId;

/// Listener for solver events. Every callback defaults to a no-op.
pub trait SolverEventListener: Send + Sync + Debug {
    /// Called after every stage transition.
    fn on_stage_changed(&self, _from: Stage, _to: Stage) {}

    /// Called after a presolving round with the cumulative tally.
    fn on_presolve_round(&self, _round: u32, _tally: &PresolveTally) {}

    /// Called when a bound of a transformed variable changes.
    ///
    /// `global` is true for changes of the global domain.
    fn on_bound_changed(&self, _var: VarId, _side: BoundType, _old: f64, _new: f64, _global: bool) {}

    /// Called after a node was processed.
    fn on_node_solved(&self, _node: NodeId, _depth: u32, _lower_bound: f64) {}

    /// Called when a solution improves the incumbent.
    ///
    /// `obj` is the objective value in the user's sense.
    fn on_best_solution_found(&self, _obj: f64, _solution: &Solution) {}

    fn on_solving_started(&self) {}

    fn on_solving_ended(&self, _status: SolveStatus) {}

    /// Called before a restart; `run` is the run about to begin.
    fn on_restart(&self, _run: u32) {}
}

/// Central event broadcaster.
///
/// All listener methods are called synchronously in registration order.
#[derive(Default, Clone)]
pub struct SolverEventSupport {
    listeners: Vec<Arc<dyn SolverEventListener>>,
}

impl SolverEventSupport {
    pub fn new() -> Self {
        Self::default()
    }

    // === Listener Registration ===

    pub fn add_listener(&mut self, listener: Arc<dyn SolverEventListener>) {
        self.listeners.push(listener);
    }

    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
    }

    // === Event Firing ===

    pub fn fire_stage_changed(&self, from: Stage, to: Stage) {
        for listener in &self.listeners {
            listener.on_stage_changed(from, to);
        }
    }

    pub fn fire_presolve_round(&self, round: u32, tally: &PresolveTally) {
        for listener in &self.listeners {
            listener.on_presolve_round(round, tally);
        }
    }

    pub fn fire_bound_changed(&self, var: VarId, side: BoundType, old: f64, new: f64, global: bool) {
        for listener in &self.listeners {
            listener.on_bound_changed(var, side, old, new, global);
        }
    }

    pub fn fire_node_solved(&self, node: NodeId, depth: u32, lower_bound: f64) {
        for listener in &self.listeners {
            listener.on_node_solved(node, depth, lower_bound);
        }
    }

    pub fn fire_best_solution_found(&self, obj: f64, solution: &Solution) {
        for listener in &self.listeners {
            listener.on_best_solution_found(obj, solution);
        }
    }

    pub fn fire_solving_started(&self) {
        for listener in &self.listeners {
            listener.on_solving_started();
        }
    }

    pub fn fire_solving_ended(&self, status: SolveStatus) {
        for listener in &self.listeners {
            listener.on_solving_ended(status);
        }
    }

    pub fn fire_restart(&self, run: u32) {
        for listener in &self.listeners {
            listener.on_restart(run);
        }
    }

    // === Query Methods ===

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn has_listeners(&self) -> bool {
        !self.listeners.is_empty()
    }
}

impl Debug for SolverEventSupport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolverEventSupport")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// A listener that forwards events to `tracing`.
#[derive(Debug, Clone, Default)]
pub struct LoggingEventListener {
    prefix: String,
}

impl LoggingEventListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a logging listener with a custom prefix, e.g. an instance name.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl SolverEventListener for LoggingEventListener {
    fn on_stage_changed(&self, from: Stage, to: Stage) {
        tracing::debug!(prefix = %self.prefix, %from, %to, "stage changed");
    }

    fn on_presolve_round(&self, round: u32, tally: &PresolveTally) {
        tracing::debug!(
            prefix = %self.prefix,
            round,
            fixed = tally.fixed_vars,
            aggregated = tally.aggr_vars,
            bounds = tally.chg_bds,
            "presolve round completed"
        );
    }

    fn on_best_solution_found(&self, obj: f64, _solution: &Solution) {
        tracing::info!(prefix = %self.prefix, obj, "new best solution");
    }

    fn on_solving_started(&self) {
        tracing::info!(prefix = %self.prefix, "solving started");
    }

    fn on_solving_ended(&self, status: SolveStatus) {
        tracing::info!(prefix = %self.prefix, %status, "solving ended");
    }

    fn on_restart(&self, run: u32) {
        tracing::info!(prefix = %self.prefix, run, "restart");
    }
}

/// A counting listener that tracks event occurrences.
///
/// Useful for testing and statistics collection.
#[derive(Debug, Default)]
pub struct CountingEventListener {
    stage_changed_count: AtomicUsize,
    presolve_round_count: AtomicUsize,
    bound_changed_count: AtomicUsize,
    node_solved_count: AtomicUsize,
    best_solution_count: AtomicUsize,
    solving_started_count: AtomicUsize,
    solving_ended_count: AtomicUsize,
    restart_count: AtomicUsize,
}

impl CountingEventListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage_changed_count(&self) -> usize {
        self.stage_changed_count.load(Ordering::SeqCst)
    }

    pub fn presolve_round_count(&self) -> usize {
        self.presolve_round_count.load(Ordering::SeqCst)
    }

    pub fn bound_changed_count(&self) -> usize {
        self.bound_changed_count.load(Ordering::SeqCst)
    }

    pub fn node_solved_count(&self) -> usize {
        self.node_solved_count.load(Ordering::SeqCst)
    }

    pub fn best_solution_count(&self) -> usize {
        self.best_solution_count.load(Ordering::SeqCst)
    }

    pub fn solving_started_count(&self) -> usize {
        self.solving_started_count.load(Ordering::SeqCst)
    }

    pub fn solving_ended_count(&self) -> usize {
        self.solving_ended_count.load(Ordering::SeqCst)
    }

    pub fn restart_count(&self) -> usize {
        self.restart_count.load(Ordering::SeqCst)
    }

    /// Resets all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.stage_changed_count,
            &self.presolve_round_count,
            &self.bound_changed_count,
            &self.node_solved_count,
            &self.best_solution_count,
            &self.solving_started_count,
            &self.solving_ended_count,
            &self.restart_count,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }
}

impl SolverEventListener for CountingEventListener {
    fn on_stage_changed(&self, _from: Stage, _to: Stage) {
        self.stage_changed_count.fetch_add(1, Ordering::SeqCst);
    }

    fn on_presolve_round(&self, _round: u32, _tally: &PresolveTally) {
        self.presolve_round_count.fetch_add(1, Ordering::SeqCst);
    }

    fn on_bound_changed(&self, _var: VarId, _side: BoundType, _old: f64, _new: f64, _global: bool) {
        self.bound_changed_count.fetch_add(1, Ordering::SeqCst);
    }

    fn on_node_solved(&self, _node: NodeId, _depth: u32, _lower_bound: f64) {
        self.node_solved_count.fetch_add(1, Ordering::SeqCst);
    }

    fn on_best_solution_found(&self, _obj: f64, _solution: &Solution) {
        self.best_solution_count.fetch_add(1, Ordering::SeqCst);
    }

    fn on_solving_started(&self) {
        self.solving_started_count.fetch_add(1, Ordering::SeqCst);
    }

    fn on_solving_ended(&self, _status: SolveStatus) {
        self.solving_ended_count.fetch_add(1, Ordering::SeqCst);
    }

    fn on_restart(&self, _run: u32) {
        self.restart_count.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
