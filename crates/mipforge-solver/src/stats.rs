//! Solver statistics.
//!
//! Plain counters and clocks for runs, nodes, LP solves and presolving.

use std::time::{Duration, Instant};

use mipforge_core::SolveStatus;
use serde::Serialize;

use crate::presolve::{PresolveTally, PresolveTiming};

/// Solver-level statistics.
///
/// Counters of the current run are reset by [`SolverStats::reset_run`];
/// totals survive restarts.
///
/// # Example
///
/// ```
/// use mipforge_solver::stats::SolverStats;
///
/// let mut stats = SolverStats::default();
/// stats.record_node(0);
/// stats.record_node(3);
/// stats.record_lp(12);
///
/// assert_eq!(stats.nnodes, 2);
/// assert_eq!(stats.max_depth, 3);
/// assert_eq!(stats.nlpiterations, 12);
/// ```
#[derive(Debug, Default, Clone)]
pub struct SolverStats {
    presolve_start: Option<Instant>,
    presolve_time: Duration,
    solve_start: Option<Instant>,
    solve_time: Duration,
    /// Number of runs started (restarts included).
    pub nruns: u32,
    /// Nodes processed in the current run.
    pub nnodes: u64,
    /// Nodes processed over all runs.
    pub ntotalnodes: u64,
    pub nlps: u64,
    pub nlpiterations: u64,
    pub nlperrors: u64,
    /// Presolving rounds of the current presolving phase.
    pub npresolrounds: u32,
    /// Round primitive calls per timing tier.
    pub npresolrounds_tier: [u32; 4],
    /// Cumulative reductions of the current presolving phase.
    pub presolve_tally: PresolveTally,
    /// Snapshot taken at the start of the current outer round.
    pub last_round: PresolveTally,
    /// Integer variables globally fixed at the root in this run.
    pub nrootintfixings_run: u64,
    pub nseparounds: u64,
    pub ncutsapplied: u64,
    /// Nodes left unresolved after an LP error.
    pub nunresolved: u64,
    pub max_depth: u32,
    pub nrestarts: u32,
    pub integral: PrimalDualIntegral,
}

impl SolverStats {
    pub fn start_presolve(&mut self) {
        self.presolve_start = Some(Instant::now());
    }

    pub fn stop_presolve(&mut self) {
        if let Some(start) = self.presolve_start.take() {
            self.presolve_time += start.elapsed();
        }
    }

    pub fn start_solve(&mut self) {
        self.solve_start = Some(Instant::now());
    }

    pub fn stop_solve(&mut self) {
        if let Some(start) = self.solve_start.take() {
            self.solve_time += start.elapsed();
        }
    }

    /// Total presolving time, including a running clock.
    pub fn presolve_time(&self) -> Duration {
        self.presolve_time + self.presolve_start.map(|t| t.elapsed()).unwrap_or_default()
    }

    /// Total solving time, including a running clock.
    pub fn solve_time(&self) -> Duration {
        self.solve_time + self.solve_start.map(|t| t.elapsed()).unwrap_or_default()
    }

    /// Records a processed node at the given depth.
    pub fn record_node(&mut self, depth: u32) {
        self.nnodes += 1;
        self.ntotalnodes += 1;
        self.max_depth = self.max_depth.max(depth);
    }

    /// Records an LP solve.
    pub fn record_lp(&mut self, iterations: u64) {
        self.nlps += 1;
        self.nlpiterations += iterations;
    }

    pub fn record_lp_error(&mut self) {
        self.nlperrors += 1;
    }

    /// Records a call of the round primitive at `timing`.
    pub fn record_presolve_round(&mut self, timing: PresolveTiming) {
        self.npresolrounds_tier[timing.index()] += 1;
    }

    pub fn record_root_int_fixing(&mut self) {
        self.nrootintfixings_run += 1;
    }

    pub fn record_separation_round(&mut self, ncuts: usize) {
        self.nseparounds += 1;
        self.ncutsapplied += ncuts as u64;
    }

    pub fn record_unresolved(&mut self) {
        self.nunresolved += 1;
    }

    /// Resets the counters of the current run.
    pub fn reset_run(&mut self) {
        self.nnodes = 0;
        self.nrootintfixings_run = 0;
        self.max_depth = 0;
        self.nunresolved = 0;
    }

    /// Resets the counters of a presolving phase.
    pub fn reset_presolve(&mut self) {
        self.npresolrounds = 0;
        self.npresolrounds_tier = [0; 4];
        self.presolve_tally = PresolveTally::default();
        self.last_round = PresolveTally::default();
    }
}

/// Relative gap between a primal and a dual bound.
///
/// One if either bound is infinite or they have different signs, zero if
/// they coincide.
pub fn relative_gap(primal: f64, dual: f64, infinity: f64) -> f64 {
    if primal.abs() >= infinity || dual.abs() >= infinity {
        return 1.0;
    }
    if primal == dual {
        return 0.0;
    }
    if primal * dual < 0.0 {
        return 1.0;
    }
    let denom = primal.abs().max(dual.abs());
    if denom == 0.0 {
        0.0
    } else {
        ((primal - dual).abs() / denom).min(1.0)
    }
}

/// Area under the relative gap curve over solving time.
#[derive(Debug, Clone, Default)]
pub struct PrimalDualIntegral {
    last_time: Option<Instant>,
    last_gap: f64,
    value: f64,
}

impl PrimalDualIntegral {
    /// Starts integrating with the gap of the current bounds.
    pub fn start(&mut self, primal: f64, dual: f64, infinity: f64) {
        self.last_time = Some(Instant::now());
        self.last_gap = relative_gap(primal, dual, infinity);
    }

    /// Adds the area since the previous update and records the new gap.
    pub fn update(&mut self, primal: f64, dual: f64, infinity: f64) {
        let now = Instant::now();
        if let Some(last) = self.last_time {
            self.value += self.last_gap * now.duration_since(last).as_secs_f64();
        }
        self.last_time = Some(now);
        self.last_gap = relative_gap(primal, dual, infinity);
    }

    /// Integral value in gap-seconds.
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn last_gap(&self) -> f64 {
        self.last_gap
    }
}

/// Summary of a finished `solve` call.
#[derive(Debug, Clone, Serialize)]
pub struct SolveReport {
    pub status: SolveStatus,
    /// Best objective in the user's sense.
    pub primal_bound: f64,
    pub dual_bound: f64,
    pub gap: f64,
    pub nruns: u32,
    pub nnodes: u64,
    pub ntotalnodes: u64,
    pub nsols: u64,
    pub nbestsols: u64,
    pub nlps: u64,
    pub nlpiterations: u64,
    pub npresolrounds: u32,
    pub presolve_seconds: f64,
    pub solve_seconds: f64,
    pub primal_dual_integral: f64,
}
