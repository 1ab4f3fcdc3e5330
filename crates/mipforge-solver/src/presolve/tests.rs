use std::sync::{Arc, Mutex};

use mipforge_core::{BoundType, ConsId, Numerics, PluginResult, Problem, Result, Solution, SolveStatus, Stage, Var};
use mipforge_test::quiet_config;

use super::round::Step;
use super::*;
use crate::builtin::BestFirstSelector;
use crate::plugin::{ConstraintHandler, Presolver, Propagator};
use crate::primal::{CheckFlags, Violation};
use crate::scope::SolverScope;
use crate::solver::Solver;

type Log = Arc<Mutex<Vec<String>>>;

#[derive(Debug)]
struct RecPresolver {
    name: &'static str,
    priority: i32,
    result: PluginResult,
    log: Log,
}

impl Presolver for RecPresolver {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn execute(&mut self, _scope: &mut SolverScope, _ctx: &mut PresolveContext) -> Result<PluginResult> {
        self.log.lock().unwrap().push(self.name.to_string());
        Ok(self.result)
    }
}

#[derive(Debug)]
struct RecPropagator {
    name: &'static str,
    priority: i32,
    log: Log,
}

impl Propagator for RecPropagator {
    fn name(&self) -> &str {
        self.name
    }

    fn presol_priority(&self) -> i32 {
        self.priority
    }

    fn presol_timing(&self) -> TimingMask {
        TimingMask::FAST
    }

    fn presolve(&mut self, _scope: &mut SolverScope, _ctx: &mut PresolveContext) -> Result<PluginResult> {
        self.log.lock().unwrap().push(self.name.to_string());
        Ok(PluginResult::DidNotFind)
    }

    fn propagate(&mut self, _scope: &mut SolverScope) -> Result<PluginResult> {
        Ok(PluginResult::DidNotRun)
    }
}

#[derive(Debug)]
struct RecHandler {
    log: Log,
}

impl ConstraintHandler for RecHandler {
    fn name(&self) -> &str {
        "recorder"
    }

    fn needs_constraints(&self) -> bool {
        false
    }

    fn check(&self, _: &Problem, _: &Numerics, _: &[ConsId], _: &Solution, _: &CheckFlags) -> Vec<Violation> {
        Vec::new()
    }

    fn presolve(&mut self, _scope: &mut SolverScope, _conss: &[ConsId], _ctx: &mut PresolveContext) -> Result<PluginResult> {
        self.log.lock().unwrap().push("handler".to_string());
        Ok(PluginResult::DidNotFind)
    }
}

fn one_var_solver(config: mipforge_config::SolverConfig) -> Solver {
    let mut prob = Problem::new("one");
    prob.add_var(Var::continuous("x", 0.0, 1.0, 0.0));
    let mut solver = Solver::from_problem(&prob, config).unwrap();
    solver.include_nodeselector(BestFirstSelector::new());
    solver
}

fn presolver(name: &'static str, priority: i32, log: &Log) -> RecPresolver {
    RecPresolver {
        name,
        priority,
        result: PluginResult::DidNotFind,
        log: log.clone(),
    }
}

fn propagator(name: &'static str, priority: i32, log: &Log) -> RecPropagator {
    RecPropagator {
        name,
        priority,
        log: log.clone(),
    }
}

fn recorded(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[test]
fn test_steps_merge_by_priority_with_propagator_first_on_ties() {
    let log = Log::default();
    let mut solver = one_var_solver(quiet_config());
    solver
        .include_presolver(presolver("pre10", 10, &log))
        .include_presolver(presolver("pre5", 5, &log))
        .include_presolver(presolver("pre_neg", -1, &log))
        .include_propagator(propagator("prop10", 10, &log))
        .include_propagator(propagator("prop7", 7, &log));

    let steps: Vec<Step> = solver.presolve_steps().into_iter().map(|(_, s)| s).collect();
    assert_eq!(
        steps,
        vec![
            Step::Propagator(0),
            Step::Presolver(0),
            Step::Propagator(1),
            Step::Presolver(1),
            Step::Presolver(2),
        ]
    );
}

#[test]
fn test_round_runs_handlers_between_priority_groups() {
    let log = Log::default();
    let mut solver = one_var_solver(quiet_config());
    solver
        .include_presolver(presolver("pre_neg", -5, &log))
        .include_presolver(presolver("pre", 5, &log))
        .include_propagator(propagator("prop", 5, &log))
        .include_conshdlr(RecHandler { log: log.clone() });

    solver.presolve().unwrap();
    assert_eq!(solver.stage(), Stage::Presolved);
    assert_eq!(recorded(&log), vec!["prop", "pre", "handler", "pre_neg"]);
}

#[test]
fn test_idle_round_escalates_through_tiers() {
    let log = Log::default();
    let mut solver = one_var_solver(quiet_config());
    solver.include_presolver(presolver("pre", 0, &log));
    solver.presolve().unwrap();

    let stats = solver.scope().stats();
    assert_eq!(stats.npresolrounds, 2);
    assert_eq!(stats.npresolrounds_tier, [1, 1, 1, 1]);
    // fast-only presolver runs once, in the first tier
    assert_eq!(recorded(&log).len(), 1);
}

#[test]
fn test_cutoff_short_circuits_round() {
    let log = Log::default();
    let mut solver = one_var_solver(quiet_config());
    solver
        .include_presolver(RecPresolver {
            name: "cutoff",
            priority: 10,
            result: PluginResult::Cutoff,
            log: log.clone(),
        })
        .include_presolver(presolver("later", 0, &log));

    solver.presolve().unwrap();
    assert_eq!(recorded(&log), vec!["cutoff"]);
    assert_eq!(solver.status(), SolveStatus::Infeasible);
    assert_eq!(solver.stage(), Stage::Solved);
}

#[test]
fn test_unbounded_without_solution_is_inf_or_unbd() {
    let log = Log::default();
    let mut solver = one_var_solver(quiet_config());
    solver.include_presolver(RecPresolver {
        name: "unbounded",
        priority: 0,
        result: PluginResult::Unbounded,
        log: log.clone(),
    });
    solver.presolve().unwrap();
    assert_eq!(solver.status(), SolveStatus::InfOrUnbd);
}

#[test]
fn test_round_limit_zero_runs_nothing() {
    let log = Log::default();
    let mut solver = one_var_solver(quiet_config().with_max_presolve_rounds(0));
    solver.include_presolver(presolver("pre", 0, &log));
    solver.presolve().unwrap();
    assert!(recorded(&log).is_empty());
    assert_eq!(solver.stage(), Stage::Presolved);
    assert_eq!(solver.scope().stats().npresolrounds, 0);
}

#[test]
fn test_disabled_presolving_skips_plugins() {
    let log = Log::default();
    let mut config = quiet_config();
    config.presolving.enabled = false;
    let mut solver = one_var_solver(config);
    solver.include_presolver(presolver("pre", 0, &log));
    solver.presolve().unwrap();
    assert!(recorded(&log).is_empty());
    assert_eq!(solver.stage(), Stage::Presolved);
}

#[test]
fn test_presolve_is_idempotent_once_presolved() {
    let log = Log::default();
    let mut solver = one_var_solver(quiet_config());
    solver.include_presolver(presolver("pre", 0, &log));
    solver.presolve().unwrap();
    solver.presolve().unwrap();
    assert_eq!(recorded(&log).len(), 1);
    assert_eq!(solver.scope().stats().nruns, 1);
}

#[test]
fn test_tally_finished_threshold() {
    let last = PresolveTally::default();
    let few = PresolveTally {
        fixed_vars: 1,
        ..PresolveTally::default()
    };
    let many = PresolveTally {
        fixed_vars: 50,
        ..PresolveTally::default()
    };
    assert!(few.is_finished_since(&last, 0.0008, 10_000, 100));
    assert!(!many.is_finished_since(&last, 0.0008, 10_000, 100));
    assert!(PresolveTally::default().is_empty());
    assert_eq!((many - few).fixed_vars, 49);
}

#[test]
fn test_timing_mask_contains() {
    let mask = TimingMask::FAST.union(TimingMask::EXHAUSTIVE);
    assert!(mask.contains(PresolveTiming::Fast));
    assert!(!mask.contains(PresolveTiming::Medium));
    assert!(mask.contains(PresolveTiming::Exhaustive));
    assert!(TimingMask::ALWAYS.contains(PresolveTiming::Final));
    assert_eq!(PresolveTiming::Final.next(), None);
}

/// Raises the lower bound of the first variable to 0.5.
#[derive(Debug)]
struct RaiseFirstLb;

impl Presolver for RaiseFirstLb {
    fn name(&self) -> &str {
        "raise_first_lb"
    }

    fn execute(&mut self, scope: &mut SolverScope, ctx: &mut PresolveContext) -> Result<PluginResult> {
        let Some(&x) = scope.prob().active_vars().first() else {
            return Ok(PluginResult::DidNotRun);
        };
        if scope.tighten_var_lb(x, 0.5, false)?.changed {
            ctx.tally.chg_bds += 1;
            return Ok(PluginResult::Success);
        }
        Ok(PluginResult::DidNotFind)
    }
}

#[test]
fn test_presolve_bound_changes_reach_root_log() {
    let mut solver = one_var_solver(quiet_config());
    solver.include_presolver(RaiseFirstLb);
    solver.presolve().unwrap();
    assert_eq!(solver.stage(), Stage::Presolved);
    assert_eq!(solver.scope().tree().n_pending_root_changes(), 1);

    solver.init_solve().unwrap();
    let tree = solver.scope().tree();
    assert_eq!(tree.n_pending_root_changes(), 0);
    let root = tree.root().unwrap();
    let changes = &tree.node(root).changes;
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].side, BoundType::Lower);
    assert_eq!(changes[0].value, 0.5);
}
