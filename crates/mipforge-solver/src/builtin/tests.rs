use mipforge_core::{
    Constraint, Numerics, Problem, ProblemSpace, SolOrigin, Solution, SolveStatus, Stage, Var,
    VarId,
};
use mipforge_test::{chain_equality, deterministic_config, infeasible_binary, quiet_config, root_optimal_cover, unbounded_continuous};

use super::*;
use crate::history::BranchingHistory;
use crate::plugin::{BranchCandidate, ConstraintHandler, HeurTiming, Heuristic, NodeSelector};
use crate::primal::{CheckFlags, Violation};
use crate::solver::Solver;
use crate::tree::SearchTree;

fn cand(var: usize, value: f64) -> BranchCandidate {
    BranchCandidate {
        var: VarId(var),
        value,
        frac: value - value.floor(),
    }
}

fn linear_solver(prob: &Problem, config: mipforge_config::SolverConfig) -> Solver {
    let mut solver = Solver::from_problem(prob, config).unwrap();
    solver
        .include_conshdlr(LinearHandler::new())
        .include_conshdlr(IntegralityHandler::new())
        .include_nodeselector(BestFirstSelector::new());
    solver
}

#[test]
fn test_most_fractional_prefers_half() {
    let history = BranchingHistory::new();
    let cands = [cand(0, 0.9), cand(1, 2.5), cand(2, 0.3)];
    assert_eq!(most_fractional(&cands, &history), 1);
}

#[test]
fn test_most_fractional_tie_keeps_first() {
    let history = BranchingHistory::new();
    let cands = [cand(0, 0.5), cand(1, 1.5)];
    assert_eq!(most_fractional(&cands, &history), 0);
}

#[test]
fn test_best_first_picks_lowest_bound() {
    let mut tree = SearchTree::new();
    let root = tree.create_root(0.0);
    tree.focus_node(root);
    let worse = tree.add_child(root, 5.0, 5.0);
    let better = tree.add_child(root, 2.0, 3.0);
    tree.release_focus();

    let mut sel = BestFirstSelector::new();
    assert_eq!(sel.select(&tree), Some(better));
    assert_ne!(sel.select(&tree), Some(worse));
}

#[test]
fn test_depth_first_picks_latest_deepest() {
    let mut tree = SearchTree::new();
    let root = tree.create_root(0.0);
    tree.focus_node(root);
    let _first = tree.add_child(root, 0.0, 0.0);
    let second = tree.add_child(root, 0.0, 0.0);
    tree.release_focus();

    let mut sel = DepthFirstSelector::new();
    assert_eq!(sel.select(&tree), Some(second));
}

#[test]
fn test_linear_check_reports_violated_row() {
    let prob = root_optimal_cover();
    let num = Numerics::default();
    let conss: Vec<_> = prob.conss().map(|(id, _)| id).collect();
    let mut sol = Solution::new(ProblemSpace::Original, SolOrigin::Unknown);
    sol.set_val(VarId(0), 0.0);
    sol.set_val(VarId(1), 0.0);

    let handler = LinearHandler::new();
    let violations = handler.check(&prob, &num, &conss, &sol, &CheckFlags::default());
    assert_eq!(violations.len(), 1);
    assert!(matches!(violations[0], Violation::Constraint { activity, .. } if activity == 0.0));

    sol.set_val(VarId(1), 1.0);
    assert!(handler.check(&prob, &num, &conss, &sol, &CheckFlags::default()).is_empty());
}

#[test]
fn test_integrality_check_flags_fractional_values() {
    let prob = root_optimal_cover();
    let num = Numerics::default();
    let mut sol = Solution::new(ProblemSpace::Original, SolOrigin::Unknown);
    sol.set_val(VarId(0), 0.5);
    sol.set_val(VarId(1), 0.5);

    let handler = IntegralityHandler::new();
    let flags = CheckFlags::completely();
    assert_eq!(handler.check(&prob, &num, &[], &sol, &flags).len(), 2);

    let relaxed = CheckFlags {
        integrality: false,
        ..CheckFlags::default()
    };
    assert!(handler.check(&prob, &num, &[], &sol, &relaxed).is_empty());
}

#[test]
fn test_linear_presolve_detects_infeasible_singleton() {
    let mut solver = linear_solver(&infeasible_binary(), quiet_config());
    solver.presolve().unwrap();
    assert_eq!(solver.status(), SolveStatus::Infeasible);
    assert_eq!(solver.stage(), Stage::Solved);
}

#[test]
fn test_linear_presolve_adds_set_packing_clique() {
    let mut prob = Problem::new("packing");
    let x = prob.add_var(Var::binary("x", -1.0));
    let y = prob.add_var(Var::binary("y", -1.0));
    prob.add_cons(Constraint::linear("pack", &[(x, 1.0), (y, 1.0)], f64::NEG_INFINITY, 1.0));

    let mut solver = linear_solver(&prob, quiet_config());
    solver.presolve().unwrap();
    assert_eq!(solver.stage(), Stage::Presolved);
    assert_eq!(solver.scope().cliques().len(), 1);
}

#[test]
fn test_linear_solves_chain_equality() {
    let mut solver = linear_solver(&chain_equality(), quiet_config());
    assert_eq!(solver.solve().unwrap(), SolveStatus::Optimal);
    assert!((solver.scope().primal_bound() - 1.0).abs() < 1e-6);
}

#[test]
fn test_dualfix_reports_unbounded_without_solution() {
    let mut solver = linear_solver(&unbounded_continuous(), quiet_config());
    solver.include_propagator(DualFixPropagator::new());
    solver.presolve().unwrap();
    assert_eq!(solver.status(), SolveStatus::InfOrUnbd);
}

#[test]
fn test_dualfix_fixes_unconstrained_binary() {
    let mut prob = Problem::new("free");
    prob.add_var(Var::binary("z", 1.0));
    let mut solver = linear_solver(&prob, quiet_config());
    solver.include_propagator(DualFixPropagator::new());
    assert_eq!(solver.solve().unwrap(), SolveStatus::Optimal);
    assert_eq!(solver.scope().primal_bound(), 0.0);
    assert!(solver.scope().stats().presolve_tally.fixed_vars >= 1);
}

#[test]
fn test_trivial_presolver_removes_fixed_variable() {
    let mut prob = Problem::new("fixed");
    prob.add_var(Var::integer("x", 3.0, 3.0, 2.0));
    let mut solver = linear_solver(&prob, quiet_config());
    solver.include_presolver(TrivialPresolver::new());
    assert_eq!(solver.solve().unwrap(), SolveStatus::Optimal);
    assert!((solver.scope().primal_bound() - 6.0).abs() < 1e-9);
}

#[test]
fn test_trivial_heuristic_finds_cover() {
    let mut solver = linear_solver(&root_optimal_cover(), deterministic_config());
    solver.include_heuristic(TrivialHeuristic::new());
    solver.presolve().unwrap();
    assert!(solver.scope().primal().n_sols() >= 1);
    assert!(solver.scope().primal_bound() <= 2.0 + 1e-9);
}

#[test]
fn test_rounding_heuristic_rounds_against_locks() {
    let mut solver = linear_solver(&root_optimal_cover(), deterministic_config());
    solver.transform_problem().unwrap();
    let mut lp = Solution::new(ProblemSpace::Transformed, SolOrigin::Lp);
    lp.set_val(VarId(0), 0.5);
    lp.set_val(VarId(1), 0.5);
    solver.scope_mut().lp_sol = Some(lp);

    let mut heur = RoundingHeuristic::new();
    let result = heur
        .execute(solver.scope_mut(), HeurTiming::AFTER_LP_NODE)
        .unwrap();
    assert!(result.is_success());
    let proposed = solver.scope_mut().take_proposed();
    assert_eq!(proposed.len(), 1);
    assert_eq!(proposed[0].raw_val(VarId(0)), 1.0);
    assert_eq!(proposed[0].raw_val(VarId(1)), 1.0);
}
