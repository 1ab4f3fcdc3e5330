//! Tests for the solver context: bound dispatch, probing and presolving
//! reductions.

use mipforge_config::SolverConfig;
use mipforge_core::{Constraint, MipError, Stage, Var, VarId, VarStatus, VarType};

use super::*;
use crate::tree::Provenance;

/// x, y integer in [0, 10] and z continuous in [0, 10].
fn scope_with_vars() -> (SolverScope, VarId, VarId, VarId) {
    let mut scope = SolverScope::new("scope", SolverConfig::default().with_random_seed(3));
    let x = scope.add_var(Var::integer("x", 0.0, 10.0, 1.0)).unwrap();
    let y = scope.add_var(Var::integer("y", 0.0, 10.0, 2.0)).unwrap();
    let z = scope.add_var(Var::continuous("z", 0.0, 10.0, 1.0)).unwrap();
    (scope, x, y, z)
}

fn enter(scope: &mut SolverScope, stage: Stage) {
    if scope.transformed.is_none() {
        let num = *scope.numerics();
        let trans = scope.original.transform(&num);
        scope.transformed = Some(trans);
    }
    scope.stage = stage;
}

/// Focused root plus a focused child at depth one.
fn focus_child(scope: &mut SolverScope) -> crate::tree::NodeId {
    let root = scope.tree.create_root(0.0);
    scope.tree.focus_node(root);
    let child = scope.tree.add_child(root, 0.0, 0.0);
    scope.tree.focus_node(child);
    child
}

fn local(scope: &SolverScope, var: VarId) -> (f64, f64) {
    let v = scope.prob().var(var);
    (v.llb, v.lub)
}

fn global(scope: &SolverScope, var: VarId) -> (f64, f64) {
    let v = scope.prob().var(var);
    (v.glb, v.gub)
}

// ============================================================================
// Bound Dispatch Tests
// ============================================================================

#[test]
fn test_problem_stage_changes_original_bounds() {
    let (mut scope, x, _, _) = scope_with_vars();

    let out = scope.chg_var_ub(x, 4.6).unwrap();

    assert!(out.changed);
    let v = scope.original().var(x);
    assert_eq!((v.glb, v.gub, v.lub, v.orig_ub), (0.0, 4.0, 4.0, 4.0));
}

#[test]
fn test_chg_crossing_bounds_is_invalid_data() {
    let (mut scope, x, _, _) = scope_with_vars();
    scope.chg_var_ub(x, 3.0).unwrap();

    let err = scope.chg_var_lb(x, 5.0).unwrap_err();

    assert!(matches!(err, MipError::InvalidData(_)));
    assert_eq!(global(&scope, x), (0.0, 3.0));
}

#[test]
fn test_tighten_lb_above_ub_is_infeasible_and_untouched() {
    let (mut scope, x, _, _) = scope_with_vars();
    enter(&mut scope, Stage::Solving);
    focus_child(&mut scope);
    scope.tighten_var_ub(x, 4.0, false).unwrap();

    let out = scope.tighten_var_lb(x, 7.0, false).unwrap();

    assert!(out.infeasible);
    assert!(!out.changed);
    assert_eq!(local(&scope, x), (0.0, 4.0));
}

#[test]
fn test_tighten_below_boundstreps_is_unchanged() {
    let (mut scope, _, _, z) = scope_with_vars();
    enter(&mut scope, Stage::Presolving);

    let out = scope.tighten_var_lb(z, 0.01, false).unwrap();
    assert!(!out.changed);
    assert_eq!(global(&scope, z), (0.0, 10.0));

    let forced = scope.tighten_var_lb(z, 0.01, true).unwrap();
    assert!(forced.changed);
    assert_eq!(global(&scope, z).0, 0.01);
}

#[test]
fn test_infinite_lower_push_during_solving_is_noop() {
    let (mut scope, _, _, z) = scope_with_vars();
    enter(&mut scope, Stage::Solving);
    focus_child(&mut scope);

    let out = scope.tighten_var_lb(z, f64::INFINITY, false).unwrap();

    assert_eq!(out, BoundOutcome::UNCHANGED);
    assert_eq!(local(&scope, z), (0.0, 10.0));
}

#[test]
fn test_local_tightening_is_recorded_on_focus() {
    let (mut scope, x, y, _) = scope_with_vars();
    enter(&mut scope, Stage::Solving);
    let child = focus_child(&mut scope);

    let out = scope.tighten_var_lb(y, 5.0, false).unwrap();

    assert!(out.changed);
    assert_eq!(local(&scope, y), (5.0, 10.0));
    assert_eq!(global(&scope, y), (0.0, 10.0));
    let changes = &scope.tree().node(child).changes;
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].var, y);
    assert_eq!(changes[0].value, 5.0);
    assert_ne!(changes[0].var, x);
}

#[test]
fn test_root_tightening_is_global() {
    let (mut scope, x, _, _) = scope_with_vars();
    enter(&mut scope, Stage::Solving);
    let root = scope.tree.create_root(0.0);
    scope.tree.focus_node(root);

    scope.tighten_var_ub(x, 0.0, false).unwrap();

    assert_eq!(global(&scope, x), (0.0, 0.0));
    assert_eq!(scope.tree().node(root).changes.len(), 1);
    assert_eq!(scope.stats().nrootintfixings_run, 1);
}

#[test]
fn test_inference_keeps_provenance() {
    let (mut scope, x, _, _) = scope_with_vars();
    enter(&mut scope, Stage::Solving);
    let child = focus_child(&mut scope);
    let cons = scope
        .add_cons(Constraint::linear("row", &[(x, 1.0)], 2.0, f64::INFINITY))
        .unwrap();

    scope.infer_var_lb(x, 2.0, Provenance::Constraint(cons)).unwrap();

    let change = scope.tree().node(child).changes[0];
    assert_eq!(change.provenance, Provenance::Constraint(cons));
}

#[test]
fn test_infer_binvar_writes_single_record() {
    let mut scope = SolverScope::new("bin", SolverConfig::default());
    let b = scope.add_var(Var::binary("b", 1.0)).unwrap();
    enter(&mut scope, Stage::Solving);
    let child = focus_child(&mut scope);

    let out = scope.infer_binvar(b, true, Provenance::Branching).unwrap();

    assert!(out.changed);
    assert_eq!(local(&scope, b), (1.0, 1.0));
    assert_eq!(scope.tree().node(child).changes.len(), 1);
}

#[test]
fn test_bound_operation_in_wrong_stage_is_rejected() {
    let (mut scope, x, _, _) = scope_with_vars();
    enter(&mut scope, Stage::Solved);

    let err = scope.tighten_var_lb(x, 3.0, false).unwrap_err();

    assert!(err.is_invalid_call());
    assert_eq!(global(&scope, x), (0.0, 10.0));
}

// ============================================================================
// Probing Tests
// ============================================================================

#[test]
fn test_probing_round_trip_restores_bits() {
    let (mut scope, x, y, z) = scope_with_vars();
    enter(&mut scope, Stage::Solving);
    focus_child(&mut scope);
    scope.tighten_var_ub(z, 7.3, true).unwrap();
    let before: Vec<(f64, f64)> = [x, y, z].iter().map(|v| local(&scope, *v)).collect();

    scope.start_probing().unwrap();
    scope.tighten_var_lb(x, 3.0, true).unwrap();
    scope.new_probing_node().unwrap();
    scope.tighten_var_ub(z, 1.0 / 3.0, true).unwrap();
    scope.tighten_var_lb(y, 2.0, true).unwrap();
    scope.new_probing_node().unwrap();
    scope.tighten_var_lb(z, 0.1, true).unwrap();
    assert_eq!(scope.probing_depth(), Some(2));

    scope.backtrack_probing(0).unwrap();
    assert_eq!(local(&scope, y), before[1]);
    assert_eq!(local(&scope, z), before[2]);
    assert_eq!(local(&scope, x), (3.0, 10.0));

    scope.end_probing().unwrap();
    let after: Vec<(f64, f64)> = [x, y, z].iter().map(|v| local(&scope, *v)).collect();
    for (b, a) in before.iter().zip(&after) {
        assert_eq!(b.0.to_bits(), a.0.to_bits());
        assert_eq!(b.1.to_bits(), a.1.to_bits());
    }
}

#[test]
fn test_probing_changes_never_touch_node_logs() {
    let (mut scope, x, _, _) = scope_with_vars();
    enter(&mut scope, Stage::Solving);
    let child = focus_child(&mut scope);

    scope.start_probing().unwrap();
    scope.tighten_var_lb(x, 4.0, true).unwrap();

    assert!(scope.tree().node(child).changes.is_empty());
    assert_eq!(global(&scope, x), (0.0, 10.0));
    scope.end_probing().unwrap();
}

#[test]
fn test_probing_misuse_is_rejected() {
    let (mut scope, _, _, _) = scope_with_vars();
    assert!(scope.start_probing().unwrap_err().is_invalid_call());

    enter(&mut scope, Stage::Solving);
    focus_child(&mut scope);
    assert!(matches!(scope.backtrack_probing(0), Err(MipError::InvalidData(_))));
    assert!(matches!(scope.end_probing(), Err(MipError::InvalidData(_))));

    scope.start_probing().unwrap();
    assert!(matches!(scope.start_probing(), Err(MipError::InvalidData(_))));
    assert!(matches!(scope.backtrack_probing(3), Err(MipError::InvalidData(_))));
    scope.end_probing().unwrap();
}

// ============================================================================
// Fixing and Aggregation Tests
// ============================================================================

#[test]
fn test_fix_then_check_while_solving() {
    let (mut scope, x, _, _) = scope_with_vars();
    enter(&mut scope, Stage::Solving);
    focus_child(&mut scope);

    let out = scope.fix_var(x, 6.0).unwrap();

    assert!(!out.infeasible);
    assert_eq!(local(&scope, x), (6.0, 6.0));
}

#[test]
fn test_fix_fractional_integer_is_infeasible() {
    let (mut scope, x, _, _) = scope_with_vars();
    enter(&mut scope, Stage::Presolving);

    let out = scope.fix_var(x, 2.5).unwrap();

    assert!(out.infeasible);
    assert!(scope.prob().var(x).is_active());
}

#[test]
fn test_presolve_fixing_moves_objective_to_offset() {
    let (mut scope, _, y, _) = scope_with_vars();
    enter(&mut scope, Stage::Presolving);

    let out = scope.fix_var(y, 3.0).unwrap();

    assert!(out.changed);
    let prob = scope.prob();
    assert_eq!(prob.var(y).status, VarStatus::Fixed);
    assert_eq!(prob.var(y).obj, 0.0);
    assert_eq!(prob.obj_offset, 6.0);
    assert!(prob.marked_for_deletion().contains(&y));
}

#[test]
fn test_aggregation_transfers_bounds_and_objective() {
    let (mut scope, x, y, _) = scope_with_vars();
    enter(&mut scope, Stage::Presolving);

    // x - y == 1
    let out = scope.aggregate_vars(x, y, 1.0, -1.0, 1.0).unwrap();

    assert!(out.aggregated);
    let prob = scope.prob();
    assert_eq!(
        prob.var(x).status,
        VarStatus::Aggregated {
            var: y,
            scalar: 1.0,
            constant: 1.0
        }
    );
    // y <= 9 because x <= 10
    assert_eq!(global(&scope, y), (0.0, 9.0));
    assert_eq!(scope.prob().var(y).obj, 3.0);
    assert_eq!(scope.prob().obj_offset, 1.0);

    // a bound on the eliminated variable now lands on y
    scope.tighten_var_lb(x, 6.0, false).unwrap();
    assert_eq!(global(&scope, y).0, 5.0);
}

#[test]
fn test_aggregation_prefers_eliminating_continuous() {
    let (mut scope, x, _, z) = scope_with_vars();
    enter(&mut scope, Stage::Presolving);

    // x + 2z == 4
    let out = scope.aggregate_vars(x, z, 1.0, 2.0, 4.0).unwrap();

    assert!(out.aggregated);
    assert!(scope.prob().var(x).is_active());
    assert!(matches!(
        scope.prob().var(z).status,
        VarStatus::Aggregated { var, .. } if var == x
    ));
}

#[test]
fn test_aggregation_refuses_fractional_integer_scalar() {
    let (mut scope, x, y, _) = scope_with_vars();
    enter(&mut scope, Stage::Presolving);

    // 2x + 3y == 6 has no integral representation either way
    let out = scope.aggregate_vars(x, y, 2.0, 3.0, 6.0).unwrap();

    assert_eq!(out, AggrOutcome::default());
    assert!(scope.prob().var(x).is_active());
    assert!(scope.prob().var(y).is_active());
}

#[test]
fn test_multiaggregation_keeps_bounds_as_row() {
    let (mut scope, x, y, z) = scope_with_vars();
    enter(&mut scope, Stage::Presolving);
    let nconss = scope.prob().n_conss();

    // z == x + y - 2
    let out = scope.multiaggregate_var(z, &[(x, 1.0), (y, 1.0)], -2.0).unwrap();

    assert!(out.aggregated);
    let prob = scope.prob();
    assert_eq!(prob.n_conss(), nconss + 1);
    let row = prob.conss().last().map(|(_, c)| c.clone()).unwrap();
    assert_eq!(row.name, "t_z_bnd");
    assert_eq!((row.lhs, row.rhs), (2.0, 12.0));
    assert_eq!(prob.var(x).obj, 2.0);
    assert_eq!(prob.obj_offset, -2.0);
}

#[test]
fn test_multiaggregation_refuses_cycles() {
    let (mut scope, x, y, _) = scope_with_vars();
    enter(&mut scope, Stage::Presolving);

    let out = scope.multiaggregate_var(x, &[(x, 0.5), (y, 1.0)], 0.0).unwrap();

    assert!(!out.aggregated);
    assert!(scope.prob().var(x).is_active());
}

#[test]
fn test_chg_var_type_rounds_bounds() {
    let mut scope = SolverScope::new("types", SolverConfig::default());
    let w = scope.add_var(Var::continuous("w", 0.5, 3.7, 0.0)).unwrap();
    let v = scope.add_var(Var::continuous("v", 0.2, 0.8, 0.0)).unwrap();

    let out = scope.chg_var_type(w, VarType::Integer).unwrap();
    assert!(out.changed);
    assert_eq!(global(&scope, w), (1.0, 3.0));

    let crossing = scope.chg_var_type(v, VarType::Integer).unwrap();
    assert!(crossing.infeasible);
    assert_eq!(scope.prob().var(v).vartype, VarType::Continuous);
}

#[test]
fn test_negated_variable_is_cached() {
    let mut scope = SolverScope::new("neg", SolverConfig::default());
    let b = scope.add_var(Var::binary("b", 1.0)).unwrap();
    assert!(scope.get_negated_var(b).unwrap_err().is_invalid_call());
    enter(&mut scope, Stage::Presolving);

    let neg = scope.get_negated_var(b).unwrap();

    assert_eq!(scope.get_negated_var(b).unwrap(), neg);
    let v = scope.prob().var(neg);
    assert_eq!(v.status, VarStatus::Negated { var: b, constant: 1.0 });
    assert_eq!((v.glb, v.gub), (0.0, 1.0));

    // fixing the negation to 1 fixes b to 0
    scope.fix_var(neg, 1.0).unwrap();
    assert_eq!(scope.prob().var(b).status, VarStatus::Fixed);
    assert_eq!(global(&scope, b), (0.0, 0.0));
}
