//! Tests for the search tree.

use mipforge_core::{Numerics, Problem, Var, VarId};

use super::*;

fn transformed_pair() -> Problem {
    let mut orig = Problem::new("pair");
    orig.add_var(Var::integer("x", 0.0, 10.0, 1.0));
    orig.add_var(Var::continuous("y", -1.5, 2.5, 0.0));
    orig.transform(&Numerics::default())
}

// ============================================================================
// Structure Tests
// ============================================================================

#[test]
fn test_child_bound_never_below_parent() {
    let mut tree = SearchTree::new();
    let root = tree.create_root(2.0);
    tree.focus_node(root);

    let low = tree.add_child(root, 1.0, 1.0);
    let high = tree.add_child(root, 5.0, 6.0);

    assert_eq!(tree.node(low).lower_bound, 2.0);
    assert_eq!(tree.node(high).lower_bound, 5.0);
    assert_eq!(tree.node(high).depth, 1);
    assert_eq!(tree.node(high).parent, Some(root));
}

#[test]
fn test_focus_reclassifies_open_nodes() {
    let mut tree = SearchTree::new();
    let root = tree.create_root(0.0);
    tree.focus_node(root);
    let a = tree.add_child(root, 0.0, 0.0);
    let b = tree.add_child(root, 0.0, 0.0);
    assert_eq!(tree.node(a).kind, NodeKind::Child);

    tree.focus_node(a);
    assert_eq!(tree.node(root).kind, NodeKind::DeadEnd);
    assert_eq!(tree.node(a).kind, NodeKind::Focus);
    assert_eq!(tree.node(b).kind, NodeKind::Sibling);

    let c = tree.add_child(a, 0.0, 0.0);
    tree.focus_node(c);
    assert_eq!(tree.node(b).kind, NodeKind::Leaf);
    assert_eq!(tree.path(c), vec![root, a, c]);
}

#[test]
fn test_is_empty_and_release() {
    let mut tree = SearchTree::new();
    assert!(tree.is_empty());

    let root = tree.create_root(0.0);
    assert!(!tree.is_empty());
    tree.focus_node(root);
    assert!(!tree.is_empty());
    tree.release_focus();
    assert!(tree.is_empty());
}

#[test]
fn test_cutoff_and_lower_bound() {
    let mut tree = SearchTree::new();
    let root = tree.create_root(1.0);
    tree.focus_node(root);
    tree.add_child(root, 3.0, 3.0);
    tree.add_child(root, 7.0, 7.0);
    tree.release_focus();

    assert_eq!(tree.lower_bound(), Some(3.0));
    assert_eq!(tree.cutoff_open(5.0), 1);
    assert_eq!(tree.n_open(), 1);
    assert_eq!(tree.lower_bound(), Some(3.0));
    assert_eq!(tree.cutoff_open(3.0), 1);
    assert_eq!(tree.lower_bound(), None);
}

// ============================================================================
// Activation Tests
// ============================================================================

#[test]
fn test_activate_replays_path_clamped() {
    let mut prob = transformed_pair();
    let x = VarId(0);
    let mut tree = SearchTree::new();
    let root = tree.create_root(0.0);
    tree.focus_node(root);
    let child = tree.add_child(root, 0.0, 0.0);
    tree.record_change(child, BoundChange::new(x, BoundType::Lower, 4.0, Provenance::Branching));
    let grandchild = tree.add_child(child, 0.0, 0.0);
    tree.record_change(grandchild, BoundChange::new(x, BoundType::Upper, 20.0, Provenance::Branching));

    tree.activate(grandchild, &mut prob);
    assert_eq!(prob.var(x).llb, 4.0);
    assert_eq!(prob.var(x).lub, 10.0);

    prob.var_mut(x).set_global_bound(BoundType::Lower, 6.0);
    tree.activate(child, &mut prob);
    assert_eq!(prob.var(x).llb, 6.0);

    tree.activate(root, &mut prob);
    assert_eq!(prob.var(x).llb, 6.0);
    assert_eq!(prob.var(x).lub, 10.0);
}

#[test]
fn test_open_node_paths_include_ancestors() {
    let mut tree = SearchTree::new();
    let root = tree.create_root(0.0);
    tree.focus_node(root);
    let child = tree.add_child(root, 1.0, 1.0);
    tree.record_change(child, BoundChange::new(VarId(1), BoundType::Upper, 0.0, Provenance::Branching));
    tree.focus_node(child);
    let leaf = tree.add_child(child, 2.0, 2.0);
    tree.record_change(leaf, BoundChange::new(VarId(0), BoundType::Lower, 3.0, Provenance::Branching));

    let paths = tree.open_node_paths();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].0, 2.0);
    assert_eq!(paths[0].1.len(), 2);
    assert_eq!(paths[0].1[0].var, VarId(1));
}

// ============================================================================
// Probing Tests
// ============================================================================

fn set_in_probing(tree: &mut SearchTree, prob: &mut Problem, var: VarId, side: BoundType, value: f64) {
    let old = prob.var(var).local_bound(side);
    if let Some(p) = tree.probing_mut() {
        p.record(var, side, old);
    }
    prob.var_mut(var).set_local_bound(side, value);
}

#[test]
fn test_probing_backtrack_restores_bits() {
    let mut prob = transformed_pair();
    let (x, y) = (VarId(0), VarId(1));
    let mut tree = SearchTree::new();
    let root = tree.create_root(0.0);
    tree.focus_node(root);

    let before: Vec<(u64, u64)> = prob
        .arena()
        .iter()
        .map(|v| (v.llb.to_bits(), v.lub.to_bits()))
        .collect();

    assert!(tree.start_probing());
    assert!(!tree.start_probing());
    set_in_probing(&mut tree, &mut prob, y, BoundType::Lower, 0.1 + 0.2);
    tree.new_probing_node();
    set_in_probing(&mut tree, &mut prob, x, BoundType::Lower, 3.0);
    set_in_probing(&mut tree, &mut prob, x, BoundType::Upper, 7.0);
    tree.new_probing_node();
    set_in_probing(&mut tree, &mut prob, y, BoundType::Upper, 1.0 / 3.0);
    assert_eq!(tree.probing().map(|p| p.depth()), Some(2));

    tree.backtrack_probing(1, &mut prob);
    assert_eq!(prob.var(y).lub.to_bits(), 2.5f64.to_bits());
    assert_eq!(prob.var(x).llb, 3.0);

    tree.backtrack_probing(0, &mut prob);
    assert_eq!(prob.var(x).llb, 0.0);
    assert_eq!(prob.var(y).llb, 0.1 + 0.2);

    tree.end_probing(&mut prob);
    let after: Vec<(u64, u64)> = prob
        .arena()
        .iter()
        .map(|v| (v.llb.to_bits(), v.lub.to_bits()))
        .collect();
    assert_eq!(before, after);
    assert!(!tree.in_probing());
}

#[test]
fn test_root_changes_buffered_until_root_exists() {
    let mut tree = SearchTree::new();
    let change = BoundChange::new(VarId(0), BoundType::Upper, 4.0, Provenance::Presolve);
    tree.record_root_change(change);
    assert_eq!(tree.n_pending_root_changes(), 1);

    let root = tree.create_root(0.0);
    assert_eq!(tree.n_pending_root_changes(), 0);
    assert_eq!(tree.node(root).changes.as_slice(), &[change]);

    tree.record_root_change(change);
    assert_eq!(tree.node(root).changes.len(), 2);

    tree.clear();
    tree.record_root_change(change);
    tree.clear();
    assert_eq!(tree.n_pending_root_changes(), 0);
}
