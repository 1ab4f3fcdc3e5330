//! Tests for the problem data model.

use super::*;
use crate::numerics::Numerics;

fn transformed_with(vars: &[Var]) -> (Problem, Problem) {
    let mut orig = Problem::new("p");
    for v in vars {
        orig.add_var(v.clone());
    }
    let trans = orig.transform(&Numerics::default());
    (orig, trans)
}

// ============================================================================
// Problem container
// ============================================================================

mod problem_tests {
    use super::*;

    #[test]
    fn test_deferred_deletion() {
        let mut prob = Problem::new("p");
        let x = prob.add_var(Var::binary("x", 1.0));
        let y = prob.add_var(Var::binary("y", 1.0));
        assert!(prob.mark_var_for_deletion(x));
        assert!(!prob.mark_var_for_deletion(x));
        assert_eq!(prob.n_vars(), 2);

        assert_eq!(prob.sweep_deleted_vars(), 1);
        assert_eq!(prob.active_vars(), &[y]);
        assert!(prob.marked_for_deletion().is_empty());
        assert_eq!(prob.sweep_deleted_vars(), 0);
    }

    #[test]
    fn test_sort_vars_by_type_is_stable() {
        let mut prob = Problem::new("p");
        let c = prob.add_var(Var::continuous("c", 0.0, 1.0, 0.0));
        let i1 = prob.add_var(Var::integer("i1", 0.0, 5.0, 0.0));
        let b = prob.add_var(Var::binary("b", 0.0));
        let i2 = prob.add_var(Var::integer("i2", 0.0, 5.0, 0.0));
        prob.sort_vars_by_type();
        assert_eq!(prob.active_vars(), &[b, i1, i2, c]);
        assert_eq!(prob.var_counts().non_continuous(), 3);
    }

    #[test]
    fn test_nonzero_count_sampling() {
        let mut prob = Problem::new("p");
        let x = prob.add_var(Var::binary("x", 0.0));
        let y = prob.add_var(Var::binary("y", 0.0));
        for i in 0..10 {
            prob.add_cons(Constraint::linear(
                format!("c{i}"),
                &[(x, 1.0), (y, 1.0)],
                0.0,
                1.0,
            ));
        }
        assert_eq!(
            prob.count_nonzeros(100),
            NonzeroCount {
                count: 20,
                exact: true
            }
        );
        let approx = prob.count_nonzeros(4);
        assert_eq!(approx.count, 20);
        assert!(!approx.exact);
    }

    #[test]
    fn test_del_cons() {
        let mut prob = Problem::new("p");
        let x = prob.add_var(Var::binary("x", 0.0));
        let c = prob.add_cons(Constraint::linear("c", &[(x, 1.0)], 0.0, 1.0));
        assert!(prob.del_cons(c));
        assert!(!prob.del_cons(c));
        assert_eq!(prob.n_conss(), 0);
    }

    #[test]
    fn test_transform_links_and_folds_sense() {
        let mut orig = Problem::new("p");
        orig.sense = ObjSense::Maximize;
        orig.obj_offset = 2.0;
        let x = orig.add_var(Var::integer("x", 0.4, 3.7, 5.0));
        let trans = orig.transform(&Numerics::default());

        let tx = orig.transformed_of(x).unwrap();
        let tvar = trans.var(tx);
        assert_eq!(tvar.origin, Some(x));
        assert_eq!(tvar.obj, -5.0);
        assert_eq!((tvar.glb, tvar.gub), (1.0, 3.0));
        assert_eq!(trans.obj_offset, -2.0);
        assert_eq!(trans.space(), ProblemSpace::Transformed);

        // internal -5*3 - 2 = -17 maps back to 17
        let num = Numerics::default();
        assert_eq!(trans.external_obj(-17.0, &num), 17.0);
        assert_eq!(trans.internal_obj(17.0, &num), -17.0);
    }

    #[test]
    fn test_objective_integrality() {
        let num = Numerics::default();
        let (_, mut trans) = transformed_with(&[
            Var::integer("x", 0.0, 5.0, 2.0),
            Var::continuous("y", 0.0, 5.0, 0.0),
        ]);
        assert!(trans.check_obj_integrality(&num));

        trans.add_obj_offset(0.5);
        assert!(!trans.check_obj_integrality(&num));

        let (_, mut trans) = transformed_with(&[Var::continuous("y", 0.0, 5.0, 1.0)]);
        assert!(!trans.check_obj_integrality(&num));
    }

    #[test]
    fn test_scale_objective() {
        let num = Numerics::default();
        let (_, mut trans) = transformed_with(&[
            Var::integer("x", 0.0, 5.0, 0.5),
            Var::integer("y", 0.0, 5.0, 1.5),
        ]);
        let scale = trans.scale_objective(&num, 1000);
        assert_eq!(scale, 2.0);
        assert_eq!(trans.var(VarId(0)).obj, 1.0);
        assert_eq!(trans.var(VarId(1)).obj, 3.0);
        assert_eq!(trans.obj_scale, 0.5);
        assert!(trans.check_obj_integrality(&num));
        // x=1, y=1 is 2.0 in the user's space
        assert_eq!(trans.external_obj(4.0, &num), 2.0);
    }

    #[test]
    fn test_scale_objective_divides_gcd() {
        let num = Numerics::default();
        let (_, mut trans) = transformed_with(&[
            Var::integer("x", 0.0, 5.0, 4.0),
            Var::integer("y", 0.0, 5.0, 6.0),
        ]);
        assert_eq!(trans.scale_objective(&num, 1000), 0.5);
        assert_eq!(trans.var(VarId(0)).obj, 2.0);
        assert_eq!(trans.var(VarId(1)).obj, 3.0);
    }

    #[test]
    fn test_scale_objective_skips_continuous() {
        let num = Numerics::default();
        let (_, mut trans) = transformed_with(&[Var::continuous("x", 0.0, 5.0, 0.5)]);
        assert_eq!(trans.scale_objective(&num, 1000), 1.0);
        assert_eq!(trans.obj_scale, 1.0);
    }
}

// ============================================================================
// Resolution
// ============================================================================

mod resolve_tests {
    use super::*;

    #[test]
    fn test_probvar_sum_follows_chain() {
        let (_, mut trans) = transformed_with(&[
            Var::integer("x", 0.0, 10.0, 0.0),
            Var::integer("y", 0.0, 10.0, 0.0),
            Var::binary("z", 0.0),
        ]);
        let (x, y, z) = (VarId(0), VarId(1), VarId(2));
        trans.var_mut(x).status = VarStatus::Aggregated {
            var: y,
            scalar: 2.0,
            constant: 1.0,
        };
        trans.var_mut(y).status = VarStatus::Negated {
            var: z,
            constant: 1.0,
        };
        // x = 2 * (1 - z) + 1 = -2z + 3
        assert_eq!(probvar_sum(&trans, x, 1.0, 0.0), (z, -2.0, 3.0));
    }

    #[test]
    fn test_probvar_sum_stops_at_fixed_and_multiaggr() {
        let (_, mut trans) = transformed_with(&[
            Var::integer("x", 4.0, 4.0, 0.0),
            Var::integer("m", 0.0, 10.0, 0.0),
            Var::integer("a", 0.0, 10.0, 0.0),
            Var::integer("b", 0.0, 10.0, 0.0),
        ]);
        let (x, m, a, b) = (VarId(0), VarId(1), VarId(2), VarId(3));
        trans.var_mut(x).status = VarStatus::Fixed;
        assert_eq!(probvar_sum(&trans, x, 3.0, 1.0), (x, 0.0, 13.0));

        trans.var_mut(m).status = VarStatus::MultiAggregated {
            vars: vec![a, b],
            scalars: vec![1.0, 1.0],
            constant: 0.0,
        };
        assert_eq!(probvar_sum(&trans, m, 2.0, 0.0), (m, 2.0, 0.0));

        trans.var_mut(m).status = VarStatus::MultiAggregated {
            vars: vec![a],
            scalars: vec![3.0],
            constant: 1.0,
        };
        assert_eq!(probvar_sum(&trans, m, 2.0, 0.0), (a, 6.0, 2.0));
    }

    #[test]
    fn test_active_representatives_capacity_contract() {
        let (_, mut trans) = transformed_with(&[
            Var::integer("x", 0.0, 10.0, 0.0),
            Var::integer("y", 0.0, 10.0, 0.0),
            Var::integer("m", 0.0, 10.0, 0.0),
        ]);
        let (x, y, m) = (VarId(0), VarId(1), VarId(2));
        trans.var_mut(m).status = VarStatus::MultiAggregated {
            vars: vec![x, y],
            scalars: vec![1.0, 1.0],
            constant: 2.0,
        };

        let sentinel = (VarId(99), 7.0);
        let mut small = [sentinel; 1];
        let res = active_representatives(&trans, &[(m, 1.0), (x, 1.0)], true, &mut small);
        assert_eq!(res, Representation::NeedsCapacity { required: 2 });
        assert_eq!(small, [sentinel]);

        let mut big = [sentinel; 4];
        let res = active_representatives(&trans, &[(m, 1.0), (x, 1.0)], true, &mut big);
        assert_eq!(
            res,
            Representation::Written {
                len: 2,
                constant: 2.0
            }
        );
        assert_eq!(&big[..2], &[(x, 2.0), (y, 1.0)]);
        assert_eq!(big[2], sentinel);
    }

    #[test]
    fn test_active_linear_terms_drops_cancelled() {
        let (_, mut trans) = transformed_with(&[
            Var::integer("x", 0.0, 10.0, 0.0),
            Var::integer("y", 0.0, 10.0, 0.0),
        ]);
        let (x, y) = (VarId(0), VarId(1));
        trans.var_mut(y).status = VarStatus::Aggregated {
            var: x,
            scalar: 1.0,
            constant: 0.0,
        };
        let (terms, constant) = active_linear_terms(&trans, &[(x, 1.0), (y, -1.0)]);
        assert!(terms.is_empty());
        assert_eq!(constant, 0.0);
    }

    #[test]
    fn test_flatten_is_idempotent() {
        let (_, mut trans) = transformed_with(&[
            Var::integer("x", 0.0, 10.0, 0.0),
            Var::integer("y", 0.0, 10.0, 0.0),
            Var::integer("z", 0.0, 10.0, 0.0),
            Var::integer("m1", 0.0, 10.0, 0.0),
            Var::integer("m2", 0.0, 10.0, 0.0),
        ]);
        let (x, y, z, m1, m2) = (VarId(0), VarId(1), VarId(2), VarId(3), VarId(4));
        trans.var_mut(m2).status = VarStatus::MultiAggregated {
            vars: vec![y, z],
            scalars: vec![1.0, 2.0],
            constant: 1.0,
        };
        trans.var_mut(m1).status = VarStatus::MultiAggregated {
            vars: vec![m2, x],
            scalars: vec![3.0, 1.0],
            constant: 0.0,
        };
        assert!(!resolve::is_flat(&trans));

        assert_eq!(resolve::flatten_multi_aggregations(&mut trans), 1);
        assert!(resolve::is_flat(&trans));
        match &trans.var(m1).status {
            VarStatus::MultiAggregated {
                vars,
                scalars,
                constant,
            } => {
                assert_eq!(vars, &vec![x, y, z]);
                assert_eq!(scalars, &vec![1.0, 3.0, 6.0]);
                assert_eq!(*constant, 3.0);
            }
            other => panic!("unexpected status {other:?}"),
        }

        let before = trans.var(m1).status.clone();
        assert_eq!(resolve::flatten_multi_aggregations(&mut trans), 0);
        assert_eq!(trans.var(m1).status, before);
    }

    #[test]
    fn test_deep_shared_chain_resolves_every_term() {
        // z_i = z_{i+1} + z_{i+2}; only the last two stay active
        let n = 16;
        let vars: Vec<Var> = (0..n)
            .map(|i| Var::continuous(format!("z{i}"), 0.0, 1e6, 0.0))
            .collect();
        let (_, mut trans) = transformed_with(&vars);
        for i in 0..n - 2 {
            trans.var_mut(VarId(i)).status = VarStatus::MultiAggregated {
                vars: vec![VarId(i + 1), VarId(i + 2)],
                scalars: vec![1.0, 1.0],
                constant: 0.0,
            };
        }

        let (terms, constant) = active_linear_terms(&trans, &[(VarId(0), 1.0)]);
        assert_eq!(constant, 0.0);
        assert_eq!(terms, vec![(VarId(n - 2), 610.0), (VarId(n - 1), 377.0)]);
        let total: f64 = terms.iter().map(|(_, c)| c).sum();
        assert_eq!(total, 987.0);

        assert_eq!(resolve::flatten_multi_aggregations(&mut trans), n - 3);
        assert!(resolve::is_flat(&trans));
    }
}

// ============================================================================
// Solutions
// ============================================================================

mod solution_tests {
    use super::*;

    #[test]
    fn test_val_resolves_status() {
        let (_, mut trans) = transformed_with(&[
            Var::integer("x", 0.0, 10.0, 0.0),
            Var::integer("y", 0.0, 10.0, 0.0),
            Var::integer("f", 3.0, 3.0, 0.0),
        ]);
        let (x, y, f) = (VarId(0), VarId(1), VarId(2));
        trans.var_mut(y).status = VarStatus::Aggregated {
            var: x,
            scalar: 2.0,
            constant: 1.0,
        };
        trans.var_mut(f).status = VarStatus::Fixed;

        let mut sol = Solution::new(ProblemSpace::Transformed, SolOrigin::Unknown);
        sol.set_val(x, 4.0);
        assert_eq!(sol.val(&trans, y), 9.0);
        assert_eq!(sol.val(&trans, f), 3.0);
    }

    #[test]
    fn test_retransform_round_trip() {
        let (orig, mut trans) = transformed_with(&[
            Var::integer("x", 0.0, 10.0, 1.0),
            Var::integer("y", 0.0, 10.0, 1.0),
        ]);
        let (x, y) = (VarId(0), VarId(1));
        let ty = orig.transformed_of(y).unwrap();
        trans.var_mut(ty).status = VarStatus::Aggregated {
            var: orig.transformed_of(x).unwrap(),
            scalar: -1.0,
            constant: 10.0,
        };

        let mut sol = Solution::new(ProblemSpace::Transformed, SolOrigin::Lp);
        sol.set_val(orig.transformed_of(x).unwrap(), 3.0);
        let back = sol.retransform(&orig, &trans);
        assert_eq!(back.space(), ProblemSpace::Original);
        assert_eq!(back.raw_val(x), 3.0);
        assert_eq!(back.raw_val(y), 7.0);
        assert_eq!(back.obj, Some(10.0));

        let again = back.to_transformed(&orig, &trans, 1e-6).unwrap();
        assert_eq!(again.val(&trans, ty), 7.0);
    }

    #[test]
    fn test_to_transformed_rejects_inconsistent() {
        let (orig, mut trans) = transformed_with(&[Var::integer("x", 0.0, 10.0, 1.0)]);
        let tx = orig.transformed_of(VarId(0)).unwrap();
        trans.var_mut(tx).glb = 2.0;
        trans.var_mut(tx).gub = 2.0;
        trans.var_mut(tx).status = VarStatus::Fixed;

        let mut sol = Solution::new(ProblemSpace::Original, SolOrigin::Original);
        sol.set_val(VarId(0), 5.0);
        assert!(sol.to_transformed(&orig, &trans, 1e-6).is_none());
        assert!(Solution::new_partial()
            .to_transformed(&orig, &trans, 1e-6)
            .is_none());
    }

    #[test]
    fn test_unlink_clears_origin() {
        let mut sol = Solution::linked(SolOrigin::Lp, [(VarId(0), 1.0)]);
        assert_eq!(sol.linkage, SolLinkage::Linked);
        sol.unlink();
        assert_eq!(sol.linkage, SolLinkage::Unlinked);
        assert_eq!(sol.origin, SolOrigin::Unknown);
        assert_eq!(sol.raw_val(VarId(0)), 1.0);
    }
}
