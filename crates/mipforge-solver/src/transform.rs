//! Creation and release of the transformed problem.

use mipforge_core::{check_stage, ConsId, MipError, Operation, Result, Solution, SolveStatus, Stage};

use crate::primal::CheckFlags;
use crate::solver::Solver;

impl Solver {
    /// Creates the transformed problem as a linked copy of the original
    /// problem and installs the rounding locks of its constraints.
    ///
    /// Does nothing once a transformed problem exists.
    pub fn transform_problem(&mut self) -> Result<()> {
        check_stage(Operation::TransformProblem, self.scope.stage)?;
        if self.scope.stage != Stage::Problem {
            return Ok(());
        }
        if !self.plugins.has_node_selector() {
            return Err(MipError::PluginNotFound("node selector".to_string()));
        }
        if let Some(cons) = self
            .scope
            .original
            .conss()
            .map(|(_, c)| c)
            .find(|c| self.plugins.find_conshdlr(&c.handler).is_none())
        {
            return Err(MipError::PluginNotFound(format!(
                "constraint handler {} of {}",
                cons.handler, cons.name
            )));
        }

        self.scope.set_stage(Stage::Transforming);
        let num = *self.scope.numerics();
        let mut trans = self.scope.original.transform(&num);
        let conss: Vec<ConsId> = trans.active_conss().to_vec();
        for id in conss {
            trans.lock_row(id, 1, &num);
        }
        let integral = trans.check_obj_integrality(&num);
        let misc = &self.scope.config().misc;
        if misc.scale_obj && integral {
            let scale = trans.scale_objective(&num, misc.scale_obj_max_denominator);
            if scale != 1.0 {
                tracing::debug!(scale, "objective scaled");
            }
        }
        self.scope.transformed = Some(trans);
        self.scope.status = SolveStatus::Unknown;
        self.seed_from_reopt();

        self.scope.estimate_memory();
        self.scope.set_stage(Stage::Transformed);
        self.transfer_orig_candidates()?;

        let prob = self.scope.prob();
        tracing::info!(
            event = "transform_end",
            vars = prob.n_vars(),
            conss = prob.n_conss(),
            obj_integral = prob.is_obj_integral(),
            obj_scale = prob.obj_scale,
        );
        Ok(())
    }

    /// Re-checks the original-space candidates against the transformed
    /// problem and stores the feasible ones.
    pub(crate) fn transfer_orig_candidates(&mut self) -> Result<usize> {
        let candidates = self.scope.primal.take_orig_candidates();
        if candidates.is_empty() {
            return Ok(0);
        }
        if !self.scope.config().misc.transfer_orig_sols {
            tracing::debug!(dropped = candidates.len(), "original solutions not transferred");
            return Ok(0);
        }
        let mut stored = 0;
        for sol in candidates {
            if self.try_sol(sol, &CheckFlags::default())? {
                stored += 1;
            }
        }
        tracing::debug!(stored, "original solutions transferred");
        Ok(stored)
    }

    /// Frees the transformed problem and returns to PROBLEM stage.
    ///
    /// Stored solutions are kept as original-space candidates when
    /// transferring original solutions is enabled.
    pub fn free_transform(&mut self) -> Result<()> {
        check_stage(Operation::FreeTransform, self.scope.stage)?;
        match self.scope.stage {
            Stage::Init | Stage::Problem => return Ok(()),
            Stage::Solving | Stage::Solved | Stage::Presolving | Stage::Presolved => {
                self.free_solve(false)?;
            }
            _ => {}
        }

        self.scope.set_stage(Stage::FreeTrans);
        self.scope.clear_interrupt();
        let keep = self.scope.config().misc.transfer_orig_sols;
        let sols = self.scope.primal.take_solutions();
        if keep {
            if let Some(trans) = self.scope.transformed.as_ref() {
                let originals: Vec<Solution> = sols
                    .iter()
                    .map(|s| s.retransform(&self.scope.original, trans))
                    .collect();
                for sol in originals {
                    self.scope.primal.add_orig_candidate(sol);
                }
            }
        }
        self.scope.primal.clear_solutions();
        self.scope.original.unlink_transformed();
        self.scope.reset_for_problem();
        self.scope.stats.reset_presolve();
        self.scope.stats.reset_run();
        self.scope.status = SolveStatus::Unknown;
        self.scope.set_stage(Stage::Problem);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mipforge_core::{Constraint, Stage, Var};
    use mipforge_test::{deterministic_config, root_optimal_cover};

    use crate::builtin::{BestFirstSelector, LinearHandler};
    use crate::solver::Solver;

    fn solver_with_cover() -> Solver {
        let mut solver = Solver::from_problem(&root_optimal_cover(), deterministic_config()).unwrap();
        solver.include_conshdlr(LinearHandler::new());
        solver.include_nodeselector(BestFirstSelector::new());
        solver
    }

    #[test]
    fn test_transform_requires_node_selector() {
        let mut solver = Solver::from_problem(&root_optimal_cover(), deterministic_config()).unwrap();
        solver.include_conshdlr(LinearHandler::new());
        let err = solver.transform_problem().unwrap_err();
        assert!(matches!(err, mipforge_core::MipError::PluginNotFound(_)));
        assert_eq!(solver.stage(), Stage::Problem);
    }

    #[test]
    fn test_transform_requires_constraint_handler() {
        let mut solver = Solver::new("p", deterministic_config());
        solver.include_nodeselector(BestFirstSelector::new());
        let x = solver.add_var(Var::binary("x", 1.0)).unwrap();
        solver
            .add_cons(Constraint::with_handler("c", "knapsack", &[(x, 1.0)], 0.0, 1.0))
            .unwrap();
        assert!(solver.transform_problem().is_err());
    }

    #[test]
    fn test_transform_installs_locks_and_links() {
        let mut solver = solver_with_cover();
        solver.transform_problem().unwrap();
        assert_eq!(solver.stage(), Stage::Transformed);
        let trans = solver.scope().transformed().unwrap();
        for &v in trans.active_vars() {
            assert_eq!(trans.var(v).locks_down, 1);
            assert_eq!(trans.var(v).locks_up, 0);
        }
        let orig = solver.scope().original();
        assert!(orig.transformed_of(mipforge_core::VarId(0)).is_some());
    }

    #[test]
    fn test_transform_twice_is_noop() {
        let mut solver = solver_with_cover();
        solver.transform_problem().unwrap();
        solver.transform_problem().unwrap();
        assert_eq!(solver.stage(), Stage::Transformed);
    }

    #[test]
    fn test_free_transform_keeps_solutions_as_candidates() {
        let mut solver = solver_with_cover();
        solver.transform_problem().unwrap();
        let mut sol = solver.scope().create_sol(mipforge_core::SolOrigin::Unknown).unwrap();
        sol.set_val(mipforge_core::VarId(0), 1.0);
        sol.set_val(mipforge_core::VarId(1), 0.0);
        assert!(solver.scope_mut().add_sol(sol).unwrap());

        solver.free_transform().unwrap();
        assert_eq!(solver.stage(), Stage::Problem);
        assert!(solver.scope().transformed().is_none());
        assert_eq!(solver.scope().primal().orig_candidates().len(), 1);

        solver.transform_problem().unwrap();
        assert_eq!(solver.scope().primal().n_sols(), 1);
    }
}
