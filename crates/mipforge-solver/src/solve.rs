//! The solve loop with restarts and the solving stage transitions.

use mipforge_core::{check_stage, Operation, Result, SolOrigin, SolveStatus, Stage};

use crate::primal::{complete_partial_sol, CheckFlags};
use crate::solver::Solver;

impl Solver {
    /// Solves the problem, presolving and transforming first as needed.
    ///
    /// Restarts re-enter presolving on the transformed problem until no
    /// restart is requested. Returns the final status; a limit leaves the
    /// solver in PRESOLVING or SOLVED with a limit status.
    pub fn solve(&mut self) -> Result<SolveStatus> {
        check_stage(Operation::Solve, self.scope.stage)?;
        // an interrupt ends one call only
        self.scope.clear_interrupt();
        if self.scope.stage == Stage::Solved {
            return Ok(self.scope.status);
        }

        loop {
            if matches!(
                self.scope.stage,
                Stage::Problem | Stage::Transformed | Stage::Presolving
            ) {
                self.presolve()?;
            }
            if self.scope.stage == Stage::Presolving {
                // stopped by a limit, resumable
                break;
            }
            if self.scope.stage == Stage::Presolved {
                if self.scope.restart_requested && self.restart_allowed() {
                    self.restart()?;
                    continue;
                }
                self.scope.restart_requested = false;
                self.init_solve()?;
            }
            if self.scope.stage == Stage::Solving {
                self.run_search()?;
            }
            if self.scope.stage == Stage::Solving && self.scope.restart_requested {
                if self.restart_allowed() {
                    self.restart()?;
                    continue;
                }
                self.scope.restart_requested = false;
                self.scope.status = SolveStatus::RestartLimit;
                self.finish_search();
            }
            break;
        }

        if self.scope.stage == Stage::Solved && self.scope.config().reoptimization.enabled {
            self.save_reopt_run();
        }
        let status = self.scope.status;
        let report = self.report();
        tracing::info!(
            event = "solve_end",
            %status,
            primal_bound = report.primal_bound,
            dual_bound = report.dual_bound,
            gap = report.gap,
            nodes = report.ntotalnodes,
            runs = report.nruns,
            lp_iterations = report.nlpiterations,
            solve_seconds = report.solve_seconds,
        );
        self.scope.events.fire_solving_ended(status);
        Ok(status)
    }

    /// Restarts remain and restarts are enabled.
    fn restart_allowed(&self) -> bool {
        let presolving = &self.scope.config().presolving;
        presolving
            .max_restarts
            .map_or(true, |max| self.scope.stats.nrestarts < max)
    }

    fn restart(&mut self) -> Result<()> {
        let run = self.scope.stats.nruns;
        tracing::info!(
            event = "restart",
            run,
            root_int_fixings = self.scope.stats.nrootintfixings_run,
            nodes = self.scope.stats.nnodes,
        );
        self.scope.events.fire_restart(run);
        self.free_solve(true)
    }

    /// Sets up the search: relaxation stores, cutoff bounds, the root node
    /// and the solutions collected before solving.
    pub(crate) fn init_solve(&mut self) -> Result<()> {
        self.scope.set_stage(Stage::InitSolve);
        self.scope.stats.reset_run();
        self.scope.relax.create();
        self.scope.lp_sol = None;
        self.bnb.clear();

        let num = *self.scope.numerics();
        if let Some(limit) = self.scope.obj_limit {
            let internal = self.scope.prob().internal_obj(limit, &num);
            self.scope.primal.seed_cutoff(internal);
        }
        self.scope.tree.create_root(-num.infinity);

        self.transfer_orig_candidates()?;
        self.complete_partials()?;
        if self.plugins.n_active_pricers() == 0 {
            if let Some(bound) = self.worst_case_objective() {
                let margin = num.feastol * bound.abs().max(1.0);
                self.scope.primal.seed_cutoff(bound + margin);
            }
        }

        self.scope.stats.start_solve();
        if self.scope.config().misc.calc_integral {
            let ub = self.scope.primal.upper_bound();
            self.scope.stats.integral.start(ub, -num.infinity, num.infinity);
        }
        self.scope.set_stage(Stage::Solving);
        self.scope.events.fire_solving_started();
        tracing::info!(
            event = "solve_start",
            run = self.scope.stats.nruns,
            vars = self.scope.prob().n_vars(),
            conss = self.scope.prob().n_conss(),
            cutoff = self.scope.primal.cutoff_bound(),
        );
        Ok(())
    }

    /// Largest objective any point of the global box can attain, `None`
    /// when the box is unbounded in a costly direction.
    fn worst_case_objective(&self) -> Option<f64> {
        let prob = self.scope.prob();
        let num = self.scope.numerics();
        let mut total = prob.obj_offset;
        for &id in prob.active_vars() {
            let var = prob.var(id);
            if num.is_zero(var.obj) {
                continue;
            }
            let bound = if var.obj > 0.0 { var.gub } else { var.glb };
            if num.is_infinite(bound) {
                return None;
            }
            total += var.obj * bound;
        }
        Some(total)
    }

    /// Completes the partial solution hints by an LP over the unassigned
    /// variables and tries the results.
    fn complete_partials(&mut self) -> Result<()> {
        for partial in self.scope.primal.take_partials() {
            let completed = complete_partial_sol(
                &self.scope.original,
                self.scope.numerics(),
                self.oracle.as_mut(),
                &partial,
            )?;
            match completed {
                Some(sol) => {
                    let stored = self.try_sol(sol, &CheckFlags::default())?;
                    tracing::debug!(stored, "partial solution completed");
                }
                None => tracing::debug!("partial solution could not be completed"),
            }
        }
        Ok(())
    }

    /// Ends the search in SOLVED.
    pub(crate) fn finish_search(&mut self) {
        self.scope.tree.release_focus();
        self.scope.stats.stop_solve();
        self.scope.set_stage(Stage::Solved);
    }

    /// Frees the search data.
    ///
    /// With `restart` the solver goes straight back to TRANSFORMED keeping
    /// the presolved problem and the solutions, ready for another run.
    /// Otherwise it passes EXITSOLVE first. Solutions are kept either way.
    pub fn free_solve(&mut self, restart: bool) -> Result<()> {
        check_stage(Operation::FreeSolve, self.scope.stage)?;
        match self.scope.stage {
            Stage::Init | Stage::Problem | Stage::Transformed => return Ok(()),
            Stage::Presolving | Stage::Presolved => {
                self.scope.stats.stop_presolve();
            }
            _ => {
                if !restart {
                    self.scope.set_stage(Stage::ExitSolve);
                }
                self.scope.stats.stop_solve();
            }
        }

        self.scope.tree.clear();
        self.scope.lp_sol = None;
        self.scope.relax.free();
        self.bnb.clear();
        if let Some(trans) = self.scope.transformed.as_mut() {
            for idx in 0..trans.arena_len() {
                let var = trans.var_mut(mipforge_core::VarId(idx));
                var.llb = var.glb;
                var.lub = var.gub;
            }
        }
        if restart {
            self.scope.stats.nrestarts += 1;
            self.scope.restart_requested = false;
        }
        if !self.scope.status.is_proven() || restart {
            self.scope.status = SolveStatus::Unknown;
        }
        self.scope.set_stage(Stage::Transformed);
        Ok(())
    }

    /// Frees the search and the transformed problem while keeping the
    /// reoptimization data, so the objective can be changed for another
    /// run.
    pub fn free_reopt_solve(&mut self) -> Result<()> {
        check_stage(Operation::FreeReoptSolve, self.scope.stage)?;
        if !self.scope.config().reoptimization.enabled {
            return self.free_transform();
        }
        let keep = self.scope.primal.take_solutions();
        if let Some(trans) = self.scope.transformed.as_ref() {
            for sol in &keep {
                let mut orig = sol.retransform(&self.scope.original, trans);
                orig.origin = SolOrigin::Original;
                self.reopt.remember_solution(orig);
            }
        }
        self.free_transform()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use mipforge_core::{SolveStatus, Stage};
    use mipforge_test::{deterministic_config, root_optimal_cover};

    use crate::builtin::{BestFirstSelector, IntegralityHandler, LinearHandler};
    use crate::event::SolverEventListener;
    use crate::solver::Solver;

    /// Raises the interrupt flag the first time solving starts.
    #[derive(Debug)]
    struct InterruptOnce {
        flag: Arc<AtomicBool>,
        armed: AtomicBool,
    }

    impl SolverEventListener for InterruptOnce {
        fn on_stage_changed(&self, _from: Stage, to: Stage) {
            if to == Stage::Solving && self.armed.swap(false, Ordering::SeqCst) {
                self.flag.store(true, Ordering::SeqCst);
            }
        }
    }

    fn cover_solver() -> Solver {
        let mut solver = Solver::from_problem(&root_optimal_cover(), deterministic_config()).unwrap();
        solver
            .include_conshdlr(LinearHandler::new())
            .include_conshdlr(IntegralityHandler::new())
            .include_nodeselector(BestFirstSelector::new());
        solver
    }

    #[test]
    fn test_solve_reaches_solved_with_optimum() {
        let mut solver = cover_solver();
        let status = solver.solve().unwrap();
        assert_eq!(status, SolveStatus::Optimal);
        assert_eq!(solver.stage(), Stage::Solved);
        assert!((solver.scope().primal_bound() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_solve_in_solved_returns_status() {
        let mut solver = cover_solver();
        solver.solve().unwrap();
        let nruns = solver.scope().stats().nruns;
        assert_eq!(solver.solve().unwrap(), SolveStatus::Optimal);
        assert_eq!(solver.scope().stats().nruns, nruns);
    }

    #[test]
    fn test_free_solve_returns_to_transformed_keeping_solutions() {
        let mut solver = cover_solver();
        solver.solve().unwrap();
        solver.free_solve(false).unwrap();
        assert_eq!(solver.stage(), Stage::Transformed);
        assert!(solver.scope().tree().is_empty());
        assert!(solver.scope().primal().n_sols() > 0);
        assert_eq!(solver.status(), SolveStatus::Optimal);
    }

    #[test]
    fn test_free_transform_from_solved() {
        let mut solver = cover_solver();
        solver.solve().unwrap();
        solver.free_transform().unwrap();
        assert_eq!(solver.stage(), Stage::Problem);
        assert_eq!(solver.status(), SolveStatus::Unknown);
    }

    #[test]
    fn test_solve_again_after_free_transform() {
        let mut solver = cover_solver();
        solver.solve().unwrap();
        solver.free_transform().unwrap();
        assert_eq!(solver.solve().unwrap(), SolveStatus::Optimal);
    }

    #[test]
    fn test_objective_limit_prunes_everything() {
        let mut solver = cover_solver();
        solver.scope_mut().set_obj_limit(0.5).unwrap();
        assert_eq!(solver.solve().unwrap(), SolveStatus::Infeasible);
    }

    #[test]
    fn test_interrupt_does_not_outlive_the_call() {
        let mut solver = cover_solver();
        solver.add_listener(Arc::new(InterruptOnce {
            flag: solver.interrupt_handle(),
            armed: AtomicBool::new(true),
        }));
        assert_eq!(solver.solve().unwrap(), SolveStatus::UserInterrupt);

        solver.free_transform().unwrap();
        assert!(!solver.scope().is_interrupted());
        assert_eq!(solver.solve().unwrap(), SolveStatus::Optimal);
    }

    #[test]
    fn test_interrupt_before_solve_is_cleared_on_entry() {
        let mut solver = cover_solver();
        solver.interrupt_solve().unwrap();
        assert_eq!(solver.solve().unwrap(), SolveStatus::Optimal);
        assert!(!solver.scope().is_interrupted());
    }
}
