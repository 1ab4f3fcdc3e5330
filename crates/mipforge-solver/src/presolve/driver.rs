//! The outer presolving loop and the presolving stage transitions.

use mipforge_core::{
    check_stage, flatten_multi_aggregations, Operation, Result, SolOrigin, SolveStatus, Stage,
};

use super::{PresolveCursor, PresolveTiming, RoundOutcome};
use crate::plugin::HeurTiming;
use crate::solver::Solver;

/// Why the round loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PresolveEnd {
    Finished,
    Infeasible,
    Unbounded,
    Stopped(SolveStatus),
}

/// Constraints sampled when counting nonzeros for the size report.
const NONZERO_SAMPLE: usize = 10_000;

impl Solver {
    /// Presolves the transformed problem, transforming it first if needed.
    ///
    /// Ends in PRESOLVED, or in SOLVED when presolving decided the problem.
    /// A limit hit between rounds leaves the solver in PRESOLVING, from
    /// where presolving resumes on the next call.
    pub fn presolve(&mut self) -> Result<()> {
        check_stage(Operation::Presolve, self.scope.stage)?;
        match self.scope.stage {
            Stage::Presolved | Stage::Solved => return Ok(()),
            Stage::Problem => self.transform_problem()?,
            _ => {}
        }
        if !self.scope.status.is_proven() {
            self.scope.status = SolveStatus::Unknown;
        }
        if self.scope.stage == Stage::Transformed {
            self.init_presolve()?;
        } else {
            self.scope.stats.start_presolve();
        }

        match self.presolve_rounds()? {
            PresolveEnd::Stopped(status) => {
                self.scope.status = status;
                self.scope.stats.stop_presolve();
                tracing::info!(event = "presolve_end", %status, rounds = self.scope.stats.npresolrounds);
                Ok(())
            }
            PresolveEnd::Infeasible => {
                self.scope.status = SolveStatus::Infeasible;
                self.finish_decided_presolve()
            }
            PresolveEnd::Unbounded => {
                self.scope.status = if self.scope.primal.n_sols() > 0 {
                    SolveStatus::Unbounded
                } else {
                    SolveStatus::InfOrUnbd
                };
                self.finish_decided_presolve()
            }
            PresolveEnd::Finished => {
                self.exit_presolve(false)?;
                if self.scope.prob().n_vars() == 0 && self.scope.status == SolveStatus::Unknown {
                    self.solve_empty_problem()?;
                }
                Ok(())
            }
        }
    }

    fn init_presolve(&mut self) -> Result<()> {
        self.scope.set_stage(Stage::InitPresolve);
        self.scope.stats.nruns += 1;
        self.scope.stats.reset_presolve();
        self.scope.stats.start_presolve();

        let num = *self.scope.numerics();
        if let Some(trans) = self.scope.transformed.as_ref() {
            self.scope.primal.rescale(1.0, trans, &num);
        }
        for p in &mut self.plugins.presolvers {
            p.init_presolve(&mut self.scope)?;
        }
        self.scope.set_stage(Stage::Presolving);
        self.run_heuristics(HeurTiming::BEFORE_PRESOL)?;
        Ok(())
    }

    fn presolve_rounds(&mut self) -> Result<PresolveEnd> {
        let config = self.scope.config().presolving.clone();
        if !config.enabled {
            return Ok(PresolveEnd::Finished);
        }
        if self.scope.config().reoptimization.enabled && self.reopt.n_saved_runs() > 0 {
            tracing::debug!(run = self.scope.stats.nruns, "presolving skipped in reoptimization run");
            return Ok(PresolveEnd::Finished);
        }
        if self.plugins.has_benders_subproblems() {
            tracing::debug!("presolving skipped for Benders decomposition");
            return Ok(PresolveEnd::Finished);
        }

        let mut cursor = PresolveCursor::start();
        let mut last_round = false;
        loop {
            if let Some(status) = self.scope.check_stop() {
                return Ok(PresolveEnd::Stopped(status));
            }
            if self.scope.restart_requested {
                return Ok(PresolveEnd::Finished);
            }
            if config
                .max_rounds
                .is_some_and(|max| self.scope.stats.npresolrounds >= max)
            {
                return Ok(PresolveEnd::Finished);
            }
            if self.scope.prob().n_vars() == 0 {
                return Ok(PresolveEnd::Finished);
            }

            self.scope.stats.last_round = self.scope.stats.presolve_tally;
            let timing = if last_round {
                PresolveTiming::Final
            } else {
                PresolveTiming::Fast
            };
            let outcome = self.presolve_round(timing, last_round, &mut cursor)?;
            let round = self.scope.stats.npresolrounds;
            self.scope.stats.npresolrounds += 1;
            match outcome {
                RoundOutcome::Infeasible => return Ok(PresolveEnd::Infeasible),
                RoundOutcome::Unbounded => return Ok(PresolveEnd::Unbounded),
                RoundOutcome::Continue => {}
            }

            let finished = self.presolve_finished();
            if !finished {
                let d = self.scope.stats.presolve_tally - self.scope.stats.last_round;
                tracing::debug!(
                    event = "presolve_round",
                    round,
                    fixed = d.fixed_vars,
                    aggregated = d.aggr_vars,
                    chg_bounds = d.chg_bds,
                    del_conss = d.del_conss,
                    chg_coefs = d.chg_coefs,
                );
            }
            if last_round {
                return Ok(PresolveEnd::Finished);
            }
            last_round = finished;
        }
    }

    /// Leaves presolving: flattens aggregations, recomputes objective
    /// integrality and scaling, restores the variable order.
    fn exit_presolve(&mut self, decided: bool) -> Result<()> {
        if !decided {
            let cleanup = self.scope.cleanup_cliques();
            for (var, value) in cleanup.fixings {
                if self.scope.fix_var(var, value)?.infeasible {
                    self.scope.status = SolveStatus::Infeasible;
                    break;
                }
            }
            if cleanup.infeasible {
                self.scope.status = SolveStatus::Infeasible;
            }
        }
        self.scope.set_stage(Stage::ExitPresolve);

        let num = *self.scope.numerics();
        let scale_obj = self.scope.config().misc.scale_obj;
        let max_den = self.scope.config().misc.scale_obj_max_denominator;
        if let Some(trans) = self.scope.transformed.as_mut() {
            trans.sweep_deleted_vars();
            if !decided && self.scope.status == SolveStatus::Unknown {
                let flattened = flatten_multi_aggregations(trans);
                if flattened > 0 {
                    tracing::debug!(flattened, "flattened multi-aggregations");
                }
            }
            let integral = trans.check_obj_integrality(&num);
            let scale = if scale_obj && integral {
                trans.scale_objective(&num, max_den)
            } else {
                1.0
            };
            if scale != 1.0 {
                self.scope.primal.rescale(scale, trans, &num);
            } else {
                self.scope.primal.recompute_cutoff(integral, &num);
            }
            trans.sort_vars_by_type();
        }
        self.scope.stats.stop_presolve();
        self.log_problem_size();
        self.scope.set_stage(Stage::Presolved);
        Ok(())
    }

    /// Presolving decided the problem: pass through solving trivially so
    /// the usual statistics apply.
    fn finish_decided_presolve(&mut self) -> Result<()> {
        let status = self.scope.status;
        tracing::info!(event = "presolve_end", %status, rounds = self.scope.stats.npresolrounds);
        self.exit_presolve(true)?;
        self.init_solve()?;
        self.scope.status = status;
        self.scope.tree.clear();
        self.scope.set_stage(Stage::Solved);
        Ok(())
    }

    /// Every variable was removed: the only candidate is the assignment
    /// of the fixed values.
    fn solve_empty_problem(&mut self) -> Result<()> {
        let sol = self.scope.create_sol(SolOrigin::Unknown)?;
        self.scope.set_stage(Stage::InitSolve);
        self.scope.set_stage(Stage::Solving);
        let feasible = self.try_sol(sol, &Default::default())? || self.scope.primal.n_sols() > 0;
        self.scope.status = if feasible {
            SolveStatus::Optimal
        } else {
            SolveStatus::Infeasible
        };
        tracing::info!(event = "presolve_end", status = %self.scope.status, "problem solved in presolving");
        self.scope.set_stage(Stage::Solved);
        Ok(())
    }

    fn log_problem_size(&self) {
        let prob = self.scope.prob();
        let counts = prob.var_counts();
        let nonzeros = prob.count_nonzeros(NONZERO_SAMPLE);
        tracing::info!(
            event = "problem_size",
            vars = prob.n_vars(),
            binaries = counts.binary,
            integers = counts.integer,
            implicit = counts.implicit,
            continuous = counts.continuous,
            conss = prob.n_conss(),
            nonzeros = nonzeros.count,
            exact = nonzeros.exact,
            fixed = prob.n_resolved_vars(),
        );
    }
}
