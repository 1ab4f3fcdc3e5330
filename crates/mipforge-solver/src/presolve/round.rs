//! The presolving round primitive.

use std::cmp::Reverse;

use mipforge_core::{ConsId, PluginResult, Result};

use super::{PresolveContext, PresolveCursor, PresolveTiming, TimingMask};
use crate::plugin::HeurTiming;
use crate::solver::Solver;

/// How a presolving round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RoundOutcome {
    Continue,
    Infeasible,
    Unbounded,
}

impl RoundOutcome {
    fn of(result: PluginResult) -> Self {
        match result {
            PluginResult::Cutoff | PluginResult::Infeasible => RoundOutcome::Infeasible,
            PluginResult::Unbounded => RoundOutcome::Unbounded,
            _ => RoundOutcome::Continue,
        }
    }
}

/// One entry of the merged presolver/propagator order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Presolver(usize),
    Propagator(usize),
}

enum Flow {
    Next,
    /// A reduction was found at the exhaustive tier; end the round.
    Stop,
    Abort(RoundOutcome),
}

impl Solver {
    /// Presolvers and presolving propagators merged by priority, with the
    /// priority of every step. A propagator goes first on equal priority.
    pub(crate) fn presolve_steps(&self) -> Vec<(i32, Step)> {
        let presolvers: Vec<(i32, usize)> = self
            .plugins
            .presolvers
            .iter()
            .enumerate()
            .map(|(i, p)| (p.priority(), i))
            .collect();
        let mut props: Vec<(i32, usize)> = self
            .plugins
            .propagators
            .iter()
            .enumerate()
            .filter(|(_, p)| p.presol_timing() != TimingMask::NONE)
            .map(|(i, p)| (p.presol_priority(), i))
            .collect();
        props.sort_by_key(|(prio, _)| Reverse(*prio));

        let mut steps = Vec::with_capacity(presolvers.len() + props.len());
        let (mut i, mut j) = (0, 0);
        while i < presolvers.len() || j < props.len() {
            let take_prop = match (presolvers.get(i), props.get(j)) {
                (Some(pre), Some(prop)) => prop.0 >= pre.0,
                (None, Some(_)) => true,
                _ => false,
            };
            if take_prop {
                steps.push((props[j].0, Step::Propagator(props[j].1)));
                j += 1;
            } else {
                steps.push((presolvers[i].0, Step::Presolver(presolvers[i].1)));
                i += 1;
            }
        }
        steps
    }

    /// Runs one presolving round at `timing`, escalating to the next tier
    /// within the same round when this tier found too little.
    pub(crate) fn presolve_round(
        &mut self,
        timing: PresolveTiming,
        last_round: bool,
        cursor: &mut PresolveCursor,
    ) -> Result<RoundOutcome> {
        self.scope.stats.record_presolve_round(timing);
        let mut ctx = PresolveContext::new(
            timing,
            self.scope.stats.npresolrounds,
            self.scope.stats.presolve_tally,
            last_round,
        );
        let before = ctx.tally;
        cursor.rewind();

        let outcome = self.run_round_plugins(&mut ctx, cursor)?;
        self.scope.stats.presolve_tally = ctx.tally;
        let stopped = match outcome {
            Flow::Abort(outcome) => return Ok(outcome),
            Flow::Stop => true,
            Flow::Next => false,
        };

        let cleanup = self.scope.cleanup_cliques();
        if cleanup.infeasible {
            return Ok(RoundOutcome::Infeasible);
        }
        for (var, value) in cleanup.fixings {
            let fixed = self.scope.fix_var(var, value)?;
            if fixed.infeasible {
                return Ok(RoundOutcome::Infeasible);
            }
            if fixed.changed {
                ctx.tally.fixed_vars += 1;
            }
        }
        self.scope.prob_mut().sweep_deleted_vars();
        self.scope.stats.presolve_tally = ctx.tally;

        if (ctx.tally - before).is_empty() && !self.plugins.heuristics.is_empty() {
            self.run_heuristics(HeurTiming::DURING_PRESOL)?;
        }

        if !stopped && !last_round {
            if let Some(next) = timing.next().filter(|t| *t != PresolveTiming::Final) {
                if self.presolve_finished() {
                    tracing::trace!(from = %timing, to = %next, "escalating presolve timing");
                    return self.presolve_round(next, last_round, cursor);
                }
            }
        }

        self.scope
            .events
            .fire_presolve_round(ctx.round, &self.scope.stats.presolve_tally);
        Ok(RoundOutcome::Continue)
    }

    /// True if the reductions since the start of the outer round are below
    /// the abort threshold.
    pub(crate) fn presolve_finished(&self) -> bool {
        let prob = self.scope.prob();
        self.scope.stats.presolve_tally.is_finished_since(
            &self.scope.stats.last_round,
            self.scope.config().presolving.abort_fac,
            prob.n_vars(),
            prob.n_conss(),
        )
    }

    fn run_round_plugins(&mut self, ctx: &mut PresolveContext, cursor: &mut PresolveCursor) -> Result<Flow> {
        let steps = self.presolve_steps();
        let split = steps.partition_point(|(prio, _)| *prio >= 0);

        match self.run_steps(&steps[..split], ctx, cursor)? {
            Flow::Next => {}
            flow => return Ok(flow),
        }

        for h in 0..self.plugins.conshdlrs.len() {
            let handler = &self.plugins.conshdlrs[h];
            if !handler.presol_timing().contains(ctx.timing) {
                continue;
            }
            let name = handler.name().to_string();
            let conss: Vec<ConsId> = self
                .scope
                .prob()
                .conss()
                .filter(|(_, c)| c.handler == name)
                .map(|(id, _)| id)
                .collect();
            if conss.is_empty() && handler.needs_constraints() {
                continue;
            }
            let result = self.plugins.conshdlrs[h].presolve(&mut self.scope, &conss, ctx)?;
            cursor.cons = h + 1;
            match self.after_call(result, ctx) {
                Flow::Next => {}
                Flow::Stop => {
                    cursor.save();
                    return Ok(Flow::Stop);
                }
                abort => return Ok(abort),
            }
        }

        self.run_steps(&steps[split..], ctx, cursor)
    }

    fn run_steps(
        &mut self,
        steps: &[(i32, Step)],
        ctx: &mut PresolveContext,
        cursor: &mut PresolveCursor,
    ) -> Result<Flow> {
        for (_, step) in steps {
            let result = match *step {
                Step::Presolver(i) => {
                    if !self.plugins.presolvers[i].timing().contains(ctx.timing) {
                        continue;
                    }
                    cursor.presol = i + 1;
                    self.plugins.presolvers[i].execute(&mut self.scope, ctx)?
                }
                Step::Propagator(i) => {
                    if !self.plugins.propagators[i].presol_timing().contains(ctx.timing) {
                        continue;
                    }
                    cursor.prop = i + 1;
                    self.plugins.propagators[i].presolve(&mut self.scope, ctx)?
                }
            };
            match self.after_call(result, ctx) {
                Flow::Next => {}
                Flow::Stop => {
                    cursor.save();
                    return Ok(Flow::Stop);
                }
                abort => return Ok(abort),
            }
        }
        Ok(Flow::Next)
    }

    /// Sweeps deleted variables and classifies the plugin result.
    fn after_call(&mut self, result: PluginResult, ctx: &PresolveContext) -> Flow {
        self.scope.prob_mut().sweep_deleted_vars();
        match RoundOutcome::of(result) {
            RoundOutcome::Continue => {}
            abnormal => return Flow::Abort(abnormal),
        }
        if ctx.timing == PresolveTiming::Exhaustive && !ctx.last_round && result == PluginResult::Success {
            return Flow::Stop;
        }
        Flow::Next
    }
}
