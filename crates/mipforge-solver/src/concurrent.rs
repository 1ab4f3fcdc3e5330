//! Concurrent solving of one problem by independent solver instances.
//!
//! Every instance runs on its own scoped thread and owns all of its
//! state. Instances exchange immutable [`SyncSnapshot`]s over `crossbeam`
//! channels at node checkpoints. The first instance to finish interrupts
//! the others.
//!
//! All instances must be built from the same original problem, since
//! snapshots carry original variable ids.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{unbounded, Receiver, Sender};
use mipforge_core::{MipError, ObjSense, ProblemSpace, Result, SolOrigin, Solution, SolveStatus, VarId};

use crate::primal::CheckFlags;
use crate::solver::Solver;
use crate::stats::SolveReport;

/// What one instance shares with the others.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSnapshot {
    /// Index of the sending instance.
    pub from: usize,
    /// Values of the sender's best solution over original variables.
    pub solution: Option<Vec<(VarId, f64)>>,
    pub primal_bound: f64,
    pub dual_bound: f64,
}

/// Channel endpoints of one instance.
#[derive(Debug)]
pub(crate) struct SyncPeer {
    id: usize,
    freq: u64,
    outboxes: Vec<Sender<SyncSnapshot>>,
    inbox: Receiver<SyncSnapshot>,
    /// Improvements of the best solution already published.
    published: u64,
    next_poll: u64,
    /// Best dual bound reported by another instance.
    foreign_dual: f64,
}

impl SyncPeer {
    pub(crate) fn new(id: usize, freq: u64, outboxes: Vec<Sender<SyncSnapshot>>, inbox: Receiver<SyncSnapshot>) -> Self {
        Self {
            id,
            freq: freq.max(1),
            outboxes,
            inbox,
            published: 0,
            next_poll: 0,
            foreign_dual: f64::NEG_INFINITY,
        }
    }
}

impl Solver {
    /// Publishes an improved best solution and adopts the solutions of
    /// the other instances. Runs every `sync_node_freq` nodes.
    pub(crate) fn sync_checkpoint(&mut self) -> Result<()> {
        let Some(mut peer) = self.sync.take() else {
            return Ok(());
        };
        let result = self.exchange(&mut peer);
        self.sync = Some(peer);
        result
    }

    fn exchange(&mut self, peer: &mut SyncPeer) -> Result<()> {
        let nodes = self.scope.stats.nnodes;
        if nodes < peer.next_poll {
            return Ok(());
        }
        peer.next_poll = nodes + peer.freq;

        let improvements = self.scope.primal.nbest_found();
        if improvements > peer.published {
            if let Some(best) = self.scope.best_sol_original()? {
                let snapshot = SyncSnapshot {
                    from: peer.id,
                    solution: Some(best.values().collect()),
                    primal_bound: self.scope.primal_bound(),
                    dual_bound: self.scope.dual_bound().unwrap_or(f64::NEG_INFINITY),
                };
                for outbox in &peer.outboxes {
                    if outbox.send(snapshot.clone()).is_err() {
                        tracing::trace!(from = peer.id, "sync receiver gone");
                    }
                }
            }
            peer.published = improvements;
        }

        let incoming: Vec<SyncSnapshot> = peer.inbox.try_iter().collect();
        for snapshot in incoming {
            peer.foreign_dual = peer.foreign_dual.max(snapshot.dual_bound);
            let Some(values) = snapshot.solution else {
                continue;
            };
            let mut sol = Solution::new(ProblemSpace::Original, SolOrigin::Original);
            for (var, value) in values {
                sol.set_val(var, value);
            }
            sol.provenance.heuristic = Some(format!("concurrent#{}", snapshot.from));
            let stored = self.try_sol(sol, &CheckFlags::default())?;
            tracing::debug!(
                instance = peer.id,
                from = snapshot.from,
                stored,
                foreign_dual = peer.foreign_dual,
                "sync solution received"
            );
        }
        // only sent improvements count; adopted ones need no echo
        peer.published = peer.published.max(self.scope.primal.nbest_found());
        Ok(())
    }
}

/// Outcome of a concurrent solve.
#[derive(Debug, Clone)]
pub struct ConcurrentResult {
    /// Index of the instance that finished first.
    pub winner: usize,
    /// Status of the winner.
    pub status: SolveStatus,
    /// Best original-space solution over all instances.
    pub best: Option<Solution>,
    /// Objective of `best` in the user's sense.
    pub primal_bound: f64,
    pub reports: Vec<SolveReport>,
}

/// Independent solver instances racing on one problem.
#[derive(Debug)]
pub struct ConcurrentSolver {
    solvers: Vec<Solver>,
}

const NO_WINNER: usize = usize::MAX;

impl ConcurrentSolver {
    pub fn new(solvers: Vec<Solver>) -> Result<Self> {
        if solvers.is_empty() {
            return Err(MipError::InvalidData("concurrent solving needs at least one instance".to_string()));
        }
        Ok(Self { solvers })
    }

    /// Builds `count` instances with `factory`, which receives the instance
    /// index and usually varies the random seed.
    pub fn from_factory(count: usize, factory: impl Fn(usize) -> Result<Solver>) -> Result<Self> {
        let solvers = (0..count).map(factory).collect::<Result<Vec<_>>>()?;
        Self::new(solvers)
    }

    pub fn solvers(&self) -> &[Solver] {
        &self.solvers
    }

    pub fn solvers_mut(&mut self) -> &mut [Solver] {
        &mut self.solvers
    }

    pub fn into_solvers(self) -> Vec<Solver> {
        self.solvers
    }

    /// Solves with all instances in parallel.
    pub fn solve(&mut self) -> Result<ConcurrentResult> {
        self.connect();
        let interrupts: Vec<Arc<AtomicBool>> = self.solvers.iter().map(Solver::interrupt_handle).collect();
        let winner = AtomicUsize::new(NO_WINNER);
        tracing::info!(event = "concurrent_start", instances = self.solvers.len());

        let outcomes: Vec<Result<SolveStatus>> = thread::scope(|s| {
            let handles: Vec<_> = self
                .solvers
                .iter_mut()
                .enumerate()
                .map(|(i, solver)| {
                    let winner = &winner;
                    let interrupts = &interrupts;
                    s.spawn(move || -> Result<SolveStatus> {
                        let status = solver.solve()?;
                        if winner
                            .compare_exchange(NO_WINNER, i, Ordering::SeqCst, Ordering::SeqCst)
                            .is_ok()
                        {
                            for (j, flag) in interrupts.iter().enumerate() {
                                if j != i {
                                    flag.store(true, Ordering::Relaxed);
                                }
                            }
                        }
                        Ok(status)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| {
                    h.join()
                        .unwrap_or_else(|_| Err(MipError::Internal("solver thread panicked".to_string())))
                })
                .collect()
        });

        for solver in &mut self.solvers {
            solver.sync = None;
            solver.scope.clear_interrupt();
        }

        let winner = winner.load(Ordering::SeqCst);
        if winner == NO_WINNER {
            return Err(outcomes
                .into_iter()
                .find_map(|o| o.err())
                .unwrap_or_else(|| MipError::Internal("no instance finished".to_string())));
        }
        let status = match &outcomes[winner] {
            Ok(status) => *status,
            Err(_) => self.solvers[winner].status(),
        };

        let (best, primal_bound) = self.best_solution()?;
        let reports = self.solvers.iter().map(Solver::report).collect();
        tracing::info!(event = "concurrent_end", winner, %status, primal_bound);
        Ok(ConcurrentResult {
            winner,
            status,
            best,
            primal_bound,
            reports,
        })
    }

    /// Wires every instance to every other one.
    fn connect(&mut self) {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..self.solvers.len()).map(|_| unbounded()).unzip();
        for (i, (solver, inbox)) in self.solvers.iter_mut().zip(receivers).enumerate() {
            let outboxes = senders
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, tx)| tx.clone())
                .collect();
            let freq = solver.scope.config().concurrent.sync_node_freq;
            solver.sync = Some(SyncPeer::new(i, freq, outboxes, inbox));
        }
    }

    fn best_solution(&self) -> Result<(Option<Solution>, f64)> {
        let sense = self.solvers[0].scope.original().sense;
        let better = |a: f64, b: f64| match sense {
            ObjSense::Minimize => a < b,
            ObjSense::Maximize => a > b,
        };
        let mut best: Option<(Solution, f64)> = None;
        for solver in &self.solvers {
            let Some(sol) = solver.scope.best_sol_original()? else {
                continue;
            };
            let bound = solver.scope.primal_bound();
            if best.as_ref().map_or(true, |(_, b)| better(bound, *b)) {
                best = Some((sol, bound));
            }
        }
        Ok(match best {
            Some((sol, bound)) => (Some(sol), bound),
            None => (None, self.solvers[0].scope.primal_bound()),
        })
    }
}

#[cfg(test)]
mod tests {
    use crossbeam::channel::unbounded;
    use mipforge_core::{SolveStatus, VarId};
    use mipforge_test::{quiet_config, small_knapsack};

    use super::{ConcurrentSolver, SyncPeer, SyncSnapshot};
    use crate::builtin::{BestFirstSelector, DepthFirstSelector, IntegralityHandler, LinearHandler};
    use crate::solver::Solver;

    fn knapsack_solver(seed: usize) -> mipforge_core::Result<Solver> {
        let config = quiet_config().with_random_seed(seed as u64);
        let mut solver = Solver::from_problem(&small_knapsack(), config)?;
        solver
            .include_conshdlr(LinearHandler::new())
            .include_conshdlr(IntegralityHandler::new());
        if seed % 2 == 0 {
            solver.include_nodeselector(BestFirstSelector::new());
        } else {
            solver.include_nodeselector(DepthFirstSelector::new());
        }
        Ok(solver)
    }

    #[test]
    fn test_empty_instance_list_is_rejected() {
        assert!(ConcurrentSolver::new(Vec::new()).is_err());
        assert!(ConcurrentSolver::from_factory(0, knapsack_solver).is_err());
    }

    #[test]
    fn test_concurrent_solve_reports_optimum() {
        let mut concurrent = ConcurrentSolver::from_factory(2, knapsack_solver).unwrap();
        let result = concurrent.solve().unwrap();
        assert!(result.winner < 2);
        assert_eq!(result.status, SolveStatus::Optimal);
        assert!((result.primal_bound - 9.0).abs() < 1e-6);
        assert!(result.best.is_some());
        assert_eq!(result.reports.len(), 2);
        for solver in concurrent.solvers() {
            assert!(solver.sync.is_none());
            assert!(!solver.scope().is_interrupted());
        }
    }

    #[test]
    fn test_checkpoint_adopts_foreign_solution() {
        let mut solver = knapsack_solver(0).unwrap();
        solver.transform_problem().unwrap();
        let (tx, rx) = unbounded();
        solver.sync = Some(SyncPeer::new(0, 1, Vec::new(), rx));
        tx.send(SyncSnapshot {
            from: 1,
            solution: Some(vec![(VarId(0), 1.0), (VarId(1), 1.0), (VarId(2), 0.0), (VarId(3), 0.0)]),
            primal_bound: 9.0,
            dual_bound: 9.0,
        })
        .unwrap();

        solver.sync_checkpoint().unwrap();
        let best = solver.scope().primal().best().unwrap();
        assert_eq!(best.provenance.heuristic.as_deref(), Some("concurrent#1"));
        assert!((solver.scope().primal_bound() - 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_checkpoint_publishes_improvement_once() {
        let mut solver = knapsack_solver(0).unwrap();
        solver.transform_problem().unwrap();
        let (tx, peer_rx) = unbounded();
        let (_in_tx, rx) = unbounded();
        solver.sync = Some(SyncPeer::new(0, 1, vec![tx], rx));

        let mut sol = solver.scope().create_sol(mipforge_core::SolOrigin::Unknown).unwrap();
        sol.set_val(VarId(2), 1.0);
        assert!(solver.scope_mut().add_sol(sol).unwrap());

        solver.sync_checkpoint().unwrap();
        solver.scope_mut().stats.nnodes += 1;
        solver.sync_checkpoint().unwrap();
        let sent: Vec<_> = peer_rx.try_iter().collect();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].from, 0);
        assert!((sent[0].primal_bound - 3.0).abs() < 1e-6);
    }
}
