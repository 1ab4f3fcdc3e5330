//! Solver entry points that hide the plugin wiring.

use std::thread::{self, JoinHandle};

use mipforge_config::SolverConfig;
use mipforge_core::{Problem, Result, SolveStatus, Solution};
use mipforge_solver::builtin::{
    BestFirstSelector, DualFixPropagator, IntegralityHandler, LinearHandler, MostFractionalRule,
    RoundingHeuristic, TrivialHeuristic, TrivialPresolver,
};
use mipforge_solver::{ConcurrentSolver, Solver};
use tokio::sync::mpsc;

/// Registers the bundled plugins on `solver`.
///
/// Linear rows and integrality are enforced by their handlers; the rest
/// are one presolver, dual fixing, two heuristics, most-fractional
/// branching and best-first node selection.
pub fn include_default_plugins(solver: &mut Solver) -> &mut Solver {
    solver
        .include_conshdlr(LinearHandler::new())
        .include_conshdlr(IntegralityHandler::new())
        .include_presolver(TrivialPresolver::new())
        .include_propagator(DualFixPropagator::new())
        .include_heuristic(TrivialHeuristic::new())
        .include_heuristic(RoundingHeuristic::new())
        .include_branchrule(MostFractionalRule::new())
        .include_nodeselector(BestFirstSelector::new())
}

/// Builds a solver for `prob` with the bundled plugins.
pub fn default_solver(prob: &Problem, config: SolverConfig) -> Result<Solver> {
    let mut solver = Solver::from_problem(prob, config)?;
    include_default_plugins(&mut solver);
    Ok(solver)
}

/// Builds `config.concurrent.solver_count` default solvers on `prob`.
///
/// Instance `i` uses the configured seed shifted by `i`.
pub fn default_concurrent_solver(prob: &Problem, config: SolverConfig) -> Result<ConcurrentSolver> {
    let base_seed = config.random_seed.unwrap_or(0);
    ConcurrentSolver::from_factory(config.concurrent.solver_count, |i| {
        let seeded = config.clone().with_random_seed(base_seed.wrapping_add(i as u64));
        default_solver(prob, seeded)
    })
}

/// Solves on a background thread, streaming every new incumbent.
///
/// The receiver yields the incumbent mapped to the original variables
/// together with its objective in the user's sense. The solver is handed
/// back through the join handle; the channel closes when it is dropped.
pub fn solve_streaming(
    mut solver: Solver,
) -> (
    mpsc::UnboundedReceiver<(Solution, f64)>,
    JoinHandle<Result<(Solver, SolveStatus)>>,
) {
    let (sender, receiver) = mpsc::unbounded_channel();
    solver.scope_mut().set_solution_sender(sender);
    let handle = thread::spawn(move || {
        let status = solver.solve()?;
        Ok((solver, status))
    });
    (receiver, handle)
}
