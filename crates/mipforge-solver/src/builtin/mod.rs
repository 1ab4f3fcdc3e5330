//! Bundled plugins.
//!
//! - [`LinearHandler`] - linear rows: checking, propagation, presolving, LP rows
//! - [`IntegralityHandler`] - integrality of integer variables
//! - [`DualFixPropagator`] - fixes variables whose objective pushes them to an unlocked bound
//! - [`TrivialPresolver`] - removes variables with equal bounds
//! - [`TrivialHeuristic`], [`RoundingHeuristic`] - cheap primal heuristics
//! - [`MostFractionalRule`] - branching on the most fractional candidate
//! - [`BestFirstSelector`], [`DepthFirstSelector`] - node selection

mod branching;
mod dualfix;
mod heuristics;
mod integrality;
mod linear;
mod nodesel;
mod trivial;

pub use branching::{most_fractional, MostFractionalRule};
pub use dualfix::DualFixPropagator;
pub use heuristics::{RoundingHeuristic, TrivialHeuristic};
pub use integrality::IntegralityHandler;
pub use linear::LinearHandler;
pub use nodesel::{BestFirstSelector, DepthFirstSelector};
pub use trivial::TrivialPresolver;

#[cfg(test)]
mod tests;
