//! Binary knapsack instances.

use mipforge_core::{Constraint, ObjSense, Problem, Var, VarId};

/// One knapsack item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnapsackItem {
    pub weight: f64,
    pub profit: f64,
}

impl KnapsackItem {
    pub fn new(weight: f64, profit: f64) -> Self {
        Self { weight, profit }
    }
}

/// `max sum(profit * x)` s.t. `sum(weight * x) <= capacity`, `x` binary.
pub fn knapsack(items: &[KnapsackItem], capacity: f64) -> Problem {
    let mut prob = Problem::new("knapsack");
    prob.sense = ObjSense::Maximize;
    let vars: Vec<VarId> = items
        .iter()
        .enumerate()
        .map(|(i, item)| prob.add_var(Var::binary(format!("x{i}"), item.profit)))
        .collect();
    let terms: Vec<(VarId, f64)> = vars
        .iter()
        .zip(items)
        .map(|(v, item)| (*v, item.weight))
        .collect();
    prob.add_cons(Constraint::linear("capacity", &terms, f64::NEG_INFINITY, capacity));
    prob
}

/// Four items whose LP optimum is fractional; the integer optimum is 9.
pub fn small_knapsack() -> Problem {
    knapsack(
        &[
            KnapsackItem::new(3.0, 4.0),
            KnapsackItem::new(4.0, 5.0),
            KnapsackItem::new(2.0, 3.0),
            KnapsackItem::new(5.0, 6.0),
        ],
        7.0,
    )
}
