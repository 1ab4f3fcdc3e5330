//! Registered plugins, kept in stable priority order.

use std::cmp::Reverse;

use super::{
    BendersDecomposition, BranchRule, ConstraintHandler, Heuristic, NodeSelector, Presolver,
    Pricer, Propagator, Separator,
};

/// All plugins of a solver instance.
///
/// Every list is sorted by descending priority; plugins of equal
/// priority keep their registration order.
#[derive(Debug, Default)]
pub struct PluginSet {
    pub presolvers: Vec<Box<dyn Presolver>>,
    pub propagators: Vec<Box<dyn Propagator>>,
    pub conshdlrs: Vec<Box<dyn ConstraintHandler>>,
    pub heuristics: Vec<Box<dyn Heuristic>>,
    pub branchrules: Vec<Box<dyn BranchRule>>,
    pub nodeselectors: Vec<Box<dyn NodeSelector>>,
    pub separators: Vec<Box<dyn Separator>>,
    pub pricers: Vec<Box<dyn Pricer>>,
    pub benders: Vec<Box<dyn BendersDecomposition>>,
}

impl PluginSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_presolver(&mut self, p: Box<dyn Presolver>) {
        self.presolvers.push(p);
        self.presolvers.sort_by_key(|p| Reverse(p.priority()));
    }

    pub fn add_propagator(&mut self, p: Box<dyn Propagator>) {
        self.propagators.push(p);
        self.propagators.sort_by_key(|p| Reverse(p.priority()));
    }

    /// Constraint handlers keep registration order among equal check priorities.
    pub fn add_conshdlr(&mut self, h: Box<dyn ConstraintHandler>) {
        self.conshdlrs.push(h);
        self.conshdlrs.sort_by_key(|h| Reverse(h.check_priority()));
    }

    pub fn add_heuristic(&mut self, h: Box<dyn Heuristic>) {
        self.heuristics.push(h);
        self.heuristics.sort_by_key(|h| Reverse(h.priority()));
    }

    pub fn add_branchrule(&mut self, b: Box<dyn BranchRule>) {
        self.branchrules.push(b);
        self.branchrules.sort_by_key(|b| Reverse(b.priority()));
    }

    pub fn add_nodeselector(&mut self, n: Box<dyn NodeSelector>) {
        self.nodeselectors.push(n);
        self.nodeselectors.sort_by_key(|n| Reverse(n.priority()));
    }

    pub fn add_separator(&mut self, s: Box<dyn Separator>) {
        self.separators.push(s);
        self.separators.sort_by_key(|s| Reverse(s.priority()));
    }

    pub fn add_pricer(&mut self, p: Box<dyn Pricer>) {
        self.pricers.push(p);
        self.pricers.sort_by_key(|p| Reverse(p.priority()));
    }

    pub fn add_benders(&mut self, b: Box<dyn BendersDecomposition>) {
        self.benders.push(b);
    }

    pub fn find_conshdlr(&self, name: &str) -> Option<usize> {
        self.conshdlrs.iter().position(|h| h.name() == name)
    }

    pub fn has_node_selector(&self) -> bool {
        !self.nodeselectors.is_empty()
    }

    pub fn n_active_pricers(&self) -> usize {
        self.pricers.iter().filter(|p| p.is_active()).count()
    }

    /// True if a Benders decomposition with subproblems is registered.
    pub fn has_benders_subproblems(&self) -> bool {
        self.benders.iter().any(|b| b.n_subproblems() > 0)
    }
}
