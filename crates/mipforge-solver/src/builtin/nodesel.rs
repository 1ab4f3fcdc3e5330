use std::cmp::Ordering;

use crate::plugin::NodeSelector;
use crate::tree::{Node, NodeId, SearchTree};

/// Open node with the smallest lower bound; ties by estimate, then by
/// creation order.
#[derive(Debug, Default)]
pub struct BestFirstSelector;

impl BestFirstSelector {
    pub fn new() -> Self {
        Self
    }
}

fn best_first(a: &Node, b: &Node) -> Ordering {
    a.lower_bound
        .total_cmp(&b.lower_bound)
        .then(a.estimate.total_cmp(&b.estimate))
        .then(a.number.cmp(&b.number))
}

impl NodeSelector for BestFirstSelector {
    fn name(&self) -> &str {
        "bestfirst"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn select(&mut self, tree: &SearchTree) -> Option<NodeId> {
        tree.open_nodes()
            .iter()
            .copied()
            .min_by(|&a, &b| best_first(tree.node(a), tree.node(b)))
    }
}

/// Deepest open node, the most recently created among equals.
#[derive(Debug, Default)]
pub struct DepthFirstSelector;

impl DepthFirstSelector {
    pub fn new() -> Self {
        Self
    }
}

impl NodeSelector for DepthFirstSelector {
    fn name(&self) -> &str {
        "dfs"
    }

    fn select(&mut self, tree: &SearchTree) -> Option<NodeId> {
        tree.open_nodes().iter().copied().max_by(|&a, &b| {
            let (na, nb) = (tree.node(a), tree.node(b));
            na.depth.cmp(&nb.depth).then(na.number.cmp(&nb.number))
        })
    }
}
