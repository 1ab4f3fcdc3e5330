//! Branch-and-bound search tree.
//!
//! Nodes live in an arena and are never removed while the tree exists; a
//! pruned or processed node becomes a dead end. The domain of a node is
//! reproduced from the change logs on its root path by [`SearchTree::activate`].

mod node;
mod probing;

use mipforge_core::{BoundType, Problem};
use smallvec::SmallVec;

pub use node::{BoundChange, Node, NodeId, NodeKind, Provenance};
pub use probing::ProbingState;

/// The search tree of one run.
#[derive(Debug, Clone, Default)]
pub struct SearchTree {
    nodes: Vec<Node>,
    open: Vec<NodeId>,
    focus: Option<NodeId>,
    root: Option<NodeId>,
    probing: Option<ProbingState>,
    next_number: u64,
    /// Global changes made before the root exists.
    pending_root: Vec<BoundChange>,
}

impl SearchTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards all nodes and creates an open root with the given bound.
    ///
    /// Changes buffered by [`SearchTree::record_root_change`] while no
    /// root existed become the first entries of its log.
    pub fn create_root(&mut self, lower_bound: f64) -> NodeId {
        let pending = std::mem::take(&mut self.pending_root);
        self.clear();
        let id = self.push_node(None, 0, NodeKind::Child, lower_bound, lower_bound);
        self.nodes[id.0].changes.extend(pending);
        self.open.push(id);
        self.root = Some(id);
        id
    }

    /// Drops every node, the focus and any probing scope.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.open.clear();
        self.focus = None;
        self.root = None;
        self.probing = None;
        self.next_number = 0;
        self.pending_root.clear();
    }

    fn push_node(
        &mut self,
        parent: Option<NodeId>,
        depth: u32,
        kind: NodeKind,
        lower_bound: f64,
        estimate: f64,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            depth,
            kind,
            lower_bound,
            estimate,
            number: self.next_number,
            changes: SmallVec::new(),
        });
        self.next_number += 1;
        id
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn focus(&self) -> Option<NodeId> {
        self.focus
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Open nodes in creation order.
    pub fn open_nodes(&self) -> &[NodeId] {
        &self.open
    }

    pub fn n_open(&self) -> usize {
        self.open.len()
    }

    pub fn n_created(&self) -> usize {
        self.nodes.len()
    }

    /// True if no node is open or focused.
    pub fn is_empty(&self) -> bool {
        self.open.is_empty() && self.focus.is_none()
    }

    /// Depth of the focus node, zero without focus.
    pub fn focus_depth(&self) -> u32 {
        self.focus.map(|f| self.nodes[f.0].depth).unwrap_or(0)
    }

    /// Creates an open child of `parent`.
    ///
    /// The child's bound never falls below the parent's.
    pub fn add_child(&mut self, parent: NodeId, lower_bound: f64, estimate: f64) -> NodeId {
        let (depth, parent_lb) = {
            let p = &self.nodes[parent.0];
            (p.depth + 1, p.lower_bound)
        };
        let lb = lower_bound.max(parent_lb);
        let id = self.push_node(Some(parent), depth, NodeKind::Child, lb, estimate.max(lb));
        self.open.push(id);
        id
    }

    /// Appends a change to the log of `node`.
    pub fn record_change(&mut self, node: NodeId, change: BoundChange) {
        self.nodes[node.0].changes.push(change);
    }

    /// Records a global change on the root, buffering it until the root
    /// is created.
    pub fn record_root_change(&mut self, change: BoundChange) {
        match self.root {
            Some(root) => self.record_change(root, change),
            None => self.pending_root.push(change),
        }
    }

    pub fn n_pending_root_changes(&self) -> usize {
        self.pending_root.len()
    }

    /// Raises the bound of `node` to at least `lower_bound`.
    pub fn update_lower_bound(&mut self, node: NodeId, lower_bound: f64) {
        let n = &mut self.nodes[node.0];
        if lower_bound > n.lower_bound {
            n.lower_bound = lower_bound;
        }
    }

    /// Removes `id` from the open set and makes it the focus.
    ///
    /// The previous focus becomes a dead end. Open nodes sharing the new
    /// focus's parent become siblings, all others leaves.
    pub fn focus_node(&mut self, id: NodeId) {
        if let Some(old) = self.focus.take() {
            self.nodes[old.0].kind = NodeKind::DeadEnd;
        }
        self.open.retain(|n| *n != id);
        self.nodes[id.0].kind = NodeKind::Focus;
        let parent = self.nodes[id.0].parent;
        for &n in &self.open {
            let node = &mut self.nodes[n.0];
            node.kind = if node.parent == parent && parent.is_some() {
                NodeKind::Sibling
            } else {
                NodeKind::Leaf
            };
        }
        self.focus = Some(id);
    }

    /// Closes the focus node after processing.
    pub fn release_focus(&mut self) {
        if let Some(old) = self.focus.take() {
            self.nodes[old.0].kind = NodeKind::DeadEnd;
        }
    }

    /// Node ids from the root down to `id`.
    pub fn path(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::with_capacity(self.nodes[id.0].depth as usize + 1);
        let mut cur = Some(id);
        while let Some(n) = cur {
            path.push(n);
            cur = self.nodes[n.0].parent;
        }
        path.reverse();
        path
    }

    /// Concatenated change logs along the root path of `id`.
    pub fn path_changes(&self, id: NodeId) -> Vec<BoundChange> {
        self.path(id)
            .into_iter()
            .flat_map(|n| self.nodes[n.0].changes.iter().copied())
            .collect()
    }

    /// Resets local bounds to global ones and replays the root path of `id`.
    ///
    /// Replayed values are clamped into the current global domain.
    pub fn activate(&self, id: NodeId, prob: &mut Problem) {
        for idx in 0..prob.arena_len() {
            let var = prob.var_mut(mipforge_core::VarId(idx));
            var.llb = var.glb;
            var.lub = var.gub;
        }
        for change in self.path_changes(id) {
            let var = prob.var_mut(change.var);
            let value = change.value.max(var.glb).min(var.gub);
            match change.side {
                BoundType::Lower => {
                    if value > var.llb {
                        var.llb = value;
                    }
                }
                BoundType::Upper => {
                    if value < var.lub {
                        var.lub = value;
                    }
                }
            }
        }
    }

    /// Prunes open nodes whose bound reaches `cutoff`. Returns their number.
    pub fn cutoff_open(&mut self, cutoff: f64) -> usize {
        let nodes = &mut self.nodes;
        let before = self.open.len();
        self.open.retain(|id| {
            let node = &mut nodes[id.0];
            if node.lower_bound >= cutoff {
                node.kind = NodeKind::DeadEnd;
                false
            } else {
                true
            }
        });
        before - self.open.len()
    }

    /// Smallest bound over the open nodes and the focus, `None` if empty.
    pub fn lower_bound(&self) -> Option<f64> {
        self.open
            .iter()
            .chain(self.focus.iter())
            .map(|id| self.nodes[id.0].lower_bound)
            .reduce(f64::min)
    }

    /// Root paths of every open node, for persisting between runs.
    pub fn open_node_paths(&self) -> Vec<(f64, Vec<BoundChange>)> {
        self.open
            .iter()
            .map(|id| (self.nodes[id.0].lower_bound, self.path_changes(*id)))
            .collect()
    }

    // ---- probing ----

    pub fn in_probing(&self) -> bool {
        self.probing.is_some()
    }

    pub fn probing(&self) -> Option<&ProbingState> {
        self.probing.as_ref()
    }

    pub(crate) fn probing_mut(&mut self) -> Option<&mut ProbingState> {
        self.probing.as_mut()
    }

    /// Opens a probing scope below the focus (or the root when unfocused).
    ///
    /// Returns `false` if a scope is already open.
    pub fn start_probing(&mut self) -> bool {
        if self.probing.is_some() {
            return false;
        }
        let parent = self.focus.or(self.root);
        let (depth, lb) = parent
            .map(|p| (self.nodes[p.0].depth + 1, self.nodes[p.0].lower_bound))
            .unwrap_or((0, f64::NEG_INFINITY));
        let first = self.push_node(parent, depth, NodeKind::Probing, lb, lb);
        self.probing = Some(ProbingState::new(parent, first));
        true
    }

    /// Pushes a new probing frame. Returns its node, `None` outside probing.
    pub fn new_probing_node(&mut self) -> Option<NodeId> {
        let current = self.probing.as_ref()?.current()?;
        let (depth, lb) = {
            let n = &self.nodes[current.0];
            (n.depth + 1, n.lower_bound)
        };
        let id = self.push_node(Some(current), depth, NodeKind::Probing, lb, lb);
        if let Some(p) = self.probing.as_mut() {
            p.push_frame(id);
        }
        Some(id)
    }

    /// Reverts all probing frames deeper than `depth`.
    pub fn backtrack_probing(&mut self, depth: u32, prob: &mut Problem) {
        if let Some(p) = self.probing.as_mut() {
            for id in p.backtrack(depth, prob) {
                self.nodes[id.0].kind = NodeKind::DeadEnd;
                self.nodes[id.0].changes.clear();
            }
        }
    }

    /// Reverts every probing change and closes the scope.
    pub fn end_probing(&mut self, prob: &mut Problem) {
        if let Some(mut p) = self.probing.take() {
            for id in p.unwind(prob) {
                self.nodes[id.0].kind = NodeKind::DeadEnd;
                self.nodes[id.0].changes.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests;
