//! Probing scopes: nested frames of local bound changes undone through a trail.

use mipforge_core::{BoundType, Problem, VarId};

use super::NodeId;

#[derive(Debug, Clone, Copy)]
struct TrailEntry {
    var: VarId,
    side: BoundType,
    old: f64,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    node: NodeId,
    trail_len: usize,
}

/// State of an active probing scope.
///
/// Every local bound change made while probing pushes the previous value
/// on the trail. Backtracking pops the trail in reverse order and writes
/// the saved values back, so restored bounds are bit-identical.
#[derive(Debug, Clone)]
pub struct ProbingState {
    frames: Vec<Frame>,
    trail: Vec<TrailEntry>,
    /// Node that was focused when probing started.
    pub parent: Option<NodeId>,
}

impl ProbingState {
    pub(crate) fn new(parent: Option<NodeId>, first: NodeId) -> Self {
        Self {
            frames: vec![Frame {
                node: first,
                trail_len: 0,
            }],
            trail: Vec::new(),
            parent,
        }
    }

    /// Depth of the current probing node, zero for the first one.
    pub fn depth(&self) -> u32 {
        self.frames.len().saturating_sub(1) as u32
    }

    /// The current probing node.
    pub fn current(&self) -> Option<NodeId> {
        self.frames.last().map(|f| f.node)
    }

    pub(crate) fn push_frame(&mut self, node: NodeId) {
        self.frames.push(Frame {
            node,
            trail_len: self.trail.len(),
        });
    }

    pub(crate) fn record(&mut self, var: VarId, side: BoundType, old: f64) {
        self.trail.push(TrailEntry { var, side, old });
    }

    /// Number of recorded changes in all frames.
    pub fn trail_len(&self) -> usize {
        self.trail.len()
    }

    /// Undoes all frames deeper than `depth` and returns the removed nodes.
    pub(crate) fn backtrack(&mut self, depth: u32, prob: &mut Problem) -> Vec<NodeId> {
        let keep = depth as usize + 1;
        if keep >= self.frames.len() {
            return Vec::new();
        }
        let mark = self.frames[keep].trail_len;
        self.undo_to(mark, prob);
        self.frames.drain(keep..).map(|f| f.node).collect()
    }

    /// Undoes every change, including those of frame zero.
    pub(crate) fn unwind(&mut self, prob: &mut Problem) -> Vec<NodeId> {
        self.undo_to(0, prob);
        self.frames.drain(..).map(|f| f.node).collect()
    }

    fn undo_to(&mut self, mark: usize, prob: &mut Problem) {
        while self.trail.len() > mark {
            if let Some(entry) = self.trail.pop() {
                prob.var_mut(entry.var).set_local_bound(entry.side, entry.old);
            }
        }
    }
}
