//! Search tree nodes and their domain change logs.

use std::fmt;

use mipforge_core::{BoundType, ConsId, VarId};
use smallvec::SmallVec;

/// Index of a node in the tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Role of a node relative to the focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The node being processed.
    Focus,
    /// Open child of the focus.
    Child,
    /// Open node sharing the parent of the focus.
    Sibling,
    /// Any other open node.
    Leaf,
    /// Temporary node of a probing scope.
    Probing,
    /// Processed or pruned.
    DeadEnd,
}

impl NodeKind {
    pub fn is_open(self) -> bool {
        matches!(self, NodeKind::Child | NodeKind::Sibling | NodeKind::Leaf)
    }
}

/// Who deduced a bound change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Branching,
    /// Explicit call of a bound operation.
    User,
    /// Deduction of a constraint.
    Constraint(ConsId),
    /// Deduction of the propagator with this index.
    Propagator(usize),
    Presolve,
}

/// One entry of a node's domain change log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundChange {
    pub var: VarId,
    pub side: BoundType,
    pub value: f64,
    pub provenance: Provenance,
}

impl BoundChange {
    pub fn new(var: VarId, side: BoundType, value: f64, provenance: Provenance) -> Self {
        Self {
            var,
            side,
            value,
            provenance,
        }
    }
}

/// A subproblem: the parent's domain restricted by `changes`.
#[derive(Debug, Clone)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub depth: u32,
    pub kind: NodeKind,
    /// Proven lower bound of the subproblem.
    pub lower_bound: f64,
    /// Estimated objective of the best solution in the subtree.
    pub estimate: f64,
    /// Creation sequence number, used by node selectors for tie breaking.
    pub number: u64,
    pub changes: SmallVec<[BoundChange; 4]>,
}

impl Node {
    pub fn is_open(&self) -> bool {
        self.kind.is_open()
    }
}
