//! Decision variables and their status variant.

use std::fmt;

/// Index of a variable inside one problem's variable arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VarId(pub usize);

impl VarId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Domain type of a variable, in canonical sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VarType {
    Binary,
    Integer,
    /// Integral in every feasible solution without being required to be.
    Implicit,
    Continuous,
}

impl VarType {
    /// Returns true for every type whose bounds are kept integral.
    #[inline]
    pub fn is_integral(self) -> bool {
        !matches!(self, VarType::Continuous)
    }
}

/// Which side of the domain a bound refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BoundType {
    Lower,
    Upper,
}

impl BoundType {
    pub fn flip(self) -> Self {
        match self {
            BoundType::Lower => BoundType::Upper,
            BoundType::Upper => BoundType::Lower,
        }
    }
}

/// Resolution state of a variable.
///
/// Transitions only move towards more resolved states: an active
/// variable may become fixed, aggregated or multi-aggregated, never back.
#[derive(Debug, Clone, PartialEq)]
pub enum VarStatus {
    /// Variable of the original problem, linked to its transformed copy.
    Original { transformed: Option<VarId> },
    /// Active variable that is not in the LP.
    Loose,
    /// Active variable that is a column of the LP.
    Column,
    /// Variable fixed to its (equal) global bounds.
    Fixed,
    /// `x = scalar * var + constant`.
    Aggregated { var: VarId, scalar: f64, constant: f64 },
    /// `x = sum(scalars[i] * vars[i]) + constant`.
    MultiAggregated {
        vars: Vec<VarId>,
        scalars: Vec<f64>,
        constant: f64,
    },
    /// `x = constant - var`.
    Negated { var: VarId, constant: f64 },
}

impl VarStatus {
    /// Returns true for loose and column variables.
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, VarStatus::Loose | VarStatus::Column)
    }

    /// Returns true for original and active variables, whose values are
    /// not defined through other variables.
    #[inline]
    pub fn is_unresolved(&self) -> bool {
        matches!(self, VarStatus::Original { .. } | VarStatus::Loose | VarStatus::Column)
    }

    /// Returns a short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            VarStatus::Original { .. } => "original",
            VarStatus::Loose => "loose",
            VarStatus::Column => "column",
            VarStatus::Fixed => "fixed",
            VarStatus::Aggregated { .. } => "aggregated",
            VarStatus::MultiAggregated { .. } => "multi-aggregated",
            VarStatus::Negated { .. } => "negated",
        }
    }
}

/// A decision variable.
#[derive(Debug, Clone)]
pub struct Var {
    pub name: String,
    pub vartype: VarType,
    /// Objective coefficient in the space of the owning problem.
    pub obj: f64,
    /// Global bounds.
    pub glb: f64,
    pub gub: f64,
    /// Local bounds at the active node.
    pub llb: f64,
    pub lub: f64,
    /// Bounds as stated in the original problem.
    pub orig_lb: f64,
    pub orig_ub: f64,
    /// Number of constraints that block rounding down.
    pub locks_down: u32,
    /// Number of constraints that block rounding up.
    pub locks_up: u32,
    pub status: VarStatus,
    /// Weak back-reference from a transformed variable to its original.
    pub origin: Option<VarId>,
    /// Cached negated counterpart.
    pub negation: Option<VarId>,
}

impl Var {
    /// Creates an original-space variable.
    pub fn new(name: impl Into<String>, vartype: VarType, lb: f64, ub: f64, obj: f64) -> Self {
        let (lb, ub) = if vartype == VarType::Binary {
            (lb.max(0.0), ub.min(1.0))
        } else {
            (lb, ub)
        };
        Self {
            name: name.into(),
            vartype,
            obj,
            glb: lb,
            gub: ub,
            llb: lb,
            lub: ub,
            orig_lb: lb,
            orig_ub: ub,
            locks_down: 0,
            locks_up: 0,
            status: VarStatus::Original { transformed: None },
            origin: None,
            negation: None,
        }
    }

    pub fn binary(name: impl Into<String>, obj: f64) -> Self {
        Self::new(name, VarType::Binary, 0.0, 1.0, obj)
    }

    pub fn integer(name: impl Into<String>, lb: f64, ub: f64, obj: f64) -> Self {
        Self::new(name, VarType::Integer, lb, ub, obj)
    }

    pub fn continuous(name: impl Into<String>, lb: f64, ub: f64, obj: f64) -> Self {
        Self::new(name, VarType::Continuous, lb, ub, obj)
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    #[inline]
    pub fn is_integral(&self) -> bool {
        self.vartype.is_integral()
    }

    /// Returns the global bound of the given side.
    #[inline]
    pub fn global_bound(&self, side: BoundType) -> f64 {
        match side {
            BoundType::Lower => self.glb,
            BoundType::Upper => self.gub,
        }
    }

    /// Returns the local bound of the given side.
    #[inline]
    pub fn local_bound(&self, side: BoundType) -> f64 {
        match side {
            BoundType::Lower => self.llb,
            BoundType::Upper => self.lub,
        }
    }

    pub fn set_local_bound(&mut self, side: BoundType, value: f64) {
        match side {
            BoundType::Lower => self.llb = value,
            BoundType::Upper => self.lub = value,
        }
    }

    /// Sets the global bound and pulls the local bound along when it is looser.
    pub fn set_global_bound(&mut self, side: BoundType, value: f64) {
        match side {
            BoundType::Lower => {
                self.glb = value;
                if self.llb < value {
                    self.llb = value;
                }
            }
            BoundType::Upper => {
                self.gub = value;
                if self.lub > value {
                    self.lub = value;
                }
            }
        }
    }

    /// Returns true if the global domain is a single point.
    #[inline]
    pub fn is_globally_fixed(&self) -> bool {
        self.glb == self.gub
    }

    /// Returns true if either rounding direction is unlocked.
    pub fn may_round_down(&self) -> bool {
        self.locks_down == 0
    }

    pub fn may_round_up(&self) -> bool {
        self.locks_up == 0
    }
}
