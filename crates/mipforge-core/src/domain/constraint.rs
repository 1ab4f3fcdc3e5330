//! Constraints.
//!
//! Every constraint is a linear row `lhs <= sum(coefs[i] * vars[i]) <= rhs`
//! owned by a named constraint handler. Handlers interpret the row; the
//! problem container only stores it.

use std::fmt;

use super::VarId;

/// Index of a constraint inside one problem's constraint arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsId(pub usize);

impl fmt::Display for ConsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Behavioral flags of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsFlags {
    /// Row goes into the initial LP.
    pub initial: bool,
    pub separate: bool,
    pub enforce: bool,
    /// Constraint is checked for feasibility of primal solutions.
    pub check: bool,
    pub propagate: bool,
    /// Only valid in the current subtree.
    pub local: bool,
    /// May be changed by column generation.
    pub modifiable: bool,
    pub dynamic: bool,
    pub removable: bool,
}

impl Default for ConsFlags {
    fn default() -> Self {
        Self {
            initial: true,
            separate: true,
            enforce: true,
            check: true,
            propagate: true,
            local: false,
            modifiable: false,
            dynamic: false,
            removable: false,
        }
    }
}

/// A linear row with a handler name and flags.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub name: String,
    /// Name of the constraint handler that owns the row.
    pub handler: String,
    pub vars: Vec<VarId>,
    pub coefs: Vec<f64>,
    pub lhs: f64,
    pub rhs: f64,
    pub flags: ConsFlags,
    /// Set when the constraint was removed from the problem.
    pub deleted: bool,
}

impl Constraint {
    /// Creates a linear constraint owned by the `linear` handler.
    pub fn linear(
        name: impl Into<String>,
        terms: &[(VarId, f64)],
        lhs: f64,
        rhs: f64,
    ) -> Self {
        Self::with_handler(name, "linear", terms, lhs, rhs)
    }

    pub fn with_handler(
        name: impl Into<String>,
        handler: impl Into<String>,
        terms: &[(VarId, f64)],
        lhs: f64,
        rhs: f64,
    ) -> Self {
        Self {
            name: name.into(),
            handler: handler.into(),
            vars: terms.iter().map(|(v, _)| *v).collect(),
            coefs: terms.iter().map(|(_, c)| *c).collect(),
            lhs,
            rhs,
            flags: ConsFlags::default(),
            deleted: false,
        }
    }

    pub fn with_flags(mut self, flags: ConsFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Iterates `(var, coef)` pairs.
    pub fn terms(&self) -> impl Iterator<Item = (VarId, f64)> + '_ {
        self.vars.iter().copied().zip(self.coefs.iter().copied())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Evaluates the row activity with the given value lookup.
    pub fn activity(&self, mut value: impl FnMut(VarId) -> f64) -> f64 {
        self.terms().map(|(v, c)| c * value(v)).sum()
    }

    pub fn is_equality(&self) -> bool {
        self.lhs == self.rhs
    }
}
