//! Transient relaxation state: pending cuts, the cut pool, pending columns
//! and conflicts.

use mipforge_core::{Var, VarId};

use crate::tree::BoundChange;

/// A cutting plane `lhs <= sum(coef * var) <= rhs` over active variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Cut {
    pub name: String,
    pub terms: Vec<(VarId, f64)>,
    pub lhs: f64,
    pub rhs: f64,
    /// Valid only in the subtree where it was found.
    pub local: bool,
}

impl Cut {
    pub fn new(name: impl Into<String>, terms: Vec<(VarId, f64)>, lhs: f64, rhs: f64) -> Self {
        Self {
            name: name.into(),
            terms,
            lhs,
            rhs,
            local: false,
        }
    }

    /// Violation of the cut by an assignment, zero if satisfied.
    pub fn violation(&self, mut value: impl FnMut(VarId) -> f64) -> f64 {
        let activity: f64 = self.terms.iter().map(|(v, c)| c * value(*v)).sum();
        (self.lhs - activity).max(activity - self.rhs).max(0.0)
    }
}

/// Cuts found in the current separation round, applied at its end.
#[derive(Debug, Clone, Default)]
pub struct SepaStore {
    cuts: Vec<Cut>,
}

impl SepaStore {
    pub fn add(&mut self, cut: Cut) {
        self.cuts.push(cut);
    }

    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Cut> {
        std::mem::take(&mut self.cuts)
    }
}

/// Global cuts kept for every LP of the run.
#[derive(Debug, Clone, Default)]
pub struct CutPool {
    cuts: Vec<Cut>,
}

impl CutPool {
    /// Adds a global cut unless an identical one is present.
    pub fn add(&mut self, cut: Cut) -> bool {
        if cut.local || self.cuts.iter().any(|c| c.terms == cut.terms && c.lhs == cut.lhs && c.rhs == cut.rhs) {
            return false;
        }
        self.cuts.push(cut);
        true
    }

    pub fn cuts(&self) -> &[Cut] {
        &self.cuts
    }

    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }
}

/// Columns proposed by pricers, added to the problem before the next LP.
#[derive(Debug, Clone, Default)]
pub struct PriceStore {
    vars: Vec<Var>,
}

impl PriceStore {
    pub fn add(&mut self, var: Var) {
        self.vars.push(var);
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Var> {
        std::mem::take(&mut self.vars)
    }
}

/// A set of bound changes that cannot hold together.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub changes: Vec<BoundChange>,
    pub depth: u32,
}

/// Conflicts recorded at infeasible nodes.
#[derive(Debug, Clone, Default)]
pub struct ConflictStore {
    conflicts: Vec<Conflict>,
}

impl ConflictStore {
    pub fn add(&mut self, conflict: Conflict) {
        self.conflicts.push(conflict);
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }
}

/// Relaxation structures of one run, created at solve initialization.
///
/// They are released in the reverse order of creation by
/// [`RelaxationStores::free`].
#[derive(Debug, Default)]
pub struct RelaxationStores {
    pub conflict: Option<ConflictStore>,
    pub cutpool: Option<CutPool>,
    pub sepastore: Option<SepaStore>,
    pub pricestore: Option<PriceStore>,
}

impl RelaxationStores {
    pub fn create(&mut self) {
        self.pricestore = Some(PriceStore::default());
        self.sepastore = Some(SepaStore::default());
        self.cutpool = Some(CutPool::default());
        self.conflict = Some(ConflictStore::default());
    }

    pub fn is_created(&self) -> bool {
        self.pricestore.is_some()
    }

    pub fn free(&mut self) {
        self.conflict = None;
        self.cutpool = None;
        self.sepastore = None;
        self.pricestore = None;
    }
}
