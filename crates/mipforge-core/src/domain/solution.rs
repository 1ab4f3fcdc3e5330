//! Primal solutions.

use std::collections::BTreeMap;

use super::{Problem, ProblemSpace, VarId, VarStatus};

/// Where the values of a solution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolOrigin {
    /// Values refer to original-space variables.
    Original,
    Lp,
    Nlp,
    Relaxation,
    /// Every variable at its bound with the better objective.
    Pseudo,
    /// Some variables intentionally unassigned.
    Partial,
    Unknown,
}

/// Linkage of a solution to the relaxation state it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolLinkage {
    /// Values mirror a relaxation snapshot and are refreshed on request.
    Linked,
    /// Values are owned by the solution.
    Unlinked,
}

/// Who produced a solution and where.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolProvenance {
    /// Name of the producing heuristic, `None` for relaxations and users.
    pub heuristic: Option<String>,
    /// Node number at discovery.
    pub node: u64,
    pub depth: u32,
    /// Run index at discovery.
    pub run: u32,
}

/// An assignment of values to variables of one space.
///
/// Unassigned variables of a complete solution read as zero; a partial
/// solution distinguishes unassigned from zero.
#[derive(Debug, Clone)]
pub struct Solution {
    space: ProblemSpace,
    values: BTreeMap<VarId, f64>,
    pub origin: SolOrigin,
    pub linkage: SolLinkage,
    partial: bool,
    /// Internal objective value, cached when stored.
    pub obj: Option<f64>,
    pub provenance: SolProvenance,
    /// Relative gap at the moment the solution was stored.
    pub gap_at_discovery: Option<f64>,
    /// Sequence number assigned by the primal store.
    pub index: u64,
}

impl Solution {
    pub fn new(space: ProblemSpace, origin: SolOrigin) -> Self {
        Self {
            space,
            values: BTreeMap::new(),
            origin,
            linkage: SolLinkage::Unlinked,
            partial: false,
            obj: None,
            provenance: SolProvenance::default(),
            gap_at_discovery: None,
            index: 0,
        }
    }

    /// Creates a partial original-space solution.
    pub fn new_partial() -> Self {
        let mut sol = Self::new(ProblemSpace::Original, SolOrigin::Partial);
        sol.partial = true;
        sol
    }

    /// Creates a solution linked to a relaxation snapshot.
    pub fn linked(origin: SolOrigin, values: impl IntoIterator<Item = (VarId, f64)>) -> Self {
        let mut sol = Self::new(ProblemSpace::Transformed, origin);
        sol.linkage = SolLinkage::Linked;
        sol.values = values.into_iter().collect();
        sol
    }

    pub fn space(&self) -> ProblemSpace {
        self.space
    }

    pub fn is_partial(&self) -> bool {
        self.partial
    }

    /// Turns a partial solution into a complete one.
    pub fn mark_complete(&mut self) {
        self.partial = false;
        if self.origin == SolOrigin::Partial {
            self.origin = SolOrigin::Original;
        }
    }

    /// Detaches the solution from the relaxation it was read from.
    pub fn unlink(&mut self) {
        if self.linkage == SolLinkage::Linked {
            self.linkage = SolLinkage::Unlinked;
            self.origin = SolOrigin::Unknown;
        }
    }

    pub fn set_val(&mut self, var: VarId, value: f64) {
        self.values.insert(var, value);
        self.obj = None;
    }

    /// Stored value, `None` if unassigned.
    pub fn get_stored(&self, var: VarId) -> Option<f64> {
        self.values.get(&var).copied()
    }

    /// Stored value with zero for unassigned entries.
    pub fn raw_val(&self, var: VarId) -> f64 {
        self.values.get(&var).copied().unwrap_or(0.0)
    }

    pub fn values(&self) -> impl Iterator<Item = (VarId, f64)> + '_ {
        self.values.iter().map(|(v, x)| (*v, *x))
    }

    /// Value of any variable of `prob`, resolving fixed, aggregated,
    /// multi-aggregated and negated variables to their definitions.
    pub fn val(&self, prob: &Problem, var: VarId) -> f64 {
        self.resolve_val(prob, var, 0)
    }

    fn resolve_val(&self, prob: &Problem, var: VarId, depth: usize) -> f64 {
        let Some(v) = prob.get_var(var) else {
            return 0.0;
        };
        if let Some(x) = self.values.get(&var) {
            return *x;
        }
        if depth > prob.arena_len() {
            return 0.0;
        }
        match &v.status {
            VarStatus::Original { .. } | VarStatus::Loose | VarStatus::Column => 0.0,
            VarStatus::Fixed => v.glb,
            VarStatus::Aggregated {
                var: base,
                scalar,
                constant,
            } => scalar * self.resolve_val(prob, *base, depth + 1) + constant,
            VarStatus::MultiAggregated {
                vars,
                scalars,
                constant,
            } => {
                constant
                    + vars
                        .iter()
                        .zip(scalars)
                        .map(|(x, s)| s * self.resolve_val(prob, *x, depth + 1))
                        .sum::<f64>()
            }
            VarStatus::Negated {
                var: base,
                constant,
            } => constant - self.resolve_val(prob, *base, depth + 1),
        }
    }

    /// Stores the resolved value of every arena variable and detaches the
    /// solution, so later status changes of `prob` do not alter it.
    pub fn materialize(&mut self, prob: &Problem) {
        let values: BTreeMap<VarId, f64> = (0..prob.arena_len())
            .map(|i| (VarId(i), self.val(prob, VarId(i))))
            .collect();
        self.values = values;
        self.linkage = SolLinkage::Unlinked;
    }

    /// Objective value in the internal space of `prob`.
    pub fn objective(&self, prob: &Problem) -> f64 {
        if let Some(obj) = self.obj {
            return obj;
        }
        prob.obj_value(|v| self.val(prob, v))
    }

    /// Computes and caches the objective value.
    pub fn cache_objective(&mut self, prob: &Problem) -> f64 {
        self.obj = None;
        let obj = self.objective(prob);
        self.obj = Some(obj);
        obj
    }

    /// Copies a transformed-space solution back into the original space.
    pub fn retransform(&self, original: &Problem, transformed: &Problem) -> Solution {
        let mut sol = Solution::new(ProblemSpace::Original, SolOrigin::Original);
        for (idx, _) in original.arena().iter().enumerate() {
            let ovar = VarId(idx);
            if let Some(tvar) = original.transformed_of(ovar) {
                let value = self.val(transformed, tvar);
                if value != 0.0 {
                    sol.values.insert(ovar, value);
                }
            }
        }
        sol.provenance = self.provenance.clone();
        sol.gap_at_discovery = self.gap_at_discovery;
        sol.obj = Some(original.obj_value(|v| sol.raw_val(v)));
        sol
    }

    /// Copies an original-space solution into the transformed space.
    ///
    /// Returns `None` for partial solutions and for values that cannot be
    /// represented because the transformed variable is no longer active
    /// and its resolved value differs.
    pub fn to_transformed(
        &self,
        original: &Problem,
        transformed: &Problem,
        feastol: f64,
    ) -> Option<Solution> {
        if self.partial {
            return None;
        }
        let mut sol = Solution::new(ProblemSpace::Transformed, SolOrigin::Original);
        for (idx, _) in original.arena().iter().enumerate() {
            let ovar = VarId(idx);
            let Some(tvar) = original.transformed_of(ovar) else {
                continue;
            };
            let value = self.raw_val(ovar);
            if transformed.var(tvar).is_active() {
                sol.values.insert(tvar, value);
            }
        }
        for (idx, _) in original.arena().iter().enumerate() {
            let ovar = VarId(idx);
            let Some(tvar) = original.transformed_of(ovar) else {
                continue;
            };
            if !transformed.var(tvar).is_active() {
                let resolved = sol.val(transformed, tvar);
                let wanted = self.raw_val(ovar);
                if (resolved - wanted).abs() > feastol * wanted.abs().max(1.0) {
                    return None;
                }
            }
        }
        sol.provenance = self.provenance.clone();
        Some(sol)
    }
}
