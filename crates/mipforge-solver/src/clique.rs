//! Clique table over binary literals.
//!
//! A clique states that at most one of its literals is true. A literal
//! `(x, true)` stands for `x = 1`, `(x, false)` for `x = 0`.

use mipforge_core::domain::probvar_sum;
use mipforge_core::{Problem, VarId};

pub type Literal = (VarId, bool);

#[derive(Debug, Clone, PartialEq)]
pub struct Clique {
    pub lits: Vec<Literal>,
}

/// Result of [`CliqueTable::cleanup`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliqueCleanup {
    /// Cliques removed because they became trivial or duplicated.
    pub removed: usize,
    /// Fixings implied by the cliques, to be applied by the caller.
    pub fixings: Vec<(VarId, f64)>,
    /// A clique with two true literals was found.
    pub infeasible: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CliqueTable {
    cliques: Vec<Clique>,
}

impl CliqueTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a clique. Cliques with fewer than two literals are ignored.
    pub fn add(&mut self, lits: Vec<Literal>) -> bool {
        if lits.len() < 2 {
            return false;
        }
        self.cliques.push(Clique { lits });
        true
    }

    pub fn len(&self) -> usize {
        self.cliques.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cliques.is_empty()
    }

    pub fn cliques(&self) -> &[Clique] {
        &self.cliques
    }

    pub fn clear(&mut self) {
        self.cliques.clear();
    }

    /// Resolves literals to active variables, drops fixed-false literals,
    /// derives fixings from fixed-true literals and complementary pairs,
    /// and removes trivial and duplicate cliques.
    pub fn cleanup(&mut self, prob: &Problem) -> CliqueCleanup {
        let mut result = CliqueCleanup::default();
        let mut kept: Vec<Clique> = Vec::with_capacity(self.cliques.len());

        for clique in self.cliques.drain(..) {
            let mut lits: Vec<Literal> = Vec::with_capacity(clique.lits.len());
            let mut ntrue = 0usize;
            let mut expressible = true;
            for (var, value) in clique.lits {
                let (base, scalar, constant) = probvar_sum(prob, var, 1.0, 0.0);
                if scalar == 0.0 {
                    let lit_true = (constant > 0.5) == value;
                    if lit_true {
                        ntrue += 1;
                    }
                    continue;
                }
                let base_var = prob.var(base);
                if base_var.glb == base_var.gub {
                    let at = scalar * base_var.glb + constant;
                    if (at > 0.5) == value {
                        ntrue += 1;
                    }
                    continue;
                }
                let polarity = if scalar == 1.0 && constant == 0.0 {
                    value
                } else if scalar == -1.0 && constant == 1.0 {
                    !value
                } else {
                    expressible = false;
                    break;
                };
                lits.push((base, polarity));
            }
            if !expressible {
                result.removed += 1;
                continue;
            }
            if ntrue > 1 {
                result.infeasible = true;
                result.removed += 1;
                continue;
            }

            lits.sort_by_key(|(v, p)| (*v, *p));
            lits.dedup();
            let complementary = lits.windows(2).find(|w| w[0].0 == w[1].0).map(|w| w[0].0);

            if ntrue == 1 || complementary.is_some() {
                for &(var, polarity) in &lits {
                    if Some(var) == complementary {
                        continue;
                    }
                    result.fixings.push((var, if polarity { 0.0 } else { 1.0 }));
                }
                result.removed += 1;
                continue;
            }
            if lits.len() < 2 || kept.iter().any(|c| c.lits == lits) {
                result.removed += 1;
                continue;
            }
            kept.push(Clique { lits });
        }

        result.fixings.sort_by_key(|(v, _)| *v);
        result.fixings.dedup_by(|a, b| a.0 == b.0 && a.1 == b.1);
        if result.fixings.windows(2).any(|w| w[0].0 == w[1].0) {
            result.infeasible = true;
        }
        self.cliques = kept;
        result
    }
}

#[cfg(test)]
mod tests {
    use mipforge_core::{Numerics, Var, VarStatus};

    use super::*;

    fn binaries(n: usize) -> Problem {
        let mut orig = Problem::new("bins");
        for i in 0..n {
            orig.add_var(Var::binary(format!("b{i}"), 0.0));
        }
        orig.transform(&Numerics::default())
    }

    #[test]
    fn test_small_cliques_ignored() {
        let mut table = CliqueTable::new();
        assert!(!table.add(vec![(VarId(0), true)]));
        assert!(table.add(vec![(VarId(0), true), (VarId(1), true)]));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_cleanup_removes_duplicates() {
        let prob = binaries(3);
        let mut table = CliqueTable::new();
        table.add(vec![(VarId(0), true), (VarId(1), true)]);
        table.add(vec![(VarId(1), true), (VarId(0), true)]);
        table.add(vec![(VarId(1), true), (VarId(2), false)]);

        let result = table.cleanup(&prob);
        assert_eq!(result.removed, 1);
        assert!(result.fixings.is_empty());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_fixed_true_literal_forces_others() {
        let mut prob = binaries(3);
        prob.var_mut(VarId(0)).glb = 1.0;
        prob.var_mut(VarId(0)).status = VarStatus::Fixed;
        let mut table = CliqueTable::new();
        table.add(vec![(VarId(0), true), (VarId(1), true), (VarId(2), false)]);

        let result = table.cleanup(&prob);
        assert!(!result.infeasible);
        assert_eq!(result.fixings, vec![(VarId(1), 0.0), (VarId(2), 1.0)]);
        assert!(table.is_empty());
    }

    #[test]
    fn test_complementary_pair_forces_others() {
        let prob = binaries(3);
        let mut table = CliqueTable::new();
        table.add(vec![(VarId(0), true), (VarId(0), false), (VarId(2), true)]);

        let result = table.cleanup(&prob);
        assert_eq!(result.fixings, vec![(VarId(2), 0.0)]);
    }

    #[test]
    fn test_negated_literal_resolves_to_base() {
        let mut prob = binaries(2);
        let neg = prob.add_inactive_var(Var::binary("neg", 0.0));
        prob.var_mut(neg).status = VarStatus::Negated {
            var: VarId(0),
            constant: 1.0,
        };
        let mut table = CliqueTable::new();
        table.add(vec![(neg, true), (VarId(1), true)]);

        table.cleanup(&prob);
        assert_eq!(table.cliques()[0].lits, vec![(VarId(0), false), (VarId(1), true)]);
    }
}
