//! Resolution of transformed variables to active representatives.
//!
//! The status graph (aggregated, multi-aggregated, negated) is acyclic.
//! After [`flatten_multi_aggregations`] no multi-aggregation refers to
//! another multi-aggregated variable. Expansions are memoized per
//! variable, so deep shared chains resolve in one pass over the graph.

use std::collections::{HashMap, HashSet};

use super::{Problem, VarId, VarStatus};

/// Outcome of [`active_representatives`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Representation {
    /// `len` entries were written; `constant` collects fixed parts.
    Written { len: usize, constant: f64 },
    /// The buffer was too small; nothing was written.
    NeedsCapacity { required: usize },
}

/// Resolves `scalar * var + constant` along the status chain.
///
/// Stops at an active, fixed or multi-aggregated variable. A fixed
/// terminal folds its value into the constant and returns scalar 0. A
/// multi-aggregation with exactly one term is followed; with more terms
/// the multi-aggregated variable itself is returned.
pub fn probvar_sum(prob: &Problem, var: VarId, scalar: f64, constant: f64) -> (VarId, f64, f64) {
    let mut var = var;
    let mut scalar = scalar;
    let mut constant = constant;
    for _ in 0..=prob.arena_len() {
        let v = prob.var(var);
        match &v.status {
            VarStatus::Original { .. } | VarStatus::Loose | VarStatus::Column => break,
            VarStatus::Fixed => {
                constant += scalar * v.glb;
                scalar = 0.0;
                break;
            }
            VarStatus::Aggregated {
                var: base,
                scalar: a,
                constant: b,
            } => {
                constant += scalar * b;
                scalar *= a;
                var = *base;
            }
            VarStatus::MultiAggregated {
                vars,
                scalars,
                constant: c,
            } => match vars.len() {
                0 => {
                    constant += scalar * c;
                    scalar = 0.0;
                    break;
                }
                1 => {
                    constant += scalar * c;
                    scalar *= scalars[0];
                    var = vars[0];
                }
                _ => break,
            },
            VarStatus::Negated {
                var: base,
                constant: c,
            } => {
                constant += scalar * c;
                scalar = -scalar;
                var = *base;
            }
        }
    }
    (var, scalar, constant)
}

/// Expands a linear combination into active variables.
///
/// Fixed parts go to the returned constant. With `merge` duplicate
/// variables are combined and zero coefficients dropped. If `out` is too
/// small the required size is reported and `out` is left untouched; the
/// caller is expected to grow the buffer and retry.
pub fn active_representatives(
    prob: &Problem,
    terms: &[(VarId, f64)],
    merge: bool,
    out: &mut [(VarId, f64)],
) -> Representation {
    let (expanded, constant) = expand(prob, terms, merge);
    if expanded.len() > out.len() {
        return Representation::NeedsCapacity {
            required: expanded.len(),
        };
    }
    out[..expanded.len()].copy_from_slice(&expanded);
    Representation::Written {
        len: expanded.len(),
        constant,
    }
}

/// Convenience wrapper around [`active_representatives`] that grows its
/// own buffer. Returns the merged active terms and the constant.
pub fn active_linear_terms(prob: &Problem, terms: &[(VarId, f64)]) -> (Vec<(VarId, f64)>, f64) {
    let mut buf = vec![(VarId(0), 0.0); terms.len()];
    loop {
        match active_representatives(prob, terms, true, &mut buf) {
            Representation::Written { len, constant } => {
                buf.truncate(len);
                return (buf, constant);
            }
            Representation::NeedsCapacity { required } => {
                buf.resize(required, (VarId(0), 0.0));
            }
        }
    }
}

fn expand(prob: &Problem, terms: &[(VarId, f64)], merge: bool) -> (Vec<(VarId, f64)>, f64) {
    let mut result = Vec::with_capacity(terms.len());
    let mut constant = 0.0;
    let mut memo: HashMap<VarId, Expansion> = HashMap::new();

    for &(var, scalar) in terms {
        if scalar == 0.0 {
            continue;
        }
        if prob.var(var).status.is_unresolved() {
            result.push((var, scalar));
            continue;
        }
        let exp = expansion_of(prob, var, &mut memo);
        constant += scalar * exp.constant;
        result.extend(exp.terms.iter().map(|&(x, s)| (x, scalar * s)));
    }

    if merge {
        (merge_terms(result), constant)
    } else {
        (result, constant)
    }
}

/// Active terms and constant a single variable stands for.
#[derive(Debug, Clone, Default)]
struct Expansion {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

fn successors(status: &VarStatus) -> &[VarId] {
    match status {
        VarStatus::Aggregated { var, .. } | VarStatus::Negated { var, .. } => std::slice::from_ref(var),
        VarStatus::MultiAggregated { vars, .. } => vars,
        _ => &[],
    }
}

/// Expands `root` bottom-up, memoizing every variable on the way so that
/// shared sub-graphs are resolved once.
fn expansion_of<'m>(prob: &Problem, root: VarId, memo: &'m mut HashMap<VarId, Expansion>) -> &'m Expansion {
    let mut stack = vec![(root, false)];
    // a variable met again before it is expanded would close a cycle
    let mut entered = HashSet::new();
    while let Some((var, ready)) = stack.pop() {
        if memo.contains_key(&var) {
            continue;
        }
        let v = prob.var(var);
        if !ready {
            if !entered.insert(var) {
                continue;
            }
            stack.push((var, true));
            stack.extend(
                successors(&v.status)
                    .iter()
                    .filter(|x| !memo.contains_key(*x))
                    .map(|&x| (x, false)),
            );
            continue;
        }
        let exp = match &v.status {
            VarStatus::Original { .. } | VarStatus::Loose | VarStatus::Column => Expansion {
                terms: vec![(var, 1.0)],
                constant: 0.0,
            },
            VarStatus::Fixed => Expansion {
                terms: Vec::new(),
                constant: v.glb,
            },
            VarStatus::Aggregated {
                var: base,
                scalar: a,
                constant: b,
            } => scaled(memo, &[(*base, *a)], *b),
            VarStatus::MultiAggregated {
                vars,
                scalars,
                constant: c,
            } => {
                let parts: Vec<(VarId, f64)> = vars.iter().copied().zip(scalars.iter().copied()).collect();
                scaled(memo, &parts, *c)
            }
            VarStatus::Negated {
                var: base,
                constant: c,
            } => scaled(memo, &[(*base, -1.0)], *c),
        };
        memo.insert(var, exp);
    }
    &memo[&root]
}

/// `constant + sum(s * expansion(x))` over already memoized parts.
fn scaled(memo: &HashMap<VarId, Expansion>, parts: &[(VarId, f64)], constant: f64) -> Expansion {
    let mut terms = Vec::new();
    let mut constant = constant;
    for (x, s) in parts {
        if let Some(exp) = memo.get(x) {
            constant += s * exp.constant;
            terms.extend(exp.terms.iter().map(|&(y, t)| (y, s * t)));
        }
    }
    Expansion {
        terms: merge_terms(terms),
        constant,
    }
}

/// Sorts by variable, combines duplicates and drops zero coefficients.
fn merge_terms(mut terms: Vec<(VarId, f64)>) -> Vec<(VarId, f64)> {
    terms.sort_by_key(|(v, _)| *v);
    let mut merged: Vec<(VarId, f64)> = Vec::with_capacity(terms.len());
    for (var, coef) in terms {
        match merged.last_mut() {
            Some((last, acc)) if *last == var => *acc += coef,
            _ => merged.push((var, coef)),
        }
    }
    merged.retain(|(_, c)| *c != 0.0);
    merged
}

/// Rewrites every multi-aggregation so that it only refers to active
/// variables. Returns the number of rewritten variables; a second call
/// on a flat graph returns 0 and changes nothing.
pub fn flatten_multi_aggregations(prob: &mut Problem) -> usize {
    let mut rewritten = 0;
    for idx in 0..prob.arena_len() {
        let id = VarId(idx);
        let VarStatus::MultiAggregated {
            vars,
            scalars,
            constant,
        } = &prob.var(id).status
        else {
            continue;
        };
        if vars.iter().all(|x| prob.var(*x).is_active()) {
            continue;
        }
        let terms: Vec<(VarId, f64)> = vars.iter().copied().zip(scalars.iter().copied()).collect();
        let base_constant = *constant;
        let (flat, extra) = active_linear_terms(prob, &terms);
        prob.var_mut(id).status = VarStatus::MultiAggregated {
            vars: flat.iter().map(|(v, _)| *v).collect(),
            scalars: flat.iter().map(|(_, s)| *s).collect(),
            constant: base_constant + extra,
        };
        rewritten += 1;
    }
    rewritten
}

/// Returns true if no multi-aggregation refers to a multi-aggregated variable.
pub fn is_flat(prob: &Problem) -> bool {
    prob.arena().iter().all(|v| match &v.status {
        VarStatus::MultiAggregated { vars, .. } => vars
            .iter()
            .all(|x| !matches!(prob.var(*x).status, VarStatus::MultiAggregated { .. })),
        _ => true,
    })
}
