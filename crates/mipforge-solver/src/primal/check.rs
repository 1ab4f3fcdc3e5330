//! Feasibility check of solutions.
//!
//! Checks run from cheap to expensive: variable bounds, handlers with
//! non-negative check priority that need no constraints, explicit
//! constraints, and finally handlers with negative check priority.
//! Without `completely` the first failing stage ends the check.

use std::fmt;

use mipforge_core::{ConsId, MipError, Numerics, Problem, Result, Solution, VarId};

use crate::plugin::ConstraintHandler;

/// Aspects of feasibility to verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckFlags {
    pub bounds: bool,
    pub integrality: bool,
    /// Also check constraints that are rows of the LP.
    pub lp_rows: bool,
    /// Accumulate every violation instead of stopping at the first stage.
    pub completely: bool,
    /// Check modifiable constraints as well.
    pub allow_modifiable: bool,
}

impl Default for CheckFlags {
    fn default() -> Self {
        Self {
            bounds: true,
            integrality: true,
            lp_rows: true,
            completely: false,
            allow_modifiable: false,
        }
    }
}

impl CheckFlags {
    pub fn completely() -> Self {
        Self {
            completely: true,
            ..Self::default()
        }
    }
}

/// One reason a solution is infeasible.
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    Bound { var: VarId, value: f64, lb: f64, ub: f64 },
    Integrality { var: VarId, value: f64 },
    Constraint { cons: ConsId, activity: f64, lhs: f64, rhs: f64 },
    Handler { handler: String, message: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Bound { var, value, lb, ub } => {
                write!(f, "{var} = {value} violates bounds [{lb}, {ub}]")
            }
            Violation::Integrality { var, value } => write!(f, "{var} = {value} is fractional"),
            Violation::Constraint {
                cons,
                activity,
                lhs,
                rhs,
            } => write!(f, "{cons}: activity {activity} outside [{lhs}, {rhs}]"),
            Violation::Handler { handler, message } => write!(f, "{handler}: {message}"),
        }
    }
}

/// Outcome of a feasibility check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckReport {
    pub violations: Vec<Violation>,
}

impl CheckReport {
    pub fn is_feasible(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Checks `sol` against `prob`.
///
/// Partial solutions are rejected with `InvalidData`.
pub fn check_solution(
    prob: &Problem,
    num: &Numerics,
    handlers: &[Box<dyn ConstraintHandler>],
    sol: &Solution,
    flags: &CheckFlags,
) -> Result<CheckReport> {
    if sol.is_partial() {
        return Err(MipError::InvalidData(
            "partial solutions must be completed before checking".to_string(),
        ));
    }
    let mut report = CheckReport::default();
    let stop = |report: &CheckReport| !flags.completely && !report.is_feasible();

    if flags.bounds {
        for (idx, var) in prob.arena().iter().enumerate() {
            let id = VarId(idx);
            let value = sol.val(prob, id);
            let lb_ok = num.is_infinite(var.glb) || num.is_feas_ge(value, var.glb);
            let ub_ok = num.is_infinite(var.gub) || num.is_feas_le(value, var.gub);
            if !lb_ok || !ub_ok {
                report.violations.push(Violation::Bound {
                    var: id,
                    value,
                    lb: var.glb,
                    ub: var.gub,
                });
                if !flags.completely {
                    break;
                }
            }
        }
        if stop(&report) {
            return Ok(report);
        }
    }

    for h in handlers
        .iter()
        .filter(|h| h.check_priority() >= 0 && !h.needs_constraints())
    {
        report.violations.extend(h.check(prob, num, &[], sol, flags));
        if stop(&report) {
            return Ok(report);
        }
    }

    for h in handlers
        .iter()
        .filter(|h| h.check_priority() >= 0 && h.needs_constraints())
    {
        let conss = checked_conss(prob, h.name(), flags);
        if conss.is_empty() {
            continue;
        }
        report.violations.extend(h.check(prob, num, &conss, sol, flags));
        if stop(&report) {
            return Ok(report);
        }
    }

    for h in handlers.iter().filter(|h| h.check_priority() < 0) {
        let conss = if h.needs_constraints() {
            checked_conss(prob, h.name(), flags)
        } else {
            Vec::new()
        };
        report.violations.extend(h.check(prob, num, &conss, sol, flags));
        if stop(&report) {
            return Ok(report);
        }
    }
    Ok(report)
}

fn checked_conss(prob: &Problem, handler: &str, flags: &CheckFlags) -> Vec<ConsId> {
    prob.conss()
        .filter(|(_, c)| c.handler == handler && c.flags.check)
        .filter(|(_, c)| flags.allow_modifiable || !c.flags.modifiable)
        .filter(|(_, c)| flags.lp_rows || !c.flags.initial)
        .map(|(id, _)| id)
        .collect()
}
