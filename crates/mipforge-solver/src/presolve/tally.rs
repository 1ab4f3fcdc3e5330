//! Reduction counters reported by presolving plugins.

use std::ops::{AddAssign, Sub};

/// Counts of reductions, accumulated by plugins during presolving.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresolveTally {
    pub fixed_vars: u64,
    pub aggr_vars: u64,
    pub chg_var_types: u64,
    pub chg_bds: u64,
    pub add_holes: u64,
    pub del_conss: u64,
    pub add_conss: u64,
    pub upgd_conss: u64,
    pub chg_coefs: u64,
    pub chg_sides: u64,
}

impl PresolveTally {
    /// Total number of reductions of any kind.
    pub fn total(&self) -> u64 {
        self.fixed_vars
            + self.aggr_vars
            + self.chg_var_types
            + self.chg_bds
            + self.add_holes
            + self.del_conss
            + self.add_conss
            + self.upgd_conss
            + self.chg_coefs
            + self.chg_sides
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Returns true if the reductions since `last` are below the relative
    /// threshold `abort_fac` for a problem of the given size.
    pub fn is_finished_since(&self, last: &PresolveTally, abort_fac: f64, nvars: usize, nconss: usize) -> bool {
        let d = *self - *last;
        let nvars = nvars as f64;
        let nconss = nconss as f64;
        let var_red = (d.fixed_vars + d.aggr_vars + d.chg_var_types) as f64
            + d.chg_bds as f64 / 10.0
            + d.add_holes as f64 / 10.0;
        let cons_red = (d.del_conss + d.add_conss + d.upgd_conss + d.chg_sides) as f64;
        var_red <= abort_fac * nvars
            && cons_red <= abort_fac * nconss
            && d.chg_coefs as f64 <= abort_fac * 0.01 * nvars * nconss
    }
}

impl AddAssign for PresolveTally {
    fn add_assign(&mut self, rhs: Self) {
        self.fixed_vars += rhs.fixed_vars;
        self.aggr_vars += rhs.aggr_vars;
        self.chg_var_types += rhs.chg_var_types;
        self.chg_bds += rhs.chg_bds;
        self.add_holes += rhs.add_holes;
        self.del_conss += rhs.del_conss;
        self.add_conss += rhs.add_conss;
        self.upgd_conss += rhs.upgd_conss;
        self.chg_coefs += rhs.chg_coefs;
        self.chg_sides += rhs.chg_sides;
    }
}

impl Sub for PresolveTally {
    type Output = PresolveTally;

    /// Saturating difference; tallies only grow within a run.
    fn sub(self, rhs: Self) -> Self::Output {
        PresolveTally {
            fixed_vars: self.fixed_vars.saturating_sub(rhs.fixed_vars),
            aggr_vars: self.aggr_vars.saturating_sub(rhs.aggr_vars),
            chg_var_types: self.chg_var_types.saturating_sub(rhs.chg_var_types),
            chg_bds: self.chg_bds.saturating_sub(rhs.chg_bds),
            add_holes: self.add_holes.saturating_sub(rhs.add_holes),
            del_conss: self.del_conss.saturating_sub(rhs.del_conss),
            add_conss: self.add_conss.saturating_sub(rhs.add_conss),
            upgd_conss: self.upgd_conss.saturating_sub(rhs.upgd_conss),
            chg_coefs: self.chg_coefs.saturating_sub(rhs.chg_coefs),
            chg_sides: self.chg_sides.saturating_sub(rhs.chg_sides),
        }
    }
}
