//! Numerical tolerances and comparisons.
//!
//! All tolerance-aware comparisons used by the solver live on [`Numerics`].
//! Values at or beyond `infinity` are treated as infinite.

/// Tolerance set of one solver instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Numerics {
    /// Values with absolute value at least this are infinite.
    pub infinity: f64,
    /// Absolute tolerance for plain comparisons.
    pub epsilon: f64,
    /// Absolute tolerance for comparisons of sums.
    pub sumepsilon: f64,
    /// Feasibility tolerance for constraints and integrality.
    pub feastol: f64,
    /// Minimal relative improvement for a bound change to be applied.
    pub boundstreps: f64,
}

impl Default for Numerics {
    fn default() -> Self {
        Self {
            infinity: 1e20,
            epsilon: 1e-9,
            sumepsilon: 1e-6,
            feastol: 1e-6,
            boundstreps: 0.05,
        }
    }
}

impl Numerics {
    #[inline]
    pub fn is_infinity(&self, val: f64) -> bool {
        val >= self.infinity
    }

    #[inline]
    pub fn is_neg_infinity(&self, val: f64) -> bool {
        val <= -self.infinity
    }

    /// Returns true if `val` is infinite in either direction.
    #[inline]
    pub fn is_infinite(&self, val: f64) -> bool {
        val.abs() >= self.infinity
    }

    /// Clamps infinite values to `+-infinity`.
    #[inline]
    pub fn normalize(&self, val: f64) -> f64 {
        if self.is_infinity(val) {
            self.infinity
        } else if self.is_neg_infinity(val) {
            -self.infinity
        } else {
            val
        }
    }

    #[inline]
    pub fn is_zero(&self, val: f64) -> bool {
        val.abs() <= self.epsilon
    }

    #[inline]
    pub fn is_eq(&self, a: f64, b: f64) -> bool {
        if self.is_infinite(a) || self.is_infinite(b) {
            return (self.is_infinity(a) && self.is_infinity(b))
                || (self.is_neg_infinity(a) && self.is_neg_infinity(b));
        }
        (a - b).abs() <= self.epsilon
    }

    #[inline]
    pub fn is_lt(&self, a: f64, b: f64) -> bool {
        a - b < -self.epsilon
    }

    #[inline]
    pub fn is_le(&self, a: f64, b: f64) -> bool {
        a - b <= self.epsilon
    }

    #[inline]
    pub fn is_gt(&self, a: f64, b: f64) -> bool {
        a - b > self.epsilon
    }

    #[inline]
    pub fn is_ge(&self, a: f64, b: f64) -> bool {
        a - b >= -self.epsilon
    }

    #[inline]
    pub fn is_sum_le(&self, a: f64, b: f64) -> bool {
        a - b <= self.sumepsilon
    }

    /// Relative difference scaled by the larger magnitude (at least 1).
    #[inline]
    fn rel_diff(a: f64, b: f64) -> f64 {
        let scale = a.abs().max(b.abs()).max(1.0);
        (a - b) / scale
    }

    #[inline]
    pub fn is_feas_eq(&self, a: f64, b: f64) -> bool {
        Self::rel_diff(a, b).abs() <= self.feastol
    }

    #[inline]
    pub fn is_feas_le(&self, a: f64, b: f64) -> bool {
        Self::rel_diff(a, b) <= self.feastol
    }

    #[inline]
    pub fn is_feas_ge(&self, a: f64, b: f64) -> bool {
        Self::rel_diff(a, b) >= -self.feastol
    }

    #[inline]
    pub fn is_feas_lt(&self, a: f64, b: f64) -> bool {
        Self::rel_diff(a, b) < -self.feastol
    }

    #[inline]
    pub fn is_feas_gt(&self, a: f64, b: f64) -> bool {
        Self::rel_diff(a, b) > self.feastol
    }

    #[inline]
    pub fn feas_floor(&self, val: f64) -> f64 {
        (val + self.feastol).floor()
    }

    #[inline]
    pub fn feas_ceil(&self, val: f64) -> f64 {
        (val - self.feastol).ceil()
    }

    #[inline]
    pub fn feas_round(&self, val: f64) -> f64 {
        (val + 0.5).floor()
    }

    /// Fractional part with respect to the feasibility tolerance.
    #[inline]
    pub fn feas_frac(&self, val: f64) -> f64 {
        let frac = val - self.feas_floor(val);
        if frac < 0.0 {
            0.0
        } else {
            frac
        }
    }

    #[inline]
    pub fn is_feas_integral(&self, val: f64) -> bool {
        (val - self.feas_round(val)).abs() <= self.feastol
    }

    #[inline]
    pub fn is_integral(&self, val: f64) -> bool {
        (val - (val + 0.5).floor()).abs() <= self.epsilon
    }

    /// Returns true if `new_lb` improves `old_lb` by more than the
    /// bound strengthening tolerance relative to the domain width.
    pub fn is_lb_better(&self, new_lb: f64, old_lb: f64, old_ub: f64) -> bool {
        let eps = old_lb.abs().min(old_ub - old_lb).max(1.0);
        new_lb - old_lb > self.boundstreps * eps
    }

    /// Mirror of [`Numerics::is_lb_better`] for upper bounds.
    pub fn is_ub_better(&self, new_ub: f64, old_lb: f64, old_ub: f64) -> bool {
        let eps = old_ub.abs().min(old_ub - old_lb).max(1.0);
        old_ub - new_ub > self.boundstreps * eps
    }

    /// Rounds a lower bound for a variable of the given integrality.
    pub fn adjusted_lb(&self, integral: bool, lb: f64) -> f64 {
        if self.is_neg_infinity(lb) {
            -self.infinity
        } else if self.is_infinity(lb) {
            self.infinity
        } else if integral {
            self.feas_ceil(lb)
        } else if self.is_zero(lb) {
            0.0
        } else {
            lb
        }
    }

    /// Rounds an upper bound for a variable of the given integrality.
    pub fn adjusted_ub(&self, integral: bool, ub: f64) -> f64 {
        if self.is_infinity(ub) {
            self.infinity
        } else if self.is_neg_infinity(ub) {
            -self.infinity
        } else if integral {
            self.feas_floor(ub)
        } else if self.is_zero(ub) {
            0.0
        } else {
            ub
        }
    }

    /// Delta subtracted from an integral incumbent to form the cutoff bound.
    pub fn cutoff_bound_delta(&self) -> f64 {
        (100.0 * self.feastol).min(1e-4)
    }
}
