//! Composite termination conditions (AND/OR).
//!
//! Uses macro-generated tuple implementations for zero type erasure.

use mipforge_core::SolveStatus;

use super::Termination;
use crate::scope::SolverScope;

/// Combines terminations with OR logic; the first firing child wins.
///
/// # Examples
///
/// ```
/// use mipforge_solver::termination::{NodeTermination, OrTermination, TimeTermination};
///
/// // Stop after 30 seconds or 1000 nodes
/// let termination = OrTermination((
///     TimeTermination::seconds(30),
///     NodeTermination::new(1000),
/// ));
/// ```
#[derive(Debug)]
pub struct OrTermination<T>(pub T);

impl<T> OrTermination<T> {
    pub fn new(terminations: T) -> Self {
        Self(terminations)
    }
}

macro_rules! impl_or_termination {
    ($($idx:tt: $T:ident),+) => {
        impl<$($T),+> Termination for OrTermination<($($T,)+)>
        where
            $($T: Termination,)+
        {
            fn check(&self, scope: &SolverScope) -> Option<SolveStatus> {
                None$(.or_else(|| (self.0).$idx.check(scope)))+
            }
        }
    };
}

impl_or_termination!(0: T0);
impl_or_termination!(0: T0, 1: T1);
impl_or_termination!(0: T0, 1: T1, 2: T2);
impl_or_termination!(0: T0, 1: T1, 2: T2, 3: T3);
impl_or_termination!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4);
impl_or_termination!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5);
impl_or_termination!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6);
impl_or_termination!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6, 7: T7);

/// Combines terminations with AND logic; fires only when every child fires,
/// reporting the status of the first child.
#[derive(Debug)]
pub struct AndTermination<T>(pub T);

impl<T> AndTermination<T> {
    pub fn new(terminations: T) -> Self {
        Self(terminations)
    }
}

macro_rules! impl_and_termination {
    ($first:tt: $F:ident $(, $idx:tt: $T:ident)*) => {
        impl<$F $(, $T)*> Termination for AndTermination<($F, $($T,)*)>
        where
            $F: Termination,
            $($T: Termination,)*
        {
            fn check(&self, scope: &SolverScope) -> Option<SolveStatus> {
                let status = (self.0).$first.check(scope)?;
                $((self.0).$idx.check(scope)?;)*
                Some(status)
            }
        }
    };
}

impl_and_termination!(0: T0);
impl_and_termination!(0: T0, 1: T1);
impl_and_termination!(0: T0, 1: T1, 2: T2);
impl_and_termination!(0: T0, 1: T1, 2: T2, 3: T3);
impl_and_termination!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4);
impl_and_termination!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5);
impl_and_termination!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6);
impl_and_termination!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6, 7: T7);
