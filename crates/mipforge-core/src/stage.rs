//! Solver stages and the stage-gating table.
//!
//! Every public operation of the solver is listed in [`Operation`] together
//! with the set of stages in which it may be called. A single guard,
//! [`check_stage`], rejects calls from any other stage with
//! [`MipError::InvalidCall`] before the operation touches any state.
//!
//! # Example
//!
//! ```
//! use mipforge_core::stage::{check_stage, Operation, Stage};
//!
//! assert!(check_stage(Operation::AggregateVars, Stage::Presolving).is_ok());
//! assert!(check_stage(Operation::AggregateVars, Stage::Solving).is_err());
//! ```

use std::fmt;

use crate::error::{MipError, Result};

/// Lifecycle stage of a solver instance.
///
/// Declaration order is the forward order of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Stage {
    /// Solver instance is being created.
    Init,
    /// The original problem is being specified.
    Problem,
    /// The transformed problem is being built.
    Transforming,
    /// The transformed problem exists, presolving has not started.
    Transformed,
    /// Presolving data structures are being initialized.
    InitPresolve,
    /// Presolving rounds are running.
    Presolving,
    /// Presolving is being finalized.
    ExitPresolve,
    /// Presolving finished.
    Presolved,
    /// Search data structures are being initialized.
    InitSolve,
    /// Branch-and-bound is running.
    Solving,
    /// The problem has been solved (or solving stopped).
    Solved,
    /// Search data structures are being freed.
    ExitSolve,
    /// The transformed problem is being freed.
    FreeTrans,
    /// Solver instance is being destroyed.
    Free,
}

impl Stage {
    const ALL: [Stage; 14] = [
        Stage::Init,
        Stage::Problem,
        Stage::Transforming,
        Stage::Transformed,
        Stage::InitPresolve,
        Stage::Presolving,
        Stage::ExitPresolve,
        Stage::Presolved,
        Stage::InitSolve,
        Stage::Solving,
        Stage::Solved,
        Stage::ExitSolve,
        Stage::FreeTrans,
        Stage::Free,
    ];

    #[inline]
    fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Returns true if a transformed problem exists in this stage.
    pub fn has_transformed_problem(self) -> bool {
        (Stage::Transforming..=Stage::FreeTrans).contains(&self)
    }

    /// Returns true if the search tree exists in this stage.
    pub fn has_tree(self) -> bool {
        (Stage::InitSolve..=Stage::ExitSolve).contains(&self)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "INIT",
            Stage::Problem => "PROBLEM",
            Stage::Transforming => "TRANSFORMING",
            Stage::Transformed => "TRANSFORMED",
            Stage::InitPresolve => "INITPRESOLVE",
            Stage::Presolving => "PRESOLVING",
            Stage::ExitPresolve => "EXITPRESOLVE",
            Stage::Presolved => "PRESOLVED",
            Stage::InitSolve => "INITSOLVE",
            Stage::Solving => "SOLVING",
            Stage::Solved => "SOLVED",
            Stage::ExitSolve => "EXITSOLVE",
            Stage::FreeTrans => "FREETRANS",
            Stage::Free => "FREE",
        };
        f.write_str(name)
    }
}

/// A set of stages stored as a bit mask.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct StageSet(u16);

impl StageSet {
    /// The empty set.
    pub const EMPTY: StageSet = StageSet(0);

    /// Builds a set from a slice of stages.
    pub fn of(stages: &[Stage]) -> Self {
        StageSet(stages.iter().fold(0, |mask, s| mask | s.bit()))
    }

    /// Returns true if the set contains `stage`.
    #[inline]
    pub fn contains(self, stage: Stage) -> bool {
        self.0 & stage.bit() != 0
    }

    /// Iterates the contained stages in lifecycle order.
    pub fn iter(self) -> impl Iterator<Item = Stage> {
        Stage::ALL.into_iter().filter(move |s| self.contains(*s))
    }
}

impl fmt::Debug for StageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Public operations subject to stage gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    TransformProblem,
    Presolve,
    Solve,
    FreeSolve,
    FreeReoptSolve,
    FreeTransform,
    InterruptSolve,
    RestartSolve,
    AddVar,
    AddCons,
    ChgVarObj,
    ChgVarLb,
    ChgVarUb,
    ChgVarLbGlobal,
    ChgVarUbGlobal,
    TightenVarLb,
    TightenVarUb,
    InferVarLb,
    InferVarUb,
    InferBinvar,
    FixVar,
    AggregateVars,
    MultiaggregateVar,
    ChgVarType,
    FlattenMultiAggregations,
    GetNegatedVar,
    AddClique,
    CreateSol,
    CreatePartialSol,
    SetSolVal,
    TrySol,
    AddSol,
    CheckSol,
    GetBestSol,
    CreateFiniteSolCopy,
    StartProbing,
    NewProbingNode,
    BacktrackProbing,
    EndProbing,
    SetObjLimit,
    ChgReoptObjective,
    GetDualBound,
}

impl Operation {
    /// Returns the stages in which this operation may be called.
    pub fn allowed_stages(self) -> StageSet {
        use Stage::*;
        match self {
            Operation::TransformProblem => StageSet::of(&[
                Problem,
                Transformed,
                InitPresolve,
                Presolving,
                ExitPresolve,
                Presolved,
                InitSolve,
                Solving,
                Solved,
            ]),
            Operation::Presolve => {
                StageSet::of(&[Problem, Transformed, Presolving, Presolved, Solved])
            }
            Operation::Solve => StageSet::of(&[
                Problem,
                Transformed,
                Presolving,
                Presolved,
                Solving,
                Solved,
            ]),
            Operation::FreeSolve | Operation::FreeReoptSolve | Operation::FreeTransform => {
                StageSet::of(&[
                    Init,
                    Problem,
                    Transformed,
                    Presolving,
                    Presolved,
                    Solving,
                    Solved,
                ])
            }
            Operation::InterruptSolve => StageSet::of(&[
                Problem,
                Transforming,
                Transformed,
                InitPresolve,
                Presolving,
                ExitPresolve,
                Presolved,
                InitSolve,
                Solving,
                Solved,
                ExitSolve,
            ]),
            Operation::RestartSolve => StageSet::of(&[Presolving, Solving]),
            Operation::AddVar => StageSet::of(&[
                Problem,
                Transforming,
                InitPresolve,
                Presolving,
                ExitPresolve,
                Presolved,
                Solving,
            ]),
            Operation::AddCons => StageSet::of(&[
                Problem,
                Transformed,
                InitPresolve,
                Presolving,
                ExitPresolve,
                Presolved,
                InitSolve,
                Solving,
                ExitSolve,
            ]),
            Operation::ChgVarObj => {
                StageSet::of(&[Problem, Transforming, Presolving, Presolved])
            }
            Operation::ChgVarLb
            | Operation::ChgVarUb
            | Operation::TightenVarLb
            | Operation::TightenVarUb
            | Operation::InferVarLb
            | Operation::InferVarUb
            | Operation::InferBinvar => StageSet::of(&[
                Problem,
                Transforming,
                Transformed,
                InitPresolve,
                Presolving,
                ExitPresolve,
                Presolved,
                Solving,
            ]),
            Operation::ChgVarLbGlobal | Operation::ChgVarUbGlobal => StageSet::of(&[
                Problem,
                Transforming,
                Transformed,
                InitPresolve,
                Presolving,
                ExitPresolve,
                Presolved,
                InitSolve,
                Solving,
            ]),
            Operation::FixVar => StageSet::of(&[Problem, Presolving, Solving]),
            Operation::AggregateVars | Operation::MultiaggregateVar => {
                StageSet::of(&[Presolving])
            }
            Operation::ChgVarType => StageSet::of(&[Problem, Transforming, Presolving]),
            Operation::FlattenMultiAggregations => {
                StageSet::of(&[Presolving, ExitPresolve, Presolved, Solving])
            }
            Operation::GetNegatedVar => StageSet::of(&[
                Transforming,
                Transformed,
                InitPresolve,
                Presolving,
                ExitPresolve,
                Presolved,
                InitSolve,
                Solving,
            ]),
            Operation::AddClique => {
                StageSet::of(&[Transformed, InitPresolve, Presolving, ExitPresolve, Solving])
            }
            Operation::CreateSol | Operation::SetSolVal | Operation::CreateFiniteSolCopy => {
                StageSet::of(&[
                    Problem,
                    Transforming,
                    Transformed,
                    InitPresolve,
                    Presolving,
                    ExitPresolve,
                    Presolved,
                    InitSolve,
                    Solving,
                    Solved,
                ])
            }
            Operation::CreatePartialSol => StageSet::of(&[Problem]),
            Operation::TrySol => StageSet::of(&[
                Transformed,
                InitPresolve,
                Presolving,
                ExitPresolve,
                Presolved,
                InitSolve,
                Solving,
            ]),
            Operation::AddSol => StageSet::of(&[
                Problem,
                Transforming,
                Transformed,
                InitPresolve,
                Presolving,
                ExitPresolve,
                Presolved,
                InitSolve,
                Solving,
            ]),
            Operation::CheckSol => StageSet::of(&[
                Problem,
                Transformed,
                InitPresolve,
                Presolving,
                ExitPresolve,
                Presolved,
                InitSolve,
                Solving,
                Solved,
            ]),
            Operation::GetBestSol => StageSet::of(&[
                Problem,
                Transforming,
                Transformed,
                InitPresolve,
                Presolving,
                ExitPresolve,
                Presolved,
                InitSolve,
                Solving,
                Solved,
                ExitSolve,
            ]),
            Operation::StartProbing
            | Operation::NewProbingNode
            | Operation::BacktrackProbing
            | Operation::EndProbing => StageSet::of(&[Presolving, Solving]),
            Operation::SetObjLimit => StageSet::of(&[Problem, Transformed, Presolving, Presolved]),
            Operation::ChgReoptObjective => StageSet::of(&[Problem]),
            Operation::GetDualBound => StageSet::of(&[
                Transformed,
                InitPresolve,
                Presolving,
                ExitPresolve,
                Presolved,
                InitSolve,
                Solving,
                Solved,
            ]),
        }
    }
}

/// Rejects `operation` unless `stage` is in its whitelist.
#[inline]
pub fn check_stage(operation: Operation, stage: Stage) -> Result<()> {
    if operation.allowed_stages().contains(stage) {
        Ok(())
    } else {
        Err(MipError::InvalidCall { operation, stage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_follows_lifecycle() {
        assert!(Stage::Problem < Stage::Transformed);
        assert!(Stage::Presolving < Stage::Presolved);
        assert!(Stage::Solving < Stage::Solved);
        assert!(Stage::Solved < Stage::ExitSolve);
    }

    #[test]
    fn test_stage_set_contains() {
        let set = StageSet::of(&[Stage::Problem, Stage::Solving]);
        assert!(set.contains(Stage::Problem));
        assert!(set.contains(Stage::Solving));
        assert!(!set.contains(Stage::Presolving));
        assert!(!StageSet::EMPTY.contains(Stage::Init));
    }

    #[test]
    fn test_stage_set_iter_in_order() {
        let set = StageSet::of(&[Stage::Solved, Stage::Problem]);
        let stages: Vec<Stage> = set.iter().collect();
        assert_eq!(stages, vec![Stage::Problem, Stage::Solved]);
    }

    #[test]
    fn test_check_stage_rejects_outside_whitelist() {
        let err = check_stage(Operation::MultiaggregateVar, Stage::Problem).unwrap_err();
        assert!(err.is_invalid_call());
        assert!(check_stage(Operation::RestartSolve, Stage::Solving).is_ok());
        assert!(check_stage(Operation::RestartSolve, Stage::Solved).is_err());
    }

    #[test]
    fn test_tree_and_transformed_ranges() {
        assert!(!Stage::Problem.has_transformed_problem());
        assert!(Stage::Presolved.has_transformed_problem());
        assert!(Stage::Solving.has_tree());
        assert!(!Stage::Presolved.has_tree());
    }

    #[test]
    fn test_display() {
        assert_eq!(Stage::InitPresolve.to_string(), "INITPRESOLVE");
        assert_eq!(Stage::FreeTrans.to_string(), "FREETRANS");
    }
}
