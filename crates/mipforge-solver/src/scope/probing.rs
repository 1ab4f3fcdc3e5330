//! Probing: tentative local bound changes undone by backtracking.

use mipforge_core::{check_stage, MipError, Operation, Result};

use super::SolverScope;
use crate::tree::NodeId;

impl SolverScope {
    /// Opens a probing scope below the focus node (or the presolving root).
    pub fn start_probing(&mut self) -> Result<()> {
        check_stage(Operation::StartProbing, self.stage)?;
        if !self.tree.start_probing() {
            return Err(MipError::InvalidData("probing is already active".to_string()));
        }
        tracing::trace!(depth = self.tree.focus_depth(), "probing started");
        Ok(())
    }

    /// Pushes a probing node; later bound changes can be undone up to it.
    pub fn new_probing_node(&mut self) -> Result<NodeId> {
        check_stage(Operation::NewProbingNode, self.stage)?;
        self.tree
            .new_probing_node()
            .ok_or_else(|| MipError::InvalidData("not in probing mode".to_string()))
    }

    /// Current probing depth, zero at the first probing node.
    pub fn probing_depth(&self) -> Option<u32> {
        self.tree.probing().map(|p| p.depth())
    }

    /// Undoes every probing node deeper than `depth`, restoring the local
    /// bounds bit for bit.
    pub fn backtrack_probing(&mut self, depth: u32) -> Result<()> {
        check_stage(Operation::BacktrackProbing, self.stage)?;
        let Some(current) = self.probing_depth() else {
            return Err(MipError::InvalidData("not in probing mode".to_string()));
        };
        if depth > current {
            return Err(MipError::InvalidData(format!(
                "cannot backtrack to depth {depth} from probing depth {current}"
            )));
        }
        let Some(prob) = self.transformed.as_mut() else {
            return Err(MipError::Internal("probing without transformed problem".to_string()));
        };
        self.tree.backtrack_probing(depth, prob);
        Ok(())
    }

    /// Undoes all probing changes and closes the scope.
    pub fn end_probing(&mut self) -> Result<()> {
        check_stage(Operation::EndProbing, self.stage)?;
        if !self.tree.in_probing() {
            return Err(MipError::InvalidData("not in probing mode".to_string()));
        }
        let Some(prob) = self.transformed.as_mut() else {
            return Err(MipError::Internal("probing without transformed problem".to_string()));
        };
        self.tree.end_probing(prob);
        tracing::trace!("probing ended");
        Ok(())
    }
}
