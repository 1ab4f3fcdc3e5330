//! Error types for MipForge

use thiserror::Error;

use crate::stage::{Operation, Stage};

/// Main error type for MipForge operations.
///
/// Infeasibility, unboundedness and resource limits are solve outcomes,
/// not errors; they are reported through [`crate::SolveStatus`].
#[derive(Debug, Error)]
pub enum MipError {
    /// Operation invoked in a stage outside its whitelist.
    #[error("invalid call: {operation:?} is not allowed in stage {stage:?}")]
    InvalidCall {
        /// The rejected operation.
        operation: Operation,
        /// The stage the solver was in.
        stage: Stage,
    },

    /// Caller supplied semantically wrong input.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A required plugin is not registered.
    #[error("plugin not found: {0}")]
    PluginNotFound(String),

    /// The relaxation oracle failed in a way that cannot be handled locally.
    #[error("LP error: {0}")]
    Lp(String),

    /// Error in solver configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error (should not occur in normal operation)
    #[error("internal error: {0}")]
    Internal(String),
}

impl MipError {
    /// Returns true for the invalid-call kind.
    pub fn is_invalid_call(&self) -> bool {
        matches!(self, MipError::InvalidCall { .. })
    }
}

/// Result type alias for MipForge operations
pub type Result<T> = std::result::Result<T, MipError>;
