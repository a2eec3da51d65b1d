//! Orchestrator-level error types.

use super::{EngineError, TriggerError};
use thiserror::Error;

/// Errors raised by the execution orchestrator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    #[error("No active workflow selected")]
    NoActiveWorkflow,
    #[error("No active workspace selected")]
    NoActiveWorkspace,
    #[error("{0}")]
    Validation(#[from] TriggerError),
    #[error("A run is already in progress")]
    RunInProgress,
    #[error("Cannot continue debugging: missing {missing}")]
    DebugStateMissing { missing: &'static str },
    #[error("Execution failed: {0}")]
    Engine(String),
    #[error("Execution aborted")]
    Aborted,
}

impl ExecutionError {
    /// Pre-execution validation failures, surfaced as a synthetic console entry.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ExecutionError::NoActiveWorkflow
                | ExecutionError::NoActiveWorkspace
                | ExecutionError::Validation(_)
        )
    }
}

impl From<EngineError> for ExecutionError {
    fn from(value: EngineError) -> Self {
        ExecutionError::Engine(super::normalize::normalize_error(&value))
    }
}
