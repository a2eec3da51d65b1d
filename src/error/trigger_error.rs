//! Validation errors raised while choosing a run's start block.

use thiserror::Error;

/// Trigger resolution failures. All of them are fatal to the attempted run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriggerError {
    #[error("No Chat trigger configured for this workflow")]
    NoChatTrigger,
    #[error("Workflow requires at least one trigger block to execute")]
    NoTrigger,
    #[error("No API entry point configured for this workflow")]
    NoApiEntry,
    #[error("Multiple API Trigger blocks found ({count}). Keep only one.")]
    MultipleApiTriggers { count: usize },
    #[error("{name} is not connected to any blocks. Connect it to a block to run the workflow.")]
    DisconnectedTrigger { block_id: String, name: String },
}
