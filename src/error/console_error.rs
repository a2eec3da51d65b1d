use thiserror::Error;

/// Failure reported by a console sink.
///
/// Sink errors never abort a run; the orchestrator logs them and moves on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConsoleError {
    #[error("Console entry rejected: {0}")]
    Rejected(String),
    #[error("Failed to persist execution result: {0}")]
    Persist(String),
}
