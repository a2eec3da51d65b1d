//! Error types for the canvas core.
//!
//! - [`TriggerError`]: Validation failures while choosing a start block.
//! - [`ExecutionError`]: Orchestrator-level failures (debug state, engine, validation).
//! - [`EngineError`]: Failures reported by the remote execution engine.
//! - [`ConsoleError`]: Console sink failures, logged and swallowed.
//! - [`normalize`]: Collapsing engine error payloads into user-facing messages.

pub mod console_error;
pub mod engine_error;
pub mod execution_error;
pub mod normalize;
pub mod trigger_error;

pub use console_error::ConsoleError;
pub use engine_error::{EngineError, RATE_LIMIT_EXCEEDED};
pub use execution_error::ExecutionError;
pub use normalize::{
    normalize_error, normalize_error_message, normalize_error_value, GENERIC_EXECUTION_ERROR,
};
pub use trigger_error::TriggerError;

pub use crate::store::StoreError;
pub use crate::config::ConfigError;

/// Convenience alias for orchestrator results.
pub type OrchestratorResult<T> = Result<T, ExecutionError>;
