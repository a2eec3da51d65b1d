//! Execution status and result types.

mod result;
mod status;

pub use result::{BlockLog, ExecutionResult, ResultMetadata};
pub use status::{ExecutionStatus, RunState};
