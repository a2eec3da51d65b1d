//! Run orchestration: start, stream reconciliation, debug stepping, cancel.

mod handle;
mod orchestrator;
mod request;

pub use handle::RunStateHandle;
pub use orchestrator::ExecutionOrchestrator;
pub use request::RunRequest;
