//! Run lifecycle states.

use serde::{Deserialize, Serialize};

/// Observable state of the orchestrator's current run.
///
/// `Running` is refined into `DebugPending`/`DebugStepping` while a debug
/// session is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Running,
    /// Paused between blocks, waiting for `step` or `resume`.
    DebugPending,
    /// A continuation call is in flight.
    DebugStepping,
    Completed,
    Errored,
    Cancelled,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Errored | RunState::Cancelled
        )
    }

    pub fn is_debugging(&self) -> bool {
        matches!(self, RunState::DebugPending | RunState::DebugStepping)
    }

    /// A new run may only start from idle or a terminal state.
    pub fn accepts_new_run(&self) -> bool {
        *self == RunState::Idle || self.is_terminal()
    }
}

/// Final disposition recorded in an [`ExecutionResult`](super::ExecutionResult).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Completed,
    Failed,
    Cancelled,
    DebugPaused,
}
