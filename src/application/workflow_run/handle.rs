//! Observer of the orchestrator's run state.

use tokio::sync::watch;

use crate::domain::RunState;

/// Watches [`RunState`] transitions of an orchestrator.
///
/// Allows polling [`state()`](Self::state) and blocking until the run
/// settles via [`wait_settled()`](Self::wait_settled).
#[derive(Clone)]
pub struct RunStateHandle {
    state_rx: watch::Receiver<RunState>,
}

impl RunStateHandle {
    pub(crate) fn new(state_rx: watch::Receiver<RunState>) -> Self {
        Self { state_rx }
    }

    /// Return the current state (non-blocking).
    pub fn state(&self) -> RunState {
        *self.state_rx.borrow()
    }

    /// Wait for the next transition and return the new state.
    pub async fn changed(&mut self) -> Option<RunState> {
        self.state_rx.changed().await.ok()?;
        Some(*self.state_rx.borrow_and_update())
    }

    /// Block until the run is idle, paused for debugging, or terminal.
    pub async fn wait_settled(&self) -> RunState {
        let mut rx = self.state_rx.clone();
        loop {
            let state = *rx.borrow_and_update();
            match state {
                RunState::Running | RunState::DebugStepping => {
                    if rx.changed().await.is_err() {
                        return *rx.borrow();
                    }
                }
                _ => return state,
            }
        }
    }
}
