use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Per-run abort signal.
///
/// Every run gets a fresh token; once cancelled it stays cancelled, so late
/// events from an old run can always be told apart from a new run's.
#[derive(Clone, Debug, Default)]
pub struct RunCancellation {
    run_id: String,
    token: CancellationToken,
}

impl RunCancellation {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            token: CancellationToken::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}
