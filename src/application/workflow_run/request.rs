use serde_json::Value;

use crate::core::DeltaSender;
use crate::store::WorkflowSnapshot;
use crate::trigger::ExecutionSource;

/// Parameters of a single run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub source: ExecutionSource,
    /// Caller-supplied input, used when the trigger does not derive its own.
    pub input: Option<Value>,
    pub debug: bool,
    /// Run a preview snapshot instead of the live store contents.
    pub workflow_state_override: Option<WorkflowSnapshot>,
    /// Limits which blocks' streamed chunks reach `delta_tx`.
    pub selected_outputs: Vec<String>,
    pub delta_tx: Option<DeltaSender>,
}

impl RunRequest {
    pub fn new(source: ExecutionSource) -> Self {
        Self {
            source,
            input: None,
            debug: false,
            workflow_state_override: None,
            selected_outputs: Vec::new(),
            delta_tx: None,
        }
    }

    pub fn manual() -> Self {
        Self::new(ExecutionSource::Manual)
    }

    pub fn chat(message: impl Into<Value>) -> Self {
        Self::new(ExecutionSource::Chat).with_input(message)
    }

    pub fn api(input: Value) -> Self {
        Self::new(ExecutionSource::Api).with_input(input)
    }

    pub fn with_input(mut self, input: impl Into<Value>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn debug(mut self) -> Self {
        self.debug = true;
        self
    }

    pub fn with_state_override(mut self, snapshot: WorkflowSnapshot) -> Self {
        self.workflow_state_override = Some(snapshot);
        self
    }

    pub fn selected_outputs(mut self, outputs: Vec<String>) -> Self {
        self.selected_outputs = outputs;
        self
    }

    pub fn stream_to(mut self, tx: DeltaSender) -> Self {
        self.delta_tx = Some(tx);
        self
    }
}
