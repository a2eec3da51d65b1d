//! Contract of the remote execution engine.
//!
//! The engine runs the workflow; this crate only drives it. A run is opened
//! with [`RemoteEngine::execute`], which yields a stream of
//! [`ExecutionEvent`]s. Debug sessions are advanced with
//! [`RemoteEngine::continue_execution`], threading the opaque context the
//! engine handed back last time.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::BlockLog;
use crate::error::EngineError;
use crate::store::WorkflowSnapshot;
use crate::trigger::ExecutionSource;

use super::event_bus::ExecutionEvent;

pub type EventStream = BoxStream<'static, ExecutionEvent>;

/// Opaque reference to the engine-side executor of a debug session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutorHandle(pub String);

impl ExecutorHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    pub workflow_id: String,
    pub start_block_id: String,
    #[serde(default)]
    pub input: Value,
    pub trigger_type: ExecutionSource,
    /// Run against this snapshot instead of the engine's stored workflow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_state_override: Option<WorkflowSnapshot>,
    #[serde(default)]
    pub debug: bool,
}

impl ExecutionRequest {
    pub fn uses_state_override(&self) -> bool {
        self.workflow_state_override.is_some()
    }
}

/// Debug bookkeeping the engine attaches to completions and continuations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineMetadata {
    #[serde(default)]
    pub is_debug_session: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(default)]
    pub pending_blocks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor: Option<ExecutorHandle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueRequest {
    pub workflow_id: String,
    pub executor: ExecutorHandle,
    pub pending_blocks: Vec<String>,
    pub context: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueResponse {
    pub success: bool,
    #[serde(default)]
    pub output: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    /// Block records produced by this continuation.
    #[serde(default)]
    pub logs: Vec<BlockLog>,
    #[serde(default)]
    pub metadata: EngineMetadata,
}

#[async_trait]
pub trait RemoteEngine: Send + Sync {
    async fn execute(&self, request: ExecutionRequest) -> Result<EventStream, EngineError>;

    async fn continue_execution(
        &self,
        request: ContinueRequest,
    ) -> Result<ContinueResponse, EngineError>;
}
