//! Debug sessions over the remote engine.
//!
//! A [`DebugSession`] is a plain value: executor handle, opaque engine
//! context and the pending block list. It is threaded through continuation
//! calls by value; each call consumes the previous response's context, so
//! continuations are strictly sequential.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ExecutionError, OrchestratorResult};

use super::engine::{ContinueRequest, ContinueResponse, EngineMetadata, ExecutorHandle, RemoteEngine};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugSession {
    pub workflow_id: String,
    pub run_id: String,
    pub executor: Option<ExecutorHandle>,
    pub context: Option<Value>,
    pub pending_blocks: Vec<String>,
}

/// What is left after applying a continuation response.
#[derive(Debug, Clone, PartialEq)]
pub enum DebugProgress {
    Pending(DebugSession),
    Finished,
}

impl DebugSession {
    /// Open a session from engine metadata, if it reports pending work.
    pub fn from_metadata(
        workflow_id: impl Into<String>,
        run_id: impl Into<String>,
        metadata: &EngineMetadata,
    ) -> Option<Self> {
        if !has_pending_work(metadata) {
            return None;
        }
        Some(Self {
            workflow_id: workflow_id.into(),
            run_id: run_id.into(),
            executor: metadata.executor.clone(),
            context: metadata.context.clone(),
            pending_blocks: metadata.pending_blocks.clone(),
        })
    }

    /// Build the next continuation call, or name the missing piece of state.
    pub fn continue_request(&self) -> OrchestratorResult<ContinueRequest> {
        let executor = self
            .executor
            .clone()
            .ok_or(ExecutionError::DebugStateMissing { missing: "executor" })?;
        let context = self
            .context
            .clone()
            .ok_or(ExecutionError::DebugStateMissing { missing: "context" })?;
        if self.pending_blocks.is_empty() {
            return Err(ExecutionError::DebugStateMissing {
                missing: "pending blocks",
            });
        }
        Ok(ContinueRequest {
            workflow_id: self.workflow_id.clone(),
            executor,
            pending_blocks: self.pending_blocks.clone(),
            context,
        })
    }

    /// Replace context and pending list with the engine's answer.
    pub fn advance(self, response: &ContinueResponse) -> DebugProgress {
        if !has_pending_work(&response.metadata) {
            return DebugProgress::Finished;
        }
        DebugProgress::Pending(Self {
            executor: response.metadata.executor.clone().or(self.executor),
            context: response.metadata.context.clone(),
            pending_blocks: response.metadata.pending_blocks.clone(),
            ..self
        })
    }
}

/// The engine still has work for the session: flag set, context present and
/// a non-empty pending list.
pub fn has_pending_work(metadata: &EngineMetadata) -> bool {
    metadata.is_debug_session && metadata.context.is_some() && !metadata.pending_blocks.is_empty()
}

/// Issue one continuation call for `session`.
pub async fn continue_once(
    engine: &dyn RemoteEngine,
    session: &DebugSession,
) -> OrchestratorResult<(ContinueResponse, DebugProgress)> {
    let request = session.continue_request()?;
    tracing::debug!(
        run_id = %session.run_id,
        pending = session.pending_blocks.len(),
        "continuing debug session"
    );
    let response = engine.continue_execution(request).await?;
    let progress = session.clone().advance(&response);
    Ok((response, progress))
}
