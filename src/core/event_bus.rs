use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::ContainerKind;

use super::engine::EngineMetadata;

/// Position of a block execution inside a loop or parallel region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationContext {
    pub iteration_current: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration_total: Option<usize>,
    pub iteration_type: ContainerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration_container_id: Option<String>,
}

/// Event emitted by the remote engine while a run streams.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEvent {
    ExecutionStarted {
        #[serde(default, rename = "executionId")]
        execution_id: Option<String>,
    },

    BlockStarted {
        #[serde(rename = "blockId")]
        block_id: String,
    },

    BlockCompleted {
        #[serde(rename = "blockId")]
        block_id: String,
        #[serde(default)]
        input: Value,
        #[serde(default)]
        output: Value,
        #[serde(default, rename = "durationMs")]
        duration_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        iteration: Option<IterationContext>,
    },

    BlockError {
        #[serde(rename = "blockId")]
        block_id: String,
        #[serde(default)]
        input: Value,
        error: Value,
        #[serde(default, rename = "durationMs")]
        duration_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        iteration: Option<IterationContext>,
    },

    /// Incremental text produced by a streaming block.
    StreamChunk {
        #[serde(rename = "blockId")]
        block_id: String,
        chunk: String,
    },

    StreamDone {
        #[serde(rename = "blockId")]
        block_id: String,
    },

    ExecutionCompleted {
        #[serde(default)]
        success: Option<bool>,
        #[serde(default)]
        output: Value,
        #[serde(default, rename = "durationMs")]
        duration_ms: u64,
        #[serde(default)]
        metadata: EngineMetadata,
    },

    ExecutionError {
        error: Value,
    },
}

impl ExecutionEvent {
    /// Block the event belongs to, for block-scoped events.
    pub fn block_id(&self) -> Option<&str> {
        match self {
            ExecutionEvent::BlockStarted { block_id }
            | ExecutionEvent::BlockCompleted { block_id, .. }
            | ExecutionEvent::BlockError { block_id, .. }
            | ExecutionEvent::StreamChunk { block_id, .. }
            | ExecutionEvent::StreamDone { block_id } => Some(block_id),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionEvent::ExecutionStarted { .. } => "execution_started",
            ExecutionEvent::BlockStarted { .. } => "block_started",
            ExecutionEvent::BlockCompleted { .. } => "block_completed",
            ExecutionEvent::BlockError { .. } => "block_error",
            ExecutionEvent::StreamChunk { .. } => "stream_chunk",
            ExecutionEvent::StreamDone { .. } => "stream_done",
            ExecutionEvent::ExecutionCompleted { .. } => "execution_completed",
            ExecutionEvent::ExecutionError { .. } => "execution_error",
        }
    }
}
