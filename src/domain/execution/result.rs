//! Structured run results handed to the console sink for persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::status::ExecutionStatus;

/// Per-block record kept in the final result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockLog {
    pub block_id: String,
    pub block_name: String,
    pub block_type: String,
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub output: Value,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    pub is_debug_session: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(default)]
    pub pending_blocks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub run_id: String,
    pub status: ExecutionStatus,
    pub success: bool,
    #[serde(default)]
    pub output: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub logs: Vec<BlockLog>,
    #[serde(default)]
    pub metadata: ResultMetadata,
    pub total_duration_ms: u64,
}

impl ExecutionResult {
    pub fn failed(run_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            status: ExecutionStatus::Failed,
            success: false,
            output: Value::Null,
            error: Some(error.into()),
            logs: Vec::new(),
            metadata: ResultMetadata::default(),
            total_duration_ms: 0,
        }
    }

    pub fn cancelled(run_id: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Cancelled,
            error: None,
            ..Self::failed(run_id, "")
        }
    }

    pub fn log_for(&self, block_id: &str) -> Option<&BlockLog> {
        self.logs.iter().rev().find(|l| l.block_id == block_id)
    }

    pub fn is_debug_paused(&self) -> bool {
        self.status == ExecutionStatus::DebugPaused
    }
}
