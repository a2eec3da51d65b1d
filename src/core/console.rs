//! Console sink: where per-block execution records go.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::ExecutionResult;
use crate::error::ConsoleError;

use super::event_bus::IterationContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleEntryKind {
    Block,
    /// Synthetic entry for a run that failed before any block executed.
    Validation,
    /// Synthetic entry for an engine-level failure with no block entries.
    Run,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleEntry {
    pub id: String,
    pub run_id: String,
    pub workflow_id: String,
    pub kind: ConsoleEntryKind,
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
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration: Option<IterationContext>,
}

impl ConsoleEntry {
    pub fn is_block_entry(&self) -> bool {
        self.kind == ConsoleEntryKind::Block
    }
}

/// Receiver of console entries and final run results.
pub trait ConsoleSink: Send + Sync {
    fn add_entry(&self, entry: ConsoleEntry) -> Result<(), ConsoleError>;

    fn persist_result(&self, result: &ExecutionResult) -> Result<(), ConsoleError>;

    /// Number of block-level entries recorded for `run_id`.
    fn block_entry_count(&self, run_id: &str) -> usize;
}

/// In-memory sink keeping everything it receives.
#[derive(Default)]
pub struct MemoryConsole {
    entries: Mutex<Vec<ConsoleEntry>>,
    results: Mutex<Vec<ExecutionResult>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ConsoleEntry> {
        self.entries.lock().clone()
    }

    pub fn entries_for_run(&self, run_id: &str) -> Vec<ConsoleEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.run_id == run_id)
            .cloned()
            .collect()
    }

    pub fn results(&self) -> Vec<ExecutionResult> {
        self.results.lock().clone()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
        self.results.lock().clear();
    }
}

impl ConsoleSink for MemoryConsole {
    fn add_entry(&self, entry: ConsoleEntry) -> Result<(), ConsoleError> {
        self.entries.lock().push(entry);
        Ok(())
    }

    fn persist_result(&self, result: &ExecutionResult) -> Result<(), ConsoleError> {
        self.results.lock().push(result.clone());
        Ok(())
    }

    fn block_entry_count(&self, run_id: &str) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.run_id == run_id && e.is_block_entry())
            .count()
    }
}
