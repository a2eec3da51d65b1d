//! Start block selection.
//!
//! Manual runs rank every qualifying trigger by a fixed priority: explicit
//! start blocks (unified, then the split manual/input/API blocks), schedules,
//! external triggers, and finally the legacy starter. Ties inside one
//! priority fall back to block id order so the choice is stable.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{Block, BlockCategory, BlockRegistry, Edge, StartPath};
use crate::error::TriggerError;

use super::input::{input_from_format, mock_payload};

/// Where a run request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionSource {
    Chat,
    Manual,
    Api,
}

impl ExecutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionSource::Chat => "chat",
            ExecutionSource::Manual => "manual",
            ExecutionSource::Api => "api",
        }
    }
}

/// The chosen start block and the input the run starts with.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTrigger {
    pub block_id: String,
    pub block_name: String,
    pub block_type: String,
    pub path: StartPath,
    pub input: Value,
}

#[derive(Debug, Clone)]
struct Candidate<'a> {
    block: &'a Block,
    path: StartPath,
}

pub struct TriggerResolver {
    registry: Arc<BlockRegistry>,
}

impl TriggerResolver {
    pub fn new(registry: Arc<BlockRegistry>) -> Self {
        Self { registry }
    }

    /// Start path a block qualifies for, if any. Disabled blocks never do.
    pub fn start_path(&self, block: &Block) -> Option<StartPath> {
        if !block.enabled {
            return None;
        }
        match self.registry.get(&block.block_type) {
            Some(def) if def.category == BlockCategory::Trigger => {
                def.trigger.as_ref().map(|t| t.path)
            }
            Some(def) if block.trigger_mode => def.trigger.as_ref().map(|t| t.path),
            None if block.trigger_mode => Some(StartPath::External),
            _ => None,
        }
    }

    /// Pick the start block for `source` and compute the run input.
    pub fn resolve(
        &self,
        blocks: &HashMap<String, Block>,
        edges: &[Edge],
        source: ExecutionSource,
        caller_input: Option<Value>,
    ) -> Result<ResolvedTrigger, TriggerError> {
        let candidates: Vec<Candidate<'_>> = blocks
            .values()
            .filter_map(|block| self.start_path(block).map(|path| Candidate { block, path }))
            .collect();

        let selected = match source {
            ExecutionSource::Chat => {
                pick(&candidates, chat_rank).ok_or(TriggerError::NoChatTrigger)?
            }
            ExecutionSource::Manual => {
                if candidates.iter().all(|c| manual_rank(c.path).is_none()) {
                    return Err(TriggerError::NoTrigger);
                }
                check_single_api(&candidates)?;
                pick(&candidates, manual_rank).ok_or(TriggerError::NoTrigger)?
            }
            ExecutionSource::Api => {
                check_single_api(&candidates)?;
                pick(&candidates, api_rank).ok_or(TriggerError::NoApiEntry)?
            }
        };

        if selected.path.requires_connection()
            && !edges.iter().any(|e| e.source == selected.block.id)
        {
            return Err(TriggerError::DisconnectedTrigger {
                block_id: selected.block.id.clone(),
                name: selected.block.display_name().to_string(),
            });
        }

        let input = self.resolve_input(selected, source, caller_input);
        tracing::debug!(
            block_id = %selected.block.id,
            source = source.as_str(),
            path = ?selected.path,
            "trigger resolved"
        );

        Ok(ResolvedTrigger {
            block_id: selected.block.id.clone(),
            block_name: selected.block.display_name().to_string(),
            block_type: selected.block.block_type.clone(),
            path: selected.path,
            input,
        })
    }

    fn resolve_input(
        &self,
        selected: &Candidate<'_>,
        source: ExecutionSource,
        caller_input: Option<Value>,
    ) -> Value {
        let trigger = self
            .registry
            .get(&selected.block.block_type)
            .and_then(|d| d.trigger.as_ref());
        let needs_mock = trigger.map(|t| t.needs_mock_payload).unwrap_or(false)
            || (selected.path == StartPath::External && selected.block.trigger_mode);

        if source == ExecutionSource::Manual && needs_mock {
            return mock_payload(selected.block, trigger);
        }
        if source == ExecutionSource::Manual
            && matches!(selected.path, StartPath::Unified | StartPath::SplitInput)
        {
            if let Some(input) = input_from_format(selected.block) {
                return input;
            }
        }
        caller_input.unwrap_or(Value::Null)
    }
}

fn check_single_api(candidates: &[Candidate<'_>]) -> Result<(), TriggerError> {
    let count = candidates
        .iter()
        .filter(|c| c.path == StartPath::SplitApi)
        .count();
    if count > 1 {
        return Err(TriggerError::MultipleApiTriggers { count });
    }
    Ok(())
}

fn pick<'c, 'a>(
    candidates: &'c [Candidate<'a>],
    rank: fn(StartPath) -> Option<u8>,
) -> Option<&'c Candidate<'a>> {
    candidates
        .iter()
        .filter_map(|c| rank(c.path).map(|r| (r, c)))
        .min_by(|(ra, a), (rb, b)| ra.cmp(rb).then_with(|| a.block.id.cmp(&b.block.id)))
        .map(|(_, c)| c)
}

fn manual_rank(path: StartPath) -> Option<u8> {
    match path {
        StartPath::Unified => Some(0),
        StartPath::SplitManual => Some(1),
        StartPath::SplitInput => Some(2),
        StartPath::SplitApi => Some(3),
        StartPath::Schedule => Some(4),
        StartPath::External => Some(5),
        StartPath::LegacyStarter => Some(6),
        StartPath::SplitChat => None,
    }
}

fn chat_rank(path: StartPath) -> Option<u8> {
    match path {
        StartPath::SplitChat => Some(0),
        StartPath::Unified => Some(1),
        _ => None,
    }
}

fn api_rank(path: StartPath) -> Option<u8> {
    match path {
        StartPath::Unified => Some(0),
        StartPath::SplitApi => Some(1),
        StartPath::LegacyStarter => Some(2),
        _ => None,
    }
}
