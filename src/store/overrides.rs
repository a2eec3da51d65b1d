use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

use crate::domain::Block;

/// Field values keyed by block id, then field id.
pub type BlockFieldValues = HashMap<String, HashMap<String, Value>>;

/// Per-workflow field values edited on the canvas but not yet folded into the
/// block records.
pub trait FieldOverrideStore: Send + Sync {
    fn overrides(&self, workflow_id: &str) -> BlockFieldValues;
}

#[derive(Default)]
pub struct MemoryFieldOverrides {
    values: RwLock<HashMap<String, BlockFieldValues>>,
}

impl MemoryFieldOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, workflow_id: &str, block_id: &str, field: &str, value: Value) {
        self.values
            .write()
            .entry(workflow_id.to_string())
            .or_default()
            .entry(block_id.to_string())
            .or_default()
            .insert(field.to_string(), value);
    }
}

impl FieldOverrideStore for MemoryFieldOverrides {
    fn overrides(&self, workflow_id: &str) -> BlockFieldValues {
        self.values
            .read()
            .get(workflow_id)
            .cloned()
            .unwrap_or_default()
    }
}

/// Fold field overrides into the blocks they belong to. Overrides for blocks
/// that are not in the map are ignored.
pub fn merge_field_overrides(blocks: &mut HashMap<String, Block>, overrides: BlockFieldValues) {
    for (block_id, fields) in overrides {
        if let Some(block) = blocks.get_mut(&block_id) {
            block.sub_blocks.extend(fields);
        }
    }
}
