use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::{Block, Dimensions, Edge, Position};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Block not found: {0}")]
    BlockNotFound(String),
}

/// Point-in-time copy of the graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    #[serde(default)]
    pub blocks: HashMap<String, Block>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl WorkflowSnapshot {
    pub fn new(blocks: impl IntoIterator<Item = Block>, edges: Vec<Edge>) -> Self {
        Self {
            blocks: blocks.into_iter().map(|b| (b.id.clone(), b)).collect(),
            edges,
        }
    }
}

/// A single field write against one block.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockUpdate {
    Position { block_id: String, position: Position },
    Parent { block_id: String, parent_id: Option<String> },
    Dimensions { block_id: String, dimensions: Dimensions },
}

impl BlockUpdate {
    pub fn block_id(&self) -> &str {
        match self {
            BlockUpdate::Position { block_id, .. }
            | BlockUpdate::Parent { block_id, .. }
            | BlockUpdate::Dimensions { block_id, .. } => block_id,
        }
    }
}

/// Shared block/edge store injected into the layout and execution layers.
///
/// `apply` is atomic: either every update in the batch lands or none does.
pub trait BlockStore: Send + Sync {
    fn blocks(&self) -> HashMap<String, Block>;
    fn edges(&self) -> Vec<Edge>;
    fn block(&self, block_id: &str) -> Option<Block>;
    fn apply(&self, updates: &[BlockUpdate]) -> Result<(), StoreError>;

    fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            blocks: self.blocks(),
            edges: self.edges(),
        }
    }

    fn contains(&self, block_id: &str) -> bool {
        self.block(block_id).is_some()
    }
}

/// In-memory [`BlockStore`].
#[derive(Default)]
pub struct MemoryBlockStore {
    data: RwLock<WorkflowSnapshot>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: WorkflowSnapshot) -> Self {
        Self {
            data: RwLock::new(snapshot),
        }
    }

    pub fn with_blocks(blocks: impl IntoIterator<Item = Block>) -> Self {
        Self::from_snapshot(WorkflowSnapshot::new(blocks, Vec::new()))
    }

    pub fn insert_block(&self, block: Block) {
        self.data.write().blocks.insert(block.id.clone(), block);
    }

    pub fn remove_block(&self, block_id: &str) -> Option<Block> {
        let mut data = self.data.write();
        data.edges
            .retain(|e| e.source != block_id && e.target != block_id);
        data.blocks.remove(block_id)
    }

    pub fn add_edge(&self, edge: Edge) {
        self.data.write().edges.push(edge);
    }
}

impl BlockStore for MemoryBlockStore {
    fn blocks(&self) -> HashMap<String, Block> {
        self.data.read().blocks.clone()
    }

    fn edges(&self) -> Vec<Edge> {
        self.data.read().edges.clone()
    }

    fn block(&self, block_id: &str) -> Option<Block> {
        self.data.read().blocks.get(block_id).cloned()
    }

    fn apply(&self, updates: &[BlockUpdate]) -> Result<(), StoreError> {
        let mut data = self.data.write();
        if let Some(missing) = updates
            .iter()
            .find(|u| !data.blocks.contains_key(u.block_id()))
        {
            return Err(StoreError::BlockNotFound(missing.block_id().to_string()));
        }
        for update in updates {
            let Some(block) = data.blocks.get_mut(update.block_id()) else {
                continue;
            };
            match update {
                BlockUpdate::Position { position, .. } => block.position = *position,
                BlockUpdate::Parent { parent_id, .. } => block.parent_id = parent_id.clone(),
                BlockUpdate::Dimensions { dimensions, .. } => {
                    block.width = Some(dimensions.width);
                    block.height = Some(dimensions.height);
                }
            }
        }
        Ok(())
    }

    fn snapshot(&self) -> WorkflowSnapshot {
        self.data.read().clone()
    }
}
