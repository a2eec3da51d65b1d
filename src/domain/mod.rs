//! Domain layer: pure graph model shared by the layout and execution layers.
//!
//! This layer contains types that do not depend on any runtime implementation
//! details: blocks, edges, canvas geometry, the block type catalog and run
//! results.

pub mod execution;
pub mod model;

pub use execution::{BlockLog, ExecutionResult, ExecutionStatus, ResultMetadata, RunState};
pub use model::{
    Block, BlockCategory, BlockDefinition, BlockRegistry, ContainerKind, Dimensions, Edge,
    OutputField, Position, Rect, StartPath, TriggerDefinition,
};
