//! Workflow graph model types shared across layers.

mod block;
mod geometry;
mod registry;

pub use block::{Block, ContainerKind, Edge};
pub use geometry::{Dimensions, Position, Rect};
pub use registry::{
    BlockCategory, BlockDefinition, BlockRegistry, OutputField, StartPath, TriggerDefinition,
};
