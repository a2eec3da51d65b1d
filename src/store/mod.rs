//! Block/edge store capability shared by the layout and execution layers.
//!
//! The store is injected as a trait object so both subsystems can run against
//! [`MemoryBlockStore`] in tests.

mod block_store;
mod overrides;

pub use block_store::{BlockStore, BlockUpdate, MemoryBlockStore, StoreError, WorkflowSnapshot};
pub use overrides::{merge_field_overrides, BlockFieldValues, FieldOverrideStore, MemoryFieldOverrides};
