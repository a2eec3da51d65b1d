//! Public API layer: stable entry points for external consumers.
//!
//! This module provides the primary public interface for the canvas core.
//! All externally visible types are re-exported here.

mod runner;

pub use runner::{CanvasRuntime, OrchestratorBuilder};

pub use crate::application::workflow_run::{ExecutionOrchestrator, RunRequest, RunStateHandle};
pub use crate::config::{parse_config, CanvasConfig, ConfigFormat, LayoutConfig, OrchestratorConfig, RetryPolicy};
pub use crate::core::{
    ConsoleEntry, ConsoleEntryKind, ConsoleSink, ContinueRequest, ContinueResponse, DebugSession,
    EngineMetadata, EventStream, ExecutionEvent, ExecutionRequest, ExecutorHandle, IterationContext,
    MemoryConsole, RemoteEngine, RuntimeContext, StreamDelta,
};
pub use crate::domain::{
    Block, BlockLog, BlockRegistry, ContainerKind, Dimensions, Edge, ExecutionResult,
    ExecutionStatus, Position, RunState,
};
pub use crate::error::{EngineError, ExecutionError, TriggerError};
pub use crate::layout::{HierarchyResolver, ReparentOutcome};
pub use crate::store::{BlockStore, MemoryBlockStore, MemoryFieldOverrides, WorkflowSnapshot};
pub use crate::trigger::{ExecutionSource, ResolvedTrigger, TriggerResolver};
