//! # flowcanvas: workflow canvas core
//!
//! `flowcanvas` is the engine-agnostic core of a visual workflow editor. It
//! has two halves that share one injected block store:
//!
//! - **Layout**: nested container geometry over an ownership forest of blocks.
//!   Absolute/relative position transforms, hit testing for drops,
//!   reparenting and bottom-up container auto-sizing. Every ancestor walk is
//!   bounded, so a corrupted parent chain degrades instead of hanging.
//! - **Execution**: trigger resolution, streamed runs against a remote
//!   engine, console reconciliation, interactive debug stepping and
//!   cancellation.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use flowcanvas::{MemoryBlockStore, MemoryConsole, OrchestratorBuilder, RemoteEngine, RunRequest};
//!
//! async fn run(engine: Arc<dyn RemoteEngine>) {
//!     let store = Arc::new(MemoryBlockStore::new());
//!     let console = Arc::new(MemoryConsole::new());
//!     let orchestrator = OrchestratorBuilder::new(store, engine, console)
//!         .active("workflow-1", "workspace-1")
//!         .build();
//!     let result = orchestrator.start_run(RunRequest::manual()).await;
//!     println!("{:?}", result);
//! }
//! ```

pub mod api;
pub mod application;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod layout;
pub mod store;
pub mod trigger;

pub use crate::api::*;
pub use crate::config::ConfigError;
pub use crate::core::{
    FakeIdGenerator, FakeTimeProvider, IdGenerator, RealIdGenerator, RealTimeProvider,
    StreamedContentBuffer, TimeProvider,
};
pub use crate::error::{normalize_error, normalize_error_message, normalize_error_value};
pub use crate::store::{BlockUpdate, FieldOverrideStore};
