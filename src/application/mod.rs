//! Application layer: use-case orchestration.
//!
//! Coordinates a run from the live graph to the remote engine and back into
//! the console. It depends on [`core`](crate::core) for the engine and sink
//! contracts and [`domain`](crate::domain) for shared types.

pub mod workflow_run;
