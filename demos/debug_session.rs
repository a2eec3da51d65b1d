//! Walks a three-block workflow through a debug session against an in-process
//! engine: run until the first pause, step once, then resume to the end.
//!
//! Run with `RUST_LOG=flowcanvas=debug cargo run --example debug_session`.

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use flowcanvas::{
    Block, CanvasConfig, CanvasRuntime, ContinueRequest, ContinueResponse, Edge, EngineError,
    EngineMetadata, EventStream, ExecutionEvent, ExecutionRequest, ExecutorHandle,
    MemoryBlockStore, MemoryConsole, Position, RemoteEngine, RunRequest, WorkflowSnapshot,
};

/// Pauses before every block after the trigger and releases one per
/// continuation.
struct SteppingEngine {
    remaining: Mutex<VecDeque<String>>,
}

impl SteppingEngine {
    fn new(blocks: &[&str]) -> Self {
        Self {
            remaining: Mutex::new(blocks.iter().map(|b| b.to_string()).collect()),
        }
    }

    fn metadata(pending: &VecDeque<String>) -> EngineMetadata {
        EngineMetadata {
            is_debug_session: !pending.is_empty(),
            context: Some(json!({ "pending": pending })),
            pending_blocks: pending.iter().cloned().collect(),
            executor: Some(ExecutorHandle::new("demo-executor")),
        }
    }
}

#[async_trait]
impl RemoteEngine for SteppingEngine {
    async fn execute(&self, request: ExecutionRequest) -> Result<EventStream, EngineError> {
        let metadata = Self::metadata(&self.remaining.lock());
        let events = vec![
            ExecutionEvent::ExecutionStarted { execution_id: None },
            ExecutionEvent::BlockStarted {
                block_id: request.start_block_id.clone(),
            },
            ExecutionEvent::BlockCompleted {
                block_id: request.start_block_id,
                input: request.input.clone(),
                output: request.input,
                duration_ms: 2,
                iteration: None,
            },
            ExecutionEvent::ExecutionCompleted {
                success: Some(true),
                output: Value::Null,
                duration_ms: 2,
                metadata,
            },
        ];
        Ok(futures::stream::iter(events).boxed())
    }

    async fn continue_execution(
        &self,
        request: ContinueRequest,
    ) -> Result<ContinueResponse, EngineError> {
        let mut remaining = self.remaining.lock();
        let Some(block) = remaining.pop_front() else {
            return Err(EngineError::new("nothing left to run"));
        };
        tracing::info!(block_id = %block, executor = %request.executor.as_str(), "engine ran block");
        Ok(ContinueResponse {
            success: true,
            output: json!({ "last": block }),
            error: None,
            logs: Vec::new(),
            metadata: Self::metadata(&remaining),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let store = Arc::new(MemoryBlockStore::from_snapshot(WorkflowSnapshot::new(
        vec![
            Block::new("start", "start_trigger").named("Start"),
            Block::new("loop1", "loop").named("Retry loop").at(300.0, 80.0),
            Block::new("draft", "agent").named("Draft").at(700.0, 150.0),
            Block::new("review", "agent").named("Review").at(1100.0, 120.0),
        ],
        vec![Edge::new("start", "draft"), Edge::new("draft", "review")],
    )));
    let console = Arc::new(MemoryConsole::new());
    let canvas = CanvasRuntime::new(
        CanvasConfig::default(),
        store.clone(),
        Arc::new(SteppingEngine::new(&["draft", "review"])),
        console.clone(),
    );

    // drop the draft agent into the loop without moving it on screen
    let before = canvas.layout.absolute_position("draft");
    let outcome = canvas.layout.reparent("draft", Some("loop1"));
    println!("reparent draft -> loop1: {:?}", outcome);
    println!(
        "draft on screen: {:?} -> {:?}",
        before,
        canvas.layout.absolute_position("draft")
    );
    println!(
        "drop target at (350, 200): {:?}",
        canvas.layout.container_at(Position::new(350.0, 200.0), None)
    );

    canvas
        .execution
        .set_active_workflow(Some("demo-workflow".to_string()));
    canvas
        .execution
        .set_active_workspace(Some("demo-workspace".to_string()));

    let paused = canvas
        .execution
        .start_run(RunRequest::manual().with_input(json!({"topic": "release notes"})).debug())
        .await?;
    println!(
        "run {} -> {:?}, pending {:?}",
        paused.run_id, paused.status, paused.metadata.pending_blocks
    );

    let stepped = canvas.execution.step().await?;
    println!(
        "step -> {:?}, pending {:?}",
        stepped.status, stepped.metadata.pending_blocks
    );

    let finished = canvas.execution.resume().await?;
    println!("resume -> {:?}, output {}", finished.status, finished.output);
    println!("state: {:?}", canvas.execution.state());

    for entry in console.entries() {
        println!(
            "console: {:?} {} success={}",
            entry.kind,
            entry.block_name,
            entry.success
        );
    }
    Ok(())
}
