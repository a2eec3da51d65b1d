#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use flowcanvas::ConsoleSink;
use flowcanvas::{
    Block, ContinueRequest, ContinueResponse, Edge, EngineError, EngineMetadata, EventStream,
    ExecutionEvent, ExecutionRequest, ExecutorHandle, MemoryBlockStore, RemoteEngine,
    WorkflowSnapshot,
};

/// Engine that replays a fixed event list and answers continuations from a
/// queue, repeating `repeat_continue` once the queue is empty.
#[derive(Default)]
pub struct ScriptedEngine {
    pub events: parking_lot::Mutex<Vec<ExecutionEvent>>,
    pub start_errors: parking_lot::Mutex<VecDeque<EngineError>>,
    pub continue_responses: parking_lot::Mutex<VecDeque<ContinueResponse>>,
    pub repeat_continue: parking_lot::Mutex<Option<ContinueResponse>>,
    pub requests: parking_lot::Mutex<Vec<ExecutionRequest>>,
    pub continue_requests: parking_lot::Mutex<Vec<ContinueRequest>>,
    pub execute_calls: AtomicUsize,
    pub continue_calls: AtomicUsize,
}

impl ScriptedEngine {
    pub fn with_events(events: Vec<ExecutionEvent>) -> Arc<Self> {
        let engine = Self::default();
        *engine.events.lock() = events;
        Arc::new(engine)
    }

    pub fn push_continue(&self, response: ContinueResponse) {
        self.continue_responses.lock().push_back(response);
    }

    pub fn repeat_continue(&self, response: ContinueResponse) {
        *self.repeat_continue.lock() = Some(response);
    }

    pub fn last_request(&self) -> Option<ExecutionRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl RemoteEngine for ScriptedEngine {
    async fn execute(&self, request: ExecutionRequest) -> Result<EventStream, EngineError> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request);
        if let Some(err) = self.start_errors.lock().pop_front() {
            return Err(err);
        }
        let events = self.events.lock().clone();
        Ok(futures::stream::iter(events).boxed())
    }

    async fn continue_execution(
        &self,
        request: ContinueRequest,
    ) -> Result<ContinueResponse, EngineError> {
        self.continue_calls.fetch_add(1, Ordering::SeqCst);
        self.continue_requests.lock().push(request);
        if let Some(response) = self.continue_responses.lock().pop_front() {
            return Ok(response);
        }
        self.repeat_continue
            .lock()
            .clone()
            .ok_or_else(|| EngineError::new("no scripted continuation"))
    }
}

/// Engine whose single stream is fed by the test through a channel.
pub struct ChannelEngine {
    rx: parking_lot::Mutex<Option<mpsc::UnboundedReceiver<ExecutionEvent>>>,
}

impl ChannelEngine {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedSender<ExecutionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Arc::new(Self {
            rx: parking_lot::Mutex::new(Some(rx)),
        });
        (engine, tx)
    }
}

#[async_trait]
impl RemoteEngine for ChannelEngine {
    async fn execute(&self, _request: ExecutionRequest) -> Result<EventStream, EngineError> {
        let rx = self
            .rx
            .lock()
            .take()
            .ok_or_else(|| EngineError::new("stream already taken"))?;
        Ok(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
        .boxed())
    }

    async fn continue_execution(
        &self,
        _request: ContinueRequest,
    ) -> Result<ContinueResponse, EngineError> {
        Err(EngineError::new("not a debug engine"))
    }
}

/// start_trigger -> agent1 -> agent2
pub fn linear_workflow() -> Vec<Block> {
    vec![
        Block::new("start", "start_trigger").named("Start"),
        Block::new("agent1", "agent").named("Agent 1"),
        Block::new("agent2", "agent").named("Agent 2"),
    ]
}

pub fn linear_edges() -> Vec<Edge> {
    vec![Edge::new("start", "agent1"), Edge::new("agent1", "agent2")]
}

pub fn linear_store() -> Arc<MemoryBlockStore> {
    Arc::new(MemoryBlockStore::from_snapshot(WorkflowSnapshot::new(
        linear_workflow(),
        linear_edges(),
    )))
}

pub fn completed(block_id: &str, output: Value) -> ExecutionEvent {
    ExecutionEvent::BlockCompleted {
        block_id: block_id.to_string(),
        input: Value::Null,
        output,
        duration_ms: 10,
        iteration: None,
    }
}

pub fn started(block_id: &str) -> ExecutionEvent {
    ExecutionEvent::BlockStarted {
        block_id: block_id.to_string(),
    }
}

pub fn chunk(block_id: &str, text: &str) -> ExecutionEvent {
    ExecutionEvent::StreamChunk {
        block_id: block_id.to_string(),
        chunk: text.to_string(),
    }
}

pub fn execution_completed(output: Value) -> ExecutionEvent {
    ExecutionEvent::ExecutionCompleted {
        success: Some(true),
        output,
        duration_ms: 30,
        metadata: EngineMetadata::default(),
    }
}

pub fn debug_metadata(pending: &[&str]) -> EngineMetadata {
    EngineMetadata {
        is_debug_session: true,
        context: Some(json!({"cursor": pending})),
        pending_blocks: pending.iter().map(|s| s.to_string()).collect(),
        executor: Some(ExecutorHandle::new("executor-1")),
    }
}

pub fn debug_paused_events() -> Vec<ExecutionEvent> {
    vec![
        ExecutionEvent::ExecutionStarted { execution_id: None },
        started("start"),
        completed("start", json!({"input": "hi"})),
        ExecutionEvent::ExecutionCompleted {
            success: Some(true),
            output: Value::Null,
            duration_ms: 5,
            metadata: debug_metadata(&["agent1"]),
        },
    ]
}

pub fn continue_pending(pending: &[&str]) -> ContinueResponse {
    ContinueResponse {
        success: true,
        output: Value::Null,
        error: None,
        logs: Vec::new(),
        metadata: debug_metadata(pending),
    }
}

pub fn continue_done(output: Value) -> ContinueResponse {
    ContinueResponse {
        success: true,
        output,
        error: None,
        logs: Vec::new(),
        metadata: EngineMetadata::default(),
    }
}

/// Console that rejects entries for one block and forwards everything else.
pub struct RejectingConsole {
    pub inner: flowcanvas::MemoryConsole,
    pub reject_block: String,
}

impl RejectingConsole {
    pub fn new(reject_block: &str) -> Arc<Self> {
        Arc::new(Self {
            inner: flowcanvas::MemoryConsole::new(),
            reject_block: reject_block.to_string(),
        })
    }
}

impl ConsoleSink for RejectingConsole {
    fn add_entry(
        &self,
        entry: flowcanvas::ConsoleEntry,
    ) -> Result<(), flowcanvas::error::ConsoleError> {
        if entry.block_id == self.reject_block {
            return Err(flowcanvas::error::ConsoleError::Rejected(format!(
                "entry for {} refused",
                entry.block_id
            )));
        }
        self.inner.add_entry(entry)
    }

    fn persist_result(
        &self,
        result: &flowcanvas::ExecutionResult,
    ) -> Result<(), flowcanvas::error::ConsoleError> {
        self.inner.persist_result(result)
    }

    fn block_entry_count(&self, run_id: &str) -> usize {
        self.inner.block_entry_count(run_id)
    }
}
