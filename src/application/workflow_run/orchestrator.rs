use chrono::{DateTime, Utc};
use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::config::OrchestratorConfig;
use crate::core::{
    continue_once, ConsoleEntry, ConsoleEntryKind, ConsoleSink, ContinueResponse, DebugProgress,
    DebugSession, DeltaSender, EngineMetadata, EventStream, ExecutionEvent, ExecutionRequest,
    IterationContext, RemoteEngine, RunCancellation, RuntimeContext, StreamedContentBuffer,
};
use crate::domain::{
    Block, BlockLog, BlockRegistry, ExecutionResult, ExecutionStatus, ResultMetadata, RunState,
};
use crate::error::{
    normalize_error, normalize_error_message, normalize_error_value, EngineError, ExecutionError,
    OrchestratorResult,
};
use crate::store::{merge_field_overrides, BlockStore, FieldOverrideStore, WorkflowSnapshot};
use crate::trigger::{ResolvedTrigger, TriggerResolver};

use super::handle::RunStateHandle;
use super::request::RunRequest;

/// Mutable per-run bookkeeping. Never held across an await.
#[derive(Default)]
struct RunSlot {
    cancellation: Option<RunCancellation>,
    active_blocks: HashSet<String>,
    debug: Option<DebugSession>,
    /// Logs gathered across a debug session, persisted when it finishes.
    debug_logs: Vec<BlockLog>,
    debug_started_at: Option<DateTime<Utc>>,
}

impl RunSlot {
    fn reset_debug(&mut self) {
        self.debug = None;
        self.debug_logs.clear();
        self.debug_started_at = None;
    }
}

/// Everything a run needs after validation succeeded.
struct RunContext {
    run_id: String,
    workflow_id: String,
    cancel: RunCancellation,
    started_at: DateTime<Utc>,
    /// Blocks of a state override, used when the live store lacks an id.
    override_blocks: Option<HashMap<String, Block>>,
}

enum StreamOutcome {
    Completed {
        success: bool,
        output: Value,
        duration_ms: u64,
        metadata: EngineMetadata,
    },
    Failed(String),
    Cancelled,
}

enum DebugStepOutcome {
    Pending(DebugSession, ContinueResponse),
    Finished(ContinueResponse),
    Failed(String),
    Cancelled,
}

/// Drives runs against the remote engine and reconciles their event streams
/// into console entries and a final [`ExecutionResult`].
///
/// One run at a time. `cancel`, `subscribe` and `active_blocks` may be called
/// while a run is awaiting the engine.
pub struct ExecutionOrchestrator {
    store: Arc<dyn BlockStore>,
    engine: Arc<dyn RemoteEngine>,
    console: Arc<dyn ConsoleSink>,
    overrides: Arc<dyn FieldOverrideStore>,
    registry: Arc<BlockRegistry>,
    config: OrchestratorConfig,
    runtime: RuntimeContext,
    active_workflow: RwLock<Option<String>>,
    active_workspace: RwLock<Option<String>>,
    state_tx: watch::Sender<RunState>,
    slot: Mutex<RunSlot>,
}

impl ExecutionOrchestrator {
    pub(crate) fn new(
        store: Arc<dyn BlockStore>,
        engine: Arc<dyn RemoteEngine>,
        console: Arc<dyn ConsoleSink>,
        overrides: Arc<dyn FieldOverrideStore>,
        registry: Arc<BlockRegistry>,
        config: OrchestratorConfig,
        runtime: RuntimeContext,
    ) -> Self {
        let (state_tx, _) = watch::channel(RunState::Idle);
        Self {
            store,
            engine,
            console,
            overrides,
            registry,
            config,
            runtime,
            active_workflow: RwLock::new(None),
            active_workspace: RwLock::new(None),
            state_tx,
            slot: Mutex::new(RunSlot::default()),
        }
    }

    pub fn set_active_workflow(&self, workflow_id: Option<String>) {
        *self.active_workflow.write() = workflow_id;
    }

    pub fn set_active_workspace(&self, workspace_id: Option<String>) {
        *self.active_workspace.write() = workspace_id;
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        *self.state_tx.borrow()
    }

    pub fn subscribe(&self) -> RunStateHandle {
        RunStateHandle::new(self.state_tx.subscribe())
    }

    /// Blocks currently executing, sorted by id.
    pub fn active_blocks(&self) -> Vec<String> {
        let mut blocks: Vec<String> = self.slot.lock().active_blocks.iter().cloned().collect();
        blocks.sort();
        blocks
    }

    pub fn debug_session(&self) -> Option<DebugSession> {
        self.slot.lock().debug.clone()
    }

    /// Publish a state change. Callers hold the slot lock so a concurrent
    /// `cancel` cannot interleave with the transition.
    fn set_state(&self, state: RunState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            tracing::debug!(from = ?previous, to = ?state, "run state changed");
        }
    }

    /// Apply `f` to the run slot only if the run has not been cancelled.
    ///
    /// The cancellation check and the mutation happen under one lock, so
    /// nothing lands after [`cancel`](Self::cancel) returns.
    fn with_live_run<R>(
        &self,
        cancel: &RunCancellation,
        f: impl FnOnce(&mut RunSlot) -> R,
    ) -> Option<R> {
        let mut slot = self.slot.lock();
        if cancel.is_cancelled() {
            return None;
        }
        Some(f(&mut slot))
    }

    // ================================
    // Start
    // ================================

    /// Start a run.
    ///
    /// Validation, engine and stream failures come back as a failed
    /// [`ExecutionResult`]; only a run already in flight is an `Err`.
    pub async fn start_run(&self, request: RunRequest) -> OrchestratorResult<ExecutionResult> {
        let run_id = self.runtime.next_id();
        let cancel = RunCancellation::new(run_id.clone());
        {
            let mut slot = self.slot.lock();
            let state = self.state();
            if !(state.accepts_new_run() || state == RunState::DebugPending) {
                return Err(ExecutionError::RunInProgress);
            }
            if slot.debug.is_some() {
                tracing::info!("discarding open debug session for new run");
            }
            *slot = RunSlot {
                cancellation: Some(cancel.clone()),
                ..RunSlot::default()
            };
            self.state_tx.send_replace(RunState::Running);
        }

        let started_at = self.runtime.now();
        let workflow_id = self.active_workflow.read().clone().unwrap_or_default();
        tracing::info!(
            run_id = %run_id,
            workflow_id = %workflow_id,
            source = request.source.as_str(),
            debug = request.debug,
            "starting run"
        );

        let (run, trigger, snapshot) = match self.prepare_run(&request, &run_id, &cancel, started_at) {
            Ok(prepared) => prepared,
            Err(err) => {
                return Ok(self.fail_before_execution(&run_id, &workflow_id, &cancel, err, started_at));
            }
        };

        let engine_request = ExecutionRequest {
            workflow_id: run.workflow_id.clone(),
            start_block_id: trigger.block_id.clone(),
            input: trigger.input.clone(),
            trigger_type: request.source,
            workflow_state_override: request.workflow_state_override.as_ref().map(|_| snapshot),
            debug: request.debug,
        };

        let stream = match self.open_stream(engine_request, &run.cancel).await {
            Ok(Some(stream)) => stream,
            Ok(None) => return Ok(self.cancelled_result(&run)),
            Err(err) => {
                let message = normalize_error(&err);
                return Ok(self.finish_failed(&run, message, Vec::new()));
            }
        };

        let mut buffer = StreamedContentBuffer::new(self.config.stream_separator.clone())
            .with_selected_outputs(request.selected_outputs.clone());
        let mut logs = Vec::new();
        let outcome = self
            .drive_stream(&run, stream, &mut buffer, request.delta_tx.clone(), &mut logs)
            .await;

        for log in logs.iter_mut() {
            buffer.merge_into(&log.block_id, &mut log.output);
        }

        match outcome {
            StreamOutcome::Cancelled => Ok(self.cancelled_result(&run)),
            StreamOutcome::Failed(message) => Ok(self.finish_failed(&run, message, logs)),
            StreamOutcome::Completed {
                success,
                output,
                duration_ms,
                metadata,
            } => Ok(self.finish_stream(&run, request.debug, success, output, duration_ms, metadata, logs)),
        }
    }

    fn prepare_run(
        &self,
        request: &RunRequest,
        run_id: &str,
        cancel: &RunCancellation,
        started_at: DateTime<Utc>,
    ) -> OrchestratorResult<(RunContext, ResolvedTrigger, WorkflowSnapshot)> {
        let workflow_id = self
            .active_workflow
            .read()
            .clone()
            .ok_or(ExecutionError::NoActiveWorkflow)?;
        if self.active_workspace.read().is_none() {
            return Err(ExecutionError::NoActiveWorkspace);
        }

        // Read the store directly so a block added just before the run is seen.
        let mut snapshot = match &request.workflow_state_override {
            Some(snapshot) => snapshot.clone(),
            None => self.store.snapshot(),
        };
        snapshot.blocks.retain(|id, block| {
            let valid = !block.block_type.trim().is_empty();
            if !valid {
                tracing::warn!(block_id = %id, "dropping block without a type");
            }
            valid
        });
        merge_field_overrides(&mut snapshot.blocks, self.overrides.overrides(&workflow_id));

        let trigger = TriggerResolver::new(self.registry.clone()).resolve(
            &snapshot.blocks,
            &snapshot.edges,
            request.source,
            request.input.clone(),
        )?;

        let run = RunContext {
            run_id: run_id.to_string(),
            workflow_id,
            cancel: cancel.clone(),
            started_at,
            override_blocks: request
                .workflow_state_override
                .as_ref()
                .map(|_| snapshot.blocks.clone()),
        };
        Ok((run, trigger, snapshot))
    }

    /// Open the engine stream, retrying rate-limited starts.
    ///
    /// `Ok(None)` means the run was cancelled while waiting.
    async fn open_stream(
        &self,
        request: ExecutionRequest,
        cancel: &RunCancellation,
    ) -> Result<Option<EventStream>, EngineError> {
        let policy = &self.config.retry;
        let mut attempt = 0;
        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => return Ok(None),
                result = self.engine.execute(request.clone()) => result,
            };
            match result {
                Ok(stream) => return Ok(Some(stream)),
                Err(err) if err.is_rate_limited() && attempt < policy.max_retries => {
                    let delay = policy.delay_ms(attempt, err.retry_after_ms);
                    tracing::warn!(
                        run_id = %cancel.run_id(),
                        attempt = attempt + 1,
                        delay_ms = delay,
                        "engine rate limited run start, retrying"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Ok(None),
                        _ = tokio::time::sleep(Duration::from_millis(delay)) => {}
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    // ================================
    // Streaming reconciliation
    // ================================

    async fn drive_stream(
        &self,
        run: &RunContext,
        mut stream: EventStream,
        buffer: &mut StreamedContentBuffer,
        mut delta_tx: Option<DeltaSender>,
        logs: &mut Vec<BlockLog>,
    ) -> StreamOutcome {
        let mut started: HashMap<String, DateTime<Utc>> = HashMap::new();

        loop {
            let event = tokio::select! {
                biased;
                _ = run.cancel.cancelled() => return StreamOutcome::Cancelled,
                next = stream.next() => match next {
                    Some(event) => event,
                    None => break,
                },
            };
            if run.cancel.is_cancelled() {
                return StreamOutcome::Cancelled;
            }
            tracing::trace!(run_id = %run.run_id, kind = event.kind(), "engine event");

            match event {
                ExecutionEvent::ExecutionStarted { .. } => {}
                ExecutionEvent::BlockStarted { block_id } => {
                    started.insert(block_id.clone(), self.runtime.now());
                    self.with_live_run(&run.cancel, |slot| {
                        slot.active_blocks.insert(block_id);
                    });
                }
                ExecutionEvent::StreamChunk { block_id, chunk } => {
                    let Some(delta) = buffer.push(&block_id, &chunk) else {
                        continue;
                    };
                    if let Some(tx) = &delta_tx {
                        if tx.send(delta).is_err() {
                            tracing::warn!(run_id = %run.run_id, "stream consumer gone, dropping deltas");
                            delta_tx = None;
                        }
                    }
                }
                ExecutionEvent::StreamDone { block_id } => buffer.finish(&block_id),
                ExecutionEvent::BlockCompleted {
                    block_id,
                    input,
                    mut output,
                    duration_ms,
                    iteration,
                } => {
                    // A block whose stream is done logs its full text right away.
                    if buffer.is_finished(&block_id) {
                        buffer.merge_into(&block_id, &mut output);
                    }
                    let started_at = started.remove(&block_id);
                    let record = BlockRecord {
                        block_id: &block_id,
                        input,
                        output,
                        error: None,
                        duration_ms,
                        started_at,
                        iteration,
                    };
                    if self.record_block(run, record, logs).is_none() {
                        return StreamOutcome::Cancelled;
                    }
                    self.with_live_run(&run.cancel, |slot| {
                        slot.active_blocks.remove(&block_id);
                    });
                }
                ExecutionEvent::BlockError {
                    block_id,
                    input,
                    error,
                    duration_ms,
                    iteration,
                } => {
                    let started_at = started.remove(&block_id);
                    let record = BlockRecord {
                        block_id: &block_id,
                        input,
                        output: Value::Null,
                        error: Some(normalize_error_value(&error)),
                        duration_ms,
                        started_at,
                        iteration,
                    };
                    // The entry is written before the block leaves the active set.
                    if self.record_block(run, record, logs).is_none() {
                        return StreamOutcome::Cancelled;
                    }
                    self.with_live_run(&run.cancel, |slot| {
                        slot.active_blocks.remove(&block_id);
                    });
                }
                ExecutionEvent::ExecutionCompleted {
                    success,
                    output,
                    duration_ms,
                    metadata,
                } => {
                    return StreamOutcome::Completed {
                        success: success.unwrap_or(true),
                        output,
                        duration_ms,
                        metadata,
                    };
                }
                ExecutionEvent::ExecutionError { error } => {
                    return StreamOutcome::Failed(normalize_error_value(&error));
                }
            }
        }

        if run.cancel.is_cancelled() {
            return StreamOutcome::Cancelled;
        }
        StreamOutcome::Failed("Execution stream ended before completion".to_string())
    }

    /// Write a console entry and a log for one finished block.
    ///
    /// Returns `None` if the run was cancelled. Blocks unknown to both the
    /// live store and the run's override snapshot are skipped.
    fn record_block(
        &self,
        run: &RunContext,
        record: BlockRecord<'_>,
        logs: &mut Vec<BlockLog>,
    ) -> Option<()> {
        let Some((block_name, block_type)) = self.block_identity(record.block_id, run) else {
            tracing::debug!(
                run_id = %run.run_id,
                block_id = %record.block_id,
                "skipping console entry for unknown block"
            );
            return if run.cancel.is_cancelled() { None } else { Some(()) };
        };

        let ended_at = self.runtime.now();
        let started_at = record
            .started_at
            .unwrap_or_else(|| ended_at - chrono::Duration::milliseconds(record.duration_ms as i64));
        let success = record.error.is_none();

        let entry = ConsoleEntry {
            id: self.runtime.next_id(),
            run_id: run.run_id.clone(),
            workflow_id: run.workflow_id.clone(),
            kind: ConsoleEntryKind::Block,
            block_id: record.block_id.to_string(),
            block_name: block_name.clone(),
            block_type: block_type.clone(),
            input: record.input.clone(),
            output: record.output.clone(),
            success,
            error: record.error.clone(),
            duration_ms: record.duration_ms,
            started_at,
            ended_at,
            iteration: record.iteration,
        };

        self.with_live_run(&run.cancel, |_| {
            if !success {
                tracing::warn!(
                    run_id = %run.run_id,
                    block_id = %record.block_id,
                    error = record.error.as_deref().unwrap_or_default(),
                    "block failed"
                );
            }
            self.write_entry(entry);
        })?;

        logs.push(BlockLog {
            block_id: record.block_id.to_string(),
            block_name,
            block_type,
            input: record.input,
            output: record.output,
            success,
            error: record.error,
            duration_ms: record.duration_ms,
            started_at,
            ended_at,
        });
        Some(())
    }

    fn block_identity(&self, block_id: &str, run: &RunContext) -> Option<(String, String)> {
        let identity = |b: &Block| (b.display_name().to_string(), b.block_type.clone());
        if let Some(block) = self.store.block(block_id) {
            return Some(identity(&block));
        }
        run.override_blocks.as_ref()?.get(block_id).map(identity)
    }

    fn write_entry(&self, entry: ConsoleEntry) {
        let block_id = entry.block_id.clone();
        if let Err(err) = self.console.add_entry(entry) {
            tracing::warn!(block_id = %block_id, error = %err, "console sink rejected entry");
        }
    }

    fn persist(&self, result: &ExecutionResult) {
        if let Err(err) = self.console.persist_result(result) {
            tracing::warn!(run_id = %result.run_id, error = %err, "failed to persist execution result");
        }
    }

    // ================================
    // Run completion
    // ================================

    #[allow(clippy::too_many_arguments)]
    fn finish_stream(
        &self,
        run: &RunContext,
        debug: bool,
        success: bool,
        output: Value,
        duration_ms: u64,
        metadata: EngineMetadata,
        logs: Vec<BlockLog>,
    ) -> ExecutionResult {
        let ended_at = self.runtime.now();
        let total_duration_ms = if duration_ms > 0 {
            duration_ms
        } else {
            self.runtime.time_provider.elapsed_millis(run.started_at)
        };

        let session = if debug {
            DebugSession::from_metadata(&run.workflow_id, &run.run_id, &metadata)
        } else {
            None
        };

        if let Some(session) = session {
            let pending_blocks = session.pending_blocks.clone();
            let context = session.context.clone();
            let applied = self.with_live_run(&run.cancel, |slot| {
                slot.active_blocks.clear();
                slot.debug = Some(session);
                slot.debug_logs = logs.clone();
                slot.debug_started_at = Some(run.started_at);
                self.set_state(RunState::DebugPending);
            });
            if applied.is_none() {
                return self.cancelled_result(run);
            }
            tracing::info!(
                run_id = %run.run_id,
                pending = pending_blocks.len(),
                "debug session paused"
            );
            return ExecutionResult {
                run_id: run.run_id.clone(),
                status: ExecutionStatus::DebugPaused,
                success: true,
                output,
                error: None,
                logs,
                metadata: ResultMetadata {
                    is_debug_session: true,
                    context,
                    pending_blocks,
                    start_time: Some(run.started_at),
                    end_time: None,
                },
                total_duration_ms,
            };
        }

        let result = ExecutionResult {
            run_id: run.run_id.clone(),
            status: if success {
                ExecutionStatus::Completed
            } else {
                ExecutionStatus::Failed
            },
            success,
            output,
            error: None,
            logs,
            metadata: ResultMetadata {
                is_debug_session: false,
                context: None,
                pending_blocks: Vec::new(),
                start_time: Some(run.started_at),
                end_time: Some(ended_at),
            },
            total_duration_ms,
        };

        let applied = self.with_live_run(&run.cancel, |slot| {
            slot.active_blocks.clear();
            slot.cancellation = None;
            self.persist(&result);
            self.set_state(if success {
                RunState::Completed
            } else {
                RunState::Errored
            });
        });
        if applied.is_none() {
            return self.cancelled_result(run);
        }
        tracing::info!(
            run_id = %run.run_id,
            success,
            duration_ms = total_duration_ms,
            "run finished"
        );
        result
    }

    fn finish_failed(&self, run: &RunContext, message: String, logs: Vec<BlockLog>) -> ExecutionResult {
        let mut result = ExecutionResult::failed(&run.run_id, message.clone());
        result.logs = logs;
        result.total_duration_ms = self.runtime.time_provider.elapsed_millis(run.started_at);
        result.metadata.start_time = Some(run.started_at);
        result.metadata.end_time = Some(self.runtime.now());

        let applied = self.with_live_run(&run.cancel, |slot| {
            slot.active_blocks.clear();
            slot.cancellation = None;
            slot.reset_debug();
            self.write_run_error_entry(
                &run.run_id,
                &run.workflow_id,
                ConsoleEntryKind::Run,
                &message,
                run.started_at,
            );
            self.persist(&result);
            self.set_state(RunState::Errored);
        });
        if applied.is_none() {
            return self.cancelled_result(run);
        }
        tracing::error!(run_id = %run.run_id, error = %message, "run failed");
        result
    }

    fn fail_before_execution(
        &self,
        run_id: &str,
        workflow_id: &str,
        cancel: &RunCancellation,
        err: ExecutionError,
        started_at: DateTime<Utc>,
    ) -> ExecutionResult {
        let message = err.to_string();
        let kind = if err.is_validation() {
            ConsoleEntryKind::Validation
        } else {
            ConsoleEntryKind::Run
        };
        let mut result = ExecutionResult::failed(run_id, message.clone());
        result.metadata.start_time = Some(started_at);
        result.metadata.end_time = Some(self.runtime.now());

        let applied = self.with_live_run(cancel, |slot| {
            slot.cancellation = None;
            self.write_run_error_entry(run_id, workflow_id, kind, &message, started_at);
            self.persist(&result);
            self.set_state(RunState::Errored);
        });
        if applied.is_none() {
            return ExecutionResult::cancelled(run_id);
        }
        tracing::warn!(run_id = %run_id, error = %message, "run rejected before execution");
        result
    }

    /// Synthetic console entry for a run-level failure. Skipped once block
    /// entries exist for the run so errors are not reported twice.
    fn write_run_error_entry(
        &self,
        run_id: &str,
        workflow_id: &str,
        kind: ConsoleEntryKind,
        message: &str,
        started_at: DateTime<Utc>,
    ) {
        if self.console.block_entry_count(run_id) > 0 {
            return;
        }
        let (block_id, block_name, block_type) = match kind {
            ConsoleEntryKind::Validation => ("validation", "Workflow Validation", "validation"),
            _ => ("execution-error", "Workflow Execution", "execution"),
        };
        let ended_at = self.runtime.now();
        self.write_entry(ConsoleEntry {
            id: self.runtime.next_id(),
            run_id: run_id.to_string(),
            workflow_id: workflow_id.to_string(),
            kind,
            block_id: block_id.to_string(),
            block_name: block_name.to_string(),
            block_type: block_type.to_string(),
            input: Value::Null,
            output: Value::Null,
            success: false,
            error: Some(message.to_string()),
            duration_ms: (ended_at - started_at).num_milliseconds().max(0) as u64,
            started_at,
            ended_at,
            iteration: None,
        });
    }

    fn cancelled_result(&self, run: &RunContext) -> ExecutionResult {
        tracing::info!(run_id = %run.run_id, "run cancelled");
        let mut result = ExecutionResult::cancelled(&run.run_id);
        result.metadata.start_time = Some(run.started_at);
        result
    }

    // ================================
    // Debug
    // ================================

    /// Advance an open debug session by one continuation call.
    pub async fn step(&self) -> OrchestratorResult<ExecutionResult> {
        let (session, cancel) = self.take_debug_for_continuation()?;
        match self.advance_debug(&session, &cancel).await {
            DebugStepOutcome::Pending(next, _) => Ok(self.pause_debug(next, &cancel)),
            DebugStepOutcome::Finished(response) => Ok(self.finish_debug(&session, &cancel, response)),
            DebugStepOutcome::Failed(message) => Ok(self.fail_debug(&session, &cancel, message)),
            DebugStepOutcome::Cancelled => Ok(ExecutionResult::cancelled(&session.run_id)),
        }
    }

    /// Keep continuing until the engine reports no pending work.
    ///
    /// Bounded by `max_resume_iterations` continuation calls; hitting the cap
    /// leaves the session paused.
    pub async fn resume(&self) -> OrchestratorResult<ExecutionResult> {
        let (mut session, cancel) = self.take_debug_for_continuation()?;
        let cap = self.config.max_resume_iterations;
        let mut iterations = 0;

        loop {
            if iterations >= cap {
                tracing::warn!(
                    run_id = %session.run_id,
                    iterations,
                    pending = session.pending_blocks.len(),
                    "debug resume hit iteration cap"
                );
                return Ok(self.pause_debug(session, &cancel));
            }
            iterations += 1;

            match self.advance_debug(&session, &cancel).await {
                DebugStepOutcome::Pending(next, _) => {
                    let stored = self.with_live_run(&cancel, |slot| {
                        slot.debug = Some(next.clone());
                    });
                    if stored.is_none() {
                        return Ok(ExecutionResult::cancelled(&session.run_id));
                    }
                    session = next;
                }
                DebugStepOutcome::Finished(response) => {
                    return Ok(self.finish_debug(&session, &cancel, response));
                }
                DebugStepOutcome::Failed(message) => {
                    return Ok(self.fail_debug(&session, &cancel, message));
                }
                DebugStepOutcome::Cancelled => {
                    return Ok(ExecutionResult::cancelled(&session.run_id));
                }
            }
        }
    }

    /// Validate that a continuation can be issued and move to `DebugStepping`.
    ///
    /// Any missing piece of state forces a full debug reset.
    fn take_debug_for_continuation(&self) -> OrchestratorResult<(DebugSession, RunCancellation)> {
        let mut slot = self.slot.lock();
        if self.state() == RunState::DebugStepping {
            return Err(ExecutionError::RunInProgress);
        }

        let checked = match (&slot.debug, &slot.cancellation) {
            (None, _) => Err(ExecutionError::DebugStateMissing {
                missing: "debug session",
            }),
            (Some(_), None) => Err(ExecutionError::DebugStateMissing { missing: "run" }),
            (Some(session), Some(cancel)) => session
                .continue_request()
                .map(|_| (session.clone(), cancel.clone())),
        };

        match checked {
            Ok(found) => {
                self.state_tx.send_replace(RunState::DebugStepping);
                Ok(found)
            }
            Err(err) => {
                // A plain run may be streaming: its token and active set stay.
                let was_debugging = slot.debug.is_some() || self.state().is_debugging();
                slot.reset_debug();
                if was_debugging {
                    slot.active_blocks.clear();
                    slot.cancellation = None;
                    self.state_tx.send_replace(RunState::Idle);
                    tracing::warn!(error = %err, "debug state incomplete, resetting");
                } else {
                    tracing::debug!(error = %err, "no debug session to continue");
                }
                Err(err)
            }
        }
    }

    async fn advance_debug(&self, session: &DebugSession, cancel: &RunCancellation) -> DebugStepOutcome {
        let call = tokio::select! {
            _ = cancel.cancelled() => return DebugStepOutcome::Cancelled,
            call = continue_once(self.engine.as_ref(), session) => call,
        };
        if cancel.is_cancelled() {
            return DebugStepOutcome::Cancelled;
        }

        let (response, progress) = match call {
            Ok(done) => done,
            Err(ExecutionError::Engine(message)) => return DebugStepOutcome::Failed(message),
            Err(err) => return DebugStepOutcome::Failed(err.to_string()),
        };

        let run = RunContext {
            run_id: session.run_id.clone(),
            workflow_id: session.workflow_id.clone(),
            cancel: cancel.clone(),
            started_at: self.runtime.now(),
            override_blocks: None,
        };
        let mut logs = Vec::new();
        for log in &response.logs {
            let record = BlockRecord {
                block_id: &log.block_id,
                input: log.input.clone(),
                output: log.output.clone(),
                error: log.error.as_ref().map(|e| normalize_error_message(e)),
                duration_ms: log.duration_ms,
                started_at: Some(log.started_at),
                iteration: None,
            };
            if self.record_block(&run, record, &mut logs).is_none() {
                return DebugStepOutcome::Cancelled;
            }
        }
        if self
            .with_live_run(cancel, |slot| slot.debug_logs.extend(logs))
            .is_none()
        {
            return DebugStepOutcome::Cancelled;
        }

        if !response.success {
            let message = response
                .error
                .as_ref()
                .map(normalize_error_value)
                .unwrap_or_else(|| normalize_error_message(""));
            return DebugStepOutcome::Failed(message);
        }

        match progress {
            DebugProgress::Pending(next) => DebugStepOutcome::Pending(next, response),
            DebugProgress::Finished => DebugStepOutcome::Finished(response),
        }
    }

    fn pause_debug(&self, session: DebugSession, cancel: &RunCancellation) -> ExecutionResult {
        let run_id = session.run_id.clone();
        let pending_blocks = session.pending_blocks.clone();
        let context = session.context.clone();
        let applied = self.with_live_run(cancel, |slot| {
            let logs = slot.debug_logs.clone();
            let started = slot.debug_started_at;
            slot.debug = Some(session);
            self.set_state(RunState::DebugPending);
            (logs, started)
        });
        let Some((logs, start_time)) = applied else {
            return ExecutionResult::cancelled(&run_id);
        };

        ExecutionResult {
            run_id,
            status: ExecutionStatus::DebugPaused,
            success: true,
            output: Value::Null,
            error: None,
            logs,
            metadata: ResultMetadata {
                is_debug_session: true,
                context,
                pending_blocks,
                start_time,
                end_time: None,
            },
            total_duration_ms: start_time
                .map(|t| self.runtime.time_provider.elapsed_millis(t))
                .unwrap_or_default(),
        }
    }

    fn finish_debug(
        &self,
        session: &DebugSession,
        cancel: &RunCancellation,
        response: ContinueResponse,
    ) -> ExecutionResult {
        let ended_at = self.runtime.now();
        let finished = self.with_live_run(cancel, |slot| {
            let logs = std::mem::take(&mut slot.debug_logs);
            let started = slot.debug_started_at;
            slot.reset_debug();
            slot.active_blocks.clear();
            slot.cancellation = None;

            let result = ExecutionResult {
                run_id: session.run_id.clone(),
                status: ExecutionStatus::Completed,
                success: true,
                output: response.output,
                error: None,
                logs,
                metadata: ResultMetadata {
                    is_debug_session: false,
                    context: None,
                    pending_blocks: Vec::new(),
                    start_time: started,
                    end_time: Some(ended_at),
                },
                total_duration_ms: started
                    .map(|t| self.runtime.time_provider.elapsed_millis(t))
                    .unwrap_or_default(),
            };
            self.persist(&result);
            self.set_state(RunState::Completed);
            result
        });
        let Some(result) = finished else {
            return ExecutionResult::cancelled(&session.run_id);
        };
        tracing::info!(run_id = %session.run_id, "debug session finished");
        result
    }

    fn fail_debug(
        &self,
        session: &DebugSession,
        cancel: &RunCancellation,
        message: String,
    ) -> ExecutionResult {
        let ended_at = self.runtime.now();
        let failed = self.with_live_run(cancel, |slot| {
            let mut result = ExecutionResult::failed(&session.run_id, message.clone());
            result.logs = std::mem::take(&mut slot.debug_logs);
            result.metadata.start_time = slot.debug_started_at;
            result.metadata.end_time = Some(ended_at);
            slot.reset_debug();
            slot.active_blocks.clear();
            slot.cancellation = None;
            self.write_run_error_entry(
                &session.run_id,
                &session.workflow_id,
                ConsoleEntryKind::Run,
                &message,
                result.metadata.start_time.unwrap_or(ended_at),
            );
            self.persist(&result);
            self.set_state(RunState::Errored);
            result
        });
        let Some(result) = failed else {
            return ExecutionResult::cancelled(&session.run_id);
        };
        tracing::error!(run_id = %session.run_id, error = %message, "debug session failed");
        result
    }

    // ================================
    // Cancel
    // ================================

    /// Abort the current run. Returns `false` if nothing was running.
    ///
    /// Cancellation is not a failure: nothing is logged to the console and
    /// the result is not persisted.
    pub fn cancel(&self) -> bool {
        let mut slot = self.slot.lock();
        let Some(cancel) = slot.cancellation.take() else {
            return false;
        };
        cancel.cancel();
        slot.active_blocks.clear();
        let had_debug = slot.debug.is_some();
        slot.reset_debug();
        self.state_tx.send_replace(RunState::Cancelled);
        drop(slot);

        tracing::info!(run_id = %cancel.run_id(), debug = had_debug, "run cancel requested");
        true
    }
}

struct BlockRecord<'a> {
    block_id: &'a str,
    input: Value,
    output: Value,
    error: Option<String>,
    duration_ms: u64,
    started_at: Option<DateTime<Utc>>,
    iteration: Option<IterationContext>,
}
