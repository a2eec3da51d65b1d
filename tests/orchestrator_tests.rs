mod common;

use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use flowcanvas::core::delta_channel;
use flowcanvas::{
    Block, BlockLog, ConsoleEntryKind, EngineError, ExecutionError, ExecutionEvent,
    ExecutionOrchestrator, ExecutionStatus, MemoryBlockStore, MemoryConsole,
    MemoryFieldOverrides, OrchestratorBuilder, OrchestratorConfig, RemoteEngine, RetryPolicy,
    RunRequest, RunState, RuntimeContext, WorkflowSnapshot,
};

use common::*;

fn orchestrator(
    store: Arc<MemoryBlockStore>,
    engine: Arc<dyn RemoteEngine>,
    console: Arc<MemoryConsole>,
) -> ExecutionOrchestrator {
    orchestrator_with(store, engine, console, OrchestratorConfig::default())
}

fn orchestrator_with(
    store: Arc<MemoryBlockStore>,
    engine: Arc<dyn RemoteEngine>,
    console: Arc<MemoryConsole>,
    config: OrchestratorConfig,
) -> ExecutionOrchestrator {
    OrchestratorBuilder::new(store, engine, console)
        .config(config)
        .runtime(RuntimeContext::deterministic(1_700_000_000_000, "id"))
        .active("wf-1", "ws-1")
        .build()
}

#[tokio::test]
async fn test_manual_run_completes_and_logs_blocks() {
    let engine = ScriptedEngine::with_events(vec![
        ExecutionEvent::ExecutionStarted { execution_id: None },
        started("start"),
        completed("start", json!({})),
        started("agent1"),
        completed("agent1", json!({"content": "done"})),
        execution_completed(json!({"content": "done"})),
    ]);
    let console = Arc::new(MemoryConsole::new());
    let orch = orchestrator(linear_store(), engine.clone(), console.clone());

    let result = orch.start_run(RunRequest::manual()).await.unwrap();

    assert_eq!(result.status, ExecutionStatus::Completed);
    assert!(result.success);
    assert_eq!(result.logs.len(), 2);
    assert_eq!(result.total_duration_ms, 30);
    assert_eq!(orch.state(), RunState::Completed);
    assert!(orch.active_blocks().is_empty());

    let entries = console.entries_for_run(&result.run_id);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].block_name, "Agent 1");
    assert!(entries.iter().all(|e| e.kind == ConsoleEntryKind::Block && e.success));
    assert_eq!(console.results().len(), 1);

    let request = engine.last_request().unwrap();
    assert_eq!(request.start_block_id, "start");
    assert_eq!(request.workflow_id, "wf-1");
    assert!(!request.uses_state_override());
}

#[tokio::test]
async fn test_validation_failure_writes_synthetic_entry() {
    let store = Arc::new(MemoryBlockStore::with_blocks(vec![Block::new(
        "chat",
        "chat_trigger",
    )]));
    let engine = ScriptedEngine::with_events(Vec::new());
    let console = Arc::new(MemoryConsole::new());
    let orch = orchestrator(store, engine.clone(), console.clone());

    let result = orch.start_run(RunRequest::manual()).await.unwrap();

    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(
        result.error.as_deref(),
        Some("Workflow requires at least one trigger block to execute")
    );
    assert_eq!(orch.state(), RunState::Errored);
    assert_eq!(engine.execute_calls.load(Ordering::SeqCst), 0);

    let entries = console.entries_for_run(&result.run_id);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, ConsoleEntryKind::Validation);
    assert!(!entries[0].success);
}

#[tokio::test]
async fn test_missing_workspace_is_validation_error() {
    let console = Arc::new(MemoryConsole::new());
    let orch = OrchestratorBuilder::new(
        linear_store(),
        ScriptedEngine::with_events(Vec::new()),
        console.clone(),
    )
    .build();
    orch.set_active_workflow(Some("wf-1".into()));

    let result = orch.start_run(RunRequest::manual()).await.unwrap();
    assert_eq!(result.error.as_deref(), Some("No active workspace selected"));
    assert_eq!(console.entries()[0].kind, ConsoleEntryKind::Validation);
}

#[tokio::test]
async fn test_disconnected_trigger_names_block() {
    let store = Arc::new(MemoryBlockStore::with_blocks(vec![
        Block::new("start", "start_trigger").named("Start"),
        Block::new("agent1", "agent"),
    ]));
    let console = Arc::new(MemoryConsole::new());
    let orch = orchestrator(store, ScriptedEngine::with_events(Vec::new()), console);

    let result = orch.start_run(RunRequest::manual()).await.unwrap();
    assert_eq!(
        result.error.as_deref(),
        Some("Start is not connected to any blocks. Connect it to a block to run the workflow.")
    );
}

#[tokio::test]
async fn test_engine_error_is_normalized() {
    let engine = ScriptedEngine::with_events(vec![ExecutionEvent::ExecutionError {
        error: json!({"error": {"message": "undefined (undefined)"}}),
    }]);
    let console = Arc::new(MemoryConsole::new());
    let orch = orchestrator(linear_store(), engine, console.clone());

    let result = orch.start_run(RunRequest::manual()).await.unwrap();

    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.error.as_deref(), Some("Workflow execution failed"));
    let entries = console.entries_for_run(&result.run_id);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, ConsoleEntryKind::Run);
    assert_eq!(console.results().len(), 1);
}

#[tokio::test]
async fn test_block_error_suppresses_run_level_entry() {
    let engine = ScriptedEngine::with_events(vec![
        started("agent1"),
        ExecutionEvent::BlockError {
            block_id: "agent1".into(),
            input: Value::Null,
            error: json!({"error": {"message": "Model timeout"}}),
            duration_ms: 3,
            iteration: None,
        },
        ExecutionEvent::ExecutionError {
            error: json!("Model timeout"),
        },
    ]);
    let console = Arc::new(MemoryConsole::new());
    let orch = orchestrator(linear_store(), engine, console.clone());

    let result = orch.start_run(RunRequest::manual()).await.unwrap();

    assert_eq!(result.error.as_deref(), Some("Model timeout"));
    let entries = console.entries_for_run(&result.run_id);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].block_id, "agent1");
    assert_eq!(entries[0].error.as_deref(), Some("Model timeout"));
    assert!(!entries[0].success);
    assert!(orch.active_blocks().is_empty());
}

#[tokio::test]
async fn test_unknown_block_events_are_dropped() {
    let engine = ScriptedEngine::with_events(vec![
        completed("ghost", json!({})),
        completed("agent1", json!({})),
        execution_completed(Value::Null),
    ]);
    let console = Arc::new(MemoryConsole::new());
    let orch = orchestrator(linear_store(), engine, console.clone());

    let result = orch.start_run(RunRequest::manual()).await.unwrap();
    let ids: Vec<String> = console
        .entries_for_run(&result.run_id)
        .into_iter()
        .map(|e| e.block_id)
        .collect();
    assert_eq!(ids, vec!["agent1".to_string()]);
}

#[tokio::test]
async fn test_streamed_text_is_forwarded_and_merged() {
    let engine = ScriptedEngine::with_events(vec![
        started("agent1"),
        chunk("agent1", "Hel"),
        chunk("agent1", "lo"),
        started("agent2"),
        chunk("agent2", "World"),
        ExecutionEvent::StreamDone {
            block_id: "agent1".into(),
        },
        completed("agent1", json!({"content": "", "tokens": 2})),
        completed("agent2", Value::Null),
        execution_completed(Value::Null),
    ]);
    let console = Arc::new(MemoryConsole::new());
    let orch = orchestrator(linear_store(), engine, console.clone());

    let (tx, mut rx) = delta_channel();
    let result = orch
        .start_run(RunRequest::manual().stream_to(tx))
        .await
        .unwrap();

    let mut forwarded = String::new();
    while let Ok(delta) = rx.try_recv() {
        forwarded.push_str(&delta.text);
    }
    assert_eq!(forwarded, "Hello\n\nWorld");

    let log: &BlockLog = result.log_for("agent1").unwrap();
    assert_eq!(log.output, json!({"content": "Hello", "tokens": 2}));
    assert_eq!(result.log_for("agent2").unwrap().output, json!({"content": "World"}));
    assert_eq!(console.results()[0].log_for("agent1").unwrap().output["content"], "Hello");

    // agent1's stream was done before it completed, agent2's was not
    let entries = console.entries_for_run(&result.run_id);
    assert_eq!(entries[0].block_id, "agent1");
    assert_eq!(entries[0].output, json!({"content": "Hello", "tokens": 2}));
    assert_eq!(entries[1].block_id, "agent2");
    assert_eq!(entries[1].output, Value::Null);
}

#[tokio::test]
async fn test_selected_outputs_limit_forwarding() {
    let engine = ScriptedEngine::with_events(vec![
        chunk("agent1", "hidden"),
        chunk("agent2", "shown"),
        execution_completed(Value::Null),
    ]);
    let orch = orchestrator(linear_store(), engine, Arc::new(MemoryConsole::new()));

    let (tx, mut rx) = delta_channel();
    orch.start_run(
        RunRequest::manual()
            .selected_outputs(vec!["agent2.content".into()])
            .stream_to(tx),
    )
    .await
    .unwrap();

    let delta = rx.try_recv().unwrap();
    assert_eq!(delta.block_id, "agent2");
    assert_eq!(delta.text, "shown");
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_field_overrides_shape_trigger_input() {
    let engine = ScriptedEngine::with_events(vec![execution_completed(Value::Null)]);
    let overrides = Arc::new(MemoryFieldOverrides::new());
    overrides.set(
        "wf-1",
        "start",
        "inputFormat",
        json!([{"name": "question", "value": "why?"}, {"name": "unset"}]),
    );
    let orch = OrchestratorBuilder::new(linear_store(), engine.clone(), Arc::new(MemoryConsole::new()))
        .field_overrides(overrides)
        .active("wf-1", "ws-1")
        .build();

    orch.start_run(RunRequest::manual()).await.unwrap();
    assert_eq!(engine.last_request().unwrap().input, json!({"question": "why?"}));
}

#[tokio::test]
async fn test_state_override_is_sent_and_typeless_blocks_dropped() {
    let engine = ScriptedEngine::with_events(vec![
        completed("preview", json!({})),
        execution_completed(Value::Null),
    ]);
    let console = Arc::new(MemoryConsole::new());
    let orch = orchestrator(linear_store(), engine.clone(), console.clone());

    let mut preview = linear_workflow();
    preview.push(Block::new("preview", "function").named("Preview Only"));
    preview.push(Block::new("broken", ""));
    let snapshot = WorkflowSnapshot::new(preview, linear_edges());

    let result = orch
        .start_run(RunRequest::manual().with_state_override(snapshot))
        .await
        .unwrap();

    let sent = engine.last_request().unwrap().workflow_state_override.unwrap();
    assert!(sent.blocks.contains_key("preview"));
    assert!(!sent.blocks.contains_key("broken"));
    // preview-only blocks resolve through the override snapshot
    assert_eq!(console.entries_for_run(&result.run_id)[0].block_name, "Preview Only");
}

#[tokio::test]
async fn test_rate_limited_start_is_retried() {
    let engine = ScriptedEngine::with_events(vec![execution_completed(Value::Null)]);
    engine
        .start_errors
        .lock()
        .push_back(EngineError::rate_limited(Some(5)));
    let orch = orchestrator(linear_store(), engine.clone(), Arc::new(MemoryConsole::new()));

    let result = orch.start_run(RunRequest::manual()).await.unwrap();
    assert!(result.success);
    assert_eq!(engine.execute_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_non_retryable_start_error_fails_run() {
    let engine = ScriptedEngine::with_events(Vec::new());
    engine
        .start_errors
        .lock()
        .push_back(EngineError::rate_limited(Some(5)));
    let config = OrchestratorConfig {
        retry: RetryPolicy::disabled(),
        ..Default::default()
    };
    let orch = orchestrator_with(linear_store(), engine.clone(), Arc::new(MemoryConsole::new()), config);

    let result = orch.start_run(RunRequest::manual()).await.unwrap();
    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.error.as_deref(), Some("Rate limit exceeded. Retry after 5ms"));
    assert_eq!(engine.execute_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_console_entries_use_current_block_identity() {
    let (engine, tx) = ChannelEngine::new();
    let store = linear_store();
    let console = Arc::new(MemoryConsole::new());
    let orch = Arc::new(orchestrator(store.clone(), engine, console.clone()));

    let run = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.start_run(RunRequest::manual()).await })
    };

    tx.send(started("agent1")).unwrap();
    store.insert_block(Block::new("agent1", "agent").named("Renamed Agent"));
    tx.send(completed("agent1", json!({}))).unwrap();
    tx.send(execution_completed(Value::Null)).unwrap();

    let result = run.await.unwrap().unwrap();
    assert_eq!(console.entries_for_run(&result.run_id)[0].block_name, "Renamed Agent");
}

#[tokio::test]
async fn test_cancel_mid_stream_drops_late_events() {
    let (engine, tx) = ChannelEngine::new();
    let console = Arc::new(MemoryConsole::new());
    let orch = Arc::new(orchestrator(linear_store(), engine, console.clone()));
    let state = orch.subscribe();

    let run = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.start_run(RunRequest::manual()).await })
    };

    tx.send(started("agent1")).unwrap();
    tx.send(completed("agent1", json!({}))).unwrap();
    tx.send(started("agent2")).unwrap();
    while orch.active_blocks() != vec!["agent2".to_string()] {
        tokio::task::yield_now().await;
    }
    assert_eq!(console.entries().len(), 1);

    assert!(orch.cancel());
    assert!(orch.active_blocks().is_empty());

    // late events after cancel
    let _ = tx.send(completed("agent2", json!({})));
    let _ = tx.send(execution_completed(Value::Null));

    let result = run.await.unwrap().unwrap();
    assert_eq!(result.status, ExecutionStatus::Cancelled);
    assert!(result.error.is_none());
    assert_eq!(console.entries().len(), 1);
    assert!(console.results().is_empty());
    assert_eq!(state.wait_settled().await, RunState::Cancelled);
    assert!(!orch.cancel());
}

#[tokio::test]
async fn test_second_run_rejected_while_running() {
    let (engine, tx) = ChannelEngine::new();
    let orch = Arc::new(orchestrator(linear_store(), engine, Arc::new(MemoryConsole::new())));

    let run = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.start_run(RunRequest::manual()).await })
    };
    while orch.state() != RunState::Running {
        tokio::task::yield_now().await;
    }

    let err = orch.start_run(RunRequest::manual()).await.unwrap_err();
    assert_eq!(err, ExecutionError::RunInProgress);

    tx.send(execution_completed(Value::Null)).unwrap();
    assert!(run.await.unwrap().unwrap().success);
}

#[tokio::test]
async fn test_debug_run_pauses_then_steps_to_completion() {
    let engine = ScriptedEngine::with_events(debug_paused_events());
    engine.push_continue(continue_pending(&["agent2"]));
    engine.push_continue(continue_done(json!({"content": "final"})));
    let console = Arc::new(MemoryConsole::new());
    let orch = orchestrator(linear_store(), engine.clone(), console.clone());

    let paused = orch.start_run(RunRequest::manual().debug()).await.unwrap();
    assert_eq!(paused.status, ExecutionStatus::DebugPaused);
    assert!(paused.metadata.is_debug_session);
    assert_eq!(paused.metadata.pending_blocks, vec!["agent1".to_string()]);
    assert_eq!(orch.state(), RunState::DebugPending);
    assert!(console.results().is_empty());
    assert!(engine.last_request().unwrap().debug);

    let step = orch.step().await.unwrap();
    assert_eq!(step.status, ExecutionStatus::DebugPaused);
    assert_eq!(step.metadata.pending_blocks, vec!["agent2".to_string()]);
    assert_eq!(orch.state(), RunState::DebugPending);

    let done = orch.step().await.unwrap();
    assert_eq!(done.status, ExecutionStatus::Completed);
    assert_eq!(done.output, json!({"content": "final"}));
    assert_eq!(done.logs.len(), 1);
    assert_eq!(orch.state(), RunState::Completed);
    assert!(orch.debug_session().is_none());
    assert_eq!(console.results().len(), 1);

    let requests = engine.continue_requests.lock().clone();
    assert_eq!(requests[0].pending_blocks, vec!["agent1".to_string()]);
    assert_eq!(requests[1].pending_blocks, vec!["agent2".to_string()]);
    assert_eq!(requests[1].executor.as_str(), "executor-1");
}

#[tokio::test]
async fn test_resume_stops_at_iteration_cap() {
    let engine = ScriptedEngine::with_events(debug_paused_events());
    engine.repeat_continue(continue_pending(&["agent1"]));
    let config = OrchestratorConfig {
        max_resume_iterations: 25,
        ..Default::default()
    };
    let orch = orchestrator_with(linear_store(), engine.clone(), Arc::new(MemoryConsole::new()), config);

    orch.start_run(RunRequest::manual().debug()).await.unwrap();
    let result = orch.resume().await.unwrap();

    assert_eq!(result.status, ExecutionStatus::DebugPaused);
    assert_eq!(engine.continue_calls.load(Ordering::SeqCst), 25);
    assert_eq!(orch.state(), RunState::DebugPending);
    assert!(orch.debug_session().is_some());
}

#[tokio::test]
async fn test_resume_runs_until_no_pending_blocks() {
    let engine = ScriptedEngine::with_events(debug_paused_events());
    engine.push_continue(continue_pending(&["agent2"]));
    engine.push_continue(continue_pending(&["agent3"]));
    engine.push_continue(continue_done(json!("ok")));
    let orch = orchestrator(linear_store(), engine.clone(), Arc::new(MemoryConsole::new()));

    orch.start_run(RunRequest::manual().debug()).await.unwrap();
    let result = orch.resume().await.unwrap();

    assert_eq!(result.status, ExecutionStatus::Completed);
    assert_eq!(result.output, json!("ok"));
    assert_eq!(engine.continue_calls.load(Ordering::SeqCst), 3);
    assert_eq!(orch.state(), RunState::Completed);
}

#[tokio::test]
async fn test_step_without_session_reports_missing_state() {
    let orch = orchestrator(
        linear_store(),
        ScriptedEngine::with_events(Vec::new()),
        Arc::new(MemoryConsole::new()),
    );
    let err = orch.step().await.unwrap_err();
    assert_eq!(
        err,
        ExecutionError::DebugStateMissing {
            missing: "debug session"
        }
    );
    assert_eq!(orch.state(), RunState::Idle);
}

#[tokio::test]
async fn test_step_without_executor_forces_reset() {
    let mut events = debug_paused_events();
    if let Some(ExecutionEvent::ExecutionCompleted { metadata, .. }) = events.last_mut() {
        metadata.executor = None;
    }
    let engine = ScriptedEngine::with_events(events);
    let orch = orchestrator(linear_store(), engine.clone(), Arc::new(MemoryConsole::new()));

    orch.start_run(RunRequest::manual().debug()).await.unwrap();
    assert_eq!(orch.state(), RunState::DebugPending);

    let err = orch.step().await.unwrap_err();
    assert_eq!(err, ExecutionError::DebugStateMissing { missing: "executor" });
    assert!(orch.debug_session().is_none());
    assert_eq!(orch.state(), RunState::Idle);
    assert_eq!(engine.continue_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failed_continuation_resets_debug_state() {
    let engine = ScriptedEngine::with_events(debug_paused_events());
    engine.push_continue(flowcanvas::ContinueResponse {
        success: false,
        error: Some(json!({"message": "Agent crashed"})),
        ..continue_done(Value::Null)
    });
    let console = Arc::new(MemoryConsole::new());
    let orch = orchestrator(linear_store(), engine, console.clone());

    orch.start_run(RunRequest::manual().debug()).await.unwrap();
    let result = orch.step().await.unwrap();

    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.error.as_deref(), Some("Agent crashed"));
    assert!(orch.debug_session().is_none());
    assert_eq!(orch.state(), RunState::Errored);
    assert_eq!(console.results().len(), 1);
}

#[tokio::test]
async fn test_cancel_resets_open_debug_session() {
    let engine = ScriptedEngine::with_events(debug_paused_events());
    let console = Arc::new(MemoryConsole::new());
    let orch = orchestrator(linear_store(), engine, console.clone());

    orch.start_run(RunRequest::manual().debug()).await.unwrap();
    assert!(orch.cancel());

    assert!(orch.debug_session().is_none());
    assert_eq!(orch.state(), RunState::Cancelled);
    assert!(console.results().is_empty());
    assert!(matches!(
        orch.step().await.unwrap_err(),
        ExecutionError::DebugStateMissing { .. }
    ));
}

#[tokio::test]
async fn test_rejected_console_entry_does_not_stop_run() {
    let engine = ScriptedEngine::with_events(vec![
        started("agent1"),
        completed("agent1", json!({"content": "a"})),
        started("agent2"),
        completed("agent2", json!({"content": "b"})),
        execution_completed(json!({"content": "b"})),
    ]);
    let console = RejectingConsole::new("agent1");
    let orch = OrchestratorBuilder::new(linear_store(), engine, console.clone())
        .runtime(RuntimeContext::deterministic(1_700_000_000_000, "id"))
        .active("wf-1", "ws-1")
        .build();

    let result = orch.start_run(RunRequest::manual()).await.unwrap();

    assert_eq!(result.status, ExecutionStatus::Completed);
    assert!(result.log_for("agent1").is_some());
    assert_eq!(result.log_for("agent2").unwrap().output, json!({"content": "b"}));
    let ids: Vec<String> = console
        .inner
        .entries_for_run(&result.run_id)
        .into_iter()
        .map(|e| e.block_id)
        .collect();
    assert_eq!(ids, vec!["agent2".to_string()]);
    assert_eq!(console.inner.results().len(), 1);
}

#[tokio::test]
async fn test_dropped_stream_consumer_does_not_stop_run() {
    let (engine, tx) = ChannelEngine::new();
    let console = Arc::new(MemoryConsole::new());
    let orch = Arc::new(orchestrator(linear_store(), engine, console.clone()));

    let (delta_tx, mut delta_rx) = delta_channel();
    let run = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.start_run(RunRequest::manual().stream_to(delta_tx)).await })
    };

    tx.send(started("agent1")).unwrap();
    tx.send(chunk("agent1", "Hel")).unwrap();
    assert_eq!(delta_rx.recv().await.unwrap().text, "Hel");
    drop(delta_rx);

    tx.send(chunk("agent1", "lo")).unwrap();
    tx.send(completed("agent1", Value::Null)).unwrap();
    tx.send(execution_completed(Value::Null)).unwrap();

    let result = run.await.unwrap().unwrap();
    assert_eq!(result.status, ExecutionStatus::Completed);
    assert_eq!(result.log_for("agent1").unwrap().output, json!({"content": "Hello"}));
    assert_eq!(console.entries_for_run(&result.run_id).len(), 1);
}

#[tokio::test]
async fn test_step_during_plain_run_keeps_it_cancellable() {
    let (engine, tx) = ChannelEngine::new();
    let console = Arc::new(MemoryConsole::new());
    let orch = Arc::new(orchestrator(linear_store(), engine, console.clone()));

    let run = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.start_run(RunRequest::manual()).await })
    };

    tx.send(started("agent1")).unwrap();
    while orch.active_blocks() != vec!["agent1".to_string()] {
        tokio::task::yield_now().await;
    }

    let err = orch.step().await.unwrap_err();
    assert_eq!(
        err,
        ExecutionError::DebugStateMissing {
            missing: "debug session"
        }
    );
    assert!(matches!(
        orch.resume().await.unwrap_err(),
        ExecutionError::DebugStateMissing { .. }
    ));
    assert_eq!(orch.state(), RunState::Running);
    assert_eq!(orch.active_blocks(), vec!["agent1".to_string()]);

    assert!(orch.cancel());
    let _ = tx.send(completed("agent1", json!({})));
    let _ = tx.send(execution_completed(Value::Null));

    let result = run.await.unwrap().unwrap();
    assert_eq!(result.status, ExecutionStatus::Cancelled);
    assert!(console.entries().is_empty());
    assert!(console.results().is_empty());
    assert_eq!(orch.state(), RunState::Cancelled);
}

#[tokio::test]
async fn test_junk_start_error_is_scrubbed() {
    let engine = ScriptedEngine::with_events(Vec::new());
    engine
        .start_errors
        .lock()
        .push_back(EngineError::new("undefined (undefined)"));
    let orch = orchestrator(linear_store(), engine, Arc::new(MemoryConsole::new()));

    let result = orch.start_run(RunRequest::manual()).await.unwrap();

    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.error.as_deref(), Some("Workflow execution failed"));
}
