//! Builders wiring the injected capabilities into the two subsystems.
//!
//! [`OrchestratorBuilder`] assembles an
//! [`ExecutionOrchestrator`](crate::application::workflow_run::ExecutionOrchestrator);
//! [`CanvasRuntime`] shares one block store between it and a
//! [`HierarchyResolver`].

use std::sync::Arc;

use crate::application::workflow_run::ExecutionOrchestrator;
use crate::config::{CanvasConfig, OrchestratorConfig};
use crate::core::{ConsoleSink, RemoteEngine, RuntimeContext};
use crate::domain::BlockRegistry;
use crate::layout::HierarchyResolver;
use crate::store::{BlockStore, FieldOverrideStore, MemoryFieldOverrides};

/// Builder for an [`ExecutionOrchestrator`].
pub struct OrchestratorBuilder {
    store: Arc<dyn BlockStore>,
    engine: Arc<dyn RemoteEngine>,
    console: Arc<dyn ConsoleSink>,
    overrides: Arc<dyn FieldOverrideStore>,
    registry: Arc<BlockRegistry>,
    config: OrchestratorConfig,
    runtime: RuntimeContext,
    workflow_id: Option<String>,
    workspace_id: Option<String>,
}

impl OrchestratorBuilder {
    pub fn new(
        store: Arc<dyn BlockStore>,
        engine: Arc<dyn RemoteEngine>,
        console: Arc<dyn ConsoleSink>,
    ) -> Self {
        Self {
            store,
            engine,
            console,
            overrides: Arc::new(MemoryFieldOverrides::new()),
            registry: Arc::new(BlockRegistry::with_builtins()),
            config: OrchestratorConfig::default(),
            runtime: RuntimeContext::default(),
            workflow_id: None,
            workspace_id: None,
        }
    }

    /// Set the per-workflow field override source.
    pub fn field_overrides(mut self, overrides: Arc<dyn FieldOverrideStore>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn registry(mut self, registry: Arc<BlockRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Override time and id generation (deterministic tests).
    pub fn runtime(mut self, runtime: RuntimeContext) -> Self {
        self.runtime = runtime;
        self
    }

    /// Select the active workflow and workspace up front.
    pub fn active(mut self, workflow_id: impl Into<String>, workspace_id: impl Into<String>) -> Self {
        self.workflow_id = Some(workflow_id.into());
        self.workspace_id = Some(workspace_id.into());
        self
    }

    pub fn build(self) -> ExecutionOrchestrator {
        let orchestrator = ExecutionOrchestrator::new(
            self.store,
            self.engine,
            self.console,
            self.overrides,
            self.registry,
            self.config,
            self.runtime,
        );
        orchestrator.set_active_workflow(self.workflow_id);
        orchestrator.set_active_workspace(self.workspace_id);
        orchestrator
    }
}

/// Layout and execution over one shared block store.
pub struct CanvasRuntime {
    pub layout: HierarchyResolver,
    pub execution: ExecutionOrchestrator,
}

impl CanvasRuntime {
    pub fn new(
        config: CanvasConfig,
        store: Arc<dyn BlockStore>,
        engine: Arc<dyn RemoteEngine>,
        console: Arc<dyn ConsoleSink>,
    ) -> Self {
        let registry = Arc::new(BlockRegistry::with_builtins());
        let layout = HierarchyResolver::new(store.clone(), config.layout, registry.clone());
        let execution = OrchestratorBuilder::new(store, engine, console)
            .registry(registry)
            .config(config.execution)
            .build();
        Self { layout, execution }
    }
}
