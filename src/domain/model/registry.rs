use std::collections::HashMap;

use super::block::ContainerKind;

/// How a trigger block enters the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StartPath {
    /// `start_trigger`: one block serving manual, API and chat runs.
    Unified,
    /// `starter`: the legacy start block.
    LegacyStarter,
    SplitInput,
    SplitApi,
    SplitManual,
    SplitChat,
    Schedule,
    /// Webhooks and third-party triggers.
    External,
}

impl StartPath {
    /// Only the legacy starter may run without outgoing edges.
    pub fn requires_connection(&self) -> bool {
        !matches!(self, StartPath::LegacyStarter)
    }
}

/// Declared output field of a trigger, used to build mock payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputField {
    pub name: String,
    pub field_type: String,
}

impl OutputField {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerDefinition {
    pub path: StartPath,
    /// The trigger normally receives an external payload, so a manual run
    /// needs a mocked one.
    pub needs_mock_payload: bool,
    pub outputs: Vec<OutputField>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockCategory {
    Block,
    Trigger,
    Container(ContainerKind),
}

/// Static description of a block type.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDefinition {
    pub block_type: String,
    pub category: BlockCategory,
    /// Number of visible configuration rows.
    pub field_count: usize,
    /// Terminal blocks have no outgoing error handle row.
    pub terminal: bool,
    pub trigger: Option<TriggerDefinition>,
}

impl BlockDefinition {
    pub fn block(block_type: impl Into<String>, field_count: usize) -> Self {
        Self {
            block_type: block_type.into(),
            category: BlockCategory::Block,
            field_count,
            terminal: false,
            trigger: None,
        }
    }

    pub fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }

    pub fn trigger(block_type: impl Into<String>, field_count: usize, path: StartPath) -> Self {
        Self {
            block_type: block_type.into(),
            category: BlockCategory::Trigger,
            field_count,
            terminal: false,
            trigger: Some(TriggerDefinition {
                path,
                needs_mock_payload: false,
                outputs: Vec::new(),
            }),
        }
    }

    pub fn container(kind: ContainerKind) -> Self {
        Self {
            block_type: kind.as_str().to_string(),
            category: BlockCategory::Container(kind),
            field_count: 0,
            terminal: false,
            trigger: None,
        }
    }

    /// Declare that a manual run must mock this trigger's payload.
    pub fn with_mock_outputs(mut self, outputs: Vec<OutputField>) -> Self {
        if let Some(trigger) = &mut self.trigger {
            trigger.needs_mock_payload = true;
            trigger.outputs = outputs;
        }
        self
    }

    /// Attach a trigger capability to an ordinary block, activated by the
    /// block's `trigger_mode` flag.
    pub fn with_trigger_capability(mut self, path: StartPath) -> Self {
        self.trigger = Some(TriggerDefinition {
            path,
            needs_mock_payload: true,
            outputs: Vec::new(),
        });
        self
    }

    /// Start and terminal blocks render without the extra handle row.
    pub fn is_start_or_terminal(&self) -> bool {
        self.terminal || self.category == BlockCategory::Trigger
    }
}

/// Catalog of known block types.
pub struct BlockRegistry {
    definitions: HashMap<String, BlockDefinition>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        BlockRegistry {
            definitions: HashMap::new(),
        }
    }

    /// Registry pre-populated with the built-in block types.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        // triggers
        registry.register(BlockDefinition::trigger("starter", 3, StartPath::LegacyStarter));
        registry.register(BlockDefinition::trigger("start_trigger", 1, StartPath::Unified));
        registry.register(BlockDefinition::trigger("input_trigger", 1, StartPath::SplitInput));
        registry.register(BlockDefinition::trigger("api_trigger", 1, StartPath::SplitApi));
        registry.register(BlockDefinition::trigger("manual_trigger", 0, StartPath::SplitManual));
        registry.register(BlockDefinition::trigger("chat_trigger", 0, StartPath::SplitChat));
        registry.register(BlockDefinition::trigger("schedule", 4, StartPath::Schedule));
        registry.register(
            BlockDefinition::trigger("generic_webhook", 3, StartPath::External).with_mock_outputs(
                vec![
                    OutputField::new("payload", "json"),
                    OutputField::new("headers", "json"),
                    OutputField::new("method", "string"),
                ],
            ),
        );

        // containers
        registry.register(BlockDefinition::container(ContainerKind::Loop));
        registry.register(BlockDefinition::container(ContainerKind::Parallel));
        registry.register(BlockDefinition::container(ContainerKind::Subflow));

        // ordinary blocks
        registry.register(BlockDefinition::block("agent", 6));
        registry.register(BlockDefinition::block("function", 2));
        registry.register(
            BlockDefinition::block("api", 5).with_trigger_capability(StartPath::External),
        );
        registry.register(BlockDefinition::block("condition", 3));
        registry.register(BlockDefinition::block("router", 4));
        registry.register(BlockDefinition::block("evaluator", 5));
        registry.register(BlockDefinition::block("response", 3).terminal());

        registry
    }

    pub fn register(&mut self, definition: BlockDefinition) {
        self.definitions
            .insert(definition.block_type.clone(), definition);
    }

    pub fn get(&self, block_type: &str) -> Option<&BlockDefinition> {
        self.definitions.get(block_type)
    }

    pub fn registered_types(&self) -> Vec<String> {
        self.definitions.keys().cloned().collect()
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
