use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::geometry::{Dimensions, Position};

/// Container flavour of a block that owns children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Loop,
    Parallel,
    Subflow,
}

impl ContainerKind {
    /// Parse a block type tag; ordinary blocks yield `None`.
    pub fn from_block_type(block_type: &str) -> Option<Self> {
        match block_type {
            "loop" => Some(ContainerKind::Loop),
            "parallel" => Some(ContainerKind::Parallel),
            "subflow" => Some(ContainerKind::Subflow),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerKind::Loop => "loop",
            ContainerKind::Parallel => "parallel",
            ContainerKind::Subflow => "subflow",
        }
    }
}

/// A node in the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,

    /// Type tag, e.g. `agent`, `loop`, `start_trigger`. Empty means the block
    /// is structurally invalid and is dropped before execution.
    #[serde(rename = "type", default)]
    pub block_type: String,

    #[serde(default)]
    pub name: String,

    /// Owning container, if any.
    #[serde(default, alias = "parentId")]
    pub parent_id: Option<String>,

    /// Relative to the parent's content origin when parented, else absolute.
    #[serde(default)]
    pub position: Position,

    /// Stored size (containers).
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,

    /// Rendered height reported by the canvas once the block has been measured.
    #[serde(default, alias = "measuredHeight")]
    pub measured_height: Option<f64>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub locked: bool,

    /// Block configured to act as a trigger.
    #[serde(default, alias = "triggerMode")]
    pub trigger_mode: bool,

    /// Field values keyed by field id.
    #[serde(default, alias = "subBlocks")]
    pub sub_blocks: HashMap<String, Value>,
}

fn default_true() -> bool {
    true
}

impl Block {
    pub fn new(id: impl Into<String>, block_type: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            block_type: block_type.into(),
            parent_id: None,
            position: Position::origin(),
            width: None,
            height: None,
            measured_height: None,
            enabled: true,
            locked: false,
            trigger_mode: false,
            sub_blocks: HashMap::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_measured_height(mut self, height: f64) -> Self {
        self.measured_height = Some(height);
        self
    }

    pub fn with_field(mut self, field: impl Into<String>, value: Value) -> Self {
        self.sub_blocks.insert(field.into(), value);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn as_trigger(mut self) -> Self {
        self.trigger_mode = true;
        self
    }

    pub fn container_kind(&self) -> Option<ContainerKind> {
        ContainerKind::from_block_type(&self.block_type)
    }

    #[inline]
    pub fn is_container(&self) -> bool {
        self.container_kind().is_some()
    }

    /// Stored size, if both axes are known.
    pub fn stored_dimensions(&self) -> Option<Dimensions> {
        match (self.width, self.height) {
            (Some(width), Some(height)) => Some(Dimensions::new(width, height)),
            _ => None,
        }
    }

    pub fn field(&self, field: &str) -> Option<&Value> {
        self.sub_blocks.get(field)
    }

    /// Name shown to the user; falls back to the id for unnamed blocks.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Directed connection between two blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, alias = "sourceHandle")]
    pub source_handle: Option<String>,
    #[serde(default, alias = "targetHandle")]
    pub target_handle: Option<String>,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: format!("{}-{}", source, target),
            source,
            target,
            source_handle: None,
            target_handle: None,
        }
    }
}
