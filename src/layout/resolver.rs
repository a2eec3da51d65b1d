//! Store-backed entry points of the hierarchy engine.
//!
//! Queries snapshot the [`BlockStore`] and delegate to [`LayoutView`]. The two
//! mutations, [`HierarchyResolver::reparent`] and
//! [`HierarchyResolver::resize_all_containers`], are the only code paths that
//! write layout fields back to the store.

use std::sync::Arc;

use crate::config::LayoutConfig;
use crate::domain::{BlockRegistry, Dimensions, Position};
use crate::store::{BlockStore, BlockUpdate};

use super::hierarchy::LayoutView;

/// Result of a [`HierarchyResolver::reparent`] request.
#[derive(Debug, Clone, PartialEq)]
pub enum ReparentOutcome {
    /// The block already had the requested parent.
    Unchanged,
    /// Position and parent link were written together.
    Moved {
        position: Position,
        parent_id: Option<String>,
    },
    /// The request would corrupt the hierarchy or referenced unknown blocks.
    Rejected(String),
}

pub struct HierarchyResolver {
    store: Arc<dyn BlockStore>,
    config: LayoutConfig,
    registry: Arc<BlockRegistry>,
}

impl HierarchyResolver {
    pub fn new(store: Arc<dyn BlockStore>, config: LayoutConfig, registry: Arc<BlockRegistry>) -> Self {
        Self {
            store,
            config,
            registry,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    fn with_view<T>(&self, f: impl FnOnce(&LayoutView<'_>) -> T) -> T {
        let blocks = self.store.blocks();
        let view = LayoutView::new(&blocks, &self.config, &self.registry);
        f(&view)
    }

    pub fn depth(&self, block_id: &str) -> usize {
        self.with_view(|v| v.depth(block_id))
    }

    pub fn hierarchy_path(&self, block_id: &str) -> Vec<String> {
        self.with_view(|v| v.hierarchy_path(block_id))
    }

    pub fn absolute_position(&self, block_id: &str) -> Position {
        self.with_view(|v| v.absolute_position(block_id))
    }

    pub fn relative_position(&self, block_id: &str, new_parent_id: &str) -> Position {
        self.with_view(|v| v.relative_position(block_id, new_parent_id))
    }

    /// Id of the most specific container under `point`.
    pub fn container_at(&self, point: Position, exclude: Option<&str>) -> Option<String> {
        self.with_view(|v| v.container_at(point, exclude).map(|b| b.id.clone()))
    }

    pub fn auto_size_container(&self, container_id: &str) -> Dimensions {
        self.with_view(|v| {
            if !v.blocks().contains_key(container_id) {
                tracing::warn!(block_id = %container_id, "auto-size requested for unknown container");
            }
            v.auto_size_container(container_id)
        })
    }

    /// Recompute every container's size deepest first and hand each changed
    /// size to `apply`. Unchanged containers are skipped.
    pub fn resize_all_containers_with(&self, mut apply: impl FnMut(&str, Dimensions)) -> usize {
        let blocks = self.store.blocks();
        let changed = LayoutView::new(&blocks, &self.config, &self.registry).compute_container_sizes();
        for (id, dims) in &changed {
            apply(id, *dims);
        }
        changed.len()
    }

    /// Recompute container sizes and write the changed ones to the store in
    /// one batch. Returns how many containers changed.
    pub fn resize_all_containers(&self) -> usize {
        let mut updates = Vec::new();
        self.resize_all_containers_with(|id, dimensions| {
            updates.push(BlockUpdate::Dimensions {
                block_id: id.to_string(),
                dimensions,
            })
        });
        let count = updates.len();
        if count > 0 {
            if let Err(e) = self.store.apply(&updates) {
                tracing::warn!(error = %e, "container resize dropped");
                return 0;
            }
        }
        count
    }

    /// Move `block_id` into `new_parent_id` (or out to the canvas with `None`)
    /// without changing where it appears on screen, then re-fit containers.
    ///
    /// Position and parent link are computed from one snapshot and written as
    /// a single atomic batch.
    pub fn reparent(&self, block_id: &str, new_parent_id: Option<&str>) -> ReparentOutcome {
        let blocks = self.store.blocks();
        let view = LayoutView::new(&blocks, &self.config, &self.registry);

        let Some(block) = blocks.get(block_id) else {
            tracing::warn!(block_id = %block_id, "reparent requested for unknown block");
            return ReparentOutcome::Rejected(format!("Block not found: {}", block_id));
        };
        if block.parent_id.as_deref() == new_parent_id {
            return ReparentOutcome::Unchanged;
        }
        if block.locked {
            tracing::warn!(block_id = %block_id, "reparent rejected: block is locked");
            return ReparentOutcome::Rejected(format!("Block is locked: {}", block_id));
        }

        let position = match new_parent_id {
            Some(parent_id) => {
                if let Err(reason) = self.validate_new_parent(&view, block_id, parent_id) {
                    tracing::warn!(block_id = %block_id, parent_id = %parent_id, %reason, "reparent rejected");
                    return ReparentOutcome::Rejected(reason);
                }
                view.relative_position(block_id, parent_id)
            }
            None => view.absolute_position(block_id),
        };

        let updates = [
            BlockUpdate::Position {
                block_id: block_id.to_string(),
                position,
            },
            BlockUpdate::Parent {
                block_id: block_id.to_string(),
                parent_id: new_parent_id.map(str::to_string),
            },
        ];
        if let Err(e) = self.store.apply(&updates) {
            tracing::warn!(block_id = %block_id, error = %e, "reparent write failed");
            return ReparentOutcome::Rejected(e.to_string());
        }
        tracing::debug!(block_id = %block_id, parent_id = ?new_parent_id, "block reparented");

        self.resize_all_containers();
        ReparentOutcome::Moved {
            position,
            parent_id: new_parent_id.map(str::to_string),
        }
    }

    fn validate_new_parent(
        &self,
        view: &LayoutView<'_>,
        block_id: &str,
        parent_id: &str,
    ) -> Result<(), String> {
        let Some(parent) = view.blocks().get(parent_id) else {
            return Err(format!("Parent not found: {}", parent_id));
        };
        if !parent.is_container() {
            return Err(format!("{} is not a container", parent_id));
        }
        if parent_id == block_id || view.is_descendant(parent_id, block_id) {
            return Err(format!("{} cannot contain its own ancestor {}", parent_id, block_id));
        }
        if parent.locked {
            return Err(format!("Container is locked: {}", parent_id));
        }
        Ok(())
    }
}
