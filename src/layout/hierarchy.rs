//! Read-only queries over the container hierarchy.
//!
//! Parent links form an ownership forest. Nothing here trusts that: every
//! ancestor walk is bounded by a visited set or a hop limit, so a corrupted
//! cyclic chain degrades to a fallback value instead of looping.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::config::LayoutConfig;
use crate::domain::{Block, BlockRegistry, Dimensions, Position};

use super::geometry::{block_dimensions, clamp_to_content_area, container_dimensions, content_rect};

/// Hierarchy queries over one snapshot of the block set.
pub struct LayoutView<'a> {
    blocks: &'a HashMap<String, Block>,
    config: &'a LayoutConfig,
    registry: &'a BlockRegistry,
    /// Sizes computed earlier in a resize pass, taking precedence over
    /// stored sizes.
    size_overrides: HashMap<String, Dimensions>,
}

impl<'a> LayoutView<'a> {
    pub fn new(
        blocks: &'a HashMap<String, Block>,
        config: &'a LayoutConfig,
        registry: &'a BlockRegistry,
    ) -> Self {
        Self {
            blocks,
            config,
            registry,
            size_overrides: HashMap::new(),
        }
    }

    pub fn blocks(&self) -> &'a HashMap<String, Block> {
        self.blocks
    }

    pub fn config(&self) -> &'a LayoutConfig {
        self.config
    }

    pub(crate) fn override_size(&mut self, block_id: &str, dimensions: Dimensions) {
        self.size_overrides.insert(block_id.to_string(), dimensions);
    }

    /// Current size of a block, honouring sizes computed in this pass.
    pub fn dimensions_of(&self, block: &Block) -> Dimensions {
        if let Some(dims) = self.size_overrides.get(&block.id) {
            return *dims;
        }
        block_dimensions(
            block,
            self.registry,
            &self.config.block,
            &self.config.container,
        )
    }

    fn container_size(&self, block: &Block) -> Dimensions {
        self.size_overrides
            .get(&block.id)
            .copied()
            .unwrap_or_else(|| container_dimensions(block, &self.config.container))
    }

    /// Number of ancestor hops above `block_id`, capped at the configured
    /// maximum depth. Missing and unparented blocks have depth 0.
    pub fn depth(&self, block_id: &str) -> usize {
        self.depth_bounded(block_id, self.config.max_depth)
    }

    pub fn depth_bounded(&self, block_id: &str, max_depth: usize) -> usize {
        let mut depth = 0;
        let mut current = self.blocks.get(block_id);
        while let Some(block) = current {
            let Some(parent) = block.parent_id.as_deref().and_then(|p| self.blocks.get(p)) else {
                break;
            };
            if depth >= max_depth {
                tracing::warn!(block_id = %block_id, max_depth, "hierarchy depth limit reached");
                break;
            }
            depth += 1;
            current = Some(parent);
        }
        depth
    }

    /// Ancestor chain of `block_id`, root first and the block itself last.
    /// Empty when the block does not exist.
    pub fn hierarchy_path(&self, block_id: &str) -> Vec<String> {
        let Some(block) = self.blocks.get(block_id) else {
            return Vec::new();
        };
        let mut path = vec![block.id.clone()];
        let mut visited: HashSet<&str> = HashSet::from([block.id.as_str()]);
        let mut current = block;
        while let Some(parent_id) = current.parent_id.as_deref() {
            if !visited.insert(parent_id) {
                tracing::warn!(block_id = %block_id, parent_id = %parent_id, "cyclic parent chain");
                break;
            }
            let Some(parent) = self.blocks.get(parent_id) else {
                break;
            };
            if path.len() > self.config.max_depth {
                tracing::warn!(block_id = %block_id, "hierarchy depth limit reached");
                break;
            }
            path.push(parent.id.clone());
            current = parent;
        }
        path.reverse();
        path
    }

    /// Canvas-absolute position of a block.
    ///
    /// A cyclic parent chain is corrupted state: it is logged and the block's
    /// raw stored position is returned instead.
    pub fn absolute_position(&self, block_id: &str) -> Position {
        let Some(block) = self.blocks.get(block_id) else {
            tracing::warn!(block_id = %block_id, "absolute position requested for unknown block");
            return Position::origin();
        };
        if block.parent_id.is_none() {
            return block.position;
        }

        // self first, outermost existing ancestor last
        let mut chain: Vec<&Block> = vec![block];
        let mut visited: HashSet<&str> = HashSet::from([block.id.as_str()]);
        let mut current = block;
        while let Some(parent_id) = current.parent_id.as_deref() {
            if !visited.insert(parent_id) {
                tracing::warn!(
                    block_id = %block_id,
                    parent_id = %parent_id,
                    "cyclic parent chain, using raw position"
                );
                return block.position;
            }
            let Some(parent) = self.blocks.get(parent_id) else {
                tracing::debug!(block_id = %current.id, parent_id = %parent_id, "parent missing");
                break;
            };
            if chain.len() > self.config.max_depth {
                tracing::warn!(block_id = %block_id, "hierarchy depth limit reached, using raw position");
                return block.position;
            }
            chain.push(parent);
            current = parent;
        }

        let container = &self.config.container;
        let mut iter = chain.iter().rev();
        let mut absolute = iter.next().map(|root| root.position).unwrap_or_default();
        for child in iter {
            absolute = absolute.offset(container.content_offset_x(), container.content_offset_y())
                + child.position;
        }
        absolute
    }

    /// Position `block_id` would have, relative to `new_parent_id`'s content
    /// origin, if reparented without moving on screen. Clamped into the new
    /// parent's content area.
    pub fn relative_position(&self, block_id: &str, new_parent_id: &str) -> Position {
        let (Some(block), Some(parent)) = (self.blocks.get(block_id), self.blocks.get(new_parent_id))
        else {
            tracing::warn!(
                block_id = %block_id,
                parent_id = %new_parent_id,
                "relative position requested for unknown block"
            );
            return Position::origin();
        };
        let container = &self.config.container;
        let outer = self.absolute_position(block_id) - self.absolute_position(new_parent_id);
        let clamped = clamp_to_content_area(
            outer,
            self.container_size(parent),
            self.dimensions_of(block),
            container,
        );
        clamped.offset(-container.content_offset_x(), -container.content_offset_y())
    }

    /// Smallest container whose content area contains `point`.
    ///
    /// `exclude` removes a block and everything below it from consideration,
    /// so a dragged container can never land inside itself.
    pub fn container_at(&self, point: Position, exclude: Option<&str>) -> Option<&'a Block> {
        let excluded: HashSet<String> = match exclude {
            Some(id) => {
                let mut set = self.descendants(id);
                set.insert(id.to_string());
                set
            }
            None => HashSet::new(),
        };

        self.blocks
            .values()
            .filter(|b| b.is_container() && !excluded.contains(&b.id))
            .filter_map(|b| {
                let rect = content_rect(
                    self.absolute_position(&b.id),
                    self.container_size(b),
                    &self.config.container,
                );
                rect.contains(point).then_some((b, rect.area()))
            })
            .min_by(|(a, area_a), (b, area_b)| {
                area_a
                    .total_cmp(area_b)
                    .then_with(|| self.depth(&b.id).cmp(&self.depth(&a.id)))
                    .then_with(|| a.id.cmp(&b.id))
            })
            .map(|(b, _)| b)
    }

    /// Direct children of a container, by stored parent link.
    pub fn children(&self, container_id: &str) -> Vec<&'a Block> {
        let mut children: Vec<&Block> = self
            .blocks
            .values()
            .filter(|b| b.parent_id.as_deref() == Some(container_id))
            .collect();
        children.sort_by(|a, b| a.id.cmp(&b.id));
        children
    }

    /// Every block below `block_id`, excluding itself.
    pub fn descendants(&self, block_id: &str) -> HashSet<String> {
        let mut by_parent: HashMap<&str, Vec<&str>> = HashMap::new();
        for block in self.blocks.values() {
            if let Some(parent) = block.parent_id.as_deref() {
                by_parent.entry(parent).or_default().push(block.id.as_str());
            }
        }

        let mut found = HashSet::new();
        let mut queue = VecDeque::from([block_id]);
        while let Some(id) = queue.pop_front() {
            for child in by_parent.get(id).into_iter().flatten() {
                if *child != block_id && found.insert(child.to_string()) {
                    queue.push_back(*child);
                }
            }
        }
        found
    }

    pub fn is_descendant(&self, block_id: &str, ancestor_id: &str) -> bool {
        self.descendants(ancestor_id).contains(block_id)
    }
}
