//! Container auto-sizing.

use crate::domain::{Block, Dimensions};

use super::hierarchy::LayoutView;

impl<'a> LayoutView<'a> {
    /// Size that fits every direct child of `container_id` plus padding,
    /// never below the configured minimum. A container without children gets
    /// the default size.
    pub fn auto_size_container(&self, container_id: &str) -> Dimensions {
        let geometry = &self.config().container;
        let children = self.children(container_id);
        if children.is_empty() {
            return Dimensions::new(geometry.default_width, geometry.default_height);
        }

        let (max_right, max_bottom) = children.iter().fold((0.0_f64, 0.0_f64), |(r, b), child| {
            let dims = self.dimensions_of(child);
            (
                r.max(child.position.x + dims.width),
                b.max(child.position.y + dims.height),
            )
        });

        Dimensions::new(
            geometry
                .min_width
                .max(geometry.left_padding + max_right + geometry.right_padding),
            geometry.min_height.max(
                geometry.header_height + geometry.top_padding + max_bottom + geometry.bottom_padding,
            ),
        )
    }

    /// Recompute every container's size, deepest first, so an outer
    /// container always measures its inner containers at their final size.
    ///
    /// Returns only the containers whose size changed, in processing order.
    pub fn compute_container_sizes(mut self) -> Vec<(String, Dimensions)> {
        let mut containers: Vec<&Block> = self
            .blocks()
            .values()
            .filter(|b| b.is_container())
            .collect();
        containers.sort_by(|a, b| {
            self.depth(&b.id)
                .cmp(&self.depth(&a.id))
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut changed = Vec::new();
        for container in containers {
            let size = self.auto_size_container(&container.id);
            self.override_size(&container.id, size);
            if container.stored_dimensions() != Some(size) {
                changed.push((container.id.clone(), size));
            }
        }
        changed
    }
}
