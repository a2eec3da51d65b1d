//! Pure geometry helpers for container content areas and block sizes.

use crate::config::{BlockGeometry, ContainerGeometry};
use crate::domain::{Block, BlockRegistry, Dimensions, Position, Rect};

/// Deterministic size estimate for a block type that has not been measured.
///
/// The visible row count comes from the type's declared field count, clamped
/// to `[min_rows, max_rows]`; blocks that are neither start nor terminal get
/// one extra row for their error handle. Unknown types estimate with the
/// minimum row count.
pub fn estimate_dimensions(
    block_type: &str,
    registry: &BlockRegistry,
    geometry: &BlockGeometry,
) -> Dimensions {
    let definition = registry.get(block_type);
    let declared = definition.map(|d| d.field_count).unwrap_or(geometry.min_rows);
    let mut rows = declared.clamp(geometry.min_rows, geometry.max_rows.max(geometry.min_rows));
    if !definition.map(|d| d.is_start_or_terminal()).unwrap_or(false) {
        rows += 1;
    }
    Dimensions::new(
        geometry.width,
        geometry.header_height + geometry.content_padding + rows as f64 * geometry.row_height,
    )
}

/// Stored size of a container, or the configured default.
pub fn container_dimensions(block: &Block, geometry: &ContainerGeometry) -> Dimensions {
    Dimensions::new(
        block.width.unwrap_or(geometry.default_width),
        block.height.unwrap_or(geometry.default_height),
    )
}

/// Current size of any block: containers use their stored size, ordinary
/// blocks their measured height or the estimate.
pub fn block_dimensions(
    block: &Block,
    registry: &BlockRegistry,
    block_geometry: &BlockGeometry,
    container_geometry: &ContainerGeometry,
) -> Dimensions {
    if block.is_container() {
        return container_dimensions(block, container_geometry);
    }
    let estimate = estimate_dimensions(&block.block_type, registry, block_geometry);
    Dimensions::new(
        block.width.unwrap_or(estimate.width),
        block.measured_height.unwrap_or(estimate.height),
    )
}

/// Clamp a position, relative to the container's outer top-left, into its
/// content area. When the container is smaller than the block the minimum
/// wins, so a placement never goes negative.
pub fn clamp_to_content_area(
    position: Position,
    container: Dimensions,
    block: Dimensions,
    geometry: &ContainerGeometry,
) -> Position {
    let min_x = geometry.left_padding;
    let max_x = container.width - geometry.right_padding - block.width;
    let min_y = geometry.header_height + geometry.top_padding;
    let max_y = container.height - geometry.bottom_padding - block.height;

    Position::new(clamp_or_min(position.x, min_x, max_x), clamp_or_min(position.y, min_y, max_y))
}

fn clamp_or_min(value: f64, min: f64, max: f64) -> f64 {
    if max < min {
        min
    } else {
        value.clamp(min, max)
    }
}

/// Absolute rectangle of a container's content area.
pub fn content_rect(
    container_origin: Position,
    container: Dimensions,
    geometry: &ContainerGeometry,
) -> Rect {
    Rect::new(
        container_origin.x + geometry.content_offset_x(),
        container_origin.y + geometry.content_offset_y(),
        container.width - geometry.left_padding - geometry.right_padding,
        container.height - geometry.content_offset_y() - geometry.bottom_padding,
    )
}
