//! Node hierarchy and geometry engine.
//!
//! - [`geometry`]: pure size estimation and content-area clamping.
//! - [`LayoutView`]: depth, ancestor paths, absolute/relative positions,
//!   hit testing and auto-sizing over one snapshot of the block set.
//! - [`HierarchyResolver`]: the same queries against a live
//!   [`BlockStore`](crate::store::BlockStore), plus the reparent and resize
//!   mutations.
//!
//! Layout runs on every drag frame: nothing here returns an error. Unknown ids
//! and corrupted hierarchies degrade to defaults and are logged.

pub mod geometry;
mod hierarchy;
mod resolver;
mod sizing;

pub use geometry::{
    block_dimensions, clamp_to_content_area, container_dimensions, content_rect,
    estimate_dimensions,
};
pub use hierarchy::LayoutView;
pub use resolver::{HierarchyResolver, ReparentOutcome};
