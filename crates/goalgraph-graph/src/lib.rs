pub mod cache;
pub mod collapse;
pub mod hierarchy;
pub mod layout;
pub mod sanitize;
pub mod style;

pub use cache::{LayoutCache, fingerprint};
pub use collapse::CollapseStore;
pub use hierarchy::{HierarchyError, build_tree, effective_progress, tree_stats};
pub use layout::{
    LayoutError, LayoutGoal, LayoutParams, LayoutTree, LinkSegment, Vec2, compute_layout,
};
pub use sanitize::{RawChildren, RawGoalNode, sanitize_tree};
pub use style::{Color, StatusColors, resolve_style, status_colors};
