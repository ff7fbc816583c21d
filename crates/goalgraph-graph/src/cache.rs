use crate::layout::{LayoutError, LayoutParams, LayoutTree, compute_layout};
use goalgraph_core::GoalNode;
use std::hash::{Hash, Hasher};

/// Structural fingerprint of a layout input: tree shape (ids and child
/// counts in preorder) plus orientation, viewport and margin bits.
///
/// Collapse flags and other payload fields are deliberately excluded —
/// toggling collapse must not invalidate a layout.
pub fn fingerprint(root: &GoalNode, params: &LayoutParams) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();

    match params.direction {
        goalgraph_core::LayoutDirection::Horizontal => 0u8.hash(&mut hasher),
        goalgraph_core::LayoutDirection::Vertical => 1u8.hash(&mut hasher),
    }
    params.viewport.x.to_bits().hash(&mut hasher);
    params.viewport.y.to_bits().hash(&mut hasher);
    params.margin.x.to_bits().hash(&mut hasher);
    params.margin.y.to_bits().hash(&mut hasher);

    for node in root.iter() {
        node.id.hash(&mut hasher);
        node.children.len().hash(&mut hasher);
    }

    hasher.finish()
}

/// Memoizes the most recent layout pass.
///
/// Recomputation happens only when the structural fingerprint changes; the
/// previous pass is discarded at that point. Layout is the most expensive
/// step of the pipeline and must not re-run on unrelated UI state changes.
#[derive(Debug, Default)]
pub struct LayoutCache {
    entry: Option<(u64, LayoutTree)>,
    hits: u64,
    misses: u64,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the layout for `root` under `params`, computing it only when
    /// the memoized pass no longer matches.
    pub fn layout(
        &mut self,
        root: &GoalNode,
        params: &LayoutParams,
    ) -> Result<LayoutTree, LayoutError> {
        let key = fingerprint(root, params);
        if let Some((cached_key, tree)) = &self.entry {
            if *cached_key == key {
                self.hits += 1;
                return Ok(tree.clone());
            }
        }

        let tree = compute_layout(root, params)?;
        self.misses += 1;
        self.entry = Some((key, tree.clone()));
        Ok(tree)
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
