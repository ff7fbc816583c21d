use goalgraph_core::{GoalId, GoalNode, GoalStatus, GoalStyle, LayoutDirection, UiState};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Inputs of one layout pass: viewport, margins, and flow direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutParams {
    pub viewport: Vec2,
    pub margin: Vec2,
    pub direction: LayoutDirection,
}

impl LayoutParams {
    /// Default margin on every side, in the viewport's units.
    pub const DEFAULT_MARGIN: f32 = 40.0;

    pub fn new(width: f32, height: f32) -> Self {
        Self {
            viewport: Vec2::new(width, height),
            margin: Vec2::new(Self::DEFAULT_MARGIN, Self::DEFAULT_MARGIN),
            direction: LayoutDirection::default(),
        }
    }

    pub fn with_direction(mut self, direction: LayoutDirection) -> Self {
        self.direction = direction;
        self
    }

    fn available(&self) -> Vec2 {
        Vec2::new(
            self.viewport.x - 2.0 * self.margin.x,
            self.viewport.y - 2.0 * self.margin.y,
        )
    }
}

/// A goal with its absolute position for one render pass, plus a reference
/// to its laid-out parent. Produced fresh per pass and never mutated after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutGoal {
    pub id: GoalId,
    pub parent: Option<GoalId>,
    pub depth: usize,
    pub position: Vec2,
    pub title: String,
    pub progress: f32,
    pub status: GoalStatus,
    pub style: GoalStyle,
    pub ui: UiState,
}

/// One parent-child edge with resolved endpoint positions. Derived per
/// pass, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSegment {
    pub source_id: GoalId,
    pub target_id: GoalId,
    pub source: Vec2,
    pub target: Vec2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutTree {
    pub nodes: Vec<LayoutGoal>,
    pub links: Vec<LinkSegment>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("degenerate viewport {width}x{height} leaves no drawable area")]
    DegenerateViewport { width: f32, height: f32 },
}

struct Slot<'a> {
    node: &'a GoalNode,
    parent: Option<usize>,
    depth: usize,
    children: Vec<usize>,
}

/// Tidy layered layout over a sanitized rooted tree.
///
/// Depth maps to the primary axis, leaves get consecutive slots on the
/// perpendicular axis and inner nodes sit centered over their children's
/// span, so sibling subtrees can never overlap and same-depth edges never
/// cross. Coordinates are scaled into the margined viewport. The pass is
/// fully deterministic for a given tree shape and parameters.
pub fn compute_layout(root: &GoalNode, params: &LayoutParams) -> Result<LayoutTree, LayoutError> {
    let avail = params.available();
    if !(avail.x > 0.0 && avail.y > 0.0) || !avail.x.is_finite() || !avail.y.is_finite() {
        return Err(LayoutError::DegenerateViewport {
            width: params.viewport.x,
            height: params.viewport.y,
        });
    }

    // Flatten into a preorder arena; children always index after parents.
    let mut arena: Vec<Slot> = Vec::new();
    let mut stack = vec![(root, None::<usize>, 0usize)];
    while let Some((node, parent, depth)) = stack.pop() {
        let idx = arena.len();
        if let Some(parent_idx) = parent {
            arena[parent_idx].children.push(idx);
        }
        arena.push(Slot {
            node,
            parent,
            depth,
            children: Vec::new(),
        });
        for child in node.children.iter().rev() {
            stack.push((child, Some(idx), depth + 1));
        }
    }

    // First walk: hand out leaf slots in preorder, which is exactly
    // left-to-right leaf order.
    let mut unit = vec![0.0f32; arena.len()];
    let mut leaf_count = 0usize;
    let mut max_depth = 0usize;
    for (idx, slot) in arena.iter().enumerate() {
        max_depth = max_depth.max(slot.depth);
        if slot.children.is_empty() {
            unit[idx] = leaf_count as f32;
            leaf_count += 1;
        }
    }

    // Second walk, reversed so every child is resolved before its parent:
    // inner nodes take the midpoint of their child span.
    for idx in (0..arena.len()).rev() {
        let slot = &arena[idx];
        if let (Some(&first), Some(&last)) = (slot.children.first(), slot.children.last()) {
            unit[idx] = (unit[first] + unit[last]) / 2.0;
        }
    }

    let mut nodes = Vec::with_capacity(arena.len());
    for (idx, slot) in arena.iter().enumerate() {
        let depth_frac = if max_depth == 0 {
            0.0
        } else {
            slot.depth as f32 / max_depth as f32
        };
        let perp_frac = if leaf_count > 1 {
            unit[idx] / (leaf_count - 1) as f32
        } else {
            0.5
        };

        let position = match params.direction {
            LayoutDirection::Horizontal => Vec2::new(
                params.margin.x + depth_frac * avail.x,
                params.margin.y + perp_frac * avail.y,
            ),
            LayoutDirection::Vertical => Vec2::new(
                params.margin.x + perp_frac * avail.x,
                params.margin.y + depth_frac * avail.y,
            ),
        };

        nodes.push(LayoutGoal {
            id: slot.node.id.clone(),
            parent: slot.parent.map(|p| arena[p].node.id.clone()),
            depth: slot.depth,
            position,
            title: slot.node.title.clone(),
            progress: slot.node.progress,
            status: slot.node.status,
            style: slot.node.style.clone(),
            ui: slot.node.ui,
        });
    }

    let mut links = Vec::with_capacity(arena.len().saturating_sub(1));
    for (idx, slot) in arena.iter().enumerate() {
        if let Some(parent_idx) = slot.parent {
            links.push(LinkSegment {
                source_id: nodes[parent_idx].id.clone(),
                target_id: nodes[idx].id.clone(),
                source: nodes[parent_idx].position,
                target: nodes[idx].position,
            });
        }
    }

    Ok(LayoutTree { nodes, links })
}
