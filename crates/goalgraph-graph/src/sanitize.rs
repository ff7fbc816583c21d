use goalgraph_core::{GoalId, GoalNode, GoalStatus, GoalStyle, UiState};
use goalgraph_events::{AnomalyKind, AnomalySink};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tree-shaped value as it may arrive from outside the hierarchy builder,
/// e.g. a nested payload injected past the flat-list path. Everything except
/// `children` is already typed; `children` is untrusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawGoalNode {
    pub id: GoalId,
    #[serde(default)]
    pub parent_id: Option<GoalId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub progress: f32,
    #[serde(default)]
    pub status: GoalStatus,
    #[serde(default)]
    pub style: GoalStyle,
    #[serde(default)]
    pub ui: UiState,
    #[serde(default)]
    pub children: RawChildren,
}

/// Untrusted `children` field: either a proper node sequence, or whatever
/// else the payload carried (absent and `null` both land in `Other`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawChildren {
    Nodes(Vec<RawGoalNode>),
    Other(Value),
}

impl Default for RawChildren {
    fn default() -> Self {
        RawChildren::Other(Value::Null)
    }
}

impl RawChildren {
    fn as_nodes(&self) -> Option<&[RawGoalNode]> {
        match self {
            RawChildren::Nodes(nodes) => Some(nodes),
            RawChildren::Other(_) => None,
        }
    }
}

impl From<&GoalNode> for RawGoalNode {
    fn from(node: &GoalNode) -> Self {
        Self {
            id: node.id.clone(),
            parent_id: node.parent_id.clone(),
            title: node.title.clone(),
            progress: node.progress,
            status: node.status,
            style: node.style.clone(),
            ui: node.ui,
            children: RawChildren::Nodes(node.children.iter().map(RawGoalNode::from).collect()),
        }
    }
}

enum Frame<'a> {
    Enter(&'a RawGoalNode),
    Assemble(&'a RawGoalNode, usize),
}

/// Defensively repair a tree so every node has a concrete, ordered child
/// list, returning a deep copy that shares no state with the input.
///
/// Any `children` that is not a proper node sequence is replaced with an
/// empty list; each repaired node id goes to the sink and processing always
/// continues. The traversal keeps an explicit work stack, so arbitrarily
/// deep input cannot exhaust the call stack.
pub fn sanitize_tree(root: &RawGoalNode, sink: &dyn AnomalySink) -> GoalNode {
    let mut work = vec![Frame::Enter(root)];
    // Finished subtrees, in left-to-right completion order.
    let mut built: Vec<GoalNode> = Vec::new();

    while let Some(frame) = work.pop() {
        match frame {
            Frame::Enter(raw) => {
                let children = match raw.children.as_nodes() {
                    Some(nodes) => nodes,
                    None => {
                        sink.record_anomaly(AnomalyKind::MalformedChildren, &raw.id);
                        &[]
                    }
                };
                work.push(Frame::Assemble(raw, children.len()));
                for child in children.iter().rev() {
                    work.push(Frame::Enter(child));
                }
            }
            Frame::Assemble(raw, child_count) => {
                let children = built.split_off(built.len() - child_count);
                built.push(GoalNode {
                    id: raw.id.clone(),
                    parent_id: raw.parent_id.clone(),
                    title: raw.title.clone(),
                    progress: raw.progress.clamp(0.0, 1.0),
                    status: raw.status,
                    style: raw.style.clone(),
                    ui: raw.ui,
                    children,
                });
            }
        }
    }

    // The root's Assemble frame always leaves exactly one node.
    debug_assert_eq!(built.len(), 1);
    built.swap_remove(0)
}
