use goalgraph_core::{FlatGoal, GoalId, GoalNode, GoalStatus, TreeStats};
use goalgraph_events::{AnomalyKind, AnomalySink};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    /// A node was reached twice during descent: the parent references are
    /// cyclic, or duplicated ids made one entry a child of two parents.
    #[error("cycle detected in parent references at goal {id}")]
    CycleDetected { id: GoalId },
}

enum Frame {
    Enter(usize),
    Assemble(usize, usize),
}

/// Convert a flat goal collection into a single rooted tree.
///
/// Root selection: the node with `root_id` when one is supplied, otherwise
/// the first node in collection order whose `parent_id` is the root
/// sentinel. No match is a legitimate empty state (`Ok(None)`), not an
/// error.
///
/// A node's children are exactly the entries whose `parent_id` equals its
/// id, in original relative order. Collapse flags are ignored entirely: the
/// built tree always contains the full structure.
///
/// Cyclic parent references are rejected with
/// [`HierarchyError::CycleDetected`]; nodes unreachable from the selected
/// root are excluded and reported to the sink.
pub fn build_tree(
    nodes: &[FlatGoal],
    root_id: Option<&GoalId>,
    sink: &dyn AnomalySink,
) -> Result<Option<GoalNode>, HierarchyError> {
    if nodes.is_empty() {
        return Ok(None);
    }

    let mut children_of: HashMap<&GoalId, Vec<usize>> = HashMap::new();
    for (idx, node) in nodes.iter().enumerate() {
        if let Some(parent_id) = &node.parent_id {
            children_of.entry(parent_id).or_default().push(idx);
        }
    }

    let root_idx = match root_id {
        Some(id) => nodes.iter().position(|n| &n.id == id),
        None => {
            let mut sentinels = nodes
                .iter()
                .enumerate()
                .filter(|(_, n)| n.parent_id.is_none());
            let first = sentinels.next().map(|(idx, _)| idx);
            for (_, extra) in sentinels {
                sink.record_anomaly(AnomalyKind::ExtraRoot, &extra.id);
            }
            first
        }
    };
    let Some(root_idx) = root_idx else {
        return Ok(None);
    };

    let mut visited: HashSet<usize> = HashSet::with_capacity(nodes.len());
    visited.insert(root_idx);

    let mut work = vec![Frame::Enter(root_idx)];
    let mut built: Vec<GoalNode> = Vec::new();

    while let Some(frame) = work.pop() {
        match frame {
            Frame::Enter(idx) => {
                let node = &nodes[idx];
                if !(0.0..=1.0).contains(&node.progress) {
                    sink.record_anomaly(AnomalyKind::ProgressOutOfRange, &node.id);
                }

                let child_indices = children_of
                    .get(&node.id)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                for &child_idx in child_indices {
                    if !visited.insert(child_idx) {
                        tracing::warn!(
                            "Rejecting goal collection: {} reached twice during descent",
                            nodes[child_idx].id
                        );
                        return Err(HierarchyError::CycleDetected {
                            id: nodes[child_idx].id.clone(),
                        });
                    }
                }

                work.push(Frame::Assemble(idx, child_indices.len()));
                for &child_idx in child_indices.iter().rev() {
                    work.push(Frame::Enter(child_idx));
                }
            }
            Frame::Assemble(idx, child_count) => {
                let children = built.split_off(built.len() - child_count);
                let mut node = GoalNode::from_flat(&nodes[idx]);
                node.children = children;
                built.push(node);
            }
        }
    }

    for (idx, node) in nodes.iter().enumerate() {
        if !visited.contains(&idx) {
            sink.record_anomaly(AnomalyKind::UnreachableNode, &node.id);
        }
    }

    debug_assert_eq!(built.len(), 1);
    Ok(Some(built.swap_remove(0)))
}

/// Aggregate counts over a built tree. Traverses with an explicit stack.
pub fn tree_stats(root: &GoalNode) -> TreeStats {
    let mut total = 0usize;
    let mut completed = 0usize;
    let mut max_depth = 0usize;

    let mut stack = vec![(root, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        total += 1;
        if node.status == GoalStatus::Done {
            completed += 1;
        }
        max_depth = max_depth.max(depth);
        for child in &node.children {
            stack.push((child, depth + 1));
        }
    }

    TreeStats {
        total_goals: total,
        completed_goals: completed,
        completion_rate: if total > 0 {
            completed as f32 / total as f32
        } else {
            0.0
        },
        max_depth,
    }
}

/// Roll a subtree's statuses up into a completion fraction: leaves weigh in
/// at 1.0 when done and 0.5 while active, inner nodes average their
/// children.
pub fn effective_progress(root: &GoalNode) -> f32 {
    enum Visit<'a> {
        Enter(&'a GoalNode),
        Average(usize),
    }

    let mut work = vec![Visit::Enter(root)];
    let mut values: Vec<f32> = Vec::new();

    while let Some(visit) = work.pop() {
        match visit {
            Visit::Enter(node) => {
                if node.children.is_empty() {
                    values.push(match node.status {
                        GoalStatus::Done => 1.0,
                        GoalStatus::Active => 0.5,
                        GoalStatus::Pending | GoalStatus::Blocked => 0.0,
                    });
                } else {
                    work.push(Visit::Average(node.children.len()));
                    for child in node.children.iter().rev() {
                        work.push(Visit::Enter(child));
                    }
                }
            }
            Visit::Average(count) => {
                let children = values.split_off(values.len() - count);
                values.push(children.iter().sum::<f32>() / count as f32);
            }
        }
    }

    values.pop().unwrap_or(0.0)
}
