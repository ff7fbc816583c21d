use goalgraph_core::GoalId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

const DIAGNOSTICS_TARGET: &str = "goalgraph::events::diagnostics";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnomalyKind {
    /// `children` was not a proper sequence and was replaced with an empty one.
    MalformedChildren,
    /// Node carried the root sentinel but lost the first-in-order tie-break.
    ExtraRoot,
    /// Node is not reachable from the selected root (dangling `parent_id`,
    /// or part of a parent chain that never reaches the root).
    UnreachableNode,
    /// `progress` was outside `[0, 1]` and was clamped.
    ProgressOutOfRange,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedChildren => write!(f, "malformed_children"),
            Self::ExtraRoot => write!(f, "extra_root"),
            Self::UnreachableNode => write!(f, "unreachable_node"),
            Self::ProgressOutOfRange => write!(f, "progress_out_of_range"),
        }
    }
}

/// Injectable diagnostics sink for the pipeline.
///
/// Repairs and drops are reported here instead of being written to
/// process-wide logging state; recording never aborts processing.
pub trait AnomalySink {
    fn record_anomaly(&self, kind: AnomalyKind, id: &GoalId);
}

/// Forwards anomalies to `tracing` at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AnomalySink for TracingSink {
    fn record_anomaly(&self, kind: AnomalyKind, id: &GoalId) {
        tracing::warn!(
            target: DIAGNOSTICS_TARGET,
            kind = %kind,
            goal_id = %id,
            "pipeline_anomaly"
        );
    }
}

/// Keeps anomalies in memory. Used by tests and by callers that want to
/// present a repair report after a pass.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<(AnomalyKind, GoalId)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain all recorded anomalies.
    pub fn take(&self) -> Vec<(AnomalyKind, GoalId)> {
        std::mem::take(&mut *self.records.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn records(&self) -> Vec<(AnomalyKind, GoalId)> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_empty(&self) -> bool {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }
}

impl AnomalySink for MemorySink {
    fn record_anomaly(&self, kind: AnomalyKind, id: &GoalId) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((kind, id.clone()));
    }
}
