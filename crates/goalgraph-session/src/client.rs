use anyhow::Result;
use goalgraph_core::{GoalId, GoalStatus, TreeResponse};

/// Read side of the external data source.
///
/// Implementations may block; the session only ever calls this from a
/// worker thread, never from the UI loop.
pub trait FetchClient: Send + Sync {
    fn fetch_tree(&self) -> Result<TreeResponse>;
}

/// Write side of the external data source.
///
/// The session never patches its local tree after a write — every
/// successful mutation is followed by a full refetch-and-rebuild.
pub trait GoalWriter: Send + Sync {
    fn update_status(&self, id: &GoalId, status: GoalStatus) -> Result<()>;
    /// Returns the id of the created goal.
    fn create_goal(&self, title: &str, parent_id: Option<&GoalId>) -> Result<GoalId>;
    fn delete_goal(&self, id: &GoalId) -> Result<()>;
}
