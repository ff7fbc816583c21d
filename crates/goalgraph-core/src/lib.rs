use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GoalId(pub String);

impl GoalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GoalId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for GoalId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    #[default]
    Pending,
    Active,
    Done,
    Blocked,
}

/// Error type for status conversion failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusParseError {
    #[error("Invalid GoalStatus value: {0:?}")]
    Unknown(String),
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Pending => "pending",
            GoalStatus::Active => "active",
            GoalStatus::Done => "done",
            GoalStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for GoalStatus {
    type Error = StatusParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(GoalStatus::Pending),
            "active" => Ok(GoalStatus::Active),
            "done" => Ok(GoalStatus::Done),
            "blocked" => Ok(GoalStatus::Blocked),
            _ => Err(StatusParseError::Unknown(value.to_string())),
        }
    }
}

impl std::str::FromStr for GoalStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GoalStatus::try_from(s)
    }
}

/// Presentation color tokens (fill, accent). Carried through the pipeline
/// unchanged; empty tokens fall back to the status palette at render time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GoalStyle {
    #[serde(default)]
    pub fill: String,
    #[serde(default)]
    pub accent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UiState {
    #[serde(default)]
    pub collapsed: bool,
}

/// Wire-format goal as delivered by the fetch collaborator.
///
/// `parent_id == None` is the root sentinel. The `children` field is whatever
/// the server happened to send — absent, null, or any shape — and is never
/// trusted for traversal; structure is always derived from `parent_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatGoal {
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
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub children: serde_json::Value,
}

impl FlatGoal {
    pub fn new(id: impl Into<GoalId>, parent_id: Option<GoalId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id,
            title: title.into(),
            progress: 0.0,
            status: GoalStatus::default(),
            style: GoalStyle::default(),
            ui: UiState::default(),
            children: serde_json::Value::Null,
        }
    }
}

/// A goal inside the reconstructed hierarchy.
///
/// `children` is always a concrete, insertion-ordered list and is the
/// authoritative structural relation: the tree is acyclic and single-rooted,
/// and no node appears twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalNode {
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
    pub children: Vec<GoalNode>,
}

impl GoalNode {
    pub fn from_flat(flat: &FlatGoal) -> Self {
        Self {
            id: flat.id.clone(),
            parent_id: flat.parent_id.clone(),
            title: flat.title.clone(),
            progress: flat.progress.clamp(0.0, 1.0),
            status: flat.status,
            style: flat.style.clone(),
            ui: flat.ui,
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including self.
    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// Depth-first preorder traversal over the subtree. Uses an explicit
    /// stack so arbitrarily deep trees cannot exhaust the call stack.
    pub fn iter(&self) -> GoalNodeIter<'_> {
        GoalNodeIter { stack: vec![self] }
    }

    pub fn find(&self, id: &GoalId) -> Option<&GoalNode> {
        self.iter().find(|node| &node.id == id)
    }
}

pub struct GoalNodeIter<'a> {
    stack: Vec<&'a GoalNode>,
}

impl<'a> Iterator for GoalNodeIter<'a> {
    type Item = &'a GoalNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        for child in node.children.iter().rev() {
            self.stack.push(child);
        }
        Some(node)
    }
}

/// Payload shape supplied by the fetch collaborator.
///
/// `schema_version` and `generated_at` are passed through without validation;
/// `root_id` feeds root selection and `nodes` feeds the hierarchy builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TreeResponse {
    #[serde(default)]
    pub schema_version: u32,
    #[serde(default)]
    pub generated_at: String,
    #[serde(default)]
    pub root_id: Option<GoalId>,
    #[serde(default)]
    pub nodes: Vec<FlatGoal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LayoutDirection {
    #[default]
    Horizontal,
    Vertical,
}

/// Aggregate statistics over a built goal tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct TreeStats {
    pub total_goals: usize,
    pub completed_goals: usize,
    pub completion_rate: f32,
    pub max_depth: usize,
}
