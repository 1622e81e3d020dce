//! Per-node execution status and state records.

use crate::output::NodeOutput;
use crate::utils::now_millis;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a node.
///
/// `idle → running → done | error`; a `done` node becomes `stale` when
/// something upstream re-runs, and `reset` returns every node to `idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// Never run, or reset.
    #[default]
    Idle,
    /// Inputs satisfied, waiting to run.
    Ready,
    /// Executing.
    Running,
    /// Finished with an output.
    Done,
    /// Finished with an error.
    Error,
    /// Output invalidated by an upstream re-run.
    Stale,
}

impl ExecutionStatus {
    /// Returns true if the node has finished its last run.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// Returns true if the node's output is current.
    #[must_use]
    pub const fn is_fresh(self) -> bool {
        matches!(self, Self::Done)
    }

    /// The wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Done => "done",
            Self::Error => "error",
            Self::Stale => "stale",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The execution state of one node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeExecutionState {
    /// Lifecycle status.
    pub status: ExecutionStatus,
    /// Last output; kept across `stale` so it can still be displayed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<NodeOutput>,
    /// Last error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Progress percentage, 0 to 100.
    #[serde(default)]
    pub progress: u8,
    /// Completion time of the last run, in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<i64>,
}

/// A partial update merged into a [`NodeExecutionState`].
///
/// Unset fields keep their current value. The nested `Option`s distinguish
/// "leave alone" (`None`) from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeStateUpdate {
    /// New status.
    pub status: Option<ExecutionStatus>,
    /// New output.
    pub output: Option<Option<NodeOutput>>,
    /// New error.
    pub error: Option<Option<String>>,
    /// New progress.
    pub progress: Option<u8>,
    /// New completion time.
    pub last_run_at: Option<Option<i64>>,
}

impl NodeStateUpdate {
    /// An empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the node running: progress 0, error cleared.
    #[must_use]
    pub fn running() -> Self {
        Self {
            status: Some(ExecutionStatus::Running),
            error: Some(None),
            progress: Some(0),
            ..Self::default()
        }
    }

    /// Marks the node done with `output`, stamped now.
    #[must_use]
    pub fn done(output: Option<NodeOutput>) -> Self {
        Self {
            status: Some(ExecutionStatus::Done),
            output: Some(output),
            error: Some(None),
            progress: Some(100),
            last_run_at: Some(Some(now_millis())),
        }
    }

    /// Marks the node failed with `message`. The previous output is kept.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(ExecutionStatus::Error),
            error: Some(Some(message.into())),
            progress: Some(0),
            ..Self::default()
        }
    }

    /// Sets the status.
    #[must_use]
    pub const fn status(mut self, status: ExecutionStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the progress, clamped to 100.
    #[must_use]
    pub fn progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress.min(100));
        self
    }

    /// Merges the update over `current`, producing a new record.
    #[must_use]
    pub fn apply(self, current: &NodeExecutionState) -> NodeExecutionState {
        NodeExecutionState {
            status: self.status.unwrap_or(current.status),
            output: self.output.unwrap_or_else(|| current.output.clone()),
            error: self.error.unwrap_or_else(|| current.error.clone()),
            progress: self.progress.map_or(current.progress, |p| p.min(100)),
            last_run_at: self.last_run_at.unwrap_or(current.last_run_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialize() {
        assert_eq!(serde_json::to_string(&ExecutionStatus::Stale).unwrap(), r#""stale""#);
        let status: ExecutionStatus = serde_json::from_str(r#""running""#).unwrap();
        assert_eq!(status, ExecutionStatus::Running);
    }

    #[test]
    fn test_status_predicates() {
        assert!(ExecutionStatus::Done.is_settled());
        assert!(ExecutionStatus::Error.is_settled());
        assert!(!ExecutionStatus::Stale.is_settled());
        assert!(ExecutionStatus::Done.is_fresh());
        assert!(!ExecutionStatus::Stale.is_fresh());
    }

    #[test]
    fn test_update_leaves_unset_fields() {
        let current = NodeExecutionState {
            status: ExecutionStatus::Done,
            output: Some(NodeOutput::text("kept")),
            error: None,
            progress: 100,
            last_run_at: Some(5),
        };

        let next = NodeStateUpdate::new().status(ExecutionStatus::Stale).apply(&current);
        assert_eq!(next.status, ExecutionStatus::Stale);
        assert_eq!(next.output, current.output);
        assert_eq!(next.last_run_at, Some(5));
    }

    #[test]
    fn test_failed_keeps_output_and_sets_error() {
        let current = NodeExecutionState {
            status: ExecutionStatus::Running,
            output: Some(NodeOutput::text("old")),
            ..NodeExecutionState::default()
        };
        let next = NodeStateUpdate::failed("boom").apply(&current);
        assert_eq!(next.status, ExecutionStatus::Error);
        assert_eq!(next.error.as_deref(), Some("boom"));
        assert!(next.output.is_some());
    }

    #[test]
    fn test_running_clears_error() {
        let current = NodeExecutionState {
            status: ExecutionStatus::Error,
            error: Some("previous".to_string()),
            ..NodeExecutionState::default()
        };
        let next = NodeStateUpdate::running().apply(&current);
        assert_eq!(next.status, ExecutionStatus::Running);
        assert!(next.error.is_none());
        assert_eq!(next.progress, 0);
    }

    #[test]
    fn test_progress_is_clamped() {
        let next = NodeStateUpdate::new().progress(250).apply(&NodeExecutionState::default());
        assert_eq!(next.progress, 100);
    }
}
