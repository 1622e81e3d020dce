//! Pipeline run results.

use crate::state::{ExecutionStatus, NodeExecutionState};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The outcome of a full pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunResult {
    /// The run id.
    pub run_id: String,
    /// True if every node settled without error.
    pub success: bool,
    /// Final state of every node in the graph.
    pub node_results: HashMap<String, NodeExecutionState>,
    /// Wall time of the run in milliseconds.
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    /// The failure that halted the run, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineRunResult {
    /// The status of `node_id` at the end of the run.
    #[must_use]
    pub fn status_of(&self, node_id: &str) -> ExecutionStatus {
        self.node_results
            .get(node_id)
            .map_or(ExecutionStatus::Idle, |s| s.status)
    }

    /// Ids of nodes that ended in error, sorted.
    #[must_use]
    pub fn failed_nodes(&self) -> Vec<&str> {
        let mut failed: Vec<&str> = self
            .node_results
            .iter()
            .filter(|(_, s)| s.status == ExecutionStatus::Error)
            .map(|(id, _)| id.as_str())
            .collect();
        failed.sort_unstable();
        failed
    }

    /// Number of nodes that ended `done`.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.node_results
            .values()
            .filter(|s| s.status == ExecutionStatus::Done)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_wire_shape() {
        let result = PipelineRunResult {
            run_id: "r1".to_string(),
            success: true,
            node_results: HashMap::from([("A".to_string(), NodeExecutionState::default())]),
            duration_ms: 40,
            error: None,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["runId"], json!("r1"));
        assert_eq!(value["duration"], json!(40));
        assert_eq!(value["nodeResults"]["A"]["status"], json!("idle"));
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_status_helpers() {
        let result = PipelineRunResult {
            run_id: "r1".to_string(),
            success: false,
            node_results: HashMap::from([
                (
                    "B".to_string(),
                    NodeExecutionState {
                        status: ExecutionStatus::Error,
                        ..NodeExecutionState::default()
                    },
                ),
                (
                    "A".to_string(),
                    NodeExecutionState {
                        status: ExecutionStatus::Done,
                        ..NodeExecutionState::default()
                    },
                ),
            ]),
            duration_ms: 1,
            error: Some("Node 'B' failed".to_string()),
        };
        assert_eq!(result.failed_nodes(), vec!["B"]);
        assert_eq!(result.completed_count(), 1);
        assert_eq!(result.status_of("C"), ExecutionStatus::Idle);
    }
}
