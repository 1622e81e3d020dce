//! Registry of pipeline runs.
//!
//! Keeps a record of every run started through a runner it is attached to,
//! so hosts can look a run up by id after it finishes. Finished records are
//! kept up to a bound; the oldest are evicted first. Running records are
//! never evicted.

use crate::pipeline::PipelineRunResult;
use crate::state::NodeExecutionState;
use crate::utils::iso_timestamp;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Lifecycle of a recorded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Still executing.
    Running,
    /// Every node succeeded.
    Completed,
    /// Aborted by a node failure, a cycle, or cancellation.
    Failed,
}

/// What the registry knows about one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    /// The run id.
    pub run_id: String,
    /// Current status.
    pub status: RunStatus,
    /// Nodes in the graph.
    pub node_count: usize,
    /// Accepted edges in the graph.
    pub edge_count: usize,
    /// Final node states, once finished.
    #[serde(default)]
    pub node_results: HashMap<String, NodeExecutionState>,
    /// Failure message, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the run started (RFC 3339).
    pub started_at: String,
    /// When the run finished (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    /// Wall time in milliseconds, once finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Finished runs kept by [`RunRegistry::new`].
pub const DEFAULT_MAX_FINISHED: usize = 256;

#[derive(Debug, Default)]
struct RegistryState {
    runs: HashMap<String, RunRecord>,
    finished: VecDeque<String>,
}

impl RegistryState {
    fn mark_finished(&mut self, run_id: &str, max_finished: usize) {
        self.finished.retain(|id| id != run_id);
        self.finished.push_back(run_id.to_string());
        while self.finished.len() > max_finished {
            if let Some(oldest) = self.finished.pop_front() {
                self.runs.remove(&oldest);
            }
        }
    }
}

/// Thread-safe registry of runs keyed by run id.
#[derive(Debug)]
pub struct RunRegistry {
    state: RwLock<RegistryState>,
    max_finished: usize,
}

impl Default for RunRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RunRegistry {
    /// Creates an empty registry keeping [`DEFAULT_MAX_FINISHED`] finished runs.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_finished(DEFAULT_MAX_FINISHED)
    }

    /// Creates an empty registry keeping at most `max_finished` finished runs.
    #[must_use]
    pub fn with_max_finished(max_finished: usize) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            max_finished,
        }
    }

    /// Records a run as started.
    pub fn register(&self, run_id: &str, node_count: usize, edge_count: usize) {
        let record = RunRecord {
            run_id: run_id.to_string(),
            status: RunStatus::Running,
            node_count,
            edge_count,
            node_results: HashMap::new(),
            error: None,
            started_at: iso_timestamp(),
            finished_at: None,
            duration_ms: None,
        };
        self.state.write().runs.insert(run_id.to_string(), record);
    }

    /// Records the outcome of a finished run.
    pub fn finish(&self, result: &PipelineRunResult) {
        let mut state = self.state.write();
        let Some(record) = state.runs.get_mut(&result.run_id) else {
            return;
        };
        record.status = if result.success {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
        record.node_results = result.node_results.clone();
        record.error = result.error.clone();
        record.finished_at = Some(iso_timestamp());
        record.duration_ms = Some(result.duration_ms);
        state.mark_finished(&result.run_id, self.max_finished);
    }

    /// Records a run that failed before executing any node.
    pub fn fail(&self, run_id: &str, error: impl Into<String>) {
        let mut state = self.state.write();
        let Some(record) = state.runs.get_mut(run_id) else {
            return;
        };
        record.status = RunStatus::Failed;
        record.error = Some(error.into());
        record.finished_at = Some(iso_timestamp());
        state.mark_finished(run_id, self.max_finished);
    }

    /// Looks up a run.
    #[must_use]
    pub fn get(&self, run_id: &str) -> Option<RunRecord> {
        self.state.read().runs.get(run_id).cloned()
    }

    /// Returns the ids of runs still executing.
    #[must_use]
    pub fn running(&self) -> Vec<String> {
        self.state
            .read()
            .runs
            .values()
            .filter(|r| r.status == RunStatus::Running)
            .map(|r| r.run_id.clone())
            .collect()
    }

    /// Removes a run.
    pub fn remove(&self, run_id: &str) -> Option<RunRecord> {
        let mut state = self.state.write();
        state.finished.retain(|id| id != run_id);
        state.runs.remove(run_id)
    }

    /// Returns the number of recorded runs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().runs.len()
    }

    /// Returns true if no runs are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().runs.is_empty()
    }

    /// Clears all records.
    pub fn clear(&self) {
        *self.state.write() = RegistryState::default();
    }
}
