//! The execution store.

use super::status::{ExecutionStatus, NodeExecutionState, NodeStateUpdate};
use crate::events::{noop_sink, EventSink};
use crate::graph::Edge;
use crate::output::NodeOutput;
use crate::pipeline::OutputMap;
use parking_lot::RwLock;
use serde_json::json;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
struct StoreState {
    node_states: HashMap<String, NodeExecutionState>,
    pipeline_running: bool,
    current_run_id: Option<String>,
}

/// The authoritative record of per-node execution state.
///
/// Every mutation produces a new [`NodeExecutionState`] and replaces the old
/// one, so a state handed out by a getter never changes under the caller.
/// State-change events are emitted after the lock is released.
pub struct ExecutionStore {
    state: RwLock<StoreState>,
    sink: Arc<dyn EventSink>,
}

impl Default for ExecutionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExecutionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("ExecutionStore")
            .field("nodes", &state.node_states.len())
            .field("pipeline_running", &state.pipeline_running)
            .field("current_run_id", &state.current_run_id)
            .finish()
    }
}

impl ExecutionStore {
    /// Creates an empty store that emits no events.
    #[must_use]
    pub fn new() -> Self {
        Self::with_event_sink(noop_sink())
    }

    /// Creates an empty store that emits to `sink`.
    #[must_use]
    pub fn with_event_sink(sink: Arc<dyn EventSink>) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            sink,
        }
    }

    /// The state of `node_id`; a fresh idle state if none is recorded.
    #[must_use]
    pub fn get_node_state(&self, node_id: &str) -> NodeExecutionState {
        self.state
            .read()
            .node_states
            .get(node_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Merges `update` into the state of `node_id` and returns the new state.
    pub fn set_node_state(&self, node_id: &str, update: NodeStateUpdate) -> NodeExecutionState {
        let next = {
            let mut state = self.state.write();
            let current = state.node_states.get(node_id).cloned().unwrap_or_default();
            let next = update.apply(&current);
            state.node_states.insert(node_id.to_string(), next.clone());
            next
        };

        debug!(node_id, status = %next.status, progress = next.progress, "Node state changed");
        self.sink.try_emit(
            "node.state_changed",
            Some(json!({
                "node_id": node_id,
                "status": next.status,
                "progress": next.progress,
                "error": next.error,
            })),
        );
        next
    }

    /// The recorded output of `node_id`, if any.
    #[must_use]
    pub fn get_node_output(&self, node_id: &str) -> Option<NodeOutput> {
        self.state
            .read()
            .node_states
            .get(node_id)
            .and_then(|s| s.output.clone())
    }

    /// Every recorded output, keyed by node id.
    ///
    /// Includes outputs of `stale` and `error` nodes, since their last
    /// output is still the best available value.
    #[must_use]
    pub fn outputs(&self) -> OutputMap {
        self.state
            .read()
            .node_states
            .iter()
            .filter_map(|(id, s)| s.output.clone().map(|o| (id.clone(), o)))
            .collect()
    }

    /// Sets the pipeline-running flag and the current run id.
    ///
    /// Passing `None` clears the run id.
    pub fn set_pipeline_running(&self, running: bool, run_id: Option<&str>) {
        let mut state = self.state.write();
        state.pipeline_running = running;
        state.current_run_id = run_id.map(str::to_string);
    }

    /// Whether a full run is in progress.
    #[must_use]
    pub fn is_pipeline_running(&self) -> bool {
        self.state.read().pipeline_running
    }

    /// The id of the run in progress, if any.
    #[must_use]
    pub fn current_run_id(&self) -> Option<String> {
        self.state.read().current_run_id.clone()
    }

    /// Flips every `done` node reachable downstream of `node_id` to `stale`.
    ///
    /// Traversal is breadth-first over `edges` and visits each node once.
    /// Nodes in any other status are left untouched; `node_id` itself is
    /// never changed. Returns the ids that were flipped, in visit order.
    pub fn mark_downstream_stale(&self, node_id: &str, edges: &[Edge]) -> Vec<String> {
        let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in edges {
            successors.entry(edge.source.as_str()).or_default().push(edge.target.as_str());
        }

        let mut visited: HashSet<&str> = HashSet::from([node_id]);
        let mut queue: VecDeque<&str> = VecDeque::from([node_id]);
        let mut flipped = Vec::new();

        {
            let mut state = self.state.write();
            while let Some(current) = queue.pop_front() {
                for &next in successors.get(current).into_iter().flatten() {
                    if !visited.insert(next) {
                        continue;
                    }
                    queue.push_back(next);
                    if let Some(node_state) = state.node_states.get_mut(next) {
                        if node_state.status == ExecutionStatus::Done {
                            *node_state = NodeStateUpdate::new()
                                .status(ExecutionStatus::Stale)
                                .apply(node_state);
                            flipped.push(next.to_string());
                        }
                    }
                }
            }
        }

        if !flipped.is_empty() {
            debug!(source = node_id, stale = ?flipped, "Marked downstream nodes stale");
            self.sink
                .try_emit("node.stale", Some(json!({ "source": node_id, "nodes": flipped })));
        }
        flipped
    }

    /// A snapshot of every recorded node state.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, NodeExecutionState> {
        self.state.read().node_states.clone()
    }

    /// Clears all node states and the running flag.
    pub fn reset(&self) {
        let mut state = self.state.write();
        *state = StoreState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;
    use pretty_assertions::assert_eq;

    fn chain_edges() -> Vec<Edge> {
        vec![
            Edge::new("A", "text", "B", "text"),
            Edge::new("B", "prompt", "C", "prompt"),
        ]
    }

    fn mark_done(store: &ExecutionStore, id: &str) {
        store.set_node_state(id, NodeStateUpdate::done(Some(NodeOutput::text(id))));
    }

    #[test]
    fn test_unknown_node_is_idle() {
        let store = ExecutionStore::new();
        let state = store.get_node_state("nope");
        assert_eq!(state.status, ExecutionStatus::Idle);
        assert!(state.output.is_none());
        assert_eq!(state.progress, 0);
    }

    #[test]
    fn test_set_node_state_replaces_record() {
        let store = ExecutionStore::new();
        let before = store.set_node_state("A", NodeStateUpdate::running());
        let after = store.set_node_state("A", NodeStateUpdate::done(Some(NodeOutput::text("x"))));

        assert_eq!(before.status, ExecutionStatus::Running);
        assert_eq!(after.status, ExecutionStatus::Done);
        assert_eq!(store.get_node_output("A"), after.output);
        assert_eq!(store.get_node_output("A").unwrap().as_text().unwrap().text, "x");
    }

    #[test]
    fn test_mark_downstream_stale_flips_done_only() {
        let store = ExecutionStore::new();
        mark_done(&store, "A");
        mark_done(&store, "B");
        store.set_node_state("C", NodeStateUpdate::failed("bad"));

        let flipped = store.mark_downstream_stale("A", &chain_edges());

        assert_eq!(flipped, vec!["B"]);
        assert_eq!(store.get_node_state("A").status, ExecutionStatus::Done);
        assert_eq!(store.get_node_state("B").status, ExecutionStatus::Stale);
        assert_eq!(store.get_node_state("C").status, ExecutionStatus::Error);
        assert!(store.get_node_output("B").is_some());
    }

    #[test]
    fn test_mark_downstream_stale_reaches_transitively() {
        let store = ExecutionStore::new();
        for id in ["A", "B", "C"] {
            mark_done(&store, id);
        }
        let flipped = store.mark_downstream_stale("A", &chain_edges());
        assert_eq!(flipped, vec!["B", "C"]);
    }

    #[test]
    fn test_mark_downstream_stale_terminates_on_cycles() {
        let store = ExecutionStore::new();
        mark_done(&store, "A");
        mark_done(&store, "B");
        let edges = vec![
            Edge::new("A", "x", "B", "x"),
            Edge::new("B", "x", "A", "x"),
        ];
        let flipped = store.mark_downstream_stale("A", &edges);
        assert_eq!(flipped, vec!["B"]);
        assert_eq!(store.get_node_state("A").status, ExecutionStatus::Done);
    }

    #[test]
    fn test_pipeline_running_flag() {
        let store = ExecutionStore::new();
        store.set_pipeline_running(true, Some("run-1"));
        assert!(store.is_pipeline_running());
        assert_eq!(store.current_run_id().as_deref(), Some("run-1"));

        store.set_pipeline_running(false, None);
        assert!(!store.is_pipeline_running());
        assert!(store.current_run_id().is_none());
    }

    #[test]
    fn test_outputs_and_reset() {
        let store = ExecutionStore::new();
        mark_done(&store, "A");
        store.set_node_state("B", NodeStateUpdate::running());
        assert_eq!(store.outputs().len(), 1);

        store.set_pipeline_running(true, Some("r"));
        store.reset();
        assert!(store.snapshot().is_empty());
        assert!(!store.is_pipeline_running());
    }

    #[test]
    fn test_state_changes_are_emitted() {
        let sink = Arc::new(CollectingEventSink::new());
        let store = ExecutionStore::with_event_sink(sink.clone());
        mark_done(&store, "A");
        mark_done(&store, "B");
        store.mark_downstream_stale("A", &chain_edges());

        assert_eq!(
            sink.event_types(),
            vec!["node.state_changed", "node.state_changed", "node.stale"]
        );
        let (_, data) = &sink.events()[0];
        assert_eq!(data.as_ref().unwrap()["status"], "done");
    }
}
