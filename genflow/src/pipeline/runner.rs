//! Pipeline and single-node execution.

use super::collector::{collect_inputs, first_input, missing_required_inputs, NodeInputs, OutputMap};
use super::result::PipelineRunResult;
use crate::cancellation::CancellationToken;
use crate::errors::{ExecutionError, PipelineError};
use crate::events::{noop_sink, EventSink};
use crate::executor::NodeExecutor;
use crate::graph::{Node, PipelineGraph, RunnableNode};
use crate::output::NodeOutput;
use crate::registry::RunRegistry;
use crate::state::{ExecutionStore, NodeExecutionState, NodeStateUpdate};
use crate::utils::generate_run_id;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Executes pipeline graphs against a [`NodeExecutor`], recording every
/// state change in an [`ExecutionStore`].
///
/// A full run walks the topological order one node at a time and stops at
/// the first failure. Outputs flow between nodes through a run-local map,
/// so a run never reads outputs left over from a previous one.
pub struct PipelineRunner {
    executor: Arc<dyn NodeExecutor>,
    store: Arc<ExecutionStore>,
    sink: Arc<dyn EventSink>,
    registry: Option<Arc<RunRegistry>>,
}

impl std::fmt::Debug for PipelineRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("store", &self.store)
            .field("registry", &self.registry.is_some())
            .finish_non_exhaustive()
    }
}

impl PipelineRunner {
    /// Creates a runner.
    #[must_use]
    pub fn new(executor: Arc<dyn NodeExecutor>, store: Arc<ExecutionStore>) -> Self {
        Self {
            executor,
            store,
            sink: noop_sink(),
            registry: None,
        }
    }

    /// Emits run and node lifecycle events to `sink`.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Records every run in `registry`.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<RunRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// The execution store.
    #[must_use]
    pub fn store(&self) -> &Arc<ExecutionStore> {
        &self.store
    }

    /// Runs every node of `graph` in dependency order.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the graph cannot be scheduled. Node
    /// failures are not errors; they are reported in the result.
    pub async fn run_pipeline(&self, graph: &PipelineGraph) -> Result<PipelineRunResult, PipelineError> {
        self.run_pipeline_with_cancel(graph, &CancellationToken::new()).await
    }

    /// Runs every node of `graph`, stopping early if `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the graph cannot be scheduled.
    pub async fn run_pipeline_with_cancel(
        &self,
        graph: &PipelineGraph,
        cancel: &CancellationToken,
    ) -> Result<PipelineRunResult, PipelineError> {
        let run_id = generate_run_id();
        let span = info_span!("pipeline_run", run_id = %run_id, nodes = graph.node_count());
        self.execute_run(run_id, graph, cancel).instrument(span).await
    }

    async fn execute_run(
        &self,
        run_id: String,
        graph: &PipelineGraph,
        cancel: &CancellationToken,
    ) -> Result<PipelineRunResult, PipelineError> {
        let started = Instant::now();
        self.store.set_pipeline_running(true, Some(&run_id));
        if let Some(registry) = &self.registry {
            registry.register(&run_id, graph.node_count(), graph.edge_count());
        }

        let order = match graph.execution_order() {
            Ok(order) => order,
            Err(err) => {
                warn!(error = %err, "Pipeline cannot be scheduled");
                return Err(self.abort_run(&run_id, err.into()));
            }
        };
        info!(order = ?order, "Pipeline started");
        self.sink
            .try_emit("pipeline.started", Some(json!({ "run_id": run_id, "order": order })));

        let mut outputs = OutputMap::new();
        let mut failure: Option<String> = None;

        for node_id in &order {
            let Some(node) = graph.node(node_id) else {
                return Err(self.abort_run(&run_id, PipelineError::UnknownNode(node_id.clone())));
            };

            if cancel.is_cancelled() {
                let reason = cancel.reason().unwrap_or_else(|| "cancelled".to_string());
                warn!(node_id = %node_id, reason = %reason, "Pipeline cancelled");
                failure = Some(format!("Pipeline cancelled: {reason}"));
                break;
            }

            let inputs = collect_inputs(node_id, graph.edges(), &outputs);
            match node.config.as_runnable() {
                Some(runnable) => match self.run_runnable(node, runnable, &inputs, cancel).await {
                    Ok(output) => {
                        outputs.insert(node_id.clone(), output);
                    }
                    Err(err) => {
                        failure = Some(format!("Node '{node_id}' failed: {err}"));
                        break;
                    }
                },
                None => {
                    let output = Self::local_output(node, &inputs);
                    self.store.set_node_state(node_id, NodeStateUpdate::done(output.clone()));
                    debug!(node_id = %node_id, has_output = output.is_some(), "Local node settled");
                    if let Some(output) = output {
                        outputs.insert(node_id.clone(), output);
                    }
                }
            }
        }

        self.store.set_pipeline_running(false, None);

        let node_results: HashMap<String, NodeExecutionState> = graph
            .nodes()
            .iter()
            .map(|n| (n.id.clone(), self.store.get_node_state(&n.id)))
            .collect();
        let result = PipelineRunResult {
            run_id,
            success: failure.is_none(),
            node_results,
            duration_ms: elapsed_ms(started),
            error: failure,
        };

        if let Some(registry) = &self.registry {
            registry.finish(&result);
        }
        match &result.error {
            None => {
                info!(duration_ms = result.duration_ms, "Pipeline completed");
                self.sink.try_emit(
                    "pipeline.completed",
                    Some(json!({ "run_id": result.run_id, "duration_ms": result.duration_ms })),
                );
            }
            Some(message) => {
                error!(error = %message, duration_ms = result.duration_ms, "Pipeline failed");
                self.sink.try_emit(
                    "pipeline.failed",
                    Some(json!({ "run_id": result.run_id, "error": message })),
                );
            }
        }
        Ok(result)
    }

    /// Runs a single runnable node against the outputs currently recorded
    /// in the store, then marks its `done` descendants `stale`.
    ///
    /// Returns the node's new state; an execution failure is recorded in
    /// that state, not returned as an error.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NodeNotFound`] or
    /// [`PipelineError::NotRunnable`] without touching any state.
    pub async fn run_node(&self, node_id: &str, graph: &PipelineGraph) -> Result<NodeExecutionState, PipelineError> {
        self.run_node_with_cancel(node_id, graph, &CancellationToken::new())
            .await
    }

    /// Like [`Self::run_node`], stopping early if `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NodeNotFound`] or [`PipelineError::NotRunnable`].
    pub async fn run_node_with_cancel(
        &self,
        node_id: &str,
        graph: &PipelineGraph,
        cancel: &CancellationToken,
    ) -> Result<NodeExecutionState, PipelineError> {
        let node = graph
            .node(node_id)
            .ok_or_else(|| PipelineError::NodeNotFound(node_id.to_string()))?;
        let runnable = node.config.as_runnable().ok_or_else(|| PipelineError::NotRunnable {
            node_id: node_id.to_string(),
            kind: node.kind(),
        })?;

        let outputs = self.store.outputs();
        let inputs = collect_inputs(node_id, graph.edges(), &outputs);

        let span = info_span!("node_run", node_id = %node_id, kind = %node.kind());
        let outcome = self.run_runnable(node, runnable, &inputs, cancel).instrument(span).await;
        if outcome.is_ok() {
            let stale = self.store.mark_downstream_stale(node_id, graph.edges());
            if !stale.is_empty() {
                info!(node_id = %node_id, stale = ?stale, "Downstream outputs invalidated");
            }
        }
        Ok(self.store.get_node_state(node_id))
    }

    /// Executes one runnable node, recording running → done | error.
    async fn run_runnable(
        &self,
        node: &Node,
        runnable: RunnableNode<'_>,
        inputs: &NodeInputs,
        cancel: &CancellationToken,
    ) -> Result<NodeOutput, ExecutionError> {
        let node_id = node.id.as_str();
        self.store.set_node_state(node_id, NodeStateUpdate::running());
        self.sink
            .try_emit("node.started", Some(json!({ "node_id": node_id, "kind": node.kind() })));

        let started = Instant::now();
        let outcome = self.execute_checked(node, runnable, inputs, cancel).await;
        let duration_ms = elapsed_ms(started);

        match &outcome {
            Ok(output) => {
                self.store
                    .set_node_state(node_id, NodeStateUpdate::done(Some(output.clone())));
                info!(node_id = %node_id, kind = %node.kind(), duration_ms, "Node completed");
                self.sink.try_emit(
                    "node.completed",
                    Some(json!({ "node_id": node_id, "duration_ms": duration_ms })),
                );
            }
            Err(err) => {
                self.store.set_node_state(node_id, NodeStateUpdate::failed(err.to_string()));
                error!(node_id = %node_id, kind = %node.kind(), error = %err, "Node failed");
                self.sink.try_emit(
                    "node.failed",
                    Some(json!({ "node_id": node_id, "error": err.to_string(), "code": err.code() })),
                );
            }
        }
        outcome
    }

    async fn execute_checked(
        &self,
        node: &Node,
        runnable: RunnableNode<'_>,
        inputs: &NodeInputs,
        cancel: &CancellationToken,
    ) -> Result<NodeOutput, ExecutionError> {
        if let Some(port) = missing_required_inputs(node.kind(), inputs).first() {
            return Err(ExecutionError::MissingRequiredInput {
                node_id: node.id.clone(),
                port: (*port).to_string(),
            });
        }

        let response = tokio::select! {
            response = self.executor.execute(runnable, inputs) => response?,
            () = cancel.cancelled() => {
                return Err(ExecutionError::Cancelled(
                    cancel.reason().unwrap_or_else(|| "cancelled".to_string()),
                ));
            }
        };

        let expected = node.kind().schema().primary_output_type();
        if expected != Some(response.output.port_type()) {
            return Err(ExecutionError::MalformedResponse(format!(
                "expected {} output, got {}",
                expected.map_or("no", |t| t.as_str()),
                response.output.port_type()
            )));
        }
        debug!(node_id = %node.id, remote_ms = response.duration_ms, "Executor returned");
        Ok(response.output)
    }

    /// The output of a node that runs locally: its own derived value, or
    /// the first available input passed through.
    fn local_output(node: &Node, inputs: &NodeInputs) -> Option<NodeOutput> {
        node.config
            .self_output()
            .or_else(|| first_input(node.kind(), inputs).cloned())
    }

    fn abort_run(&self, run_id: &str, err: PipelineError) -> PipelineError {
        self.store.set_pipeline_running(false, None);
        if let Some(registry) = &self.registry {
            registry.fail(run_id, err.to_string());
        }
        self.sink.try_emit(
            "pipeline.failed",
            Some(json!({ "run_id": run_id, "error": err.to_string() })),
        );
        err
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
