//! Error types for the genflow engine.
//!
//! Scheduler-level failures ([`PipelineError`]) are returned to the caller
//! before any node state is touched. Node-level failures
//! ([`ExecutionError`]) are captured into the execution store and only
//! surface through the run result.

use crate::graph::NodeKind;
use crate::ports::PortType;
use thiserror::Error;

/// The umbrella error type for genflow operations.
#[derive(Debug, Error)]
pub enum GenflowError {
    /// The pipeline graph could not be built.
    #[error("{0}")]
    Graph(#[from] GraphError),

    /// A run could not be scheduled or started.
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// A node failed to execute.
    #[error("{0}")]
    Execution(#[from] ExecutionError),

    /// Configuration could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error raised when the pipeline graph is not a DAG.
///
/// No partial ordering is produced; `nodes` lists every node that could not
/// be scheduled (the cycle members and everything downstream of them).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Pipeline contains a cycle; cannot order nodes: {}", .nodes.join(", "))]
pub struct CycleDetectedError {
    /// Nodes left unscheduled when the ready queue drained.
    pub nodes: Vec<String>,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(nodes: Vec<String>) -> Self {
        Self { nodes }
    }
}

/// Errors raised while constructing or mutating a [`crate::graph::PipelineGraph`].
#[derive(Debug, Error)]
pub enum GraphError {
    /// Two nodes share the same id.
    #[error("Duplicate node id '{0}'")]
    DuplicateNode(String),

    /// An operation referenced a node that is not in the graph.
    #[error("Unknown node '{0}'")]
    UnknownNode(String),

    /// The pipeline definition could not be parsed.
    #[error("Invalid pipeline definition: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Reasons an edge is refused entry into the graph model.
///
/// Rejected edges are discarded during graph construction and reported,
/// never scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EdgeRejection {
    /// The edge has no source or target handle.
    #[error("edge is missing a source or target handle")]
    MissingHandle,

    /// The edge references a node that does not exist.
    #[error("edge references unknown node '{0}'")]
    UnknownNode(String),

    /// The edge connects a node to itself.
    #[error("edge connects node '{0}' to itself")]
    SelfLoop(String),

    /// The source handle is not an output port of the source node.
    #[error("'{kind}' has no output port '{handle}'")]
    UnknownSourcePort {
        /// Kind of the source node.
        kind: NodeKind,
        /// The unresolved handle.
        handle: String,
    },

    /// The target handle is not an input port of the target node.
    #[error("'{kind}' has no input port '{handle}'")]
    UnknownTargetPort {
        /// Kind of the target node.
        kind: NodeKind,
        /// The unresolved handle.
        handle: String,
    },

    /// The port types do not satisfy the compatibility matrix.
    #[error("port type '{source_type}' cannot connect to '{target_type}'")]
    IncompatibleTypes {
        /// Type of the source output port.
        source_type: PortType,
        /// Type of the target input port.
        target_type: PortType,
    },

    /// Another edge already feeds this input port.
    #[error("input port '{port}' on node '{node_id}' is already connected")]
    TargetPortOccupied {
        /// The target node.
        node_id: String,
        /// The occupied input port.
        port: String,
    },
}

/// Errors that abort a run before (or instead of) executing nodes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// The graph has no valid execution order.
    #[error("{0}")]
    Cycle(#[from] CycleDetectedError),

    /// A scheduled node id has no node object.
    #[error("Node '{0}' is scheduled but missing from the graph")]
    UnknownNode(String),

    /// A single-node run targeted a node that does not exist.
    #[error("Node '{0}' not found")]
    NodeNotFound(String),

    /// A single-node run targeted a node that is not runnable.
    #[error("Node type '{kind}' of node '{node_id}' is not runnable")]
    NotRunnable {
        /// The targeted node.
        node_id: String,
        /// Its kind.
        kind: NodeKind,
    },
}

/// Node-level execution failures.
///
/// These are recorded as the node's `error` state with the message preserved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// The remote endpoint answered with a non-success status.
    #[error("Server error ({status}): {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// The request never produced a response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response could not be decoded or had the wrong shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The request could not be built.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The generation task reported `FAILED`.
    #[error("Task failed: {0}")]
    TaskFailed(String),

    /// The poll budget was exhausted before the task finished.
    #[error("Task {task_id} timed out after {attempts} attempts")]
    Timeout {
        /// The polled task.
        task_id: String,
        /// Number of polls performed.
        attempts: usize,
    },

    /// A required input port has no collected value.
    #[error("Node '{node_id}' is missing required input '{port}'")]
    MissingRequiredInput {
        /// The node being executed.
        node_id: String,
        /// The unfilled port.
        port: String,
    },

    /// The generation service is unusable (e.g. missing credentials).
    #[error("Generation service error: {0}")]
    Service(String),

    /// Execution was cancelled.
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl ExecutionError {
    /// Returns a stable machine-readable code for the error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Http { .. } => "remote_http",
            Self::Transport(_) => "remote_transport",
            Self::MalformedResponse(_) => "remote_malformed",
            Self::InvalidRequest(_) => "invalid_request",
            Self::TaskFailed(_) => "task_failed",
            Self::Timeout { .. } => "task_timeout",
            Self::MissingRequiredInput { .. } => "missing_input",
            Self::Service(_) => "service",
            Self::Cancelled(_) => "cancelled",
        }
    }

    /// Returns true if the failure was a poll timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for ExecutionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value was present but invalid.
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue {
        /// The offending key.
        key: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The config file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file could not be parsed.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
