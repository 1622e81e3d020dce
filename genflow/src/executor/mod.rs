//! Node executors.
//!
//! The runner hands every runnable node to a [`NodeExecutor`]. Two are
//! provided:
//!
//! - [`HttpNodeExecutor`] posts `{config, inputs}` to a remote per-kind
//!   endpoint and decodes `{output, duration_ms}`.
//! - [`ServiceNodeExecutor`] performs the work in-process against a
//!   [`GenerationService`], building prompts and polling generation jobs.

#[cfg(feature = "http")]
mod http;
mod service;

#[cfg(feature = "http")]
pub use http::HttpNodeExecutor;
pub use service::{
    build_system_prompt, ChatMessage, ChatRole, GenerationService, ImageRequest, ServiceNodeExecutor, TextRequest,
    VideoRequest, ENHANCER_MAX_TOKENS,
};

use crate::errors::ExecutionError;
use crate::graph::RunnableNode;
use crate::output::NodeOutput;
use crate::pipeline::NodeInputs;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The result of executing one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRunResponse {
    /// The produced output.
    pub output: NodeOutput,
    /// Wall time spent executing, in milliseconds.
    #[serde(default)]
    pub duration_ms: u64,
}

/// Executes runnable nodes.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    /// Executes `node` with its collected `inputs`.
    ///
    /// # Errors
    ///
    /// Returns an [`ExecutionError`] describing why no output was produced.
    async fn execute(&self, node: RunnableNode<'_>, inputs: &NodeInputs) -> Result<NodeRunResponse, ExecutionError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_run_response_wire_shape() {
        let response: NodeRunResponse = serde_json::from_value(json!({
            "output": {
                "type": "prompt",
                "data": { "prompt": "a cat", "negativePrompt": "" },
                "timestamp": 1
            },
            "duration_ms": 812
        }))
        .unwrap();

        assert_eq!(response.duration_ms, 812);
        assert_eq!(response.output.as_prompt().unwrap().prompt, "a cat");
    }
}
