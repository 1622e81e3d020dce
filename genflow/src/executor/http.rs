//! Remote execution over HTTP.

use super::{NodeExecutor, NodeRunResponse};
use crate::config::GenflowConfig;
use crate::errors::ExecutionError;
use crate::graph::RunnableNode;
use crate::pipeline::NodeInputs;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error};

/// Executes runnable nodes by posting to `{base_url}/{endpoint}`.
#[derive(Debug, Clone)]
pub struct HttpNodeExecutor {
    client: Client,
    base_url: String,
}

impl HttpNodeExecutor {
    /// Creates an executor for the API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ExecutionError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Creates an executor from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::Transport`] if the HTTP client cannot be built.
    pub fn from_config(config: &GenflowConfig) -> Result<Self, ExecutionError> {
        Self::new(config.api_base_url.clone(), config.request_timeout())
    }

    /// The base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, node: RunnableNode<'_>) -> String {
        format!("{}/{}", self.base_url, node.endpoint())
    }
}

#[async_trait]
impl NodeExecutor for HttpNodeExecutor {
    async fn execute(&self, node: RunnableNode<'_>, inputs: &NodeInputs) -> Result<NodeRunResponse, ExecutionError> {
        let url = self.url_for(node);
        let config = node
            .config_json()
            .map_err(|e| ExecutionError::InvalidRequest(e.to_string()))?;
        let body = json!({ "config": config, "inputs": inputs });

        debug!(url = %url, kind = %node.kind(), "Posting node run request");
        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, url = %url, "Node run request failed");
            return Err(ExecutionError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ExecutionError::MalformedResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ImageGeneratorConfig, PromptEnhancerConfig};
    use crate::output::NodeOutput;
    use crate::testing::StubServer;
    use serde_json::Value;

    fn executor(base_url: &str) -> HttpNodeExecutor {
        HttpNodeExecutor::new(base_url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_posts_config_and_inputs() {
        let server = StubServer::respond_once(
            200,
            r#"{"output":{"type":"prompt","data":{"prompt":"enhanced","negativePrompt":""},"timestamp":7},"duration_ms":15}"#,
        )
        .await
        .unwrap();
        let config = PromptEnhancerConfig::default();
        let inputs = NodeInputs::from([("text".to_string(), NodeOutput::text("kucing"))]);

        let response = executor(&server.base_url())
            .execute(RunnableNode::PromptEnhancer(&config), &inputs)
            .await
            .unwrap();
        assert_eq!(response.duration_ms, 15);
        assert_eq!(response.output.as_prompt().unwrap().prompt, "enhanced");

        let request = server.request().await;
        assert!(request.head.starts_with("POST /prompt-enhancer/run "), "{}", request.head);
        let body: Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["config"]["creativity"], "balanced");
        assert_eq!(body["inputs"]["text"]["type"], "text");
        assert_eq!(body["inputs"]["text"]["data"]["text"], "kucing");
    }

    #[tokio::test]
    async fn test_error_status_keeps_body() {
        let server = StubServer::respond_once(400, r#"{"error":"Prompt input required"}"#).await.unwrap();
        let config = ImageGeneratorConfig::default();

        let err = executor(&server.base_url())
            .execute(RunnableNode::ImageGenerator(&config), &NodeInputs::new())
            .await
            .unwrap_err();
        match err {
            ExecutionError::Http { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("Prompt input required"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let server = StubServer::respond_once(200, r#"{"result":"nope"}"#).await.unwrap();
        let config = ImageGeneratorConfig::default();

        let err = executor(&server.base_url())
            .execute(RunnableNode::ImageGenerator(&config), &NodeInputs::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_trailing_slash_is_trimmed() {
        let exec = executor("http://localhost:3001/api/nodes/");
        assert_eq!(exec.base_url(), "http://localhost:3001/api/nodes");
        let config = ImageGeneratorConfig::default();
        assert_eq!(
            exec.url_for(RunnableNode::ImageGenerator(&config)),
            "http://localhost:3001/api/nodes/image-generator/run"
        );
    }
}
