//! Mock executors and services for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::errors::ExecutionError;
use crate::executor::{GenerationService, ImageRequest, NodeExecutor, NodeRunResponse, TextRequest, VideoRequest};
use crate::graph::{NodeKind, RunnableNode};
use crate::jobs::{TaskApi, TaskSnapshot, TaskStatus};
use crate::output::NodeOutput;
use crate::pipeline::NodeInputs;

/// One recorded executor call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorCall {
    /// Kind of the executed node.
    pub kind: NodeKind,
    /// Inputs it received.
    pub inputs: NodeInputs,
}

/// A [`NodeExecutor`] that records calls and returns canned outputs.
///
/// By default each runnable kind produces a plausible output derived from
/// its inputs. Failures and overrides are configured per kind.
#[derive(Debug, Default)]
pub struct MockExecutor {
    calls: Mutex<Vec<ExecutorCall>>,
    failures: Mutex<HashMap<NodeKind, ExecutionError>>,
    outputs: Mutex<HashMap<NodeKind, NodeOutput>>,
    delay: Mutex<Option<Duration>>,
}

impl MockExecutor {
    /// Creates a mock that succeeds for every kind.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every execution of `kind` fail with `error`.
    #[must_use]
    pub fn failing_on(self, kind: NodeKind, error: ExecutionError) -> Self {
        self.failures.lock().insert(kind, error);
        self
    }

    /// Makes every execution of `kind` return `output`.
    #[must_use]
    pub fn returning(self, kind: NodeKind, output: NodeOutput) -> Self {
        self.outputs.lock().insert(kind, output);
        self
    }

    /// Sleeps for `delay` before answering each call.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock() = Some(delay);
        self
    }

    /// Clears the failure configured for `kind`.
    pub fn clear_failure(&self, kind: NodeKind) {
        self.failures.lock().remove(&kind);
    }

    /// Returns the number of calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns the recorded calls in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ExecutorCall> {
        self.calls.lock().clone()
    }

    /// Returns the kinds executed, in order.
    #[must_use]
    pub fn executed_kinds(&self) -> Vec<NodeKind> {
        self.calls.lock().iter().map(|c| c.kind).collect()
    }

    fn default_output(kind: NodeKind, inputs: &NodeInputs) -> NodeOutput {
        match kind {
            NodeKind::PromptEnhancer => {
                let text = inputs
                    .get("text")
                    .and_then(NodeOutput::as_text)
                    .map(|t| t.text.clone())
                    .unwrap_or_default();
                NodeOutput::prompt(format!("enhanced: {text}"), Some(String::new()))
            }
            NodeKind::VideoGenerator => NodeOutput::video("https://mock.local/video.mp4", 5.0, 1280, 720),
            _ => NodeOutput::image("https://mock.local/image.png", 1024, 1024),
        }
    }
}

#[async_trait]
impl NodeExecutor for MockExecutor {
    async fn execute(&self, node: RunnableNode<'_>, inputs: &NodeInputs) -> Result<NodeRunResponse, ExecutionError> {
        let kind = node.kind();
        self.calls.lock().push(ExecutorCall {
            kind,
            inputs: inputs.clone(),
        });

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failures.lock().get(&kind).cloned();
        if let Some(error) = failure {
            return Err(error);
        }

        let output = self
            .outputs
            .lock()
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Self::default_output(kind, inputs));
        Ok(NodeRunResponse { output, duration_ms: 1 })
    }
}

/// A [`GenerationService`] with scripted responses.
///
/// Polls replay the scripted snapshots in order; once they run out every
/// poll reports `RUNNING`.
#[derive(Debug)]
pub struct ScriptedGenerationService {
    text: Mutex<Result<String, ExecutionError>>,
    polls: Mutex<VecDeque<TaskSnapshot>>,
    poll_count: Mutex<usize>,
    text_requests: Mutex<Vec<TextRequest>>,
    image_requests: Mutex<Vec<ImageRequest>>,
    video_requests: Mutex<Vec<VideoRequest>>,
}

impl Default for ScriptedGenerationService {
    fn default() -> Self {
        Self {
            text: Mutex::new(Ok("an enhanced prompt".to_string())),
            polls: Mutex::new(VecDeque::new()),
            poll_count: Mutex::new(0),
            text_requests: Mutex::new(Vec::new()),
            image_requests: Mutex::new(Vec::new()),
            video_requests: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedGenerationService {
    /// Task id returned by every submission.
    pub const TASK_ID: &'static str = "task-1";

    /// Creates a service with default answers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the text generation answer.
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        *self.text.lock() = Ok(text.into());
        self
    }

    /// Makes text generation fail.
    #[must_use]
    pub fn with_text_error(self, error: ExecutionError) -> Self {
        *self.text.lock() = Err(error);
        self
    }

    /// Scripts the poll snapshots.
    #[must_use]
    pub fn with_polls(self, polls: Vec<TaskSnapshot>) -> Self {
        *self.polls.lock() = polls.into();
        self
    }

    /// Number of polls served.
    #[must_use]
    pub fn poll_count(&self) -> usize {
        *self.poll_count.lock()
    }

    /// Recorded text requests.
    #[must_use]
    pub fn text_requests(&self) -> Vec<TextRequest> {
        self.text_requests.lock().clone()
    }

    /// Recorded image requests.
    #[must_use]
    pub fn image_requests(&self) -> Vec<ImageRequest> {
        self.image_requests.lock().clone()
    }

    /// Recorded video requests.
    #[must_use]
    pub fn video_requests(&self) -> Vec<VideoRequest> {
        self.video_requests.lock().clone()
    }
}

#[async_trait]
impl TaskApi for ScriptedGenerationService {
    async fn poll_task(&self, task_id: &str) -> Result<TaskSnapshot, ExecutionError> {
        *self.poll_count.lock() += 1;
        let next = self.polls.lock().pop_front();
        Ok(next.unwrap_or_else(|| TaskSnapshot::new(task_id, TaskStatus::Running)))
    }
}

#[async_trait]
impl GenerationService for ScriptedGenerationService {
    async fn generate_text(&self, request: &TextRequest) -> Result<String, ExecutionError> {
        self.text_requests.lock().push(request.clone());
        self.text.lock().clone()
    }

    async fn submit_image(&self, request: &ImageRequest) -> Result<String, ExecutionError> {
        self.image_requests.lock().push(request.clone());
        Ok(Self::TASK_ID.to_string())
    }

    async fn submit_video(&self, request: &VideoRequest) -> Result<String, ExecutionError> {
        self.video_requests.lock().push(request.clone());
        Ok(Self::TASK_ID.to_string())
    }
}
