//! DashScope generation service client.
//!
//! Text generation is synchronous. Image and video generation are
//! submitted as async tasks and then polled through `tasks/{id}`.

use crate::config::DashScopeConfig;
use crate::errors::ExecutionError;
use crate::executor::{ChatMessage, GenerationService, ImageRequest, TextRequest, VideoRequest};
use crate::jobs::{TaskApi, TaskSnapshot, TaskStatus};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

const TEXT_PATH: &str = "services/aigc/text-generation/generation";
const IMAGE_PATH: &str = "services/aigc/text2image/image-synthesis";
const VIDEO_PATH: &str = "services/aigc/video-synthesis/generation";

#[derive(Debug, Serialize)]
struct TextBody<'a> {
    model: &'a str,
    input: TextInput<'a>,
    parameters: TextParameters,
}

#[derive(Debug, Serialize)]
struct TextInput<'a> {
    messages: &'a [ChatMessage],
}

#[derive(Debug, Serialize)]
struct TextParameters {
    temperature: f64,
    max_tokens: u32,
    result_format: &'static str,
}

#[derive(Debug, Serialize)]
struct ImageBody<'a> {
    model: &'a str,
    input: ImageInput<'a>,
    parameters: ImageParameters,
}

#[derive(Debug, Serialize)]
struct ImageInput<'a> {
    prompt: &'a str,
    negative_prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ref_img: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ImageParameters {
    size: String,
    n: u32,
    steps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<i64>,
}

#[derive(Debug, Serialize)]
struct VideoBody<'a> {
    model: &'a str,
    input: VideoInput<'a>,
    parameters: VideoParameters<'a>,
}

#[derive(Debug, Serialize)]
struct VideoInput<'a> {
    prompt: &'a str,
    negative_prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    img_url: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct VideoParameters<'a> {
    duration: &'a str,
    resolution: &'a str,
    fps: u32,
}

#[derive(Debug, Deserialize)]
struct TaskEnvelope {
    output: TaskOutput,
}

#[derive(Debug, Deserialize)]
struct TaskOutput {
    task_id: String,
    #[serde(default = "unknown_status")]
    task_status: TaskStatus,
    #[serde(default)]
    results: Vec<TaskResult>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskResult {
    #[serde(default)]
    url: Option<String>,
}

const fn unknown_status() -> TaskStatus {
    TaskStatus::Unknown
}

/// Builds the text-generation request body.
///
/// # Errors
///
/// Returns [`ExecutionError::InvalidRequest`] if the body cannot be encoded.
pub fn text_body(request: &TextRequest, default_model: &str) -> Result<Value, ExecutionError> {
    let body = TextBody {
        model: request.model.as_deref().unwrap_or(default_model),
        input: TextInput {
            messages: &request.messages,
        },
        parameters: TextParameters {
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            result_format: "message",
        },
    };
    encode_body(&body)
}

/// Builds the image task body.
///
/// # Errors
///
/// Returns [`ExecutionError::InvalidRequest`] if the body cannot be encoded.
pub fn image_body(request: &ImageRequest, default_model: &str) -> Result<Value, ExecutionError> {
    let body = ImageBody {
        model: request.model.as_deref().unwrap_or(default_model),
        input: ImageInput {
            prompt: &request.prompt,
            negative_prompt: request.negative_prompt.as_deref().unwrap_or_default(),
            ref_img: request.ref_image_url.as_deref(),
        },
        parameters: ImageParameters {
            size: request.size.clone(),
            n: request.n.max(1),
            steps: request.steps,
            seed: request.seed,
        },
    };
    encode_body(&body)
}

/// Builds the video task body.
///
/// # Errors
///
/// Returns [`ExecutionError::InvalidRequest`] if the body cannot be encoded.
pub fn video_body(request: &VideoRequest, default_model: &str) -> Result<Value, ExecutionError> {
    let body = VideoBody {
        model: request.model.as_deref().unwrap_or(default_model),
        input: VideoInput {
            prompt: &request.prompt,
            negative_prompt: request.negative_prompt.as_deref().unwrap_or_default(),
            img_url: request.ref_image_url.as_deref(),
        },
        parameters: VideoParameters {
            duration: &request.duration,
            resolution: &request.resolution,
            fps: request.fps,
        },
    };
    encode_body(&body)
}

fn encode_body(body: &impl Serialize) -> Result<Value, ExecutionError> {
    serde_json::to_value(body).map_err(|e| ExecutionError::InvalidRequest(format!("cannot encode request body: {e}")))
}

/// Extracts the generated text from a text-generation response.
///
/// A response without choices yields an empty string.
#[must_use]
pub fn parse_text_response(body: &Value) -> String {
    body.pointer("/output/choices/0/message/content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Extracts the task id from a submission response.
///
/// # Errors
///
/// Returns [`ExecutionError::MalformedResponse`] if no task id is present.
pub fn parse_submission(body: &Value) -> Result<String, ExecutionError> {
    body.pointer("/output/task_id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ExecutionError::MalformedResponse("missing output.task_id".to_string()))
}

/// Converts a `tasks/{id}` response into a [`TaskSnapshot`].
///
/// # Errors
///
/// Returns [`ExecutionError::MalformedResponse`] if the body has no task output.
pub fn parse_task_status(body: Value) -> Result<TaskSnapshot, ExecutionError> {
    let envelope: TaskEnvelope =
        serde_json::from_value(body).map_err(|e| ExecutionError::MalformedResponse(e.to_string()))?;
    let output = envelope.output;
    let results = output.results.into_iter().filter_map(|r| r.url).collect();
    let mut snapshot = TaskSnapshot::new(output.task_id, output.task_status).with_results(results);
    snapshot.message = output.message;
    Ok(snapshot)
}

/// Client for the DashScope text, image and video APIs.
#[derive(Debug, Clone)]
pub struct DashScopeClient {
    client: Client,
    config: DashScopeConfig,
}

impl DashScopeClient {
    /// Creates a client.
    ///
    /// A missing API key is reported on first use, not here.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: DashScopeConfig, timeout: Duration) -> Result<Self, ExecutionError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &DashScopeConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder, ExecutionError> {
        let key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ExecutionError::Service("DASHSCOPE_API_KEY not configured".to_string()))?;
        Ok(builder.bearer_auth(key))
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Value, ExecutionError> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, call = what, "DashScope request failed");
            return Err(ExecutionError::Http {
                status: status.as_u16(),
                body,
            });
        }
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ExecutionError::MalformedResponse(format!("{what}: {e}")))
    }

    async fn submit(&self, path: &str, body: &Value, what: &str) -> Result<String, ExecutionError> {
        let builder = self
            .authorized(self.client.post(self.url(path)))?
            .header("X-DashScope-Async", "enable")
            .json(body);
        let response = self.send(builder, what).await?;
        let task_id = parse_submission(&response)?;
        debug!(task_id = %task_id, call = what, "DashScope task submitted");
        Ok(task_id)
    }
}

#[async_trait]
impl TaskApi for DashScopeClient {
    async fn poll_task(&self, task_id: &str) -> Result<TaskSnapshot, ExecutionError> {
        let builder = self.authorized(self.client.get(self.url(&format!("tasks/{task_id}"))))?;
        let body = self.send(builder, "task poll").await?;
        parse_task_status(body)
    }
}

#[async_trait]
impl GenerationService for DashScopeClient {
    async fn generate_text(&self, request: &TextRequest) -> Result<String, ExecutionError> {
        let body = text_body(request, &self.config.text_model)?;
        let builder = self.authorized(self.client.post(self.url(TEXT_PATH)))?.json(&body);
        let response = self.send(builder, "text generation").await?;
        Ok(parse_text_response(&response))
    }

    async fn submit_image(&self, request: &ImageRequest) -> Result<String, ExecutionError> {
        let body = image_body(request, &self.config.image_model)?;
        self.submit(IMAGE_PATH, &body, "image synthesis").await
    }

    async fn submit_video(&self, request: &VideoRequest) -> Result<String, ExecutionError> {
        let body = video_body(request, &self.config.video_model)?;
        self.submit(VIDEO_PATH, &body, "video synthesis").await
    }
}
