//! In-process execution against a generation service.

use super::{NodeExecutor, NodeRunResponse};
use crate::errors::ExecutionError;
use crate::graph::{ImageGeneratorConfig, PromptEnhancerConfig, RunnableNode, VideoGeneratorConfig};
use crate::jobs::{JobPoller, PollPolicy, TaskApi};
use crate::output::{NodeOutput, StyleData};
use crate::pipeline::NodeInputs;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Token cap for enhanced prompts.
pub const ENHANCER_MAX_TOKENS: u32 = 1500;

const ALLOWED_STEPS: RangeInclusive<u32> = 10..=50;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions.
    System,
    /// User content.
    User,
    /// Model output.
    Assistant,
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author.
    pub role: ChatRole,
    /// Content.
    pub content: String,
}

impl ChatMessage {
    /// A system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// A user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A text-generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    /// Model override.
    pub model: Option<String>,
    /// Conversation.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    pub temperature: f64,
    /// Token cap.
    pub max_tokens: u32,
}

/// An image-generation task request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    /// Model override.
    pub model: Option<String>,
    /// Positive prompt.
    pub prompt: String,
    /// Negative prompt.
    pub negative_prompt: Option<String>,
    /// `W*H` size string.
    pub size: String,
    /// Number of images.
    pub n: u32,
    /// Diffusion steps.
    pub steps: u32,
    /// Fixed seed.
    pub seed: Option<i64>,
    /// Reference image.
    pub ref_image_url: Option<String>,
}

/// A video-generation task request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRequest {
    /// Model override.
    pub model: Option<String>,
    /// Positive prompt.
    pub prompt: String,
    /// Negative prompt.
    pub negative_prompt: Option<String>,
    /// Clip length in whole seconds, as a string.
    pub duration: String,
    /// Resolution name, e.g. `720p`.
    pub resolution: String,
    /// Frames per second.
    pub fps: u32,
    /// Reference image.
    pub ref_image_url: Option<String>,
}

/// A provider of text, image and video generation.
///
/// Image and video submissions return a task id to be polled through the
/// [`TaskApi`] supertrait.
#[async_trait]
pub trait GenerationService: TaskApi {
    /// Generates text synchronously.
    async fn generate_text(&self, request: &TextRequest) -> Result<String, ExecutionError>;

    /// Submits an image task and returns its id.
    async fn submit_image(&self, request: &ImageRequest) -> Result<String, ExecutionError>;

    /// Submits a video task and returns its id.
    async fn submit_video(&self, request: &VideoRequest) -> Result<String, ExecutionError>;
}

/// Builds the prompt-enhancer system prompt from the node config and an
/// optional style input.
#[must_use]
pub fn build_system_prompt(config: &PromptEnhancerConfig, style: Option<&StyleData>) -> String {
    use crate::graph::Language;

    let mut lines = vec![
        "You are an expert AI image/video prompt engineer.".to_string(),
        "Enhance the user's description into a detailed, high-quality prompt for image/video generation.".to_string(),
        format!("Content type: {}. Tone: {}.", config.content_type, config.tone),
    ];

    match config.language {
        Language::Id => lines.push(
            "The user writes in Indonesian. Output the prompt in English for the AI model, but keep Indonesian cultural references."
                .to_string(),
        ),
        Language::Mixed => {
            lines.push("The user may write in mixed Indonesian/English. Output the prompt in English.".to_string());
        }
        Language::En => {}
    }

    if let Some(style) = style {
        if !style.art_style.is_empty() {
            lines.push(format!("Art style: {}", style.art_style));
        }
        if !style.mood.is_empty() {
            lines.push(format!("Mood: {}", style.mood));
        }
        if let Some(theme) = style.cultural_theme.as_deref().filter(|t| !t.is_empty()) {
            lines.push(format!("Cultural theme: {theme}"));
        }
    }

    lines.push("Output ONLY the enhanced prompt text, nothing else.".to_string());
    lines.join("\n")
}

/// Executes runnable nodes in-process against a [`GenerationService`].
pub struct ServiceNodeExecutor {
    service: Arc<dyn GenerationService>,
    image_poll: PollPolicy,
    video_poll: PollPolicy,
}

impl std::fmt::Debug for ServiceNodeExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceNodeExecutor")
            .field("image_poll", &self.image_poll)
            .field("video_poll", &self.video_poll)
            .finish_non_exhaustive()
    }
}

impl ServiceNodeExecutor {
    /// Creates an executor with the default image and video poll budgets.
    #[must_use]
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self {
            service,
            image_poll: PollPolicy::image(),
            video_poll: PollPolicy::video(),
        }
    }

    /// Overrides the image poll budget.
    #[must_use]
    pub fn with_image_poll(mut self, policy: PollPolicy) -> Self {
        self.image_poll = policy;
        self
    }

    /// Overrides the video poll budget.
    #[must_use]
    pub fn with_video_poll(mut self, policy: PollPolicy) -> Self {
        self.video_poll = policy;
        self
    }

    async fn enhance_prompt(
        &self,
        config: &PromptEnhancerConfig,
        inputs: &NodeInputs,
    ) -> Result<NodeOutput, ExecutionError> {
        let text = inputs
            .get("text")
            .and_then(NodeOutput::as_text)
            .map(|t| t.text.clone())
            .unwrap_or_default();
        let style = inputs.get("style").and_then(NodeOutput::as_style);

        let request = TextRequest {
            model: None,
            messages: vec![ChatMessage::system(build_system_prompt(config, style)), ChatMessage::user(text)],
            temperature: config.creativity.temperature(),
            max_tokens: ENHANCER_MAX_TOKENS,
        };
        let enhanced = self.service.generate_text(&request).await?;
        Ok(NodeOutput::prompt(enhanced, Some(String::new())))
    }

    async fn generate_image(
        &self,
        config: &ImageGeneratorConfig,
        inputs: &NodeInputs,
    ) -> Result<NodeOutput, ExecutionError> {
        if !ALLOWED_STEPS.contains(&config.steps) {
            return Err(ExecutionError::InvalidRequest(format!(
                "steps must be between {} and {}, got {}",
                ALLOWED_STEPS.start(),
                ALLOWED_STEPS.end(),
                config.steps
            )));
        }
        let (prompt, negative_prompt) = prompt_input(inputs)?;

        let request = ImageRequest {
            model: None,
            prompt,
            negative_prompt,
            size: config.dimensions.api_size(),
            n: 1,
            steps: config.steps,
            seed: config.seed,
            ref_image_url: reference_image(inputs),
        };
        let task_id = self.service.submit_image(&request).await?;
        info!(task_id = %task_id, size = %request.size, "Submitted image task");

        let results = JobPoller::new(&*self.service, &self.image_poll).wait(&task_id).await?;
        let url = results
            .into_iter()
            .next()
            .ok_or_else(|| ExecutionError::MalformedResponse("No image generated".to_string()))?;

        let (width, height) = config.dimensions.size();
        Ok(NodeOutput::image(url, width, height))
    }

    async fn generate_video(
        &self,
        config: &VideoGeneratorConfig,
        inputs: &NodeInputs,
    ) -> Result<NodeOutput, ExecutionError> {
        let (prompt, negative_prompt) = prompt_input(inputs)?;

        let request = VideoRequest {
            model: None,
            prompt,
            negative_prompt,
            duration: config.duration.seconds().to_string(),
            resolution: config.resolution.as_str().to_string(),
            fps: config.fps,
            ref_image_url: reference_image(inputs),
        };
        let task_id = self.service.submit_video(&request).await?;
        info!(task_id = %task_id, resolution = %request.resolution, "Submitted video task");

        let results = JobPoller::new(&*self.service, &self.video_poll).wait(&task_id).await?;
        let url = results
            .into_iter()
            .next()
            .ok_or_else(|| ExecutionError::MalformedResponse("No video generated".to_string()))?;

        let (width, height) = config.resolution.size();
        Ok(NodeOutput::video(url, f64::from(config.duration.seconds()), width, height))
    }
}

fn prompt_input(inputs: &NodeInputs) -> Result<(String, Option<String>), ExecutionError> {
    let prompt = inputs
        .get("prompt")
        .and_then(NodeOutput::as_prompt)
        .filter(|p| !p.prompt.is_empty())
        .ok_or_else(|| ExecutionError::InvalidRequest("Prompt input required".to_string()))?;
    let negative = prompt.negative_prompt.clone().filter(|n| !n.is_empty());
    Ok((prompt.prompt.clone(), negative))
}

fn reference_image(inputs: &NodeInputs) -> Option<String> {
    inputs
        .get("image")
        .and_then(NodeOutput::as_image)
        .map(|image| image.url.clone())
}

#[async_trait]
impl NodeExecutor for ServiceNodeExecutor {
    async fn execute(&self, node: RunnableNode<'_>, inputs: &NodeInputs) -> Result<NodeRunResponse, ExecutionError> {
        let started = Instant::now();
        debug!(kind = %node.kind(), inputs = inputs.len(), "Executing node in-process");

        let output = match node {
            RunnableNode::PromptEnhancer(config) => self.enhance_prompt(config, inputs).await?,
            RunnableNode::ImageGenerator(config) => self.generate_image(config, inputs).await?,
            RunnableNode::VideoGenerator(config) => self.generate_video(config, inputs).await?,
        };

        Ok(NodeRunResponse {
            output,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ContentType, Language, Tone, VideoDuration, VideoResolution};
    use crate::jobs::{TaskSnapshot, TaskStatus};
    use crate::testing::ScriptedGenerationService;
    use pretty_assertions::assert_eq;

    fn prompt_inputs(prompt: &str) -> NodeInputs {
        NodeInputs::from([("prompt".to_string(), NodeOutput::prompt(prompt, Some(String::new())))])
    }

    fn executor(service: &Arc<ScriptedGenerationService>) -> ServiceNodeExecutor {
        ServiceNodeExecutor::new(service.clone())
            .with_image_poll(PollPolicy::fixed(5, 0))
            .with_video_poll(PollPolicy::fixed(5, 0))
    }

    #[test]
    fn test_system_prompt_for_indonesian_with_style() {
        let config = PromptEnhancerConfig {
            content_type: ContentType::Wishes,
            tone: Tone::Heartfelt,
            ..PromptEnhancerConfig::default()
        };
        let style = StyleData {
            art_style: "watercolor".to_string(),
            color_palette: vec![],
            mood: "warm".to_string(),
            cultural_theme: Some("ramadan".to_string()),
        };

        let prompt = build_system_prompt(&config, Some(&style));
        let lines: Vec<&str> = prompt.lines().collect();
        assert_eq!(lines[2], "Content type: wishes. Tone: heartfelt.");
        assert!(lines[3].starts_with("The user writes in Indonesian."));
        assert_eq!(&lines[4..7], &["Art style: watercolor", "Mood: warm", "Cultural theme: ramadan"]);
        assert_eq!(lines.last(), Some(&"Output ONLY the enhanced prompt text, nothing else."));
    }

    #[test]
    fn test_system_prompt_english_has_no_language_note() {
        let config = PromptEnhancerConfig {
            language: Language::En,
            ..PromptEnhancerConfig::default()
        };
        let prompt = build_system_prompt(&config, None);
        assert!(!prompt.contains("Indonesian"));
        assert_eq!(prompt.lines().count(), 4);
    }

    #[tokio::test]
    async fn test_prompt_enhancer_sends_temperature_and_text() {
        let service = Arc::new(ScriptedGenerationService::new().with_text("a golden retriever, watercolor"));
        let config = PromptEnhancerConfig::default();
        let inputs = NodeInputs::from([("text".to_string(), NodeOutput::text("anjing lucu"))]);

        let response = executor(&service)
            .execute(RunnableNode::PromptEnhancer(&config), &inputs)
            .await
            .unwrap();

        assert_eq!(response.output.as_prompt().unwrap().prompt, "a golden retriever, watercolor");
        let request = service.text_requests().pop().unwrap();
        assert!((request.temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(request.max_tokens, ENHANCER_MAX_TOKENS);
        assert_eq!(request.messages[1], ChatMessage::user("anjing lucu"));
    }

    #[tokio::test]
    async fn test_image_generator_polls_and_sizes_output() {
        let service = Arc::new(ScriptedGenerationService::new().with_polls(vec![
            TaskSnapshot::new("task-1", TaskStatus::Pending),
            TaskSnapshot::new("task-1", TaskStatus::Succeeded).with_results(vec!["https://cdn/img.png".to_string()]),
        ]));
        let config = ImageGeneratorConfig {
            dimensions: crate::graph::ImageDimensions::Portrait768x1024,
            ..ImageGeneratorConfig::default()
        };
        let mut inputs = prompt_inputs("a cat");
        inputs.insert("image".to_string(), NodeOutput::image("https://cdn/ref.jpg", 10, 10));

        let response = executor(&service)
            .execute(RunnableNode::ImageGenerator(&config), &inputs)
            .await
            .unwrap();

        let image = response.output.as_image().unwrap();
        assert_eq!((image.url.as_str(), image.width, image.height), ("https://cdn/img.png", 768, 1024));

        let request = service.image_requests().pop().unwrap();
        assert_eq!(request.size, "768*1024");
        assert_eq!(request.negative_prompt, None);
        assert_eq!(request.ref_image_url.as_deref(), Some("https://cdn/ref.jpg"));
        assert_eq!(service.poll_count(), 2);
    }

    #[tokio::test]
    async fn test_image_generator_without_results_fails() {
        let service = Arc::new(
            ScriptedGenerationService::new().with_polls(vec![TaskSnapshot::new("task-1", TaskStatus::Succeeded)]),
        );
        let config = ImageGeneratorConfig::default();

        let err = executor(&service)
            .execute(RunnableNode::ImageGenerator(&config), &prompt_inputs("a cat"))
            .await
            .unwrap_err();
        assert_eq!(err, ExecutionError::MalformedResponse("No image generated".to_string()));
    }

    #[tokio::test]
    async fn test_image_generator_requires_prompt() {
        let service = Arc::new(ScriptedGenerationService::new());
        let config = ImageGeneratorConfig::default();

        let err = executor(&service)
            .execute(RunnableNode::ImageGenerator(&config), &NodeInputs::new())
            .await
            .unwrap_err();
        assert_eq!(err, ExecutionError::InvalidRequest("Prompt input required".to_string()));
        assert!(service.image_requests().is_empty());
    }

    #[tokio::test]
    async fn test_image_generator_rejects_out_of_range_steps() {
        let service = Arc::new(ScriptedGenerationService::new());
        let config = ImageGeneratorConfig {
            steps: 80,
            ..ImageGeneratorConfig::default()
        };
        let err = executor(&service)
            .execute(RunnableNode::ImageGenerator(&config), &prompt_inputs("a cat"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_video_generator_reports_task_failure() {
        let service = Arc::new(ScriptedGenerationService::new().with_polls(vec![
            TaskSnapshot::new("task-1", TaskStatus::Running),
            TaskSnapshot::new("task-1", TaskStatus::Failed).with_message("content rejected"),
        ]));
        let config = VideoGeneratorConfig::default();

        let err = executor(&service)
            .execute(RunnableNode::VideoGenerator(&config), &prompt_inputs("fireworks"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Task failed: content rejected");
    }

    #[tokio::test]
    async fn test_video_generator_output_dimensions() {
        let service = Arc::new(ScriptedGenerationService::new().with_polls(vec![
            TaskSnapshot::new("task-1", TaskStatus::Succeeded).with_results(vec!["https://cdn/v.mp4".to_string()]),
        ]));
        let config = VideoGeneratorConfig {
            duration: VideoDuration::Short,
            resolution: VideoResolution::P480,
            ..VideoGeneratorConfig::default()
        };

        let response = executor(&service)
            .execute(RunnableNode::VideoGenerator(&config), &prompt_inputs("fireworks"))
            .await
            .unwrap();

        let video = response.output.as_video().unwrap();
        assert_eq!((video.width, video.height), (854, 480));
        assert!((video.duration - 3.0).abs() < f64::EPSILON);
        assert_eq!(service.video_requests().pop().unwrap().duration, "3");
    }

    #[tokio::test]
    async fn test_video_generator_times_out() {
        let service = Arc::new(ScriptedGenerationService::new());
        let config = VideoGeneratorConfig::default();

        let err = ServiceNodeExecutor::new(service.clone())
            .with_video_poll(PollPolicy::fixed(3, 0))
            .execute(RunnableNode::VideoGenerator(&config), &prompt_inputs("slow"))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(service.poll_count(), 3);
    }
}
