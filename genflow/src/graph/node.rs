//! Node kinds, configs, and the node record.

use super::configs::{
    ExportConfig, ImageGeneratorConfig, ImageUploadConfig, Locale, PreviewConfig, PromptEnhancerConfig,
    StyleSettings, TemplateId, TemplatePresetConfig, TextOverlayConfig, TextPromptConfig, VideoGeneratorConfig,
};
use super::schema::schema_for;
use crate::output::{NodeOutput, StyleData};
use crate::ports::NodePortSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of node types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    /// Free-text seed.
    TextPrompt,
    /// User-uploaded reference image.
    ImageUpload,
    /// Template selector.
    TemplatePreset,
    /// Style attributes.
    StyleConfig,
    /// LLM prompt enhancement.
    PromptEnhancer,
    /// Image generation.
    ImageGenerator,
    /// Video generation.
    VideoGenerator,
    /// Caption overlay.
    TextOverlay,
    /// Platform framing.
    Preview,
    /// Export target.
    Export,
}

impl NodeKind {
    /// All node kinds.
    pub const ALL: [Self; 10] = [
        Self::TextPrompt,
        Self::ImageUpload,
        Self::TemplatePreset,
        Self::StyleConfig,
        Self::PromptEnhancer,
        Self::ImageGenerator,
        Self::VideoGenerator,
        Self::TextOverlay,
        Self::Preview,
        Self::Export,
    ];

    /// The wire name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TextPrompt => "textPrompt",
            Self::ImageUpload => "imageUpload",
            Self::TemplatePreset => "templatePreset",
            Self::StyleConfig => "styleConfig",
            Self::PromptEnhancer => "promptEnhancer",
            Self::ImageGenerator => "imageGenerator",
            Self::VideoGenerator => "videoGenerator",
            Self::TextOverlay => "textOverlay",
            Self::Preview => "preview",
            Self::Export => "export",
        }
    }

    /// Default display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::TextPrompt => "Text Prompt",
            Self::ImageUpload => "Image Upload",
            Self::TemplatePreset => "Template Preset",
            Self::StyleConfig => "Style Config",
            Self::PromptEnhancer => "Prompt Enhancer",
            Self::ImageGenerator => "Image Generator",
            Self::VideoGenerator => "Video Generator",
            Self::TextOverlay => "Text Overlay",
            Self::Preview => "Preview",
            Self::Export => "Export",
        }
    }

    /// The port schema of this kind.
    #[must_use]
    pub fn schema(self) -> &'static NodePortSchema {
        schema_for(self)
    }

    /// Returns true if nodes of this kind require remote execution.
    #[must_use]
    pub const fn is_runnable(self) -> bool {
        matches!(self, Self::PromptEnhancer | Self::ImageGenerator | Self::VideoGenerator)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown node type '{s}'"))
    }
}

/// A node's kind together with its kind-specific configuration.
///
/// Serialized as the config fields plus a `type` tag, so the config can
/// never disagree with the kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeConfig {
    /// See [`TextPromptConfig`].
    TextPrompt(TextPromptConfig),
    /// See [`ImageUploadConfig`].
    ImageUpload(ImageUploadConfig),
    /// See [`TemplatePresetConfig`].
    TemplatePreset(TemplatePresetConfig),
    /// See [`StyleSettings`].
    StyleConfig(StyleSettings),
    /// See [`PromptEnhancerConfig`].
    PromptEnhancer(PromptEnhancerConfig),
    /// See [`ImageGeneratorConfig`].
    ImageGenerator(ImageGeneratorConfig),
    /// See [`VideoGeneratorConfig`].
    VideoGenerator(VideoGeneratorConfig),
    /// See [`TextOverlayConfig`].
    TextOverlay(TextOverlayConfig),
    /// See [`PreviewConfig`].
    Preview(PreviewConfig),
    /// See [`ExportConfig`].
    Export(ExportConfig),
}

impl NodeConfig {
    /// The default config for `kind`.
    #[must_use]
    pub fn default_for(kind: NodeKind) -> Self {
        match kind {
            NodeKind::TextPrompt => Self::TextPrompt(TextPromptConfig::default()),
            NodeKind::ImageUpload => Self::ImageUpload(ImageUploadConfig::default()),
            NodeKind::TemplatePreset => Self::TemplatePreset(TemplatePresetConfig::default()),
            NodeKind::StyleConfig => Self::StyleConfig(StyleSettings::default()),
            NodeKind::PromptEnhancer => Self::PromptEnhancer(PromptEnhancerConfig::default()),
            NodeKind::ImageGenerator => Self::ImageGenerator(ImageGeneratorConfig::default()),
            NodeKind::VideoGenerator => Self::VideoGenerator(VideoGeneratorConfig::default()),
            NodeKind::TextOverlay => Self::TextOverlay(TextOverlayConfig::default()),
            NodeKind::Preview => Self::Preview(PreviewConfig::default()),
            NodeKind::Export => Self::Export(ExportConfig::default()),
        }
    }

    /// The kind this config belongs to.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::TextPrompt(_) => NodeKind::TextPrompt,
            Self::ImageUpload(_) => NodeKind::ImageUpload,
            Self::TemplatePreset(_) => NodeKind::TemplatePreset,
            Self::StyleConfig(_) => NodeKind::StyleConfig,
            Self::PromptEnhancer(_) => NodeKind::PromptEnhancer,
            Self::ImageGenerator(_) => NodeKind::ImageGenerator,
            Self::VideoGenerator(_) => NodeKind::VideoGenerator,
            Self::TextOverlay(_) => NodeKind::TextOverlay,
            Self::Preview(_) => NodeKind::Preview,
            Self::Export(_) => NodeKind::Export,
        }
    }

    /// Borrows the config as a runnable node, if the kind is runnable.
    #[must_use]
    pub const fn as_runnable(&self) -> Option<RunnableNode<'_>> {
        match self {
            Self::PromptEnhancer(config) => Some(RunnableNode::PromptEnhancer(config)),
            Self::ImageGenerator(config) => Some(RunnableNode::ImageGenerator(config)),
            Self::VideoGenerator(config) => Some(RunnableNode::VideoGenerator(config)),
            _ => None,
        }
    }

    /// The output a source node derives from its own config.
    ///
    /// Returns `None` for nodes that only forward inputs, and for source
    /// nodes with nothing to emit yet (e.g. an upload with no image).
    #[must_use]
    pub fn self_output(&self) -> Option<NodeOutput> {
        match self {
            Self::TextPrompt(config) => Some(NodeOutput::text(config.effective_text())),
            Self::ImageUpload(config) => config
                .preview_url
                .as_ref()
                .map(|url| NodeOutput::image(url.clone(), config.width, config.height)),
            Self::TemplatePreset(config) => template_seed(config).map(NodeOutput::text),
            Self::StyleConfig(settings) => Some(NodeOutput::style(StyleData {
                art_style: settings.art_style.as_str().to_string(),
                color_palette: settings.color_palette.clone(),
                mood: settings.mood.as_str().to_string(),
                cultural_theme: settings.cultural_theme.map(|t| t.as_str().to_string()),
            })),
            _ => None,
        }
    }
}

fn template_seed(config: &TemplatePresetConfig) -> Option<String> {
    let seed = match (config.template, config.locale) {
        (TemplateId::Blank, _) => return None,
        (TemplateId::RamadanWishes, Locale::Id) => "Kartu ucapan Ramadan yang hangat",
        (TemplateId::RamadanWishes, Locale::En) => "A warm Ramadan greeting card",
        (TemplateId::HolidayMeme, Locale::Id) => "Meme liburan yang lucu",
        (TemplateId::HolidayMeme, Locale::En) => "A funny holiday meme",
        (TemplateId::AiPet, Locale::Id) => "Potret hewan peliharaan yang menggemaskan",
        (TemplateId::AiPet, Locale::En) => "An adorable pet portrait",
        (TemplateId::CustomAvatar, Locale::Id) => "Avatar kustom dari foto",
        (TemplateId::CustomAvatar, Locale::En) => "A custom avatar from a photo",
    };
    Some(seed.to_string())
}

/// A runnable node's config, borrowed from its [`NodeConfig`].
///
/// Executors only ever receive this type, so a request for a non-runnable
/// kind cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnableNode<'a> {
    /// Prompt enhancement.
    PromptEnhancer(&'a PromptEnhancerConfig),
    /// Image generation.
    ImageGenerator(&'a ImageGeneratorConfig),
    /// Video generation.
    VideoGenerator(&'a VideoGeneratorConfig),
}

impl RunnableNode<'_> {
    /// The node kind.
    #[must_use]
    pub const fn kind(self) -> NodeKind {
        match self {
            Self::PromptEnhancer(_) => NodeKind::PromptEnhancer,
            Self::ImageGenerator(_) => NodeKind::ImageGenerator,
            Self::VideoGenerator(_) => NodeKind::VideoGenerator,
        }
    }

    /// The remote endpoint path for this kind.
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::PromptEnhancer(_) => "prompt-enhancer/run",
            Self::ImageGenerator(_) => "image-generator/run",
            Self::VideoGenerator(_) => "video-generator/run",
        }
    }

    /// The config as a JSON value.
    pub fn config_json(self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::PromptEnhancer(config) => serde_json::to_value(config),
            Self::ImageGenerator(config) => serde_json::to_value(config),
            Self::VideoGenerator(config) => serde_json::to_value(config),
        }
    }
}

/// Canvas position of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

/// A vertex in the pipeline graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier within the pipeline.
    pub id: String,
    /// Display label.
    #[serde(default)]
    pub label: String,
    /// Canvas position.
    #[serde(default)]
    pub position: Position,
    /// Kind and configuration.
    pub config: NodeConfig,
}

impl Node {
    /// Creates a node labelled with its kind's default label.
    #[must_use]
    pub fn new(id: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            id: id.into(),
            label: config.kind().label().to_string(),
            position: Position::default(),
            config,
        }
    }

    /// Creates a node of `kind` with the default config.
    #[must_use]
    pub fn with_defaults(id: impl Into<String>, kind: NodeKind) -> Self {
        Self::new(id, NodeConfig::default_for(kind))
    }

    /// Sets the display label.
    #[must_use]
    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the canvas position.
    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position { x, y };
        self
    }

    /// The node's kind.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.config.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::configs::{CulturalTheme, ImageMode};
    use crate::ports::PortType;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_node_config_is_tagged_by_type() {
        let node: Node = serde_json::from_value(json!({
            "id": "ig1",
            "label": "Image Generator",
            "position": { "x": 10.0, "y": 20.0 },
            "config": { "type": "imageGenerator", "mode": "img2img" }
        }))
        .unwrap();

        assert_eq!(node.kind(), NodeKind::ImageGenerator);
        match &node.config {
            NodeConfig::ImageGenerator(config) => assert_eq!(config.mode, ImageMode::Img2Img),
            other => panic!("unexpected config {other:?}"),
        }
    }

    #[test]
    fn test_unknown_node_type_is_rejected() {
        let result: Result<Node, _> = serde_json::from_value(json!({
            "id": "x",
            "config": { "type": "audioGenerator" }
        }));
        assert!(result.is_err());
        assert!("audioGenerator".parse::<NodeKind>().is_err());
    }

    #[test]
    fn test_default_config_matches_kind() {
        for kind in NodeKind::ALL {
            assert_eq!(NodeConfig::default_for(kind).kind(), kind);
            assert_eq!(kind.as_str().parse::<NodeKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_only_generators_are_runnable() {
        let runnable: Vec<_> = NodeKind::ALL
            .into_iter()
            .filter(|k| NodeConfig::default_for(*k).as_runnable().is_some())
            .collect();
        assert_eq!(
            runnable,
            vec![NodeKind::PromptEnhancer, NodeKind::ImageGenerator, NodeKind::VideoGenerator]
        );
        for kind in runnable {
            assert!(kind.is_runnable());
        }
    }

    #[test]
    fn test_endpoints() {
        let config = NodeConfig::default_for(NodeKind::VideoGenerator);
        let runnable = config.as_runnable().unwrap();
        assert_eq!(runnable.endpoint(), "video-generator/run");
        assert_eq!(runnable.kind(), NodeKind::VideoGenerator);
        assert_eq!(runnable.config_json().unwrap()["resolution"], json!("720p"));
    }

    #[test]
    fn test_style_self_output() {
        let config = NodeConfig::StyleConfig(StyleSettings {
            cultural_theme: Some(CulturalTheme::Ramadan),
            ..StyleSettings::default()
        });
        let output = config.self_output().unwrap();
        let style = output.as_style().unwrap();
        assert_eq!(style.cultural_theme.as_deref(), Some("ramadan"));
        assert_eq!(style.art_style, "realistic");
    }

    #[test]
    fn test_upload_without_image_has_no_output() {
        let config = NodeConfig::default_for(NodeKind::ImageUpload);
        assert!(config.self_output().is_none());

        let config = NodeConfig::ImageUpload(ImageUploadConfig {
            preview_url: Some("https://cdn/cat.jpg".to_string()),
            ..ImageUploadConfig::default()
        });
        assert_eq!(config.self_output().unwrap().port_type(), PortType::Image);
    }

    #[test]
    fn test_template_preset_seed_follows_locale() {
        let config = NodeConfig::TemplatePreset(TemplatePresetConfig {
            template: TemplateId::AiPet,
            locale: Locale::En,
        });
        let output = config.self_output().unwrap();
        assert_eq!(output.as_text().unwrap().text, "An adorable pet portrait");

        let blank = NodeConfig::default_for(NodeKind::TemplatePreset);
        assert!(blank.self_output().is_none());
    }

    #[test]
    fn test_node_builder_defaults_label() {
        let node = Node::with_defaults("pe1", NodeKind::PromptEnhancer).at(1.0, 2.0);
        assert_eq!(node.label, "Prompt Enhancer");
        assert_eq!(node.position, Position { x: 1.0, y: 2.0 });
    }
}
