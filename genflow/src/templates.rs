//! Built-in pipeline templates.
//!
//! Each template builds a complete, valid [`PipelineGraph`]. Unknown ids
//! fall back to the blank template in [`load`].

use crate::errors::GraphError;
use crate::graph::{
    ArtStyle, ContentType, Creativity, CulturalTheme, Edge, ExportConfig, ExportFormat, ImageGeneratorConfig,
    ImageMode, ImageUploadConfig, Language, Locale, Mood, Node, NodeConfig, PipelineGraph, PreviewConfig,
    PromptEnhancerConfig, StyleSettings, TemplateId, TemplatePresetConfig, TextOverlayConfig, TextPromptConfig,
    Tone,
};
use serde::Serialize;

/// A named starter pipeline.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PipelineTemplate {
    /// Template id.
    pub id: TemplateId,
    /// Display name.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Emoji thumbnail.
    pub thumbnail: &'static str,
    /// Gallery category.
    pub category: &'static str,
    #[serde(skip)]
    build: fn() -> (Vec<Node>, Vec<Edge>),
}

impl PipelineTemplate {
    /// Builds the template's nodes and edges.
    #[must_use]
    pub fn parts(&self) -> (Vec<Node>, Vec<Edge>) {
        (self.build)()
    }

    /// Builds the template as a graph.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] if the template defines duplicate node ids.
    pub fn graph(&self) -> Result<PipelineGraph, GraphError> {
        let (nodes, edges) = self.parts();
        PipelineGraph::new(nodes, edges)
    }
}

static TEMPLATES: [PipelineTemplate; 5] = [
    PipelineTemplate {
        id: TemplateId::RamadanWishes,
        name: "Ramadan Wishes",
        description: "Generate beautiful Islamic-themed Ramadan greeting cards",
        thumbnail: "🕌",
        category: "seasonal",
        build: ramadan_wishes,
    },
    PipelineTemplate {
        id: TemplateId::HolidayMeme,
        name: "Holiday Meme",
        description: "Create culturally relevant and funny memes for holidays like Lebaran",
        thumbnail: "🎉",
        category: "seasonal",
        build: holiday_meme,
    },
    PipelineTemplate {
        id: TemplateId::AiPet,
        name: "AI Pet",
        description: "Design unique virtual pet characters with AI",
        thumbnail: "🐾",
        category: "character",
        build: ai_pet,
    },
    PipelineTemplate {
        id: TemplateId::CustomAvatar,
        name: "Custom Avatar",
        description: "Create personalized digital avatars from photos or descriptions",
        thumbnail: "👤",
        category: "character",
        build: custom_avatar,
    },
    PipelineTemplate {
        id: TemplateId::Blank,
        name: "Blank Canvas",
        description: "Start from scratch with an empty canvas",
        thumbnail: "📄",
        category: "general",
        build: blank,
    },
];

/// All templates, in gallery order.
#[must_use]
pub fn all() -> &'static [PipelineTemplate] {
    &TEMPLATES
}

/// Looks up a template by its wire id, e.g. `ai-pet`.
#[must_use]
pub fn by_id(id: &str) -> Option<&'static PipelineTemplate> {
    TEMPLATES.iter().find(|t| t.id.as_str() == id)
}

fn edge(source: &str, source_handle: &str, target: &str, target_handle: &str) -> Edge {
    Edge::new(source, source_handle, target, target_handle).with_id(format!("e-{source}-{target}"))
}

fn palette(colors: &[&str]) -> Vec<String> {
    colors.iter().map(|c| (*c).to_string()).collect()
}

fn text_prompt(id: &str, label: &str, text: &str, placeholder: Option<&str>) -> Node {
    let mut config = TextPromptConfig::with_text(text);
    if let Some(placeholder) = placeholder {
        config.placeholder = placeholder.to_string();
    }
    Node::new(id, NodeConfig::TextPrompt(config)).labelled(label)
}

fn enhancer(creativity: Creativity, content_type: ContentType, tone: Tone, language: Language) -> Node {
    Node::new(
        "pe1",
        NodeConfig::PromptEnhancer(PromptEnhancerConfig {
            creativity,
            content_type,
            tone,
            language,
        }),
    )
    .labelled("Prompt Enhancer")
}

fn style(label: &str, art_style: ArtStyle, colors: &[&str], mood: Mood, theme: Option<CulturalTheme>) -> Node {
    Node::new(
        "sc1",
        NodeConfig::StyleConfig(StyleSettings {
            art_style,
            color_palette: palette(colors),
            mood,
            cultural_theme: theme,
        }),
    )
    .labelled(label)
}

fn image_generator(label: &str, mode: ImageMode) -> Node {
    Node::new(
        "ig1",
        NodeConfig::ImageGenerator(ImageGeneratorConfig {
            mode,
            ..ImageGeneratorConfig::default()
        }),
    )
    .labelled(label)
}

fn overlay(position: &str, font: &str, font_size: u32, font_color: &str, stroke: bool, effect: &str) -> Node {
    Node::new(
        "to1",
        NodeConfig::TextOverlay(TextOverlayConfig {
            position: position.to_string(),
            font: font.to_string(),
            font_size,
            font_color: font_color.to_string(),
            stroke,
            effect: effect.to_string(),
            ..TextOverlayConfig::default()
        }),
    )
}

fn preview() -> Node {
    Node::new("pv1", NodeConfig::Preview(PreviewConfig::default())).labelled("Preview")
}

fn export(format: ExportFormat, share_target: &str) -> Node {
    Node::new(
        "ex1",
        NodeConfig::Export(ExportConfig {
            format,
            share_target: share_target.to_string(),
            ..ExportConfig::default()
        }),
    )
    .labelled("Export")
}

/// Enhancer, style and generator wiring shared by every image template.
fn image_core_edges(text_source: &str) -> Vec<Edge> {
    vec![
        edge(text_source, "text", "pe1", "text"),
        edge("sc1", "style", "pe1", "style"),
        edge("pe1", "prompt", "ig1", "prompt"),
        edge("sc1", "style", "ig1", "style"),
    ]
}

fn ramadan_wishes() -> (Vec<Node>, Vec<Edge>) {
    let nodes = vec![
        Node::new(
            "tp1",
            NodeConfig::TemplatePreset(TemplatePresetConfig {
                template: TemplateId::RamadanWishes,
                locale: Locale::Id,
            }),
        )
        .labelled("Template Preset")
        .at(50.0, 150.0),
        text_prompt(
            "txt1",
            "Greeting Text",
            "Selamat menjalankan ibadah puasa, semoga Ramadan tahun ini penuh berkah",
            None,
        )
        .at(50.0, 350.0),
        enhancer(Creativity::Creative, ContentType::Wishes, Tone::Heartfelt, Language::Id).at(350.0, 150.0),
        style(
            "Islamic Style",
            ArtStyle::IslamicArt,
            &["#1a5c3a", "#c9a84c", "#f5f1e3", "#2d7d5f"],
            Mood::Spiritual,
            Some(CulturalTheme::Ramadan),
        )
        .at(350.0, 350.0),
        image_generator("Image Generator", ImageMode::Text2Img).at(650.0, 200.0),
        overlay("center", "arabic-display", 56, "#c9a84c", true, "glow")
            .labelled("Text Overlay")
            .at(950.0, 200.0),
        preview().at(1250.0, 100.0),
        export(ExportFormat::Png, "whatsapp").at(1250.0, 350.0),
    ];
    let mut edges = image_core_edges("tp1");
    edges.extend([
        edge("ig1", "image", "to1", "image"),
        edge("txt1", "text", "to1", "text"),
        edge("to1", "image", "pv1", "media"),
        edge("to1", "image", "ex1", "media"),
    ]);
    (nodes, edges)
}

fn holiday_meme() -> (Vec<Node>, Vec<Edge>) {
    let nodes = vec![
        text_prompt(
            "txt1",
            "Meme Idea",
            "THR sudah cair tapi langsung habis buat bayar utang",
            Some("Describe your meme idea..."),
        )
        .at(50.0, 200.0),
        enhancer(Creativity::Creative, ContentType::Meme, Tone::Funny, Language::Id).at(350.0, 150.0),
        style(
            "Meme Style",
            ArtStyle::PopArt,
            &["#ff6b6b", "#ffd93d", "#6bcb77", "#4d96ff"],
            Mood::Funny,
            Some(CulturalTheme::Lebaran),
        )
        .at(350.0, 400.0),
        image_generator("Meme Image", ImageMode::Text2Img).at(650.0, 200.0),
        overlay("bottom", "impact", 64, "#ffffff", true, "shadow")
            .labelled("Meme Text")
            .at(950.0, 200.0),
        preview().at(1250.0, 100.0),
        export(ExportFormat::Jpg, "whatsapp").at(1250.0, 350.0),
    ];
    let mut edges = image_core_edges("txt1");
    edges.extend([
        edge("ig1", "image", "to1", "image"),
        edge("txt1", "text", "to1", "text"),
        edge("to1", "image", "pv1", "media"),
        edge("to1", "image", "ex1", "media"),
    ]);
    (nodes, edges)
}

fn ai_pet() -> (Vec<Node>, Vec<Edge>) {
    let nodes = vec![
        text_prompt(
            "txt1",
            "Pet Description",
            "Kucing lucu dengan sayap peri, warna pastel, mata besar berkilau",
            Some("Describe your dream pet..."),
        )
        .at(50.0, 200.0),
        enhancer(Creativity::Creative, ContentType::Character, Tone::Casual, Language::Id).at(350.0, 150.0),
        style(
            "Cute Style",
            ArtStyle::Cartoon,
            &["#ffb3ba", "#bae1ff", "#baffc9", "#ffffba"],
            Mood::Cute,
            None,
        )
        .at(350.0, 400.0),
        image_generator("Pet Generator", ImageMode::Text2Img).at(650.0, 200.0),
        preview().at(950.0, 100.0),
        export(ExportFormat::Png, "download").at(950.0, 350.0),
    ];
    let mut edges = image_core_edges("txt1");
    edges.extend([
        edge("ig1", "image", "pv1", "media"),
        edge("ig1", "image", "ex1", "media"),
    ]);
    (nodes, edges)
}

fn custom_avatar() -> (Vec<Node>, Vec<Edge>) {
    let nodes = vec![
        Node::new("iu1", NodeConfig::ImageUpload(ImageUploadConfig::default()))
            .labelled("Reference Photo")
            .at(50.0, 100.0),
        text_prompt(
            "txt1",
            "Avatar Style Description",
            "Convert to anime style avatar, keep facial features",
            Some("Describe the avatar style..."),
        )
        .at(50.0, 350.0),
        enhancer(Creativity::Balanced, ContentType::Avatar, Tone::Casual, Language::En).at(350.0, 250.0),
        style(
            "Anime Style",
            ArtStyle::Anime,
            &["#ff9a9e", "#a18cd1", "#fbc2eb", "#a6c0fe"],
            Mood::Playful,
            None,
        )
        .at(350.0, 450.0),
        image_generator("Avatar Generator", ImageMode::Img2Img).at(650.0, 250.0),
        preview().at(950.0, 150.0),
        export(ExportFormat::Png, "download").at(950.0, 400.0),
    ];
    let mut edges = image_core_edges("txt1");
    edges.extend([
        edge("iu1", "image", "ig1", "image"),
        edge("ig1", "image", "pv1", "media"),
        edge("ig1", "image", "ex1", "media"),
    ]);
    (nodes, edges)
}

fn blank() -> (Vec<Node>, Vec<Edge>) {
    (Vec::new(), Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;
    use crate::pipeline::PipelineRunner;
    use crate::state::{ExecutionStatus, ExecutionStore};
    use crate::testing::MockExecutor;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn test_every_template_builds_cleanly() {
        for template in all() {
            let graph = template.graph().unwrap();
            assert!(graph.discarded().is_empty(), "{}: {:?}", template.name, graph.discarded());
            assert_eq!(graph.execution_order().unwrap().len(), graph.node_count());
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(by_id("ai-pet").unwrap().name, "AI Pet");
        assert!(by_id("unknown").is_none());
        assert_eq!(all().len(), 5);
    }

    #[test]
    fn test_edge_ids_follow_gallery_format() {
        let graph = by_id("ramadan-wishes").unwrap().graph().unwrap();
        assert!(graph.edges().iter().any(|e| e.id == "e-tp1-pe1"));
        assert_eq!(graph.edge_count(), 8);
        assert_eq!(graph.node("to1").map(Node::kind), Some(NodeKind::TextOverlay));
    }

    #[test]
    fn test_metadata_serializes_without_builder() {
        let value = serde_json::to_value(by_id("holiday-meme").unwrap()).unwrap();
        assert_eq!(value["id"], "holiday-meme");
        assert!(value.get("build").is_none());
    }

    #[tokio::test]
    async fn test_ai_pet_runs_end_to_end() {
        let runner = PipelineRunner::new(Arc::new(MockExecutor::new()), Arc::new(ExecutionStore::new()));
        let graph = by_id("ai-pet").unwrap().graph().unwrap();

        let result = runner.run_pipeline(&graph).await.unwrap();

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.status_of("ex1"), ExecutionStatus::Done);
        assert!(runner.store().get_node_output("pv1").is_some());
    }

    #[tokio::test]
    async fn test_ramadan_overlay_forwards_image() {
        let runner = PipelineRunner::new(Arc::new(MockExecutor::new()), Arc::new(ExecutionStore::new()));
        let graph = by_id("ramadan-wishes").unwrap().graph().unwrap();

        let result = runner.run_pipeline(&graph).await.unwrap();

        assert!(result.success, "{:?}", result.error);
        let store = runner.store();
        assert_eq!(store.get_node_output("to1"), store.get_node_output("ig1"));
    }
}
