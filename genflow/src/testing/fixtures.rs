//! Node and graph fixtures.

use crate::graph::{Edge, Node, NodeConfig, NodeKind, PipelineGraph, StyleSettings, TextPromptConfig};

/// A text prompt node holding `text`.
#[must_use]
pub fn text_prompt(id: &str, text: &str) -> Node {
    Node::new(id, NodeConfig::TextPrompt(TextPromptConfig::with_text(text)))
}

/// A style config node with default settings.
#[must_use]
pub fn style_config(id: &str) -> Node {
    Node::new(id, NodeConfig::StyleConfig(StyleSettings::default()))
}

/// A prompt enhancer node with default settings.
#[must_use]
pub fn prompt_enhancer(id: &str) -> Node {
    Node::with_defaults(id, NodeKind::PromptEnhancer)
}

/// An image generator node with default settings.
#[must_use]
pub fn image_generator(id: &str) -> Node {
    Node::with_defaults(id, NodeKind::ImageGenerator)
}

/// A video generator node with default settings.
#[must_use]
pub fn video_generator(id: &str) -> Node {
    Node::with_defaults(id, NodeKind::VideoGenerator)
}

/// A preview node with default settings.
#[must_use]
pub fn preview(id: &str) -> Node {
    Node::with_defaults(id, NodeKind::Preview)
}

/// An export node with default settings.
#[must_use]
pub fn export(id: &str) -> Node {
    Node::with_defaults(id, NodeKind::Export)
}

/// `A (textPrompt) → B (promptEnhancer) → C (imageGenerator)`.
#[must_use]
pub fn linear_chain() -> PipelineGraph {
    graph(
        vec![
            text_prompt("A", "kucing oren lucu"),
            prompt_enhancer("B"),
            image_generator("C"),
        ],
        vec![
            Edge::new("A", "text", "B", "text"),
            Edge::new("B", "prompt", "C", "prompt"),
        ],
    )
}

/// Text and style feeding an enhancer, then an image shown and exported.
#[must_use]
pub fn image_pipeline() -> PipelineGraph {
    graph(
        vec![
            text_prompt("txt1", "kucing oren lucu"),
            style_config("sc1"),
            prompt_enhancer("pe1"),
            image_generator("ig1"),
            preview("pv1"),
            export("ex1"),
        ],
        vec![
            Edge::new("txt1", "text", "pe1", "text"),
            Edge::new("sc1", "style", "pe1", "style"),
            Edge::new("pe1", "prompt", "ig1", "prompt"),
            Edge::new("sc1", "style", "ig1", "style"),
            Edge::new("ig1", "image", "pv1", "media"),
            Edge::new("ig1", "image", "ex1", "media"),
        ],
    )
}

/// Builds a graph from fixture parts.
///
/// # Panics
///
/// Panics if two nodes share an id.
#[must_use]
pub fn graph(nodes: Vec<Node>, edges: Vec<Edge>) -> PipelineGraph {
    match PipelineGraph::new(nodes, edges) {
        Ok(graph) => graph,
        Err(err) => panic!("invalid fixture graph: {err}"),
    }
}
