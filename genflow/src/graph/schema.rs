//! Port schemas for every node kind.

use super::node::NodeKind;
use crate::ports::{NodePortSchema, PortDefinition, PortType};

const TEXT_OUT: PortDefinition = PortDefinition::required("text", PortType::Text, "Text");
const PROMPT_OUT: PortDefinition = PortDefinition::required("prompt", PortType::Prompt, "Prompt");
const IMAGE_OUT: PortDefinition = PortDefinition::required("image", PortType::Image, "Image");
const VIDEO_OUT: PortDefinition = PortDefinition::required("video", PortType::Video, "Video");
const STYLE_OUT: PortDefinition = PortDefinition::required("style", PortType::Style, "Style");

const STYLE_IN: PortDefinition = PortDefinition::optional("style", PortType::Style, "Style");

static TEXT_PROMPT: NodePortSchema = NodePortSchema {
    inputs: &[],
    outputs: &[TEXT_OUT],
};

static IMAGE_UPLOAD: NodePortSchema = NodePortSchema {
    inputs: &[],
    outputs: &[IMAGE_OUT],
};

static TEMPLATE_PRESET: NodePortSchema = NodePortSchema {
    inputs: &[],
    outputs: &[TEXT_OUT],
};

static STYLE_CONFIG: NodePortSchema = NodePortSchema {
    inputs: &[],
    outputs: &[STYLE_OUT],
};

static PROMPT_ENHANCER: NodePortSchema = NodePortSchema {
    inputs: &[
        PortDefinition::required("text", PortType::Text, "Text"),
        STYLE_IN,
    ],
    outputs: &[PROMPT_OUT],
};

static IMAGE_GENERATOR: NodePortSchema = NodePortSchema {
    inputs: &[
        PortDefinition::required("prompt", PortType::Prompt, "Prompt"),
        STYLE_IN,
        PortDefinition::optional("image", PortType::Image, "Reference Image"),
    ],
    outputs: &[IMAGE_OUT],
};

static VIDEO_GENERATOR: NodePortSchema = NodePortSchema {
    inputs: &[
        PortDefinition::required("prompt", PortType::Prompt, "Prompt"),
        STYLE_IN,
        PortDefinition::optional("image", PortType::Image, "Reference Image"),
    ],
    outputs: &[VIDEO_OUT],
};

static TEXT_OVERLAY: NodePortSchema = NodePortSchema {
    inputs: &[
        PortDefinition::required("image", PortType::Image, "Image"),
        PortDefinition::optional("text", PortType::Text, "Caption"),
    ],
    outputs: &[IMAGE_OUT],
};

static PREVIEW: NodePortSchema = NodePortSchema {
    inputs: &[PortDefinition::required("media", PortType::Media, "Media")],
    outputs: &[],
};

static EXPORT: NodePortSchema = NodePortSchema {
    inputs: &[PortDefinition::required("media", PortType::Media, "Media")],
    outputs: &[],
};

/// Returns the port schema for `kind`.
#[must_use]
pub fn schema_for(kind: NodeKind) -> &'static NodePortSchema {
    match kind {
        NodeKind::TextPrompt => &TEXT_PROMPT,
        NodeKind::ImageUpload => &IMAGE_UPLOAD,
        NodeKind::TemplatePreset => &TEMPLATE_PRESET,
        NodeKind::StyleConfig => &STYLE_CONFIG,
        NodeKind::PromptEnhancer => &PROMPT_ENHANCER,
        NodeKind::ImageGenerator => &IMAGE_GENERATOR,
        NodeKind::VideoGenerator => &VIDEO_GENERATOR,
        NodeKind::TextOverlay => &TEXT_OVERLAY,
        NodeKind::Preview => &PREVIEW,
        NodeKind::Export => &EXPORT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_port_ids_unique_per_direction() {
        for kind in NodeKind::ALL {
            let schema = schema_for(kind);
            let inputs: HashSet<_> = schema.inputs.iter().map(|p| p.id).collect();
            let outputs: HashSet<_> = schema.outputs.iter().map(|p| p.id).collect();
            assert_eq!(inputs.len(), schema.inputs.len(), "{kind} inputs");
            assert_eq!(outputs.len(), schema.outputs.len(), "{kind} outputs");
        }
    }

    #[test]
    fn test_runnable_kinds_have_one_concrete_output() {
        for kind in NodeKind::ALL.into_iter().filter(|k| k.is_runnable()) {
            let schema = schema_for(kind);
            assert_eq!(schema.outputs.len(), 1);
            assert_ne!(schema.outputs[0].port_type, PortType::Media);
        }
    }

    #[test]
    fn test_sinks_have_no_outputs() {
        for kind in [NodeKind::Preview, NodeKind::Export] {
            assert!(schema_for(kind).outputs.is_empty(), "{kind}");
            assert_eq!(schema_for(kind).inputs[0].port_type, PortType::Media);
        }
    }

    #[test]
    fn test_generators_require_prompt() {
        for kind in [NodeKind::ImageGenerator, NodeKind::VideoGenerator] {
            let required: Vec<_> = schema_for(kind).required_inputs().map(|p| p.id).collect();
            assert_eq!(required, vec!["prompt"]);
        }
    }
}
