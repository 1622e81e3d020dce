//! Port types and the connection compatibility matrix.
//!
//! Every node declares typed input and output ports. An edge may only join an
//! output port to an input port when the pair satisfies [`is_connection_valid`].
//! `media` is a generic sink for visual artifacts; every other type is
//! exact-match only.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The semantic kind of data carried across a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortType {
    /// Plain text.
    Text,
    /// A generation prompt with optional negative prompt.
    Prompt,
    /// An image reference.
    Image,
    /// A video reference.
    Video,
    /// A style description.
    Style,
    /// Any visual artifact (image or video).
    Media,
}

impl PortType {
    /// All port types.
    pub const ALL: [Self; 6] = [
        Self::Text,
        Self::Prompt,
        Self::Image,
        Self::Video,
        Self::Style,
        Self::Media,
    ];

    /// The target port types a source port of this type may connect into.
    #[must_use]
    pub const fn accepted_targets(self) -> &'static [Self] {
        match self {
            Self::Text => &[Self::Text],
            Self::Prompt => &[Self::Prompt],
            Self::Image => &[Self::Image, Self::Media],
            Self::Video => &[Self::Video, Self::Media],
            Self::Style => &[Self::Style],
            Self::Media => &[Self::Media],
        }
    }

    /// Returns true if a source port of this type may feed `target`.
    #[must_use]
    pub fn can_connect_to(self, target: Self) -> bool {
        self.accepted_targets().contains(&target)
    }

    /// Returns the wire name of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Prompt => "prompt",
            Self::Image => "image",
            Self::Video => "video",
            Self::Style => "style",
            Self::Media => "media",
        }
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PortType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown port type '{s}'"))
    }
}

/// Checks whether a connection from `source` to `target` is allowed.
#[must_use]
pub fn is_connection_valid(source: PortType, target: PortType) -> bool {
    source.can_connect_to(target)
}

/// A declared port on a node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortDefinition {
    /// Identifier, unique within the node's input or output list.
    pub id: &'static str,
    /// The data kind carried by the port.
    #[serde(rename = "type")]
    pub port_type: PortType,
    /// Human-readable label.
    pub label: &'static str,
    /// Whether execution requires a value on this port.
    pub required: bool,
}

impl PortDefinition {
    /// Declares a required port.
    #[must_use]
    pub const fn required(id: &'static str, port_type: PortType, label: &'static str) -> Self {
        Self {
            id,
            port_type,
            label,
            required: true,
        }
    }

    /// Declares an optional port.
    #[must_use]
    pub const fn optional(id: &'static str, port_type: PortType, label: &'static str) -> Self {
        Self {
            id,
            port_type,
            label,
            required: false,
        }
    }
}

/// The ordered input and output ports of one node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodePortSchema {
    /// Input ports in declaration order.
    pub inputs: &'static [PortDefinition],
    /// Output ports in declaration order.
    pub outputs: &'static [PortDefinition],
}

impl NodePortSchema {
    /// Looks up an input port by id.
    #[must_use]
    pub fn input(&self, id: &str) -> Option<&'static PortDefinition> {
        self.inputs.iter().find(|p| p.id == id)
    }

    /// Looks up an output port by id.
    #[must_use]
    pub fn output(&self, id: &str) -> Option<&'static PortDefinition> {
        self.outputs.iter().find(|p| p.id == id)
    }

    /// Iterates over the required input ports.
    pub fn required_inputs(&self) -> impl Iterator<Item = &'static PortDefinition> {
        self.inputs.iter().filter(|p| p.required)
    }

    /// The type of the primary (first) output port, if any.
    #[must_use]
    pub fn primary_output_type(&self) -> Option<PortType> {
        self.outputs.first().map(|p| p.port_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_to_media_is_valid() {
        assert!(is_connection_valid(PortType::Image, PortType::Media));
        assert!(is_connection_valid(PortType::Video, PortType::Media));
    }

    #[test]
    fn test_media_to_image_is_invalid() {
        assert!(!is_connection_valid(PortType::Media, PortType::Image));
        assert!(!is_connection_valid(PortType::Media, PortType::Video));
    }

    #[test]
    fn test_every_type_is_self_compatible() {
        for t in PortType::ALL {
            assert!(is_connection_valid(t, t), "{t} should accept itself");
        }
    }

    #[test]
    fn test_exact_match_types_reject_others() {
        for source in [PortType::Text, PortType::Prompt, PortType::Style] {
            for target in PortType::ALL {
                assert_eq!(is_connection_valid(source, target), source == target);
            }
        }
    }

    #[test]
    fn test_port_type_round_trips_through_str() {
        for t in PortType::ALL {
            assert_eq!(t.as_str().parse::<PortType>(), Ok(t));
        }
        assert!("audio".parse::<PortType>().is_err());
    }

    #[test]
    fn test_port_type_serialize() {
        let json = serde_json::to_string(&PortType::Prompt).unwrap();
        assert_eq!(json, r#""prompt""#);
    }

    #[test]
    fn test_schema_lookup() {
        const INPUTS: &[PortDefinition] = &[
            PortDefinition::required("prompt", PortType::Prompt, "Prompt"),
            PortDefinition::optional("style", PortType::Style, "Style"),
        ];
        const OUTPUTS: &[PortDefinition] = &[PortDefinition::required("image", PortType::Image, "Image")];
        let schema = NodePortSchema {
            inputs: INPUTS,
            outputs: OUTPUTS,
        };

        assert_eq!(schema.input("style").map(|p| p.port_type), Some(PortType::Style));
        assert!(schema.input("image").is_none());
        assert_eq!(schema.required_inputs().count(), 1);
        assert_eq!(schema.primary_output_type(), Some(PortType::Image));
    }
}
