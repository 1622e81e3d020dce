//! Typed node outputs.
//!
//! On the wire an output is `{ "type": <port type>, "data": {...}, "timestamp": <ms> }`.
//! The payload shape is fixed by the type tag; `media` is an input-only
//! abstraction and is never the type of a produced output.

use crate::ports::PortType;
use crate::utils::now_millis;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Payload of a `text` output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextData {
    /// The text.
    pub text: String,
}

/// Payload of a `prompt` output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptData {
    /// The positive prompt.
    pub prompt: String,
    /// What the generator should avoid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
}

/// Payload of an `image` output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    /// Where the image can be fetched.
    pub url: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Payload of a `video` output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoData {
    /// Where the video can be fetched.
    pub url: String,
    /// Duration in seconds.
    pub duration: f64,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Payload of a `style` output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleData {
    /// Art style name, e.g. `watercolor`.
    pub art_style: String,
    /// Palette colors as hex strings.
    #[serde(default)]
    pub color_palette: Vec<String>,
    /// Mood name, e.g. `warm`.
    pub mood: String,
    /// Optional cultural theme, e.g. `ramadan`.
    #[serde(default)]
    pub cultural_theme: Option<String>,
}

/// The data carried by an output, discriminated by port type.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Plain text.
    Text(TextData),
    /// Prompt with optional negative prompt.
    Prompt(PromptData),
    /// Image reference.
    Image(ImageData),
    /// Video reference.
    Video(VideoData),
    /// Style description.
    Style(StyleData),
}

impl Payload {
    /// The port type tagging this payload.
    #[must_use]
    pub const fn port_type(&self) -> PortType {
        match self {
            Self::Text(_) => PortType::Text,
            Self::Prompt(_) => PortType::Prompt,
            Self::Image(_) => PortType::Image,
            Self::Video(_) => PortType::Video,
            Self::Style(_) => PortType::Style,
        }
    }
}

/// A value produced by a node.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawNodeOutput")]
pub struct NodeOutput {
    /// The typed payload.
    pub payload: Payload,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl NodeOutput {
    /// Wraps a payload, stamping it with the current time.
    #[must_use]
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            timestamp: now_millis(),
        }
    }

    /// Creates a text output.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Payload::Text(TextData { text: text.into() }))
    }

    /// Creates a prompt output.
    #[must_use]
    pub fn prompt(prompt: impl Into<String>, negative_prompt: Option<String>) -> Self {
        Self::new(Payload::Prompt(PromptData {
            prompt: prompt.into(),
            negative_prompt,
        }))
    }

    /// Creates an image output.
    #[must_use]
    pub fn image(url: impl Into<String>, width: u32, height: u32) -> Self {
        Self::new(Payload::Image(ImageData {
            url: url.into(),
            width,
            height,
        }))
    }

    /// Creates a video output.
    #[must_use]
    pub fn video(url: impl Into<String>, duration: f64, width: u32, height: u32) -> Self {
        Self::new(Payload::Video(VideoData {
            url: url.into(),
            duration,
            width,
            height,
        }))
    }

    /// Creates a style output.
    #[must_use]
    pub fn style(style: StyleData) -> Self {
        Self::new(Payload::Style(style))
    }

    /// The port type of the payload.
    #[must_use]
    pub const fn port_type(&self) -> PortType {
        self.payload.port_type()
    }

    /// Returns the text payload, if this is a text output.
    #[must_use]
    pub const fn as_text(&self) -> Option<&TextData> {
        match &self.payload {
            Payload::Text(data) => Some(data),
            _ => None,
        }
    }

    /// Returns the prompt payload, if this is a prompt output.
    #[must_use]
    pub const fn as_prompt(&self) -> Option<&PromptData> {
        match &self.payload {
            Payload::Prompt(data) => Some(data),
            _ => None,
        }
    }

    /// Returns the image payload, if this is an image output.
    #[must_use]
    pub const fn as_image(&self) -> Option<&ImageData> {
        match &self.payload {
            Payload::Image(data) => Some(data),
            _ => None,
        }
    }

    /// Returns the video payload, if this is a video output.
    #[must_use]
    pub const fn as_video(&self) -> Option<&VideoData> {
        match &self.payload {
            Payload::Video(data) => Some(data),
            _ => None,
        }
    }

    /// Returns the style payload, if this is a style output.
    #[must_use]
    pub const fn as_style(&self) -> Option<&StyleData> {
        match &self.payload {
            Payload::Style(data) => Some(data),
            _ => None,
        }
    }

    /// A URL to visual media, if the output is an image or video.
    #[must_use]
    pub fn media_url(&self) -> Option<&str> {
        match &self.payload {
            Payload::Image(data) => Some(&data.url),
            Payload::Video(data) => Some(&data.url),
            _ => None,
        }
    }
}

impl Serialize for NodeOutput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("NodeOutput", 3)?;
        state.serialize_field("type", &self.port_type())?;
        match &self.payload {
            Payload::Text(data) => state.serialize_field("data", data)?,
            Payload::Prompt(data) => state.serialize_field("data", data)?,
            Payload::Image(data) => state.serialize_field("data", data)?,
            Payload::Video(data) => state.serialize_field("data", data)?,
            Payload::Style(data) => state.serialize_field("data", data)?,
        }
        state.serialize_field("timestamp", &self.timestamp)?;
        state.end()
    }
}

/// Error decoding a [`NodeOutput`] from its wire form.
#[derive(Debug, Error)]
pub enum OutputDecodeError {
    /// `media` was used as a concrete output type.
    #[error("'media' is not a concrete output type")]
    AbstractType,

    /// The data did not match the shape required by the type.
    #[error("invalid {port_type} payload: {source}")]
    Payload {
        /// Declared type.
        port_type: PortType,
        /// Underlying decode error.
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct RawNodeOutput {
    #[serde(rename = "type")]
    port_type: PortType,
    data: serde_json::Value,
    #[serde(default)]
    timestamp: i64,
}

impl TryFrom<RawNodeOutput> for NodeOutput {
    type Error = OutputDecodeError;

    fn try_from(raw: RawNodeOutput) -> Result<Self, Self::Error> {
        fn decode<T: serde::de::DeserializeOwned>(
            port_type: PortType,
            data: serde_json::Value,
        ) -> Result<T, OutputDecodeError> {
            serde_json::from_value(data).map_err(|source| OutputDecodeError::Payload { port_type, source })
        }

        let payload = match raw.port_type {
            PortType::Text => Payload::Text(decode(raw.port_type, raw.data)?),
            PortType::Prompt => Payload::Prompt(decode(raw.port_type, raw.data)?),
            PortType::Image => Payload::Image(decode(raw.port_type, raw.data)?),
            PortType::Video => Payload::Video(decode(raw.port_type, raw.data)?),
            PortType::Style => Payload::Style(decode(raw.port_type, raw.data)?),
            PortType::Media => return Err(OutputDecodeError::AbstractType),
        };

        Ok(Self {
            payload,
            timestamp: raw.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_prompt_wire_shape() {
        let mut output = NodeOutput::prompt("a cat", Some("blurry".to_string()));
        output.timestamp = 42;

        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "prompt",
                "data": { "prompt": "a cat", "negativePrompt": "blurry" },
                "timestamp": 42
            })
        );
    }

    #[test]
    fn test_decode_image_output() {
        let output: NodeOutput = serde_json::from_value(json!({
            "type": "image",
            "data": { "url": "https://cdn/x.png", "width": 1024, "height": 768 },
            "timestamp": 1
        }))
        .unwrap();

        assert_eq!(output.port_type(), PortType::Image);
        let image = output.as_image().unwrap();
        assert_eq!(image.width, 1024);
        assert_eq!(output.media_url(), Some("https://cdn/x.png"));
    }

    #[test]
    fn test_decode_rejects_media_type() {
        let result: Result<NodeOutput, _> = serde_json::from_value(json!({
            "type": "media",
            "data": { "url": "x" },
            "timestamp": 1
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_rejects_mismatched_payload() {
        let result: Result<NodeOutput, _> = serde_json::from_value(json!({
            "type": "video",
            "data": { "text": "not a video" },
            "timestamp": 1
        }));
        let message = result.unwrap_err().to_string();
        assert!(message.contains("invalid video payload"), "{message}");
    }

    #[test]
    fn test_style_null_theme_is_preserved() {
        let output = NodeOutput::style(StyleData {
            art_style: "anime".to_string(),
            color_palette: vec!["#fff".to_string()],
            mood: "cute".to_string(),
            cultural_theme: None,
        });
        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["data"]["culturalTheme"], serde_json::Value::Null);

        let back: NodeOutput = serde_json::from_value(value).unwrap();
        assert_eq!(back, output);
    }

    #[test]
    fn test_wire_round_trip_keeps_type_and_data() {
        let cases = [
            json!({ "type": "text", "data": { "text": "Selamat berbuka" }, "timestamp": 7 }),
            json!({ "type": "prompt", "data": { "prompt": "a cat" }, "timestamp": 7 }),
            json!({
                "type": "prompt",
                "data": { "prompt": "a cat", "negativePrompt": "blurry" },
                "timestamp": 7
            }),
            json!({
                "type": "image",
                "data": { "url": "https://cdn/x.png", "width": 1024, "height": 1024 },
                "timestamp": 7
            }),
            json!({
                "type": "video",
                "data": { "url": "https://cdn/x.mp4", "duration": 5.0, "width": 1280, "height": 720 },
                "timestamp": 7
            }),
            json!({
                "type": "style",
                "data": {
                    "artStyle": "watercolor",
                    "colorPalette": ["#1a5f3c", "#d4af37"],
                    "mood": "warm",
                    "culturalTheme": "ramadan"
                },
                "timestamp": 7
            }),
        ];

        for wire in cases {
            let output: NodeOutput = serde_json::from_value(wire.clone()).unwrap();
            assert_eq!(serde_json::to_value(&output).unwrap(), wire);
        }
    }

    #[test]
    fn test_accessors_are_exclusive() {
        let output = NodeOutput::text("hello");
        assert!(output.as_text().is_some());
        assert!(output.as_prompt().is_none());
        assert!(output.media_url().is_none());
        assert!(output.timestamp > 0);
    }
}
