//! Per-kind node configuration.
//!
//! Every config struct deserializes with field-level defaults so a node saved
//! with a partial config still loads.

use serde::{Deserialize, Serialize};

/// Generates the `as_str` accessor for a config option enum.
macro_rules! option_names {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// The wire name of the option.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Free-text seed entered by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextPromptConfig {
    /// The text.
    pub text: String,
    /// Maximum accepted length in characters.
    pub max_length: usize,
    /// Placeholder shown while empty.
    pub placeholder: String,
}

impl Default for TextPromptConfig {
    fn default() -> Self {
        Self {
            text: String::new(),
            max_length: 500,
            placeholder: "Describe what you want to create...".to_string(),
        }
    }
}

impl TextPromptConfig {
    /// Creates a config holding `text`.
    #[must_use]
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// The text truncated to `max_length` characters.
    #[must_use]
    pub fn effective_text(&self) -> String {
        self.text.chars().take(self.max_length).collect()
    }
}

/// A user-supplied reference image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageUploadConfig {
    /// URL of the uploaded image.
    pub preview_url: Option<String>,
    /// Original file name.
    pub file_name: Option<String>,
    /// File size in megabytes.
    pub file_size_mb: Option<f64>,
    /// Upload size limit in megabytes.
    pub max_size_mb: f64,
    /// Width in pixels, 0 when unknown.
    pub width: u32,
    /// Height in pixels, 0 when unknown.
    pub height: u32,
}

impl Default for ImageUploadConfig {
    fn default() -> Self {
        Self {
            preview_url: None,
            file_name: None,
            file_size_mb: None,
            max_size_mb: 10.0,
            width: 0,
            height: 0,
        }
    }
}

/// Built-in pipeline templates a preset node can seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateId {
    /// Ramadan / Lebaran greeting card.
    RamadanWishes,
    /// Festive meme.
    HolidayMeme,
    /// Pet portrait.
    AiPet,
    /// Avatar from a reference photo.
    CustomAvatar,
    /// Empty canvas.
    #[default]
    Blank,
}

option_names!(TemplateId {
    RamadanWishes => "ramadan-wishes",
    HolidayMeme => "holiday-meme",
    AiPet => "ai-pet",
    CustomAvatar => "custom-avatar",
    Blank => "blank",
});

/// UI and prompt locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// Indonesian.
    #[default]
    Id,
    /// English.
    En,
}

option_names!(Locale { Id => "id", En => "en" });

/// Selects a template and locale to seed a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplatePresetConfig {
    /// Selected template.
    pub template: TemplateId,
    /// Selected locale.
    pub locale: Locale,
}

// ---------------------------------------------------------------------------
// Style
// ---------------------------------------------------------------------------

/// Visual art style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtStyle {
    /// Photographic.
    #[default]
    Realistic,
    /// Cartoon.
    Cartoon,
    /// Anime.
    Anime,
    /// Watercolor painting.
    Watercolor,
    /// Pixel art.
    PixelArt,
    /// Islamic geometric art.
    IslamicArt,
    /// Pop art.
    PopArt,
    /// Minimalist.
    Minimalist,
}

option_names!(ArtStyle {
    Realistic => "realistic",
    Cartoon => "cartoon",
    Anime => "anime",
    Watercolor => "watercolor",
    PixelArt => "pixel-art",
    IslamicArt => "islamic-art",
    PopArt => "pop-art",
    Minimalist => "minimalist",
});

/// Emotional mood of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    /// Warm.
    #[default]
    Warm,
    /// Cool.
    Cool,
    /// Playful.
    Playful,
    /// Elegant.
    Elegant,
    /// Spiritual.
    Spiritual,
    /// Funny.
    Funny,
    /// Cute.
    Cute,
}

option_names!(Mood {
    Warm => "warm",
    Cool => "cool",
    Playful => "playful",
    Elegant => "elegant",
    Spiritual => "spiritual",
    Funny => "funny",
    Cute => "cute",
});

/// Cultural or seasonal theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CulturalTheme {
    /// Ramadan.
    Ramadan,
    /// Eid al-Fitr.
    Lebaran,
    /// Christmas.
    Natal,
    /// Lunar New Year.
    Imlek,
    /// No specific holiday.
    General,
}

option_names!(CulturalTheme {
    Ramadan => "ramadan",
    Lebaran => "lebaran",
    Natal => "natal",
    Imlek => "imlek",
    General => "general",
});

/// Style attributes emitted as a `style` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StyleSettings {
    /// Art style.
    pub art_style: ArtStyle,
    /// Palette colors as hex strings.
    pub color_palette: Vec<String>,
    /// Mood.
    pub mood: Mood,
    /// Optional cultural theme.
    pub cultural_theme: Option<CulturalTheme>,
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self {
            art_style: ArtStyle::default(),
            color_palette: vec!["#FFD700".to_string(), "#1B5E20".to_string(), "#FFFFFF".to_string()],
            mood: Mood::default(),
            cultural_theme: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Processing
// ---------------------------------------------------------------------------

/// How far the enhancer may stray from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Creativity {
    /// Stay close to the input.
    Precise,
    /// Moderate embellishment.
    #[default]
    Balanced,
    /// Free embellishment.
    Creative,
}

option_names!(Creativity {
    Precise => "precise",
    Balanced => "balanced",
    Creative => "creative",
});

impl Creativity {
    /// Sampling temperature for the text model.
    #[must_use]
    pub const fn temperature(self) -> f64 {
        match self {
            Self::Precise => 0.3,
            Self::Balanced => 0.7,
            Self::Creative => 1.0,
        }
    }
}

/// What kind of content the prompt is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Greeting cards.
    Wishes,
    /// Memes.
    Meme,
    /// Characters.
    Character,
    /// Avatars.
    Avatar,
    /// Anything else.
    #[default]
    General,
}

option_names!(ContentType {
    Wishes => "wishes",
    Meme => "meme",
    Character => "character",
    Avatar => "avatar",
    General => "general",
});

/// Tone of the enhanced prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    /// Formal.
    Formal,
    /// Casual.
    #[default]
    Casual,
    /// Funny.
    Funny,
    /// Heartfelt.
    Heartfelt,
}

option_names!(Tone {
    Formal => "formal",
    Casual => "casual",
    Funny => "funny",
    Heartfelt => "heartfelt",
});

/// Language of any text that ends up in the generated media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Indonesian.
    #[default]
    Id,
    /// English.
    En,
    /// Indonesian and English.
    Mixed,
}

option_names!(Language { Id => "id", En => "en", Mixed => "mixed" });

/// Configuration of a prompt enhancer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptEnhancerConfig {
    /// Creativity level.
    pub creativity: Creativity,
    /// Target content type.
    pub content_type: ContentType,
    /// Tone.
    pub tone: Tone,
    /// Text language.
    pub language: Language,
}

/// Image generation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageMode {
    /// Prompt only.
    #[default]
    Text2Img,
    /// Prompt plus reference image.
    Img2Img,
}

option_names!(ImageMode { Text2Img => "text2img", Img2Img => "img2img" });

/// Output dimensions for generated images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ImageDimensions {
    /// 1024x1024.
    #[default]
    #[serde(rename = "square-1024")]
    Square1024,
    /// 768x1024.
    #[serde(rename = "portrait-768x1024")]
    Portrait768x1024,
    /// 1024x768.
    #[serde(rename = "landscape-1024x768")]
    Landscape1024x768,
    /// 576x1024.
    #[serde(rename = "story-576x1024")]
    Story576x1024,
}

option_names!(ImageDimensions {
    Square1024 => "square-1024",
    Portrait768x1024 => "portrait-768x1024",
    Landscape1024x768 => "landscape-1024x768",
    Story576x1024 => "story-576x1024",
});

impl ImageDimensions {
    /// Width and height in pixels.
    #[must_use]
    pub const fn size(self) -> (u32, u32) {
        match self {
            Self::Square1024 => (1024, 1024),
            Self::Portrait768x1024 => (768, 1024),
            Self::Landscape1024x768 => (1024, 768),
            Self::Story576x1024 => (576, 1024),
        }
    }

    /// The `W*H` size string used by generation APIs.
    #[must_use]
    pub fn api_size(self) -> String {
        let (width, height) = self.size();
        format!("{width}*{height}")
    }
}

/// Configuration of an image generator node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageGeneratorConfig {
    /// Generation mode.
    pub mode: ImageMode,
    /// Output dimensions.
    pub dimensions: ImageDimensions,
    /// Diffusion steps.
    pub steps: u32,
    /// Fixed seed, random when absent.
    pub seed: Option<i64>,
}

impl Default for ImageGeneratorConfig {
    fn default() -> Self {
        Self {
            mode: ImageMode::default(),
            dimensions: ImageDimensions::default(),
            steps: 30,
            seed: None,
        }
    }
}

/// Video generation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoMode {
    /// Prompt only.
    #[default]
    Text2Video,
    /// Prompt plus reference image.
    Img2Video,
}

option_names!(VideoMode { Text2Video => "text2video", Img2Video => "img2video" });

/// Clip length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VideoDuration {
    /// Three seconds.
    #[serde(rename = "3s")]
    Short,
    /// Five seconds.
    #[default]
    #[serde(rename = "5s")]
    Medium,
    /// Ten seconds.
    #[serde(rename = "10s")]
    Long,
}

option_names!(VideoDuration { Short => "3s", Medium => "5s", Long => "10s" });

impl VideoDuration {
    /// Length in whole seconds.
    #[must_use]
    pub const fn seconds(self) -> u32 {
        match self {
            Self::Short => 3,
            Self::Medium => 5,
            Self::Long => 10,
        }
    }
}

/// Video resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VideoResolution {
    /// 854x480.
    #[serde(rename = "480p")]
    P480,
    /// 1280x720.
    #[default]
    #[serde(rename = "720p")]
    P720,
}

option_names!(VideoResolution { P480 => "480p", P720 => "720p" });

impl VideoResolution {
    /// Width and height in pixels.
    #[must_use]
    pub const fn size(self) -> (u32, u32) {
        match self {
            Self::P480 => (854, 480),
            Self::P720 => (1280, 720),
        }
    }
}

/// Configuration of a video generator node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoGeneratorConfig {
    /// Generation mode.
    pub mode: VideoMode,
    /// Clip length.
    pub duration: VideoDuration,
    /// Output resolution.
    pub resolution: VideoResolution,
    /// Frames per second.
    pub fps: u32,
}

impl Default for VideoGeneratorConfig {
    fn default() -> Self {
        Self {
            mode: VideoMode::default(),
            duration: VideoDuration::default(),
            resolution: VideoResolution::default(),
            fps: 24,
        }
    }
}

/// Caption drawn over visual media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextOverlayConfig {
    /// Caption text.
    pub text: String,
    /// `top`, `center`, `bottom` or `custom`.
    pub position: String,
    /// Font family key.
    pub font: String,
    /// Font size in pixels.
    pub font_size: u32,
    /// Text color.
    pub font_color: String,
    /// Whether to stroke the glyphs.
    pub stroke: bool,
    /// `none`, `shadow`, `glow` or `gradient`.
    pub effect: String,
}

impl Default for TextOverlayConfig {
    fn default() -> Self {
        Self {
            text: String::new(),
            position: "bottom".to_string(),
            font: "inter".to_string(),
            font_size: 48,
            font_color: "#FFFFFF".to_string(),
            stroke: true,
            effect: "shadow".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Framing of the final media for a target platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreviewConfig {
    /// Platform preset, e.g. `ig-square`.
    pub preset: String,
    /// Canvas width.
    pub width: u32,
    /// Canvas height.
    pub height: u32,
    /// `cover`, `contain` or `fill`.
    pub fit: String,
    /// Letterbox color.
    pub background_color: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            preset: "ig-square".to_string(),
            width: 1080,
            height: 1080,
            fit: "cover".to_string(),
            background_color: "#000000".to_string(),
        }
    }
}

/// Export file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// PNG.
    #[default]
    Png,
    /// JPEG.
    Jpg,
    /// WebP.
    Webp,
    /// MP4.
    Mp4,
    /// GIF.
    Gif,
}

option_names!(ExportFormat {
    Png => "png",
    Jpg => "jpg",
    Webp => "webp",
    Mp4 => "mp4",
    Gif => "gif",
});

/// Export settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportConfig {
    /// File format.
    pub format: ExportFormat,
    /// Quality 1-100.
    pub quality: u8,
    /// `download`, `whatsapp` or `clipboard`.
    pub share_target: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::default(),
            quality: 90,
            share_target: "download".to_string(),
        }
    }
}
