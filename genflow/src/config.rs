//! Runtime configuration.
//!
//! Values come from serde defaults, optionally overlaid by a JSON file and
//! then by environment variables:
//!
//! | Variable | Field |
//! |---|---|
//! | `GENFLOW_API_BASE` | `api_base_url` |
//! | `GENFLOW_REQUEST_TIMEOUT_SECS` | `request_timeout_secs` |
//! | `DASHSCOPE_API_KEY` | `dashscope.api_key` |
//! | `DASHSCOPE_BASE_URL` | `dashscope.base_url` |

use crate::errors::ConfigError;
use crate::jobs::PollPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default node API base URL.
pub const DEFAULT_API_BASE: &str = "http://localhost:3000/api/node";
/// Default DashScope API base URL.
pub const DEFAULT_DASHSCOPE_BASE: &str = "https://dashscope.aliyuncs.com/api/v1";

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

const fn default_timeout_secs() -> u64 {
    120
}

fn default_dashscope_base() -> String {
    DEFAULT_DASHSCOPE_BASE.to_string()
}

fn default_text_model() -> String {
    "qwen-max".to_string()
}

fn default_media_model() -> String {
    "wanx-v1".to_string()
}

fn default_video_poll() -> PollPolicy {
    PollPolicy::video()
}

/// Credentials and models for the DashScope generation service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashScopeConfig {
    /// API base URL.
    #[serde(default = "default_dashscope_base")]
    pub base_url: String,
    /// Bearer token. Required only when the DashScope client is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Text model for prompt enhancement.
    #[serde(default = "default_text_model")]
    pub text_model: String,
    /// Image model.
    #[serde(default = "default_media_model")]
    pub image_model: String,
    /// Video model.
    #[serde(default = "default_media_model")]
    pub video_model: String,
}

impl Default for DashScopeConfig {
    fn default() -> Self {
        Self {
            base_url: default_dashscope_base(),
            api_key: None,
            text_model: default_text_model(),
            image_model: default_media_model(),
            video_model: default_media_model(),
        }
    }
}

// The key never reaches logs.
impl std::fmt::Debug for DashScopeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashScopeConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .field("video_model", &self.video_model)
            .finish()
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenflowConfig {
    /// Base URL of the node API used by the HTTP executor.
    #[serde(default = "default_api_base")]
    pub api_base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// DashScope settings.
    #[serde(default)]
    pub dashscope: DashScopeConfig,
    /// Poll budget for image tasks.
    #[serde(default)]
    pub image_poll: PollPolicy,
    /// Poll budget for video tasks.
    #[serde(default = "default_video_poll")]
    pub video_poll: PollPolicy,
}

impl Default for GenflowConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base(),
            request_timeout_secs: default_timeout_secs(),
            dashscope: DashScopeConfig::default(),
            image_poll: PollPolicy::image(),
            video_poll: PollPolicy::video(),
        }
    }
}

impl GenflowConfig {
    /// Creates a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the node API base URL.
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Sets the DashScope API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.dashscope.api_key = Some(key.into());
        self
    }

    /// Sets the image poll policy.
    #[must_use]
    pub fn with_image_poll(mut self, policy: PollPolicy) -> Self {
        self.image_poll = policy;
        self
    }

    /// Sets the video poll policy.
    #[must_use]
    pub fn with_video_poll(mut self, policy: PollPolicy) -> Self {
        self.video_poll = policy;
        self
    }

    /// The request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Loads a JSON config file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a config from defaults and the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable holds an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlays values returned by `lookup` for the known variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a value is invalid.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup("GENFLOW_API_BASE") {
            self.api_base_url = url;
        }
        if let Some(secs) = lookup("GENFLOW_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = secs
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid("GENFLOW_REQUEST_TIMEOUT_SECS", format!("{e}")))?;
        }
        if let Some(key) = lookup("DASHSCOPE_API_KEY") {
            self.dashscope.api_key = Some(key);
        }
        if let Some(url) = lookup("DASHSCOPE_BASE_URL") {
            self.dashscope.base_url = url;
        }
        self.validate()
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_http_url(&self.api_base_url) {
            return Err(ConfigError::invalid("api_base_url", "must be an http(s) URL"));
        }
        if !is_http_url(&self.dashscope.base_url) {
            return Err(ConfigError::invalid("dashscope.base_url", "must be an http(s) URL"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::invalid("request_timeout_secs", "must be positive"));
        }
        for (key, policy) in [("image_poll", &self.image_poll), ("video_poll", &self.video_poll)] {
            if policy.max_attempts == 0 {
                return Err(ConfigError::invalid(
                    format!("{key}.max_attempts"),
                    "must be positive",
                ));
            }
        }
        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
