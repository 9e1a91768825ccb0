//! Normalized generation request parameters.
//!
//! Handlers map inbound payloads into [`GenerationRequest`]; each provider
//! adapter maps it onto its own wire schema.

use serde::{Deserialize, Serialize};

/// Output aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Wide,
    #[serde(rename = "9:16")]
    Tall,
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Wide => "16:9",
            AspectRatio::Tall => "9:16",
            AspectRatio::Square => "1:1",
        }
    }
}

/// Generated clip length in seconds. Providers accept exactly two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VideoDuration {
    #[default]
    #[serde(rename = "5")]
    Short,
    #[serde(rename = "10")]
    Long,
}

/// Provider-agnostic submission parameters for one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Generation instruction; required for text-to-video
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    /// Prompt adherence, (0, 1); providers default to 0.5
    #[serde(default = "default_cfg_scale")]
    pub cfg_scale: f64,
    #[serde(default)]
    pub duration: VideoDuration,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    /// Where the provider should deliver its callback (this service's
    /// `/webhook/{task_id}` endpoint); filled in by the orchestrator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    /// Our task id, echoed back by providers that support it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_task_id: Option<String>,
}

fn default_cfg_scale() -> f64 {
    0.5
}

impl GenerationRequest {
    /// Request carrying only a prompt, with provider defaults elsewhere.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            ..Default::default()
        }
    }
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            prompt: None,
            negative_prompt: None,
            cfg_scale: default_cfg_scale(),
            duration: VideoDuration::default(),
            aspect_ratio: AspectRatio::default(),
            callback_url: None,
            external_task_id: None,
        }
    }
}
