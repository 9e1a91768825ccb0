//! Fal wire schemas.

use serde::{Deserialize, Serialize};

use vgen_models::{AspectRatio, ExternalRef, GenerationRequest, VideoDuration};

/// Body for the hosted text-to-video endpoint.
#[derive(Debug, Serialize)]
pub struct FalTextToVideoRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub duration: VideoDuration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    pub cfg_scale: f64,
}

impl FalTextToVideoRequest {
    pub fn from_request(req: &GenerationRequest) -> Self {
        Self {
            prompt: req.prompt.clone().unwrap_or_default(),
            aspect_ratio: req.aspect_ratio,
            duration: req.duration,
            negative_prompt: req.negative_prompt.clone(),
            cfg_scale: req.cfg_scale,
        }
    }
}

/// Body for the hosted image-to-video endpoint. Images are referenced by
/// CDN URL, never inlined.
#[derive(Debug, Serialize)]
pub struct FalImageToVideoRequest {
    pub prompt: String,
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tail_image_url: Option<String>,
    pub duration: VideoDuration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    pub cfg_scale: f64,
}

impl FalImageToVideoRequest {
    pub fn from_request(
        req: &GenerationRequest,
        image_url: String,
        tail_image_url: Option<String>,
    ) -> Self {
        Self {
            prompt: req
                .prompt
                .clone()
                .unwrap_or_else(|| "Animate image".to_string()),
            image_url,
            tail_image_url,
            duration: req.duration,
            negative_prompt: req.negative_prompt.clone(),
            cfg_scale: req.cfg_scale,
        }
    }
}

/// Body for the hosted elements (multi-image) endpoint.
#[derive(Debug, Serialize)]
pub struct FalElementsRequest {
    pub prompt: String,
    pub input_image_urls: Vec<String>,
    pub duration: VideoDuration,
    pub aspect_ratio: AspectRatio,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
}

impl FalElementsRequest {
    pub fn from_request(req: &GenerationRequest, input_image_urls: Vec<String>) -> Self {
        Self {
            prompt: req
                .prompt
                .clone()
                .unwrap_or_else(|| "Animate image".to_string()),
            input_image_urls,
            duration: req.duration,
            aspect_ratio: req.aspect_ratio,
            negative_prompt: req.negative_prompt.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FalVideo {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct FalPayload {
    pub video: FalVideo,
}

/// Queue submission response, also the callback payload shape.
#[derive(Debug, Deserialize)]
pub struct FalGenerateResponse {
    pub request_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub payload: Option<FalPayload>,
}

impl FalGenerateResponse {
    /// Normalize into the provider-agnostic submission result.
    pub fn to_external_ref(&self) -> ExternalRef {
        ExternalRef {
            external_id: self.request_id.clone(),
            status: self
                .status
                .clone()
                .unwrap_or_else(|| "SENDED".to_string()),
            task_id: None,
            error: self.error.clone(),
            result_url: self.payload.as_ref().map(|p| p.video.url.clone()),
        }
    }
}

/// Response of the CDN storage-auth endpoint.
#[derive(Debug, Deserialize)]
pub struct FalCdnToken {
    pub token_type: String,
    pub token: String,
}

/// Response of the CDN upload endpoint.
#[derive(Debug, Deserialize)]
pub struct FalUploadResponse {
    pub access_url: String,
}
