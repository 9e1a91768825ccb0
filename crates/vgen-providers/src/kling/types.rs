//! Kling wire schemas.

use serde::{Deserialize, Serialize};

use vgen_models::{AspectRatio, ExternalRef, GenerationRequest, VideoDuration};

pub(crate) const DEFAULT_MODEL: &str = "kling-v1";

/// Body for `/v1/videos/text2video`.
#[derive(Debug, Serialize)]
pub struct KlingTextToVideoRequest {
    pub model_name: &'static str,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    pub cfg_scale: f64,
    pub mode: &'static str,
    pub aspect_ratio: AspectRatio,
    pub duration: VideoDuration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_task_id: Option<String>,
}

impl KlingTextToVideoRequest {
    pub fn from_request(req: &GenerationRequest) -> Self {
        Self {
            model_name: DEFAULT_MODEL,
            prompt: req.prompt.clone().unwrap_or_default(),
            negative_prompt: req.negative_prompt.clone(),
            cfg_scale: req.cfg_scale,
            mode: "std",
            aspect_ratio: req.aspect_ratio,
            duration: req.duration,
            callback_url: req.callback_url.clone(),
            external_task_id: req.external_task_id.clone(),
        }
    }
}

/// Body for `/v1/videos/image2video`. Images travel inline as base64.
#[derive(Debug, Serialize)]
pub struct KlingImageToVideoRequest {
    pub model_name: &'static str,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_tail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    pub cfg_scale: f64,
    pub mode: &'static str,
    pub duration: VideoDuration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_task_id: Option<String>,
}

impl KlingImageToVideoRequest {
    pub fn from_request(req: &GenerationRequest, image: String, image_tail: Option<String>) -> Self {
        Self {
            model_name: DEFAULT_MODEL,
            image,
            image_tail,
            prompt: req.prompt.clone(),
            negative_prompt: req.negative_prompt.clone(),
            cfg_scale: req.cfg_scale,
            mode: "std",
            duration: req.duration,
            callback_url: req.callback_url.clone(),
            external_task_id: req.external_task_id.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct KlingImageListItem {
    pub image: String,
}

/// Body for `/v1/videos/multi-image2video`.
#[derive(Debug, Serialize)]
pub struct KlingMultiImageToVideoRequest {
    pub model_name: &'static str,
    pub image_list: Vec<KlingImageListItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    pub cfg_scale: f64,
    pub mode: &'static str,
    pub duration: VideoDuration,
    pub aspect_ratio: AspectRatio,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_task_id: Option<String>,
}

impl KlingMultiImageToVideoRequest {
    pub fn from_request(req: &GenerationRequest, images: Vec<String>) -> Self {
        Self {
            model_name: DEFAULT_MODEL,
            image_list: images.into_iter().map(|image| KlingImageListItem { image }).collect(),
            prompt: req.prompt.clone(),
            negative_prompt: req.negative_prompt.clone(),
            cfg_scale: req.cfg_scale,
            mode: "std",
            duration: req.duration,
            aspect_ratio: req.aspect_ratio,
            callback_url: req.callback_url.clone(),
            external_task_id: req.external_task_id.clone(),
        }
    }
}

/// Kling job status as reported in responses and callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KlingTaskStatus {
    Submitted,
    Processing,
    Succeed,
    Failed,
}

impl KlingTaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KlingTaskStatus::Submitted => "submitted",
            KlingTaskStatus::Processing => "processing",
            KlingTaskStatus::Succeed => "succeed",
            KlingTaskStatus::Failed => "failed",
        }
    }
}

// Kling body codes that indicate account/balance exhaustion (1100-1103)
// and parameter validation failure (1200-1203).
pub(crate) fn is_quota_code(code: i64) -> bool {
    (1100..=1103).contains(&code) || (1000..=1004).contains(&code)
}

pub(crate) fn is_validation_code(code: i64) -> bool {
    (1200..=1203).contains(&code)
}

#[derive(Debug, Deserialize)]
pub struct KlingVideo {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct KlingTaskResult {
    pub videos: Vec<KlingVideo>,
}

#[derive(Debug, Deserialize)]
pub struct KlingTaskInfo {
    pub external_task_id: Option<String>,
}

/// The `data` object of submit responses; callbacks deliver it bare.
#[derive(Debug, Deserialize)]
pub struct KlingCallbackPayload {
    pub task_id: String,
    pub task_status: KlingTaskStatus,
    /// Failure reason when the task fails (e.g. content risk control)
    #[serde(default)]
    pub task_status_msg: Option<String>,
    #[serde(default)]
    pub task_info: Option<KlingTaskInfo>,
    #[serde(default)]
    pub task_result: Option<KlingTaskResult>,
}

/// Envelope of synchronous API responses.
#[derive(Debug, Deserialize)]
pub struct KlingResponse {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub request_id: Option<String>,
    pub data: Option<KlingCallbackPayload>,
}

impl KlingCallbackPayload {
    /// Normalize into the provider-agnostic submission result.
    pub fn to_external_ref(&self) -> ExternalRef {
        ExternalRef {
            external_id: self.task_id.clone(),
            status: self.task_status.as_str().to_string(),
            task_id: self
                .task_info
                .as_ref()
                .and_then(|info| info.external_task_id.as_deref())
                .and_then(|id| id.parse().ok()),
            error: self.task_status_msg.clone(),
            result_url: self
                .task_result
                .as_ref()
                .and_then(|r| r.videos.first())
                .map(|v| v.url.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_payload_parses_and_normalizes() {
        let payload: KlingCallbackPayload = serde_json::from_value(serde_json::json!({
            "task_id": "CjikY2gHPbcAAAAABlkE-w",
            "task_status": "succeed",
            "task_info": {"external_task_id": "17"},
            "created_at": 1747233384021u64,
            "updated_at": 1747233384021u64,
            "task_result": {"videos": [{"id": "v1", "url": "https://cdn.kling.test/v1.mp4", "duration": "5"}]}
        }))
        .unwrap();

        let ext = payload.to_external_ref();
        assert_eq!(ext.external_id, "CjikY2gHPbcAAAAABlkE-w");
        assert_eq!(ext.status, "succeed");
        assert_eq!(ext.task_id, Some(17));
        assert_eq!(ext.result_url.as_deref(), Some("https://cdn.kling.test/v1.mp4"));
    }

    #[test]
    fn test_non_numeric_external_task_id_ignored() {
        let payload: KlingCallbackPayload = serde_json::from_value(serde_json::json!({
            "task_id": "t",
            "task_status": "submitted",
            "task_info": {"external_task_id": "not-a-number"}
        }))
        .unwrap();
        assert_eq!(payload.to_external_ref().task_id, None);
    }

    #[test]
    fn test_request_serialization_omits_absent_fields() {
        let req = KlingTextToVideoRequest::from_request(&GenerationRequest::from_prompt("a cat"));
        let value = serde_json::to_value(&req).unwrap();

        assert_eq!(value["prompt"], "a cat");
        assert_eq!(value["duration"], "5");
        assert_eq!(value["aspect_ratio"], "16:9");
        assert!(value.get("callback_url").is_none());
        assert!(value.get("negative_prompt").is_none());
    }

    #[test]
    fn test_code_classification() {
        assert!(is_quota_code(1101));
        assert!(is_quota_code(1002));
        assert!(is_validation_code(1201));
        assert!(!is_quota_code(0));
        assert!(!is_validation_code(5000));
    }
}
