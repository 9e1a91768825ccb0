//! Kling API adapter.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use vgen_models::{ExternalRef, GenerationRequest, ProviderKind};

use crate::error::{ProviderError, ProviderResult};
use crate::kling::token::SignedTokenCache;
use crate::kling::types::{
    is_quota_code, is_validation_code, KlingCallbackPayload, KlingImageToVideoRequest,
    KlingMultiImageToVideoRequest, KlingResponse, KlingTaskStatus, KlingTextToVideoRequest,
};
use crate::VideoProvider;

/// Configuration for the Kling adapter.
#[derive(Debug, Clone)]
pub struct KlingConfig {
    /// Access key, used as the `iss` claim of signed tokens
    pub access_key: String,
    /// Secret key the tokens are signed with
    pub secret_key: String,
    /// API base URL
    pub base_url: String,
    /// Outbound request timeout (submission is an acknowledgment, not the
    /// full generation, but result downloads go through the same client)
    pub timeout: Duration,
}

impl KlingConfig {
    /// Create config from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        Ok(Self {
            access_key: std::env::var("KLING_ACCESS_KEY")
                .map_err(|_| ProviderError::AuthError("KLING_ACCESS_KEY not set".into()))?,
            secret_key: std::env::var("KLING_SECRET_KEY")
                .map_err(|_| ProviderError::AuthError("KLING_SECRET_KEY not set".into()))?,
            base_url: std::env::var("KLING_BASE_URL")
                .unwrap_or_else(|_| "https://api-singapore.klingai.com".to_string()),
            timeout: Duration::from_secs(
                std::env::var("KLING_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        })
    }
}

/// Adapter for the Kling video generation API.
pub struct KlingProvider {
    http: Client,
    config: KlingConfig,
    tokens: SignedTokenCache,
}

impl KlingProvider {
    pub fn new(config: KlingConfig) -> ProviderResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ProviderError::Network)?;
        let tokens = SignedTokenCache::new(&config.access_key, &config.secret_key);

        Ok(Self { http, config, tokens })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(KlingConfig::from_env()?)
    }

    fn encode_image(image: &[u8]) -> String {
        BASE64.encode(image)
    }

    /// POST a generation request and normalize the response.
    async fn submit<B: serde::Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> ProviderResult<ExternalRef> {
        let token = self.tokens.token().await?;
        let url = format!("{}{}", self.config.base_url, endpoint);

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        match status {
            StatusCode::TOO_MANY_REQUESTS | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ProviderError::QuotaExhausted(format!("{}: {}", status, text)));
            }
            StatusCode::BAD_REQUEST => {
                return Err(ProviderError::Rejected(text));
            }
            s if !s.is_success() => {
                return Err(ProviderError::RequestFailed(format!(
                    "{} returned {}: {}",
                    endpoint, status, text
                )));
            }
            _ => {}
        }

        let envelope: KlingResponse = serde_json::from_str(&text)?;
        debug!(code = envelope.code, "Kling response from {}", endpoint);

        // Kling also reports failures as body codes on 200 responses
        if envelope.code != 0 {
            if is_quota_code(envelope.code) {
                return Err(ProviderError::QuotaExhausted(envelope.message));
            }
            if is_validation_code(envelope.code) {
                return Err(ProviderError::Rejected(envelope.message));
            }
            return Err(ProviderError::RequestFailed(format!(
                "Kling code {}: {}",
                envelope.code, envelope.message
            )));
        }

        let data = envelope.data.ok_or_else(|| {
            ProviderError::InvalidResponse(format!("{}: success without data", endpoint))
        })?;
        Ok(data.to_external_ref())
    }

    async fn download(&self, url: &str) -> ProviderResult<Vec<u8>> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::RequestFailed(format!(
                "result download returned {}",
                response.status()
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl VideoProvider for KlingProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Kling
    }

    async fn submit_text_to_video(
        &self,
        request: &GenerationRequest,
    ) -> ProviderResult<ExternalRef> {
        let body = KlingTextToVideoRequest::from_request(request);
        self.submit("/v1/videos/text2video", &body).await
    }

    async fn submit_image_to_video(
        &self,
        request: &GenerationRequest,
        image: &[u8],
        image_tail: Option<&[u8]>,
    ) -> ProviderResult<ExternalRef> {
        let body = KlingImageToVideoRequest::from_request(
            request,
            Self::encode_image(image),
            image_tail.map(Self::encode_image),
        );
        self.submit("/v1/videos/image2video", &body).await
    }

    async fn submit_multi_image_to_video(
        &self,
        request: &GenerationRequest,
        images: &[Vec<u8>],
    ) -> ProviderResult<ExternalRef> {
        let encoded = images.iter().map(|i| Self::encode_image(i)).collect();
        let body = KlingMultiImageToVideoRequest::from_request(request, encoded);
        self.submit("/v1/videos/multi-image2video", &body).await
    }

    async fn handle_callback(
        &self,
        payload: &serde_json::Value,
    ) -> ProviderResult<Option<Vec<u8>>> {
        let data: KlingCallbackPayload = match serde_json::from_value(payload.clone()) {
            Ok(data) => data,
            Err(e) => {
                debug!("Unrecognized Kling callback payload: {}", e);
                return Ok(None);
            }
        };

        match data.task_status {
            KlingTaskStatus::Failed => Err(ProviderError::GenerationFailed(
                data.task_status_msg
                    .unwrap_or_else(|| "generation failed".to_string()),
            )),
            KlingTaskStatus::Succeed => {
                let url = data
                    .task_result
                    .as_ref()
                    .and_then(|r| r.videos.first())
                    .map(|v| v.url.clone())
                    .ok_or_else(|| {
                        ProviderError::InvalidResponse(format!(
                            "succeed callback without video for task {}",
                            data.task_id
                        ))
                    })?;
                let bytes = self.download(&url).await?;
                Ok(Some(bytes))
            }
            KlingTaskStatus::Submitted | KlingTaskStatus::Processing => {
                warn!(
                    external_id = %data.task_id,
                    status = data.task_status.as_str(),
                    "Kling callback without final result"
                );
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: String) -> KlingProvider {
        KlingProvider::new(KlingConfig {
            access_key: "ak".into(),
            secret_key: "sk".into(),
            base_url,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn submit_ok_body() -> serde_json::Value {
        serde_json::json!({
            "code": 0,
            "message": "SUCCEED",
            "request_id": "req-1",
            "data": {
                "task_id": "ext-1",
                "task_status": "submitted",
                "created_at": 1747233384021u64,
                "updated_at": 1747233384021u64
            }
        })
    }

    #[tokio::test]
    async fn test_text_submit_returns_external_ref() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/videos/text2video"))
            .and(header_exists("authorization"))
            .and(body_partial_json(serde_json::json!({"prompt": "a cat"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(submit_ok_body()))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider(server.uri());
        let ext = provider
            .submit_text_to_video(&GenerationRequest::from_prompt("a cat"))
            .await
            .unwrap();

        assert_eq!(ext.external_id, "ext-1");
        assert_eq!(ext.status, "submitted");
    }

    #[tokio::test]
    async fn test_http_429_maps_to_quota_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota"))
            .mount(&server)
            .await;

        let err = provider(server.uri())
            .submit_text_to_video(&GenerationRequest::from_prompt("a cat"))
            .await
            .unwrap_err();
        assert!(err.is_quota_exhausted());
    }

    #[tokio::test]
    async fn test_http_400_maps_to_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad prompt"))
            .mount(&server)
            .await;

        let err = provider(server.uri())
            .submit_text_to_video(&GenerationRequest::from_prompt("a cat"))
            .await
            .unwrap_err();
        assert!(err.is_rejected());
    }

    #[tokio::test]
    async fn test_balance_code_on_ok_response_maps_to_quota() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 1101,
                "message": "insufficient balance",
                "request_id": "req-2",
                "data": null
            })))
            .mount(&server)
            .await;

        let err = provider(server.uri())
            .submit_text_to_video(&GenerationRequest::from_prompt("a cat"))
            .await
            .unwrap_err();
        assert!(err.is_quota_exhausted());
    }

    #[tokio::test]
    async fn test_image_submit_inlines_base64() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/videos/image2video"))
            .and(body_partial_json(serde_json::json!({
                "image": BASE64.encode(b"jpegbytes")
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(submit_ok_body()))
            .expect(1)
            .mount(&server)
            .await;

        let ext = provider(server.uri())
            .submit_image_to_video(&GenerationRequest::default(), b"jpegbytes", None)
            .await
            .unwrap();
        assert_eq!(ext.external_id, "ext-1");
    }

    #[tokio::test]
    async fn test_succeed_callback_downloads_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/videos/v1.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4-bytes".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let payload = serde_json::json!({
            "task_id": "ext-1",
            "task_status": "succeed",
            "task_result": {"videos": [{"id": "v1", "url": format!("{}/videos/v1.mp4", server.uri())}]}
        });

        let bytes = provider(server.uri())
            .handle_callback(&payload)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bytes, b"mp4-bytes");
    }

    #[tokio::test]
    async fn test_failed_callback_carries_provider_reason() {
        let payload = serde_json::json!({
            "task_id": "ext-1",
            "task_status": "failed",
            "task_status_msg": "content risk"
        });

        let err = provider("http://unused.test".into())
            .handle_callback(&payload)
            .await
            .unwrap_err();
        match err {
            ProviderError::GenerationFailed(msg) => assert_eq!(msg, "content risk"),
            other => panic!("expected GenerationFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pending_and_garbage_callbacks_yield_none() {
        let provider = provider("http://unused.test".into());

        let pending = serde_json::json!({"task_id": "ext-1", "task_status": "processing"});
        assert!(provider.handle_callback(&pending).await.unwrap().is_none());

        let garbage = serde_json::json!({"unexpected": true});
        assert!(provider.handle_callback(&garbage).await.unwrap().is_none());
    }
}
