//! Fal queue adapter.
//!
//! Fal hosts Kling models behind its own queue API. Auth is a static key;
//! images must be uploaded to the Fal CDN first and referenced by URL, with
//! the upload authorized by a separately fetched CDN token (valid ~24h,
//! cached in instance memory).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use vgen_models::{ExternalRef, GenerationRequest, ProviderKind};

use crate::error::{ProviderError, ProviderResult};
use crate::fal::types::{
    FalCdnToken, FalElementsRequest, FalGenerateResponse, FalImageToVideoRequest,
    FalTextToVideoRequest, FalUploadResponse,
};
use crate::VideoProvider;

const TEXT_TO_VIDEO_PATH: &str = "/fal-ai/kling-video/v2.1/master/text-to-video";
const IMAGE_TO_VIDEO_PATH: &str = "/fal-ai/kling-video/v2.1/standard/image-to-video";
const ELEMENTS_PATH: &str = "/fal-ai/kling-video/v1.6/pro/elements";

/// CDN tokens are valid for a day; refresh a minute early.
const CDN_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const CDN_TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Configuration for the Fal adapter.
#[derive(Debug, Clone)]
pub struct FalConfig {
    /// Static API key
    pub api_key: String,
    /// Queue base URL
    pub base_url: String,
    /// CDN base URL (uploads)
    pub cdn_url: String,
    /// Storage-auth base URL (CDN token endpoint)
    pub auth_url: String,
    pub timeout: Duration,
}

impl FalConfig {
    /// Create config from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        Ok(Self {
            api_key: std::env::var("FAL_KEY")
                .map_err(|_| ProviderError::AuthError("FAL_KEY not set".into()))?,
            base_url: std::env::var("FAL_BASE_URL")
                .unwrap_or_else(|_| "https://queue.fal.run".to_string()),
            cdn_url: std::env::var("FAL_CDN_URL")
                .unwrap_or_else(|_| "https://v3.fal.media".to_string()),
            auth_url: std::env::var("FAL_AUTH_URL")
                .unwrap_or_else(|_| "https://rest.alpha.fal.ai".to_string()),
            timeout: Duration::from_secs(
                std::env::var("FAL_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        })
    }
}

struct CachedCdnToken {
    value: String,
    fetched_at: Instant,
}

impl CachedCdnToken {
    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() + CDN_TOKEN_REFRESH_MARGIN < CDN_TOKEN_TTL
    }
}

/// Adapter for Kling hosted on the Fal queue.
pub struct FalProvider {
    http: Client,
    config: FalConfig,
    cdn_token: RwLock<Option<CachedCdnToken>>,
}

impl FalProvider {
    pub fn new(config: FalConfig) -> ProviderResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ProviderError::Network)?;

        Ok(Self {
            http,
            config,
            cdn_token: RwLock::new(None),
        })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(FalConfig::from_env()?)
    }

    fn auth_header(&self) -> String {
        format!("Key {}", self.config.api_key)
    }

    /// Get a CDN upload token, fetching a fresh one when the cache is stale.
    async fn cdn_token(&self) -> ProviderResult<String> {
        {
            let cache = self.cdn_token.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_fresh() {
                    return Ok(cached.value.clone());
                }
            }
        }

        let mut cache = self.cdn_token.write().await;
        if let Some(cached) = cache.as_ref() {
            if cached.is_fresh() {
                return Ok(cached.value.clone());
            }
        }

        let url = format!(
            "{}/storage/auth/token?storage_type=fal-cdn-v3",
            self.config.auth_url
        );
        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, self.auth_header())
            .header(CONTENT_TYPE, "application/json")
            .body("{}")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::AuthError(format!(
                "CDN token endpoint returned {}",
                response.status()
            )));
        }

        let token: FalCdnToken = response.json().await?;
        let value = format!("{} {}", token.token_type, token.token);
        *cache = Some(CachedCdnToken {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        debug!("Fetched fresh Fal CDN token");
        Ok(value)
    }

    /// Upload one image to the CDN and return its access URL.
    async fn upload_image(&self, image: &[u8]) -> ProviderResult<String> {
        let token = self.cdn_token().await?;
        let url = format!("{}/files/upload", self.config.cdn_url);

        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "image/jpeg")
            .header(AUTHORIZATION, token)
            .body(image.to_vec())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::UploadFailed(format!(
                "CDN upload returned {}",
                response.status()
            )));
        }

        let uploaded: FalUploadResponse = response.json().await?;
        Ok(uploaded.access_url)
    }

    /// POST a generation request to the queue and normalize the response.
    async fn submit<B: serde::Serialize>(
        &self,
        endpoint: &str,
        body: &B,
        callback_url: Option<&str>,
    ) -> ProviderResult<ExternalRef> {
        let url = format!("{}{}", self.config.base_url, endpoint);

        let mut request = self
            .http
            .post(&url)
            .header(AUTHORIZATION, self.auth_header())
            .json(body);
        if let Some(webhook) = callback_url {
            request = request.query(&[("fal_webhook", webhook)]);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        match status {
            StatusCode::TOO_MANY_REQUESTS | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ProviderError::QuotaExhausted(format!("{}: {}", status, text)));
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
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

        let parsed: FalGenerateResponse = serde_json::from_str(&text)?;
        debug!(request_id = %parsed.request_id, "Fal accepted submission to {}", endpoint);
        Ok(parsed.to_external_ref())
    }

    async fn download_result(&self, url: &str) -> ProviderResult<Vec<u8>> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::RequestFailed(format!(
                "result download returned {}",
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with("video/") {
            return Err(ProviderError::InvalidResponse(format!(
                "unexpected result content-type: {}",
                content_type
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl VideoProvider for FalProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Fal
    }

    async fn submit_text_to_video(
        &self,
        request: &GenerationRequest,
    ) -> ProviderResult<ExternalRef> {
        let body = FalTextToVideoRequest::from_request(request);
        self.submit(TEXT_TO_VIDEO_PATH, &body, request.callback_url.as_deref())
            .await
    }

    async fn submit_image_to_video(
        &self,
        request: &GenerationRequest,
        image: &[u8],
        image_tail: Option<&[u8]>,
    ) -> ProviderResult<ExternalRef> {
        let image_url = self.upload_image(image).await?;
        let tail_image_url = match image_tail {
            Some(tail) => Some(self.upload_image(tail).await?),
            None => None,
        };

        let body = FalImageToVideoRequest::from_request(request, image_url, tail_image_url);
        self.submit(IMAGE_TO_VIDEO_PATH, &body, request.callback_url.as_deref())
            .await
    }

    async fn submit_multi_image_to_video(
        &self,
        request: &GenerationRequest,
        images: &[Vec<u8>],
    ) -> ProviderResult<ExternalRef> {
        let mut urls = Vec::with_capacity(images.len());
        for image in images {
            urls.push(self.upload_image(image).await?);
        }

        let body = FalElementsRequest::from_request(request, urls);
        self.submit(ELEMENTS_PATH, &body, request.callback_url.as_deref())
            .await
    }

    async fn handle_callback(
        &self,
        payload: &serde_json::Value,
    ) -> ProviderResult<Option<Vec<u8>>> {
        let result: FalGenerateResponse = match serde_json::from_value(payload.clone()) {
            Ok(result) => result,
            Err(e) => {
                debug!("Unrecognized Fal callback payload: {}", e);
                return Ok(None);
            }
        };

        match result.status.as_deref() {
            Some("ERROR") => Err(ProviderError::GenerationFailed(
                result
                    .error
                    .unwrap_or_else(|| "generation failed".to_string()),
            )),
            Some("OK") => match result.payload {
                Some(payload) => {
                    let bytes = self.download_result(&payload.video.url).await?;
                    Ok(Some(bytes))
                }
                None => {
                    warn!(request_id = %result.request_id, "OK callback without payload");
                    Ok(None)
                }
            },
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(uri: String) -> FalProvider {
        FalProvider::new(FalConfig {
            api_key: "fal-key".into(),
            base_url: uri.clone(),
            cdn_url: uri.clone(),
            auth_url: uri,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_text_submit_carries_key_auth_and_webhook() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TEXT_TO_VIDEO_PATH))
            .and(header("authorization", "Key fal-key"))
            .and(query_param("fal_webhook", "https://relay.test/webhook/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "request_id": "req-1",
                "status": "IN_QUEUE"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut request = GenerationRequest::from_prompt("a cat");
        request.callback_url = Some("https://relay.test/webhook/3".into());

        let ext = provider(server.uri())
            .submit_text_to_video(&request)
            .await
            .unwrap();
        assert_eq!(ext.external_id, "req-1");
        assert_eq!(ext.status, "IN_QUEUE");
    }

    #[tokio::test]
    async fn test_image_submit_uploads_to_cdn_first() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/storage/auth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "Bearer",
                "token": "cdn-token"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/files/upload"))
            .and(header("authorization", "Bearer cdn-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_url": "https://v3.fal.media/files/abc.jpg"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path(IMAGE_TO_VIDEO_PATH))
            .and(body_partial_json(serde_json::json!({
                "image_url": "https://v3.fal.media/files/abc.jpg"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "request_id": "req-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ext = provider(server.uri())
            .submit_image_to_video(&GenerationRequest::default(), b"jpegbytes", None)
            .await
            .unwrap();
        assert_eq!(ext.external_id, "req-2");
        assert_eq!(ext.status, "SENDED");
    }

    #[tokio::test]
    async fn test_multi_image_uploads_each_image() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/storage/auth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "Bearer",
                "token": "cdn-token"
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/files/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_url": "https://v3.fal.media/files/img.jpg"
            })))
            .expect(3)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path(ELEMENTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "request_id": "req-3"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let images = vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()];
        let ext = provider(server.uri())
            .submit_multi_image_to_video(&GenerationRequest::from_prompt("group"), &images)
            .await
            .unwrap();
        assert_eq!(ext.external_id, "req-3");
    }

    #[tokio::test]
    async fn test_ok_callback_downloads_video() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/out.mp4"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"mp4-bytes".to_vec())
                    .insert_header("content-type", "video/mp4"),
            )
            .mount(&server)
            .await;

        let payload = serde_json::json!({
            "request_id": "req-4",
            "status": "OK",
            "payload": {"video": {"url": format!("{}/files/out.mp4", server.uri())}}
        });

        let bytes = provider(server.uri())
            .handle_callback(&payload)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bytes, b"mp4-bytes");
    }

    #[tokio::test]
    async fn test_non_video_result_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/out.mp4"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html>expired</html>")
                    .insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;

        let payload = serde_json::json!({
            "request_id": "req-5",
            "status": "OK",
            "payload": {"video": {"url": format!("{}/files/out.mp4", server.uri())}}
        });

        let err = provider(server.uri())
            .handle_callback(&payload)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_error_callback_is_terminal_failure() {
        let payload = serde_json::json!({
            "request_id": "req-6",
            "status": "ERROR",
            "error": "nsfw content detected"
        });

        let err = provider("http://unused.test".into())
            .handle_callback(&payload)
            .await
            .unwrap_err();
        match err {
            ProviderError::GenerationFailed(msg) => assert_eq!(msg, "nsfw content detected"),
            other => panic!("expected GenerationFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_queue_progress_callback_is_pending() {
        let payload = serde_json::json!({"request_id": "req-7", "status": "IN_QUEUE"});
        let result = provider("http://unused.test".into())
            .handle_callback(&payload)
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
