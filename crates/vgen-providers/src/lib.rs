//! Provider adapters for third-party video generation.
//!
//! Two heterogeneous providers fulfil the same contract: the Kling API
//! called directly (signed short-lived tokens, inline-base64 images) and
//! Kling hosted on the Fal queue (static key, CDN-uploaded images). The
//! orchestrator only ever sees [`VideoProvider`] and the normalized
//! `ExternalRef` result.

pub mod error;
pub mod fal;
pub mod kling;

use async_trait::async_trait;

use vgen_models::{ExternalRef, GenerationRequest, ProviderKind};

pub use error::{ProviderError, ProviderResult};
pub use fal::{FalConfig, FalProvider};
pub use kling::{KlingConfig, KlingProvider};

/// Uniform interface over heterogeneous generation providers.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// The tag recorded on tasks submitted through this adapter.
    fn kind(&self) -> ProviderKind;

    /// Submit a text-to-video job; returns the provider's job reference.
    async fn submit_text_to_video(&self, request: &GenerationRequest)
        -> ProviderResult<ExternalRef>;

    /// Submit an image-to-video job. The image (and optional tail frame) is
    /// uploaded or inline-encoded depending on the provider.
    async fn submit_image_to_video(
        &self,
        request: &GenerationRequest,
        image: &[u8],
        image_tail: Option<&[u8]>,
    ) -> ProviderResult<ExternalRef>;

    /// Submit a multi-image job (1–4 reference images).
    async fn submit_multi_image_to_video(
        &self,
        request: &GenerationRequest,
        images: &[Vec<u8>],
    ) -> ProviderResult<ExternalRef>;

    /// Parse an inbound provider callback.
    ///
    /// Returns `Ok(None)` while generation is still pending (including
    /// payloads this adapter cannot parse), `Ok(Some(bytes))` once the
    /// finished asset has been downloaded, and
    /// `Err(ProviderError::GenerationFailed)` when the provider reports a
    /// terminal failure.
    async fn handle_callback(&self, payload: &serde_json::Value)
        -> ProviderResult<Option<Vec<u8>>>;
}
