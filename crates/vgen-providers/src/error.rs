//! Provider error types.

use thiserror::Error;

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors surfaced by provider adapters.
///
/// The first three variants are the signals the orchestrator dispatches on;
/// everything else is an unexpected fault and propagates as fatal.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Authorization/quota error (HTTP 429 or a provider balance code).
    /// Logged as an operational alert and surfaced to the submit caller.
    #[error("Provider quota exhausted: {0}")]
    QuotaExhausted(String),

    /// Validation error (HTTP 400). The submission was never queued, but the
    /// task still proceeds to `submitted` for caller compatibility.
    #[error("Submission rejected by provider: {0}")]
    Rejected(String),

    /// The provider reported that generation terminally failed.
    /// Carries the provider's human-readable reason.
    #[error("{0}")]
    GenerationFailed(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Asset upload failed: {0}")]
    UploadFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Auth token error: {0}")]
    AuthError(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProviderError {
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, ProviderError::QuotaExhausted(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, ProviderError::Rejected(_))
    }
}
