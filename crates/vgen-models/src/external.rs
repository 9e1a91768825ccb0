//! Normalized provider submission result.

use serde::{Deserialize, Serialize};

/// What a provider tells us after accepting a submission.
///
/// Both adapters map their own response schemas into this shape so the
/// orchestrator never sees provider-specific types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalRef {
    /// The provider's identifier for the submitted job
    pub external_id: String,
    /// Provider-reported status string, untranslated
    pub status: String,
    /// Our task id when the provider echoes it back
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<i64>,
    /// Failure detail on submissions the provider accepted but flagged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Result URL, present only on callbacks that carry a finished asset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
}

impl ExternalRef {
    pub fn new(external_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            status: status.into(),
            task_id: None,
            error: None,
            result_url: None,
        }
    }
}
