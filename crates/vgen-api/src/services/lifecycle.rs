//! Task lifecycle orchestrator.
//!
//! Drives a task through `new → submitted → {finished, failed}`,
//! coordinating the repository, the provider adapter, the result store, and
//! the caller notifier. This is the only place task state transitions are
//! made; handlers never touch the repository directly.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use vgen_db::TaskRepository;
use vgen_models::{GenerationRequest, NewTask, ProviderKind, Task, TaskPatch};
use vgen_providers::{ProviderError, VideoProvider};
use vgen_storage::LocalStorage;

use crate::error::{ApiError, ApiResult};
use crate::services::notifier::WebhookNotifier;

/// What a submission carries besides the request parameters.
pub enum SubmitPayload {
    Text,
    Image {
        image: Vec<u8>,
        image_tail: Option<Vec<u8>>,
    },
    MultiImage {
        images: Vec<Vec<u8>>,
    },
}

/// Use-case layer coordinating the task state machine.
///
/// New tasks go through the active provider; callbacks dispatch on the
/// provider tag stored on the task, never on payload shape.
pub struct TaskLifecycle {
    repo: Arc<dyn TaskRepository>,
    storage: Arc<LocalStorage>,
    providers: HashMap<ProviderKind, Arc<dyn VideoProvider>>,
    active: ProviderKind,
    notifier: WebhookNotifier,
    domain: String,
}

impl TaskLifecycle {
    pub fn new(
        repo: Arc<dyn TaskRepository>,
        storage: Arc<LocalStorage>,
        provider: Arc<dyn VideoProvider>,
        notifier: WebhookNotifier,
        domain: impl Into<String>,
    ) -> Self {
        let active = provider.kind();
        let mut providers = HashMap::new();
        providers.insert(active, provider);

        Self {
            repo,
            storage,
            providers,
            active,
            notifier,
            domain: domain.into(),
        }
    }

    /// Register an additional adapter so callbacks for tasks submitted
    /// through it keep resolving after the active provider changed.
    pub fn with_provider(mut self, provider: Arc<dyn VideoProvider>) -> Self {
        self.providers.entry(provider.kind()).or_insert(provider);
        self
    }

    fn active_provider(&self) -> &Arc<dyn VideoProvider> {
        &self.providers[&self.active]
    }

    fn provider_for(&self, kind: ProviderKind) -> ApiResult<&Arc<dyn VideoProvider>> {
        self.providers
            .get(&kind)
            .ok_or_else(|| ApiError::internal(format!("no adapter configured for provider {}", kind)))
    }

    /// Where the provider should deliver progress callbacks for `task_id`.
    pub fn callback_url(&self, task_id: i64) -> String {
        format!("https://{}/webhook/{}", self.domain.trim_end_matches('/'), task_id)
    }

    fn result_url(&self, key: &str) -> String {
        format!("https://{}/result/{}", self.domain.trim_end_matches('/'), key.trim())
    }

    /// Create a task row in the implicit `new` state, tagged with the active
    /// provider.
    pub async fn create(
        &self,
        user_id: impl Into<String>,
        app_id: impl Into<String>,
        prompt: Option<String>,
        webhook_url: Option<String>,
    ) -> ApiResult<Task> {
        let task = self
            .repo
            .create(NewTask {
                provider: self.active,
                user_id: user_id.into(),
                app_id: app_id.into(),
                prompt,
                webhook_url,
            })
            .await?;
        info!(task_id = task.id, provider = %task.provider, "Created task");
        Ok(task)
    }

    /// Submit a task to the provider: `new → submitted`.
    ///
    /// A provider-rejected submission (HTTP 400) still flips the task to
    /// `submitted`, with no external id — the caller-visible contract does
    /// not fail on a rejected generation request. Quota exhaustion is logged
    /// as an operational alert and propagated to the caller.
    pub async fn submit(
        &self,
        task_id: i64,
        mut request: GenerationRequest,
        payload: SubmitPayload,
    ) -> ApiResult<()> {
        request.callback_url = Some(self.callback_url(task_id));
        request.external_task_id = Some(task_id.to_string());

        let provider = self.active_provider();
        let outcome = match &payload {
            SubmitPayload::Text => provider.submit_text_to_video(&request).await,
            SubmitPayload::Image { image, image_tail } => {
                provider
                    .submit_image_to_video(&request, image, image_tail.as_deref())
                    .await
            }
            SubmitPayload::MultiImage { images } => {
                provider.submit_multi_image_to_video(&request, images).await
            }
        };

        match outcome {
            Ok(ext) => {
                info!(
                    task_id,
                    external_id = %ext.external_id,
                    status = %ext.status,
                    "Submitted task to provider"
                );
                self.repo
                    .update(task_id, TaskPatch::submitted(Some(ext.external_id)))
                    .await?;
                Ok(())
            }
            Err(e) if e.is_rejected() => {
                // Nothing was queued upstream, but the task is considered
                // in flight from the caller's perspective.
                warn!(task_id, "Provider rejected submission: {}", e);
                self.repo
                    .update(task_id, TaskPatch::submitted(None))
                    .await?;
                Ok(())
            }
            Err(e) if e.is_quota_exhausted() => {
                error!(task_id, "Provider quota exhausted: {}", e);
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Handle an inbound provider callback: `submitted → {finished, failed}`.
    ///
    /// A callback for an already-terminal task is a harmless duplicate: no
    /// re-download, no state change, no re-notification. Any failure after
    /// the task was loaded flips it to `failed` — an error never escapes
    /// without recording task state, since the provider will not retry
    /// indefinitely.
    pub async fn handle_callback(
        &self,
        task_id: i64,
        payload: &serde_json::Value,
    ) -> ApiResult<()> {
        let task = self.repo.get_by_id(task_id).await?;
        if task.is_terminal() {
            debug!(task_id, "Callback for terminal task ignored");
            return Ok(());
        }

        // Dispatch on the tag recorded at creation, not on payload shape
        let provider = self.provider_for(task.provider)?;

        match provider.handle_callback(payload).await {
            Ok(None) => {
                debug!(task_id, "Callback without final result, no transition");
                Ok(())
            }
            Ok(Some(bytes)) => match self.store_result(task_id, &bytes).await {
                Ok(()) => {
                    info!(task_id, size = bytes.len(), "Task finished, result stored");
                    self.notify_if_configured(task_id).await;
                    Ok(())
                }
                Err(e) => self.fail_task(task_id, &e.to_string()).await,
            },
            Err(ProviderError::GenerationFailed(reason)) => {
                self.fail_task(task_id, &reason).await
            }
            Err(e) => self.fail_task(task_id, &e.to_string()).await,
        }
    }

    /// Read path: the stored result key becomes a resolvable URL, without
    /// mutating the persisted row.
    pub async fn get(&self, task_id: i64) -> ApiResult<Task> {
        let mut task = self.repo.get_by_id(task_id).await?;
        if let Some(result) = &task.result {
            if !result.starts_with("http") {
                task.result = Some(self.result_url(result));
            }
        }
        Ok(task)
    }

    async fn store_result(&self, task_id: i64, bytes: &[u8]) -> ApiResult<()> {
        let key = task_id.to_string();
        self.storage.put_bytes(&key, bytes).await?;
        self.repo.update(task_id, TaskPatch::finished(key)).await?;
        Ok(())
    }

    async fn fail_task(&self, task_id: i64, reason: &str) -> ApiResult<()> {
        warn!(task_id, "Task failed: {}", reason);
        self.repo
            .update(task_id, TaskPatch::failed(reason))
            .await?;
        self.notify_if_configured(task_id).await;
        Ok(())
    }

    /// Best-effort terminal-state notification; uses the read path so the
    /// delivered snapshot carries the public result URL.
    async fn notify_if_configured(&self, task_id: i64) {
        let task = match self.get(task_id).await {
            Ok(task) => task,
            Err(e) => {
                warn!(task_id, "Cannot load task for notification: {}", e);
                return;
            }
        };
        if let Some(url) = task.webhook_url.clone() {
            self.notifier.notify(&url, &task).await;
        }
    }
}
