//! Application state.

use std::sync::Arc;

use vgen_db::{PgTaskRepository, TaskRepository};
use vgen_models::ProviderKind;
use vgen_providers::{FalProvider, KlingProvider, VideoProvider};
use vgen_storage::LocalStorage;

use crate::config::ApiConfig;
use crate::services::lifecycle::TaskLifecycle;
use crate::services::notifier::WebhookNotifier;
use crate::submit_queue::SubmitQueue;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub storage: Arc<LocalStorage>,
    pub lifecycle: Arc<TaskLifecycle>,
    pub submits: SubmitQueue,
}

impl AppState {
    /// Create application state from the environment.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let repo: Arc<dyn TaskRepository> = Arc::new(PgTaskRepository::from_env().await?);
        let storage = Arc::new(LocalStorage::from_env().await?);

        let provider: Arc<dyn VideoProvider> = match config.provider {
            ProviderKind::Kling => Arc::new(KlingProvider::from_env()?),
            ProviderKind::Fal => Arc::new(FalProvider::from_env()?),
        };

        // Register the other adapter too when its credentials are present,
        // so callbacks for tasks submitted before a provider switch resolve
        let standby: Option<Arc<dyn VideoProvider>> = match config.provider {
            ProviderKind::Kling => FalProvider::from_env()
                .ok()
                .map(|p| Arc::new(p) as Arc<dyn VideoProvider>),
            ProviderKind::Fal => KlingProvider::from_env()
                .ok()
                .map(|p| Arc::new(p) as Arc<dyn VideoProvider>),
        };

        Ok(Self::assemble_with_standby(config, repo, storage, provider, standby))
    }

    /// Wire up the state from already-constructed components.
    pub fn assemble(
        config: ApiConfig,
        repo: Arc<dyn TaskRepository>,
        storage: Arc<LocalStorage>,
        provider: Arc<dyn VideoProvider>,
    ) -> Self {
        Self::assemble_with_standby(config, repo, storage, provider, None)
    }

    fn assemble_with_standby(
        config: ApiConfig,
        repo: Arc<dyn TaskRepository>,
        storage: Arc<LocalStorage>,
        provider: Arc<dyn VideoProvider>,
        standby: Option<Arc<dyn VideoProvider>>,
    ) -> Self {
        let mut lifecycle = TaskLifecycle::new(
            repo,
            Arc::clone(&storage),
            provider,
            WebhookNotifier::new(),
            config.domain.clone(),
        );
        if let Some(standby) = standby {
            lifecycle = lifecycle.with_provider(standby);
        }

        let lifecycle = Arc::new(lifecycle);
        let submits = SubmitQueue::start(Arc::clone(&lifecycle));

        Self {
            config,
            storage,
            lifecycle,
            submits,
        }
    }
}
