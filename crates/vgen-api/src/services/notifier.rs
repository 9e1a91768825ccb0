//! Caller webhook notifier.

use std::time::Duration;

use reqwest::Client;
use tracing::{info, warn};

use vgen_models::{Task, TaskReadDto};

/// Delivers task snapshots to caller-supplied webhook URLs.
///
/// Delivery is best-effort: failures are logged and never propagated, and
/// there is no retry queue.
#[derive(Clone)]
pub struct WebhookNotifier {
    http: Client,
}

impl WebhookNotifier {
    pub fn new() -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client with static configuration");
        Self { http }
    }

    /// POST the task-read DTO to `url`.
    pub async fn notify(&self, url: &str, task: &Task) {
        let dto = TaskReadDto::from_task(task);

        match self.http.post(url).json(&dto).send().await {
            Ok(response) if response.status().is_success() => {
                info!(task_id = task.id, url, "Delivered caller webhook");
            }
            Ok(response) => {
                warn!(
                    task_id = task.id,
                    url,
                    status = response.status().as_u16(),
                    "Caller webhook target rejected notification"
                );
            }
            Err(e) => {
                warn!(task_id = task.id, url, "Caller webhook delivery failed: {}", e);
            }
        }
    }
}

impl Default for WebhookNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vgen_models::{ProviderKind, TaskStatus};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn finished_task() -> Task {
        Task {
            id: 3,
            external_id: Some("ext-3".into()),
            status: Some(TaskStatus::Finished),
            provider: ProviderKind::Kling,
            user_id: "u1".into(),
            app_id: "a1".into(),
            prompt: Some("a cat".into()),
            webhook_url: Some("unused".into()),
            result: Some("https://relay.test/result/3".into()),
            error: None,
        }
    }

    #[tokio::test]
    async fn test_notification_carries_read_dto() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(serde_json::json!({
                "error": false,
                "data": {"id": 3, "status": 3, "result": "https://relay.test/result/3"}
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        WebhookNotifier::new()
            .notify(&format!("{}/hook", server.uri()), &finished_task())
            .await;
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_panic() {
        // Target refuses the connection; notify must swallow the error
        WebhookNotifier::new()
            .notify("http://127.0.0.1:1/hook", &finished_task())
            .await;
    }
}
