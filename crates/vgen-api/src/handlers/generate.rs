//! Task creation handlers.
//!
//! Paths and field names are fixed for compatibility with the existing
//! client, which sends both camelCase and snake_case variants.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Deserialize;
use url::Url;

use vgen_models::{GenerationRequest, TaskReadDto};

use crate::error::{ApiError, ApiResult};
use crate::services::lifecycle::SubmitPayload;
use crate::state::AppState;
use crate::submit_queue::SubmitJob;

/// Most images the multi-image endpoint accepts.
const MAX_MULTI_IMAGES: usize = 4;

/// JSON body of `POST /generatetext`.
#[derive(Debug, Deserialize)]
pub struct CreateTextTaskRequest {
    #[serde(alias = "appId")]
    pub app_id: String,
    #[serde(alias = "userId")]
    pub user_id: String,
    pub prompt: String,
    #[serde(default)]
    pub webhook_url: Option<String>,
}

fn validate_webhook_url(webhook_url: &Option<String>) -> ApiResult<()> {
    if let Some(raw) = webhook_url {
        Url::parse(raw)
            .map_err(|_| ApiError::validation(format!("webhook_url is not a valid URL: {}", raw)))?;
    }
    Ok(())
}

/// `POST /generatetext` — create a task and submit it synchronously.
pub async fn generate_from_text(
    State(state): State<AppState>,
    Json(body): Json<CreateTextTaskRequest>,
) -> ApiResult<Json<TaskReadDto>> {
    validate_webhook_url(&body.webhook_url)?;

    let task = state
        .lifecycle
        .create(
            body.user_id,
            body.app_id,
            Some(body.prompt.clone()),
            body.webhook_url,
        )
        .await?;

    state
        .lifecycle
        .submit(
            task.id,
            GenerationRequest::from_prompt(body.prompt),
            SubmitPayload::Text,
        )
        .await?;

    let task = state.lifecycle.get(task.id).await?;
    Ok(Json(TaskReadDto::from_task(&task)))
}

/// Multipart fields shared by the image endpoints.
#[derive(Default)]
struct TaskForm {
    app_id: Option<String>,
    user_id: Option<String>,
    prompt: Option<String>,
    webhook_url: Option<String>,
    files: Vec<Vec<u8>>,
    image_tail: Option<Vec<u8>>,
}

impl TaskForm {
    async fn collect(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "appId" | "app_id" => form.app_id = Some(read_text(field).await?),
                "userId" | "user_id" => form.user_id = Some(read_text(field).await?),
                "prompt" => form.prompt = Some(read_text(field).await?),
                "webhook_url" => {
                    let value = read_text(field).await?;
                    if !value.is_empty() {
                        form.webhook_url = Some(value);
                    }
                }
                "file" => form.files.push(read_bytes(field).await?),
                "image_tail" => form.image_tail = Some(read_bytes(field).await?),
                _ => {}
            }
        }

        validate_webhook_url(&form.webhook_url)?;
        Ok(form)
    }

    fn require(&self, value: &Option<String>, name: &str) -> ApiResult<String> {
        value
            .clone()
            .ok_or_else(|| ApiError::validation(format!("{} is required", name)))
    }
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("unreadable form field: {}", e)))
}

async fn read_bytes(field: axum::extract::multipart::Field<'_>) -> ApiResult<Vec<u8>> {
    Ok(field
        .bytes()
        .await
        .map_err(|e| ApiError::bad_request(format!("unreadable file field: {}", e)))?
        .to_vec())
}

/// `POST /generate` — create a task from one image; the provider submission
/// runs in the background so the response does not wait on the external call.
pub async fn generate_from_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<TaskReadDto>> {
    let mut form = TaskForm::collect(multipart).await?;

    let app_id = form.require(&form.app_id, "appId")?;
    let user_id = form.require(&form.user_id, "userId")?;
    let prompt = form.require(&form.prompt, "prompt")?;
    if form.files.is_empty() {
        return Err(ApiError::validation("file is required"));
    }
    let image = form.files.remove(0);

    let task = state
        .lifecycle
        .create(user_id, app_id, Some(prompt.clone()), form.webhook_url.clone())
        .await?;

    let request = GenerationRequest {
        prompt: Some(prompt),
        ..Default::default()
    };
    state.submits.enqueue(SubmitJob {
        task_id: task.id,
        request,
        payload: SubmitPayload::Image {
            image,
            image_tail: form.image_tail,
        },
    })?;

    Ok(Json(TaskReadDto::from_task(&task)))
}

/// `POST /generatemulti` — create a task from 1–4 reference images.
pub async fn generate_from_multi_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<TaskReadDto>> {
    let form = TaskForm::collect(multipart).await?;

    let app_id = form.require(&form.app_id, "appId")?;
    let user_id = form.require(&form.user_id, "userId")?;
    let prompt = form.require(&form.prompt, "prompt")?;
    if form.files.is_empty() || form.files.len() > MAX_MULTI_IMAGES {
        return Err(ApiError::bad_request(format!(
            "between 1 and {} image files required, got {}",
            MAX_MULTI_IMAGES,
            form.files.len()
        )));
    }

    let task = state
        .lifecycle
        .create(user_id, app_id, Some(prompt.clone()), form.webhook_url.clone())
        .await?;

    let request = GenerationRequest {
        prompt: Some(prompt),
        ..Default::default()
    };
    state.submits.enqueue(SubmitJob {
        task_id: task.id,
        request,
        payload: SubmitPayload::MultiImage { images: form.files },
    })?;

    Ok(Json(TaskReadDto::from_task(&task)))
}
