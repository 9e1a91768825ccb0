//! Task status, provider webhook, and result handlers.

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use tracing::warn;

use vgen_models::TaskReadDto;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// `GET /generation/{task_id}` — current task snapshot.
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<TaskReadDto>> {
    let task = state.lifecycle.get(task_id).await?;
    Ok(Json(TaskReadDto::from_task(&task)))
}

/// `POST /webhook/{task_id}` — inbound provider callback.
///
/// Always acknowledges receipt, even when internal processing fails;
/// surfacing an error here would make the provider retry-storm.
pub async fn task_webhook(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
    body: Bytes,
) -> StatusCode {
    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(task_id, "Discarding non-JSON provider callback: {}", e);
            return StatusCode::OK;
        }
    };

    if let Err(e) = state.lifecycle.handle_callback(task_id, &payload).await {
        warn!(task_id, "Provider callback processing failed: {}", e);
    }
    StatusCode::OK
}

/// `GET /result/{task_id}` — stored media as `video/mp4`.
pub async fn get_result(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
) -> Result<Response, ApiError> {
    // 404 for unknown tasks and for tasks whose blob was never stored
    state.lifecycle.get(task_id).await?;

    let bytes = state
        .storage
        .read_bytes(&task_id.to_string())
        .await
        .map_err(|e| {
            if matches!(e, vgen_storage::StorageError::NotFound(_)) {
                ApiError::not_found(format!("no result for task {}", task_id))
            } else {
                ApiError::Storage(e)
            }
        })?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}.mp4\"", task_id),
        )
        .body(Body::from(bytes))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
}
