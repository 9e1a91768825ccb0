//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::generate::{
    generate_from_image, generate_from_multi_image, generate_from_text,
};
use crate::handlers::health::health;
use crate::handlers::tasks::{get_result, get_task, task_webhook};
use crate::middleware::{request_id, request_logging};
use crate::state::AppState;

/// Create the API router.
///
/// Paths are fixed for compatibility with the existing client.
pub fn create_router(state: AppState) -> Router {
    let task_routes = Router::new()
        .route("/generatetext", post(generate_from_text))
        .route("/generate", post(generate_from_image))
        .route("/generatemulti", post(generate_from_multi_image))
        .route("/generation/:task_id", get(get_task))
        .route("/webhook/:task_id", post(task_webhook))
        .route("/result/:task_id", get(get_result));

    let health_routes = Router::new().route("/health", get(health));

    Router::new()
        .merge(task_routes)
        .merge(health_routes)
        // Image uploads exceed axum's default 2MB cap
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .with_state(state)
}
