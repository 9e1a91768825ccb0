//! Axum HTTP surface for the vgen relay.
//!
//! This crate provides:
//! - The fixed-path generation/webhook/result API
//! - The task lifecycle orchestrator
//! - The background submission worker
//! - Best-effort caller webhook notification

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod submit_queue;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{SubmitPayload, TaskLifecycle, WebhookNotifier};
pub use state::AppState;
pub use submit_queue::{SubmitJob, SubmitQueue};
