//! Use-case services.

pub mod lifecycle;
pub mod notifier;

pub use lifecycle::{SubmitPayload, TaskLifecycle};
pub use notifier::WebhookNotifier;
