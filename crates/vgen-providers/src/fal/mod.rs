//! Fal-hosted Kling adapter.

mod adapter;
mod types;

pub use adapter::{FalConfig, FalProvider};
pub use types::FalGenerateResponse;
