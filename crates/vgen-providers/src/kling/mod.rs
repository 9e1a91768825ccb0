//! Direct Kling API adapter.

mod adapter;
mod token;
mod types;

pub use adapter::{KlingConfig, KlingProvider};
pub use token::SignedTokenCache;
pub use types::{KlingCallbackPayload, KlingTaskStatus};
