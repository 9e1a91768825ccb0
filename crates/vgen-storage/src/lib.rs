//! Local filesystem blob storage for finished result media.
//!
//! Keys are task ids; the presentation layer turns a stored key into a
//! public `/result/{task_id}` URL.

pub mod error;
pub mod local;

pub use error::{StorageError, StorageResult};
pub use local::LocalStorage;
