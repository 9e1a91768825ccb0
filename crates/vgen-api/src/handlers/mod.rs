//! Request handlers.

pub mod generate;
pub mod health;
pub mod tasks;

pub use generate::*;
pub use health::*;
pub use tasks::*;
