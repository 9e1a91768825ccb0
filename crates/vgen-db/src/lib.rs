//! Task persistence over PostgreSQL.
//!
//! The repository is the only way the rest of the system touches the
//! database; rows are mapped into `vgen_models::Task` at this boundary.

pub mod error;
pub mod memory;
pub mod repo;

pub use error::{DbError, DbResult};
pub use memory::MemoryTaskRepository;
pub use repo::{PgTaskRepository, TaskRepository, MIGRATOR};
