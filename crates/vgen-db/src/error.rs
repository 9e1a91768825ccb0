//! Database error types.

use thiserror::Error;

/// Result type for repository operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Row decode failed: {0}")]
    Decode(String),

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Map constraint violations to `Conflict`, everything else passes through.
    pub(crate) fn from_sqlx(e: sqlx::Error, what: &str) -> Self {
        use sqlx::error::ErrorKind;

        if let sqlx::Error::Database(db) = &e {
            if matches!(
                db.kind(),
                ErrorKind::UniqueViolation
                    | ErrorKind::ForeignKeyViolation
                    | ErrorKind::NotNullViolation
                    | ErrorKind::CheckViolation
            ) {
                return Self::Conflict(format!("{}: {}", what, db.message()));
            }
        }
        Self::Sqlx(e)
    }
}
