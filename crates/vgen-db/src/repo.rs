//! Task repository: trait and PostgreSQL implementation.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tracing::info;

use vgen_models::{NewTask, ProviderKind, Task, TaskPatch, TaskStatus};

use crate::error::{DbError, DbResult};

/// Embedded migrations for the `tasks` table.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// CRUD over task rows.
///
/// Every call is its own short statement; no transaction is ever held open
/// across a provider network call.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Persist a new row and return the assigned record.
    async fn create(&self, task: NewTask) -> DbResult<Task>;

    /// Fetch a task, `DbError::NotFound` when absent.
    async fn get_by_id(&self, id: i64) -> DbResult<Task>;

    /// Apply only the populated fields of `patch`, leaving others untouched.
    async fn update(&self, id: i64, patch: TaskPatch) -> DbResult<()>;
}

/// Row shape as persisted; status and provider are stored as text.
#[derive(Debug, FromRow)]
struct TaskRow {
    id: i64,
    external_id: Option<String>,
    status: Option<String>,
    provider: String,
    user_id: String,
    app_id: String,
    prompt: Option<String>,
    webhook_url: Option<String>,
    result: Option<String>,
    error: Option<String>,
}

impl TaskRow {
    fn into_domain(self) -> DbResult<Task> {
        let provider: ProviderKind = self
            .provider
            .parse()
            .map_err(|_| DbError::Decode(format!("task {}: provider {:?}", self.id, self.provider)))?;

        let status = match self.status.as_deref() {
            None => None,
            Some(s) => Some(
                TaskStatus::parse(s)
                    .ok_or_else(|| DbError::Decode(format!("task {}: status {:?}", self.id, s)))?,
            ),
        };

        Ok(Task {
            id: self.id,
            external_id: self.external_id,
            status,
            provider,
            user_id: self.user_id,
            app_id: self.app_id,
            prompt: self.prompt,
            webhook_url: self.webhook_url,
            result: self.result,
            error: self.error,
        })
    }
}

/// PostgreSQL-backed repository.
#[derive(Clone)]
pub struct PgTaskRepository {
    pool: PgPool,
}

impl PgTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using `DATABASE_URL` and run pending migrations.
    pub async fn from_env() -> DbResult<Self> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| DbError::Sqlx(sqlx::Error::Configuration("DATABASE_URL not set".into())))?;
        Self::connect(&url).await
    }

    /// Connect to `database_url` and run pending migrations.
    pub async fn connect(database_url: &str) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        MIGRATOR.run(&pool).await?;
        info!("Connected to task database");

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn create(&self, task: NewTask) -> DbResult<Task> {
        let row: TaskRow = sqlx::query_as(
            r#"
            INSERT INTO tasks (provider, user_id, app_id, prompt, webhook_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, external_id, status, provider, user_id, app_id,
                      prompt, webhook_url, result, error
            "#,
        )
        .bind(task.provider.as_str())
        .bind(&task.user_id)
        .bind(&task.app_id)
        .bind(&task.prompt)
        .bind(&task.webhook_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::from_sqlx(e, "task cannot be created"))?;

        row.into_domain()
    }

    async fn get_by_id(&self, id: i64) -> DbResult<Task> {
        let row: Option<TaskRow> = sqlx::query_as(
            r#"
            SELECT id, external_id, status, provider, user_id, app_id,
                   prompt, webhook_url, result, error
            FROM tasks WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.into_domain(),
            None => Err(DbError::not_found(format!("task {}", id))),
        }
    }

    async fn update(&self, id: i64, patch: TaskPatch) -> DbResult<()> {
        if patch.is_empty() {
            return Ok(());
        }

        // Patches only ever set fields, never clear them, so COALESCE
        // implements apply-only-supplied-fields directly.
        let result = sqlx::query(
            r#"
            UPDATE tasks SET
                status      = COALESCE($2, status),
                external_id = COALESCE($3, external_id),
                result      = COALESCE($4, result),
                error       = COALESCE($5, error)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(patch.status.map(|s| s.as_str()))
        .bind(&patch.external_id)
        .bind(&patch.result)
        .bind(&patch.error)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from_sqlx(e, "task cannot be updated"))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(format!("task {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn live_repo() -> PgTaskRepository {
        dotenvy::dotenv().ok();
        PgTaskRepository::from_env()
            .await
            .expect("DATABASE_URL must point at a test database")
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL instance"]
    async fn test_create_assigns_fresh_id() {
        let repo = live_repo().await;

        let a = repo
            .create(NewTask {
                provider: ProviderKind::Kling,
                user_id: "u1".into(),
                app_id: "a1".into(),
                prompt: Some("a cat".into()),
                webhook_url: None,
            })
            .await
            .unwrap();
        let b = repo
            .create(NewTask {
                provider: ProviderKind::Fal,
                user_id: "u1".into(),
                app_id: "a1".into(),
                prompt: None,
                webhook_url: None,
            })
            .await
            .unwrap();

        assert!(b.id > a.id);
        assert!(a.status.is_none());
        assert!(a.external_id.is_none());
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL instance"]
    async fn test_partial_update_leaves_other_fields() {
        let repo = live_repo().await;

        let task = repo
            .create(NewTask {
                provider: ProviderKind::Kling,
                user_id: "u2".into(),
                app_id: "a2".into(),
                prompt: Some("sunset".into()),
                webhook_url: Some("https://caller.example.com/cb".into()),
            })
            .await
            .unwrap();

        repo.update(task.id, TaskPatch::submitted(Some("ext-9".into())))
            .await
            .unwrap();

        let loaded = repo.get_by_id(task.id).await.unwrap();
        assert_eq!(loaded.status, Some(TaskStatus::Submitted));
        assert_eq!(loaded.external_id.as_deref(), Some("ext-9"));
        assert_eq!(loaded.prompt.as_deref(), Some("sunset"));
        assert_eq!(
            loaded.webhook_url.as_deref(),
            Some("https://caller.example.com/cb")
        );
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL instance"]
    async fn test_unknown_id_is_not_found() {
        let repo = live_repo().await;

        assert!(matches!(
            repo.get_by_id(i64::MAX).await,
            Err(DbError::NotFound(_))
        ));
        assert!(matches!(
            repo.update(i64::MAX, TaskPatch::failed("x")).await,
            Err(DbError::NotFound(_))
        ));
    }
}
