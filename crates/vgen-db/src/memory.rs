//! In-memory repository used by orchestrator and router tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use vgen_models::{NewTask, Task, TaskPatch};

use crate::error::{DbError, DbResult};
use crate::repo::TaskRepository;

/// HashMap-backed [`TaskRepository`] with the same patch semantics as the
/// PostgreSQL implementation.
pub struct MemoryTaskRepository {
    tasks: Mutex<HashMap<i64, Task>>,
    next_id: AtomicI64,
}

impl MemoryTaskRepository {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for MemoryTaskRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskRepository for MemoryTaskRepository {
    async fn create(&self, task: NewTask) -> DbResult<Task> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let task = Task {
            id,
            external_id: None,
            status: None,
            provider: task.provider,
            user_id: task.user_id,
            app_id: task.app_id,
            prompt: task.prompt,
            webhook_url: task.webhook_url,
            result: None,
            error: None,
        };
        self.tasks.lock().unwrap().insert(id, task.clone());
        Ok(task)
    }

    async fn get_by_id(&self, id: i64) -> DbResult<Task> {
        self.tasks
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::not_found(format!("task {}", id)))
    }

    async fn update(&self, id: i64, patch: TaskPatch) -> DbResult<()> {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .get_mut(&id)
            .ok_or_else(|| DbError::not_found(format!("task {}", id)))?;

        if let Some(status) = patch.status {
            task.status = Some(status);
        }
        if let Some(external_id) = patch.external_id {
            task.external_id = Some(external_id);
        }
        if let Some(result) = patch.result {
            task.result = Some(result);
        }
        if let Some(error) = patch.error {
            task.error = Some(error);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vgen_models::{ProviderKind, TaskStatus};

    fn new_task() -> NewTask {
        NewTask {
            provider: ProviderKind::Kling,
            user_id: "u1".into(),
            app_id: "a1".into(),
            prompt: Some("a cat".into()),
            webhook_url: None,
        }
    }

    #[tokio::test]
    async fn test_ids_are_unique_and_increasing() {
        let repo = MemoryTaskRepository::new();

        let a = repo.create(new_task()).await.unwrap();
        let b = repo.create(new_task()).await.unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn test_patch_applies_only_supplied_fields() {
        let repo = MemoryTaskRepository::new();
        let task = repo.create(new_task()).await.unwrap();

        repo.update(task.id, TaskPatch::submitted(Some("ext-1".into())))
            .await
            .unwrap();
        repo.update(task.id, TaskPatch::failed("content risk"))
            .await
            .unwrap();

        let loaded = repo.get_by_id(task.id).await.unwrap();
        assert_eq!(loaded.status, Some(TaskStatus::Failed));
        assert_eq!(loaded.external_id.as_deref(), Some("ext-1"));
        assert_eq!(loaded.error.as_deref(), Some("content risk"));
        assert_eq!(loaded.prompt.as_deref(), Some("a cat"));
    }

    #[tokio::test]
    async fn test_missing_task_not_found() {
        let repo = MemoryTaskRepository::new();
        assert!(matches!(repo.get_by_id(99).await, Err(DbError::NotFound(_))));
    }
}
