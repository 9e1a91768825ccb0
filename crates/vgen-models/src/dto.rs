//! Task-read DTO returned on the HTTP surface and in caller webhooks.

use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskStatus};

/// Envelope the existing client expects from every task-returning endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReadDto {
    pub error: bool,
    pub messages: Vec<String>,
    pub data: TaskReadData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReadData {
    pub id: i64,
    /// 0=new, 1=submitted, 3=finished, 4=failed (2 intentionally unused)
    pub status: u8,
    /// Always null; kept for wire compatibility
    pub photo: Option<String>,
    pub result: Option<String>,
}

impl TaskReadDto {
    pub fn from_task(task: &Task) -> Self {
        Self {
            error: task.error.is_some(),
            messages: task.error.iter().cloned().collect(),
            data: TaskReadData {
                id: task.id,
                status: TaskStatus::code(task.status),
                photo: None,
                result: task.result.clone(),
            },
        }
    }
}
