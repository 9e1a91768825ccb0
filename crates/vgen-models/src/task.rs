//! Task record and lifecycle status.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::provider::ProviderKind;

/// Task processing status.
///
/// A freshly created task has no status yet (`None` on [`Task::status`]);
/// the absence of a status is what the rest of the system reads as "new".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Accepted by the provider (or accepted-as-rejected), awaiting callback
    Submitted,
    /// Result media downloaded and stored
    Finished,
    /// Provider reported a terminal failure, or callback handling failed
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Submitted => "submitted",
            TaskStatus::Finished => "finished",
            TaskStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more transitions expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Finished | TaskStatus::Failed)
    }

    /// Integer code used on the wire.
    ///
    /// The numbering (0=new, 1=submitted, 3=finished, 4=failed) skips 2 for
    /// compatibility with the existing client; do not renumber.
    pub fn code(status: Option<TaskStatus>) -> u8 {
        match status {
            None => 0,
            Some(TaskStatus::Submitted) => 1,
            Some(TaskStatus::Finished) => 3,
            Some(TaskStatus::Failed) => 4,
        }
    }

    /// Position in the forward-only ordering `new < submitted < terminal`.
    ///
    /// Terminal states share a rank: a task never moves between them.
    pub fn rank(status: Option<TaskStatus>) -> u8 {
        match status {
            None => 0,
            Some(TaskStatus::Submitted) => 1,
            Some(TaskStatus::Finished) | Some(TaskStatus::Failed) => 2,
        }
    }

    pub fn parse(s: &str) -> Option<TaskStatus> {
        match s {
            "submitted" => Some(TaskStatus::Submitted),
            "finished" => Some(TaskStatus::Finished),
            "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One video-generation request and its tracked outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Internally assigned identity, immutable once assigned
    pub id: i64,
    /// Provider-assigned identifier, absent until submission succeeds
    pub external_id: Option<String>,
    /// `None` means the task has not been submitted yet
    pub status: Option<TaskStatus>,
    /// Which provider this task was routed through
    pub provider: ProviderKind,
    /// Opaque caller-supplied attribution tags
    pub user_id: String,
    pub app_id: String,
    /// Original generation instruction (image-only tasks may omit it)
    pub prompt: Option<String>,
    /// Caller-supplied callback target; no notification when absent
    pub webhook_url: Option<String>,
    /// Storage key of the finished media, rewritten to a public URL on read
    pub result: Option<String>,
    /// Failure detail, set only alongside `TaskStatus::Failed`
    pub error: Option<String>,
}

impl Task {
    pub fn is_terminal(&self) -> bool {
        self.status.map(|s| s.is_terminal()).unwrap_or(false)
    }
}

/// Fields required to create a task row.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub provider: ProviderKind,
    pub user_id: String,
    pub app_id: String,
    pub prompt: Option<String>,
    pub webhook_url: Option<String>,
}

/// Partial update: only populated fields are applied.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub status: Option<TaskStatus>,
    pub external_id: Option<String>,
    pub result: Option<String>,
    pub error: Option<String>,
}

impl TaskPatch {
    /// Patch for a successful submission.
    pub fn submitted(external_id: Option<String>) -> Self {
        Self {
            status: Some(TaskStatus::Submitted),
            external_id,
            ..Default::default()
        }
    }

    /// Patch for a stored result.
    pub fn finished(result_key: impl Into<String>) -> Self {
        Self {
            status: Some(TaskStatus::Finished),
            result: Some(result_key.into()),
            ..Default::default()
        }
    }

    /// Patch for a terminal failure.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(TaskStatus::Failed),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.external_id.is_none()
            && self.result.is_none()
            && self.error.is_none()
    }
}
