//! Background submission worker.
//!
//! Image and multi-image submissions are decoupled from the request cycle:
//! the handler enqueues a job and returns immediately; this worker owns the
//! full submit lifecycle, including error handling. Once enqueued, a job
//! runs to completion independently of the originating request.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use vgen_models::GenerationRequest;

use crate::error::{ApiError, ApiResult};
use crate::services::lifecycle::{SubmitPayload, TaskLifecycle};

/// One unit of background submission work.
pub struct SubmitJob {
    pub task_id: i64,
    pub request: GenerationRequest,
    pub payload: SubmitPayload,
}

/// Handle for enqueueing submissions onto the worker loop.
#[derive(Clone)]
pub struct SubmitQueue {
    sender: mpsc::UnboundedSender<SubmitJob>,
}

impl SubmitQueue {
    /// Spawn the worker loop and return the enqueue handle.
    pub fn start(lifecycle: Arc<TaskLifecycle>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<SubmitJob>();

        tokio::spawn(async move {
            info!("Submit worker started");
            while let Some(job) = receiver.recv().await {
                let task_id = job.task_id;
                // Quota alerts and rejected-submission handling live in the
                // lifecycle; here we only record that a job died.
                if let Err(e) = lifecycle.submit(task_id, job.request, job.payload).await {
                    error!(task_id, "Background submission failed: {}", e);
                }
            }
            info!("Submit worker stopped");
        });

        Self { sender }
    }

    pub fn enqueue(&self, job: SubmitJob) -> ApiResult<()> {
        self.sender
            .send(job)
            .map_err(|_| ApiError::internal("submit worker is not running"))
    }
}
