use std::sync::Arc;

use appforge_core::error::CoreError;
use appforge_core::job::JobId;

use crate::executor::JobExecutor;
use crate::registry::JobRegistry;

/// Accepts prompts and turns them into background jobs.
#[derive(Clone)]
pub struct JobSubmitter {
    registry: Arc<JobRegistry>,
    executor: JobExecutor,
}

impl JobSubmitter {
    pub fn new(registry: Arc<JobRegistry>, executor: JobExecutor) -> Self {
        Self { registry, executor }
    }

    /// Register a new job for `prompt` and start it without waiting.
    ///
    /// The record is in the registry (as `processing`) before the
    /// background task exists, so the returned id always resolves. The
    /// prompt is forwarded as-is, including empty strings.
    pub async fn submit(&self, prompt: String) -> Result<JobId, CoreError> {
        let id = JobId::generate();
        self.registry.create(id.clone()).await?;

        tracing::info!(job_id = %id, prompt_len = prompt.len(), "Job submitted");

        self.executor.spawn(id.clone(), prompt);
        Ok(id)
    }
}
