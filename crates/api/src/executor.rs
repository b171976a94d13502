//! Background job executor.
//!
//! Every submitted job becomes one task on a [`TaskTracker`]. A semaphore
//! caps how many engine invocations run at once; jobs waiting for a permit
//! stay `processing`. Each task ends with exactly one terminal write to the
//! [`JobRegistry`], whatever the engine does (returns, fails or panics).
//!
//! Shutdown abandons jobs that have not started yet and gives running ones
//! until a deadline to finish.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use appforge_core::artifacts::{self, ArtifactError};
use appforge_core::job::{JobId, JobOutcome};
use appforge_engine::{GenerationEngine, GenerationOutput, GenerationRequest, InvokeConfig};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::registry::JobRegistry;

/// Message recorded on jobs dropped by shutdown before they started.
pub const ABANDONED_MESSAGE: &str = "Job abandoned: server shutting down";

/// Executor tuning.
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    /// Parent of the per-job output directories.
    pub output_root: PathBuf,
    /// Passed to every engine invocation.
    pub invoke: InvokeConfig,
    /// Maximum concurrent engine invocations. Must be at least 1.
    pub max_concurrent: usize,
}

/// Runs jobs in the background and records their outcome.
///
/// Cheaply cloneable; clones share the same permits and task set.
#[derive(Clone)]
pub struct JobExecutor {
    registry: Arc<JobRegistry>,
    engine: Arc<dyn GenerationEngine>,
    settings: Arc<ExecutorSettings>,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl JobExecutor {
    pub fn new(
        registry: Arc<JobRegistry>,
        engine: Arc<dyn GenerationEngine>,
        settings: ExecutorSettings,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(settings.max_concurrent.max(1)));
        Self {
            registry,
            engine,
            settings: Arc::new(settings),
            permits,
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Start `id` in the background and return immediately.
    ///
    /// The record for `id` must already exist in the registry.
    pub fn spawn(&self, id: JobId, prompt: String) {
        let executor = self.clone();
        self.tracker.spawn(async move {
            executor.run(id, prompt).await;
        });
    }

    /// Number of job tasks that have not finished yet (queued or running).
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Stop accepting queued work and wait for running jobs.
    ///
    /// Jobs still waiting for a permit are recorded as errors with
    /// [`ABANDONED_MESSAGE`]. Returns the number of tasks still running
    /// when `timeout` elapsed; those are left to die with the runtime.
    pub async fn shutdown(&self, timeout: Duration) -> usize {
        self.shutdown.cancel();
        self.tracker.close();

        let pending = self.tracker.len();
        tracing::info!(pending, timeout_secs = timeout.as_secs(), "Draining job executor");

        match tokio::time::timeout(timeout, self.tracker.wait()).await {
            Ok(()) => {
                tracing::info!("Job executor drained");
                0
            }
            Err(_) => {
                let remaining = self.tracker.len();
                tracing::warn!(remaining, "Shutdown deadline reached, abandoning running jobs");
                remaining
            }
        }
    }

    // ---- private helpers ----

    async fn run(self, id: JobId, prompt: String) {
        let permit = tokio::select! {
            biased;
            () = self.shutdown.cancelled() => None,
            permit = Arc::clone(&self.permits).acquire_owned() => permit.ok(),
        };

        let outcome = match permit {
            Some(_permit) => {
                tracing::debug!(job_id = %id, "Job started");
                self.execute(&id, prompt).await
            }
            None => JobOutcome::Error {
                message: ABANDONED_MESSAGE.to_string(),
            },
        };

        self.record(&id, outcome).await;
    }

    /// Invoke the engine and turn whatever happens into an outcome.
    async fn execute(&self, id: &JobId, prompt: String) -> JobOutcome {
        let request = GenerationRequest {
            job_id: id.to_string(),
            prompt,
            config: self.settings.invoke,
        };

        // The engine runs on its own task so a panic is contained here.
        let engine = Arc::clone(&self.engine);
        let result = match tokio::spawn(async move { engine.invoke(request).await }).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => {
                tracing::error!(job_id = %id, "Generation engine panicked");
                return JobOutcome::Error {
                    message: "Generation engine crashed".to_string(),
                };
            }
            Err(e) => {
                return JobOutcome::Error {
                    message: format!("Generation task did not complete: {e}"),
                };
            }
        };

        match result {
            Ok(output) => self.store(id, output).await,
            Err(e) => JobOutcome::Error {
                message: e.to_string(),
            },
        }
    }

    /// Write the engine's artifacts into the job directory.
    async fn store(&self, id: &JobId, output: GenerationOutput) -> JobOutcome {
        let output_dir = artifacts::job_output_dir(&self.settings.output_root, id);
        let plan = output
            .plan
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()));

        let dir = output_dir.clone();
        let written = tokio::task::spawn_blocking(move || {
            artifacts::write_artifacts(
                &dir,
                output
                    .artifacts
                    .iter()
                    .map(|a| (a.path.as_str(), a.content.as_str())),
            )
        })
        .await;

        match written {
            Ok(Ok(files)) => {
                tracing::debug!(job_id = %id, files, dir = %output_dir.display(), "Artifacts stored");
                JobOutcome::Completed { plan, output_dir }
            }
            Ok(Err(ArtifactError::InvalidPath(reason))) => {
                tracing::warn!(job_id = %id, %reason, "Engine produced an unsafe artifact path");
                JobOutcome::Error {
                    message: format!("Engine produced an invalid artifact path: {reason}"),
                }
            }
            Ok(Err(e)) => JobOutcome::Error {
                message: format!("Failed to store artifacts: {e}"),
            },
            Err(e) => JobOutcome::Error {
                message: format!("Failed to store artifacts: {e}"),
            },
        }
    }

    async fn record(&self, id: &JobId, outcome: JobOutcome) {
        match &outcome {
            JobOutcome::Completed { .. } => {
                tracing::info!(job_id = %id, "Job completed");
            }
            JobOutcome::Error { message } => {
                tracing::warn!(job_id = %id, error = %message, "Job failed");
            }
        }

        if let Err(e) = self.registry.set_terminal(id, outcome).await {
            tracing::error!(job_id = %id, error = %e, "Failed to record job outcome");
        }
    }
}
