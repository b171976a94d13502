use std::sync::Arc;

use crate::config::ServerConfig;
use crate::executor::JobExecutor;
use crate::registry::JobRegistry;
use crate::submitter::JobSubmitter;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Job records, read by the status and artifact handlers.
    pub registry: Arc<JobRegistry>,
    /// Entry point for new jobs.
    pub submitter: JobSubmitter,
    /// Background executor, kept here so shutdown can drain it.
    pub executor: JobExecutor,
}

impl AppState {
    /// Wire the registry, executor and submitter together.
    pub fn new(
        config: ServerConfig,
        registry: Arc<JobRegistry>,
        executor: JobExecutor,
    ) -> Self {
        let submitter = JobSubmitter::new(Arc::clone(&registry), executor.clone());
        Self {
            config: Arc::new(config),
            registry,
            submitter,
            executor,
        }
    }
}
