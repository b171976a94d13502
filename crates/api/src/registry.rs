//! In-memory job registry.
//!
//! The single source of truth for job state. One instance is created at
//! startup and shared behind an `Arc`; nothing is persisted and records are
//! never evicted, so memory grows with the number of jobs submitted over
//! the life of the process.

use std::collections::HashMap;

use appforge_core::error::CoreError;
use appforge_core::job::{JobId, JobOutcome, JobRecord, JobStatus, StatusReport};
use serde::Serialize;
use tokio::sync::RwLock;

/// Number of jobs currently in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub processing: usize,
    pub completed: usize,
    pub error: usize,
}

/// Maps job ids to job records.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application. Every mutation replaces a record's state
/// while holding the write lock, and reads hand out clones, so a reader sees
/// a record either before or after an update, never halfway.
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
}

impl JobRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Install a fresh `Processing` record for `id`.
    ///
    /// Fails with [`CoreError::Conflict`] if the id is already registered.
    pub async fn create(&self, id: JobId) -> Result<(), CoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&id) {
            return Err(CoreError::Conflict(format!("Job {id} already exists")));
        }
        jobs.insert(id.clone(), JobRecord::new(id));
        Ok(())
    }

    /// Snapshot of the record for `id`, if any.
    pub async fn get(&self, id: &JobId) -> Option<JobRecord> {
        self.jobs.read().await.get(id).cloned()
    }

    /// Write the terminal outcome for `id`.
    ///
    /// Succeeds at most once per job. Returns [`CoreError::NotFound`] for an
    /// unknown id and [`CoreError::Conflict`] if the job is already terminal.
    pub async fn set_terminal(&self, id: &JobId, outcome: JobOutcome) -> Result<(), CoreError> {
        let mut jobs = self.jobs.write().await;
        let record = jobs.get_mut(id).ok_or_else(|| CoreError::NotFound {
            entity: "Job",
            id: id.to_string(),
        })?;
        record.finish(outcome)
    }

    /// The status view a polling client receives for `id`.
    pub async fn status(&self, id: &JobId) -> StatusReport {
        match self.jobs.read().await.get(id) {
            Some(record) => StatusReport::from(record),
            None => StatusReport::not_found(),
        }
    }

    /// Count jobs per status.
    pub async fn counts(&self) -> StatusCounts {
        let jobs = self.jobs.read().await;
        let mut counts = StatusCounts::default();
        for record in jobs.values() {
            match record.status() {
                JobStatus::Processing => counts.processing += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Error => counts.error += 1,
            }
        }
        counts
    }

    /// Return the total number of jobs ever registered.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}
