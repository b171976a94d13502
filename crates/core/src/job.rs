//! Job identifiers, lifecycle states and the status view returned to
//! polling clients.
//!
//! A job starts in [`JobStatus::Processing`] and moves exactly once to a
//! terminal [`JobOutcome`]. [`JobRecord::finish`] enforces that rule so the
//! registry cannot write a second outcome over the first.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Number of random bytes in a generated job id (128 bits).
pub const JOB_ID_BYTES: usize = 16;

/// Opaque, unguessable job handle.
///
/// Generated ids are [`JOB_ID_BYTES`] bytes from the thread-local CSPRNG,
/// hex-encoded. Ids parsed from client input are taken verbatim and only
/// used for lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Allocate a fresh random id.
    pub fn generate() -> Self {
        let bytes: [u8; JOB_ID_BYTES] = rand::random();
        let mut hex = String::with_capacity(JOB_ID_BYTES * 2);
        for b in bytes {
            hex.push_str(&format!("{b:02x}"));
        }
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Status value reported for an id that was never issued. Never stored.
pub const STATUS_NOT_FOUND: &str = "not found";

/// Stored lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    /// Wire name used in status responses.
    pub fn name(self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Processing)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Terminal result of a job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// The engine succeeded; artifacts live in `output_dir`.
    Completed { plan: Value, output_dir: PathBuf },
    /// The engine (or artifact materialisation) failed.
    Error { message: String },
}

impl JobOutcome {
    pub fn status(&self) -> JobStatus {
        match self {
            JobOutcome::Completed { .. } => JobStatus::Completed,
            JobOutcome::Error { .. } => JobStatus::Error,
        }
    }
}

/// One job as held by the registry.
///
/// `outcome` is `None` while the job is processing. The payload fields of
/// each status only exist inside the matching [`JobOutcome`] variant, so a
/// record can never carry a plan alongside an error message.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub id: JobId,
    pub outcome: Option<JobOutcome>,
    pub created_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

impl JobRecord {
    /// A fresh record in `Processing`.
    pub fn new(id: JobId) -> Self {
        Self {
            id,
            outcome: None,
            created_at: chrono::Utc::now(),
            finished_at: None,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.outcome
            .as_ref()
            .map_or(JobStatus::Processing, JobOutcome::status)
    }

    pub fn plan(&self) -> Option<&Value> {
        match &self.outcome {
            Some(JobOutcome::Completed { plan, .. }) => Some(plan),
            _ => None,
        }
    }

    pub fn output_dir(&self) -> Option<&Path> {
        match &self.outcome {
            Some(JobOutcome::Completed { output_dir, .. }) => Some(output_dir),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            Some(JobOutcome::Error { message }) => Some(message),
            _ => None,
        }
    }

    /// Apply the terminal outcome.
    ///
    /// Fails with [`CoreError::Conflict`] if the record is already
    /// terminal; the existing outcome is left untouched.
    pub fn finish(&mut self, outcome: JobOutcome) -> Result<(), CoreError> {
        if let Some(existing) = &self.outcome {
            return Err(CoreError::Conflict(format!(
                "Job {} is already {}",
                self.id,
                existing.status()
            )));
        }
        self.outcome = Some(outcome);
        self.finished_at = Some(chrono::Utc::now());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Status view
// ---------------------------------------------------------------------------

/// What a polling client sees for one id.
///
/// Serializes to `{ "status": ..., "plan"?: ..., "message"?: ... }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusReport {
    pub fn not_found() -> Self {
        Self {
            status: STATUS_NOT_FOUND,
            plan: None,
            message: None,
        }
    }
}

impl From<&JobRecord> for StatusReport {
    fn from(record: &JobRecord) -> Self {
        Self {
            status: record.status().name(),
            plan: record.plan().cloned(),
            message: record.error_message().map(str::to_string),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
