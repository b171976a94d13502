//! Read access to a job's artifacts, gated on successful completion.
//!
//! Both operations answer with a structured payload rather than an HTTP
//! error: `{ "files": [...] }` / `{ "content": "..." }` on success and
//! `{ "error": "..." }` otherwise.

use std::path::PathBuf;

use appforge_core::artifacts::{self, ArtifactError};
use appforge_core::job::JobId;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::registry::JobRegistry;

/// Returned for unknown jobs and jobs that have not completed successfully.
pub const MSG_NOT_AVAILABLE: &str = "Project not available";
pub const MSG_FILE_NOT_FOUND: &str = "File not found";
pub const MSG_INVALID_PATH: &str = "Invalid file path";
pub const MSG_NOT_TEXT: &str = "File is not valid UTF-8 text";
pub const MSG_READ_FAILED: &str = "Failed to read file";
pub const MSG_LIST_FAILED: &str = "Failed to list files";

/// Body of `GET /files/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FileList {
    Files { files: Vec<String> },
    Error { error: String },
}

/// Body of `GET /download/{id}/{filename}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FileContent {
    Content { content: String },
    Error { error: String },
}

impl FileList {
    fn error(message: &str) -> Self {
        FileList::Error {
            error: message.to_string(),
        }
    }
}

impl FileContent {
    fn error(message: &str) -> Self {
        FileContent::Error {
            error: message.to_string(),
        }
    }
}

/// Output directory of `id` if the job completed successfully.
async fn completed_dir(registry: &JobRegistry, id: &JobId) -> Option<PathBuf> {
    registry
        .get(id)
        .await
        .and_then(|record| record.output_dir().map(PathBuf::from))
}

/// List the regular files directly inside a completed job's directory.
pub async fn list_files(registry: &JobRegistry, id: &JobId) -> AppResult<FileList> {
    let Some(dir) = completed_dir(registry, id).await else {
        return Ok(FileList::error(MSG_NOT_AVAILABLE));
    };

    let listed = tokio::task::spawn_blocking(move || artifacts::list_files(&dir))
        .await
        .map_err(|e| AppError::InternalError(format!("File listing task failed: {e}")))?;

    Ok(match listed {
        Ok(files) => FileList::Files { files },
        Err(e) => {
            tracing::error!(job_id = %id, error = %e, "Failed to list artifacts");
            FileList::error(MSG_LIST_FAILED)
        }
    })
}

/// Read one artifact of a completed job as text.
pub async fn read_file(registry: &JobRegistry, id: &JobId, filename: &str) -> AppResult<FileContent> {
    let Some(dir) = completed_dir(registry, id).await else {
        return Ok(FileContent::error(MSG_NOT_AVAILABLE));
    };

    let name = filename.to_string();
    let read = tokio::task::spawn_blocking(move || artifacts::read_text(&dir, &name))
        .await
        .map_err(|e| AppError::InternalError(format!("File read task failed: {e}")))?;

    Ok(match read {
        Ok(content) => FileContent::Content { content },
        Err(ArtifactError::InvalidPath(reason)) => {
            tracing::warn!(job_id = %id, filename, %reason, "Rejected artifact path");
            FileContent::error(MSG_INVALID_PATH)
        }
        Err(ArtifactError::NotFound) => FileContent::error(MSG_FILE_NOT_FOUND),
        Err(ArtifactError::NotText) => FileContent::error(MSG_NOT_TEXT),
        Err(ArtifactError::Io(e)) => {
            tracing::error!(job_id = %id, filename, error = %e, "Failed to read artifact");
            FileContent::error(MSG_READ_FAILED)
        }
    })
}
