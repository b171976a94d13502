//! Handlers for job submission, status polling and artifact retrieval.
//!
//! Every job outcome is a `200` with a structured body: unknown ids come
//! back as `{"status": "not found"}`, unavailable projects and missing
//! files as `{"error": ...}`. Only transport problems (malformed request
//! bodies, internal faults) produce non-2xx responses.

use appforge_core::job::{JobId, StatusReport};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::artifacts::{self, FileContent, FileList, MSG_INVALID_PATH, MSG_NOT_AVAILABLE};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Request body for `POST /generate`.
#[derive(Debug, Deserialize)]
pub struct ProjectPrompt {
    pub prompt: String,
}

/// Response body for `POST /generate`.
#[derive(Debug, Serialize)]
pub struct SubmittedJob {
    pub id: JobId,
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /generate
///
/// Register a job for the prompt and return its id right away. Generation
/// continues in the background; poll `/status/{id}` for the result.
pub async fn generate_project(
    State(state): State<AppState>,
    input: Result<Json<ProjectPrompt>, JsonRejection>,
) -> AppResult<Json<SubmittedJob>> {
    let Json(input) = input.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let id = state.submitter.submit(input.prompt).await?;
    Ok(Json(SubmittedJob { id }))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /status/{id}
///
/// `processing`, `completed` (with `plan`), `error` (with `message`) or
/// `not found`. An id that does not decode to UTF-8 was never issued.
pub async fn get_status(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> Json<StatusReport> {
    let Path(id) = match id {
        Ok(id) => id,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Undecodable job id");
            return Json(StatusReport::not_found());
        }
    };
    Json(state.registry.status(&JobId::from(id)).await)
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

/// GET /files/{id}
///
/// Names of the files the job produced, or `Project not available` until
/// the job has completed successfully.
pub async fn list_files(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> AppResult<Json<FileList>> {
    let Path(id) = match id {
        Ok(id) => id,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Undecodable job id");
            return Ok(Json(FileList::Error {
                error: MSG_NOT_AVAILABLE.to_string(),
            }));
        }
    };
    let listing = artifacts::list_files(&state.registry, &JobId::from(id)).await?;
    Ok(Json(listing))
}

/// GET /download/{id}/{filename}
///
/// Text content of one artifact. Names that try to leave the job's output
/// directory are refused without touching the filesystem.
pub async fn download_file(
    State(state): State<AppState>,
    params: Result<Path<(String, String)>, PathRejection>,
) -> AppResult<Json<FileContent>> {
    let Path((id, filename)) = match params {
        Ok(params) => params,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Undecodable download path");
            return Ok(Json(FileContent::Error {
                error: MSG_INVALID_PATH.to_string(),
            }));
        }
    };
    let content = artifacts::read_file(&state.registry, &JobId::from(id), &filename).await?;
    Ok(Json(content))
}
