//! Route definitions for job submission, polling and artifact retrieval.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Job routes, mounted at the root.
///
/// ```text
/// POST   /generate                   -> generate_project
/// GET    /status/{id}                -> get_status
/// GET    /files/{id}                 -> list_files
/// GET    /download/{id}/{filename}   -> download_file
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(jobs::generate_project))
        .route("/status/{id}", get(jobs::get_status))
        .route("/files/{id}", get(jobs::list_files))
        .route("/download/{id}/{filename}", get(jobs::download_file))
}
