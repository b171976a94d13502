pub mod health;
pub mod jobs;

use axum::Router;

use crate::state::AppState;

/// Build the job route tree.
///
/// Route hierarchy:
///
/// ```text
/// /generate                        submit a prompt (POST)
/// /status/{id}                     poll job status (GET)
/// /files/{id}                      list artifacts (GET)
/// /download/{id}/{filename}        fetch one artifact (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(jobs::router())
}
