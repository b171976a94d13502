use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::registry::StatusCounts;
use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Jobs per status since startup.
    pub jobs: StatusCounts,
    /// Job tasks queued or running on the executor.
    pub in_flight: usize,
}

/// GET /health -- returns service health and job counts.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        jobs: state.registry.counts().await,
        in_flight: state.executor.in_flight(),
    })
}

/// Mount health check routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
