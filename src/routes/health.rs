use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub jobs: JobCounts,
}

#[derive(Serialize)]
pub struct JobCounts {
    pub live: usize,
}

/// GET /health — liveness plus the number of tracked jobs.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        jobs: JobCounts {
            live: state.jobs.len().await,
        },
    })
}
