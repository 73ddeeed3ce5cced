//! Image restyling service
//!
//! Accepts an uploaded image plus a style directive, hands it to a multimodal
//! generation API on a background task, and lets the caller poll the job until
//! it completes, fails or expires.

pub mod app_state;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use axum::extract::DefaultBodyLimit;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{middleware, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use app_state::AppState;

/// Room for multipart boundaries and text fields on top of the image itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the HTTP surface over `state`.
pub fn build_router(state: AppState, prometheus: PrometheusHandle) -> Router {
    let body_limit = state.max_upload_bytes + MULTIPART_OVERHEAD;

    let submit = post(routes::process::submit_image).route_layer(middleware::from_fn_with_state(
        state.clone(),
        routes::process::enforce_rate_limit,
    ));

    Router::new()
        // Upload page (embedded at compile time)
        .route("/", get(|| async { Html(include_str!("../static/index.html")) }))
        .route("/health", get(routes::health::health_check))
        .route("/api/process-image", submit)
        .route(
            "/api/process-status/{task_id}",
            get(routes::process::get_task_status),
        )
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(body_limit))
}
