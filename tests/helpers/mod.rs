#![allow(dead_code)]

//! Test helpers: an in-process server wired to a mock upstream, plus the
//! client calls a browser would make against it.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;
use reqwest::multipart;
use restyle_server::{app_state::AppState, build_router, config::AppConfig};
use serde::Deserialize;
use tokio::time::sleep;
use uuid::Uuid;

/// Response from POST /api/process-image
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub success: bool,
    pub status: String,
    pub task_id: Uuid,
}

/// Response from GET /api/process-status/{task_id}
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusResponse {
    pub status: String,
    pub result_image: Option<String>,
    pub error: Option<String>,
    pub created_at: String,
}

/// Configuration pointing at `upstream_uri` with retry delays shrunk for tests.
pub fn test_config(upstream_uri: &str) -> AppConfig {
    AppConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        api_endpoint: format!("{upstream_uri}/v1/chat/completions"),
        api_key: "sk-test".to_string(),
        api_model: "image-model".to_string(),
        max_tokens: 300,
        rate_limit_window_ms: 24 * 60 * 60 * 1000,
        rate_limit_max_requests: 5,
        upstream_max_attempts: 3,
        upstream_timeout_secs: 5,
        upstream_retry_delay_secs: 0,
        job_retention_secs: 3600,
        sweep_interval_secs: 900,
        max_upload_bytes: 5 * 1024 * 1024,
    }
}

/// Router over fresh state, with a metrics handle that is not installed globally.
pub fn test_router(config: &AppConfig) -> axum::Router {
    let prometheus = PrometheusBuilder::new().build_recorder().handle();
    build_router(AppState::from_config(config), prometheus)
}

/// Serve the app on an ephemeral port and return its base URL.
pub async fn spawn_app(config: &AppConfig) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("listener has no address");
    let app = test_router(config);

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("test server failed");
    });

    format!("http://{addr}")
}

/// Upload an image with an optional style and custom prompt.
pub async fn upload_image(
    client: &reqwest::Client,
    base_url: &str,
    image: Vec<u8>,
    style: Option<&str>,
    custom_prompt: Option<&str>,
) -> Result<reqwest::Response, reqwest::Error> {
    let mut form = multipart::Form::new().part(
        "image",
        multipart::Part::bytes(image)
            .file_name("photo.png")
            .mime_str("image/png")?,
    );
    if let Some(s) = style {
        form = form.text("style", s.to_string());
    }
    if let Some(p) = custom_prompt {
        form = form.text("customPrompt", p.to_string());
    }

    client
        .post(format!("{base_url}/api/process-image"))
        .multipart(form)
        .send()
        .await
}

/// Poll a task until it is completed or failed (with timeout)
pub async fn poll_job_status(
    client: &reqwest::Client,
    base_url: &str,
    task_id: Uuid,
    timeout: Duration,
) -> Result<TaskStatusResponse, Box<dyn std::error::Error>> {
    let deadline = tokio::time::Instant::now() + timeout;

    while tokio::time::Instant::now() < deadline {
        let response = client
            .get(format!("{base_url}/api/process-status/{task_id}"))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(format!("Status check failed: {error_text}").into());
        }

        let task = response.json::<TaskStatusResponse>().await?;
        match task.status.as_str() {
            "completed" | "failed" => return Ok(task),
            "processing" => sleep(Duration::from_millis(25)).await,
            other => return Err(format!("Unknown task status: {other}").into()),
        }
    }

    Err(format!("Task did not finish within {timeout:?}").into())
}
