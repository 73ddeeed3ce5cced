use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Multipart, Path, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum::Json;
use garde::Validate;
use image::ImageFormat;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::models::job::Job;
use crate::models::process::{ProcessResponse, StyleDirective};

/// POST /api/process-image — Upload an image with a style and start a restyle job.
pub async fn submit_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<ProcessResponse>> {
    let mut image_data: Option<Vec<u8>> = None;
    let mut directive = StyleDirective::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid upload: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid upload: {e}")))?;
                if data.len() > state.max_upload_bytes {
                    return Err(AppError::Validation("Image is too large".to_string()));
                }
                match image::guess_format(&data) {
                    Ok(ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP) => {}
                    _ => return Err(AppError::UnsupportedMedia),
                }
                image_data = Some(data.to_vec());
            }
            Some("style") => directive.style = Some(text_field(field).await?),
            Some("customPrompt") => directive.custom_prompt = Some(text_field(field).await?),
            _ => {}
        }
    }

    let image_data = image_data.ok_or_else(|| AppError::Validation("Please upload an image".to_string()))?;
    directive
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let prompt = directive.prompt().ok_or_else(|| {
        AppError::Validation("Please choose a style or enter a custom prompt".to_string())
    })?;

    let task_id = state.orchestrator.process_image(image_data, prompt).await?;
    Ok(Json(ProcessResponse::accepted(task_id)))
}

async fn text_field(field: axum::extract::multipart::Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid form field: {e}")))
}

/// GET /api/process-status/{task_id} — Poll a job.
///
/// Unknown, expired and malformed ids all answer 404.
pub async fn get_task_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> AppResult<Json<Job>> {
    let id = Uuid::parse_str(&task_id).map_err(|_| AppError::NotFound)?;
    let job = state.jobs.get(id).await?;
    Ok(Json(job))
}

/// Per-client quota for submissions, checked before the upload is read.
///
/// The client is identified by the first `X-Forwarded-For` entry, falling back
/// to the peer address.
pub async fn enforce_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_identity(&request);
    if let Err(exceeded) = state.rate_limiter.check(&client).await {
        metrics::counter!("restyle_jobs_rate_limited_total").increment(1);
        tracing::warn!(client = %client, "Submission quota exceeded");
        return Err(AppError::RateLimited {
            retry_after: exceeded.retry_after,
        });
    }
    Ok(next.run(request).await)
}

fn client_identity(request: &Request) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}
