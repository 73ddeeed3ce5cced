use garde::Validate;
use serde::Serialize;
use uuid::Uuid;

use crate::models::job::JobStatus;

/// Text fields of a `POST /api/process-image` upload.
#[derive(Debug, Default, Validate)]
pub struct StyleDirective {
    #[garde(length(chars, max = 2000))]
    pub style: Option<String>,

    #[garde(length(chars, max = 2000))]
    pub custom_prompt: Option<String>,
}

impl StyleDirective {
    /// The prompt sent upstream: a preset style wins over a custom prompt.
    /// Blank values count as absent.
    pub fn prompt(&self) -> Option<&str> {
        [self.style.as_deref(), self.custom_prompt.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

/// Response after submitting an image.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub success: bool,
    pub message: String,
    pub status: JobStatus,
    pub task_id: Uuid,
}

impl ProcessResponse {
    pub fn accepted(task_id: Uuid) -> Self {
        Self {
            success: true,
            message: "Image is being processed, please wait...".to_string(),
            status: JobStatus::Processing,
            task_id,
        }
    }
}
