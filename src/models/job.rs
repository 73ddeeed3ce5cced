use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

/// Status of a restyle job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// A tracked image restyling request and its outcome.
///
/// `result_image` is only set on a completed job and `error` only on a failed
/// one. Both are written by the single terminal transition in
/// [`JobStore::update`](crate::services::job_store::JobStore::update).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(skip)]
    pub id: Uuid,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn new(id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            status: JobStatus::Processing,
            result_image: None,
            error: None,
            created_at,
        }
    }
}

/// The fields a terminal transition merges into a job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobUpdate {
    Completed { result_image: String },
    Failed { error: String },
}

impl JobUpdate {
    pub fn status(&self) -> JobStatus {
        match self {
            JobUpdate::Completed { .. } => JobStatus::Completed,
            JobUpdate::Failed { .. } => JobStatus::Failed,
        }
    }

    /// Merge into `job`, leaving `created_at` untouched.
    pub(crate) fn apply(self, job: &mut Job) {
        job.status = self.status();
        match self {
            JobUpdate::Completed { result_image } => {
                job.result_image = Some(result_image);
                job.error = None;
            }
            JobUpdate::Failed { error } => {
                job.error = Some(error);
                job.result_image = None;
            }
        }
    }
}
