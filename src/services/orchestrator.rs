use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use crate::models::job::JobUpdate;
use crate::models::upstream::GenerationRequest;
use crate::services::extractor::{self, ExtractError};
use crate::services::job_store::JobStore;
use crate::services::upstream::{UpstreamClient, UpstreamError};

/// Message stored on a failed job. Details only go to the logs.
pub const GENERIC_FAILURE_MESSAGE: &str = "Image processing failed, please try again later";

/// Creates jobs and drives each one to a terminal state in the background.
pub struct JobOrchestrator {
    store: Arc<JobStore>,
    upstream: Arc<UpstreamClient>,
    model: String,
    max_tokens: u32,
}

impl JobOrchestrator {
    pub fn new(
        store: Arc<JobStore>,
        upstream: Arc<UpstreamClient>,
        model: String,
        max_tokens: u32,
    ) -> Self {
        Self {
            store,
            upstream,
            model,
            max_tokens,
        }
    }

    /// Register a job for `image_bytes` and start processing it.
    ///
    /// Returns the job id as soon as the record exists; the upstream call
    /// happens on a spawned task.
    pub async fn process_image(
        &self,
        image_bytes: Vec<u8>,
        prompt: &str,
    ) -> Result<Uuid, ProcessError> {
        if image_bytes.is_empty() {
            return Err(ProcessError::Validation("Please upload an image".to_string()));
        }
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ProcessError::Validation(
                "Please choose a style or enter a custom prompt".to_string(),
            ));
        }

        let job_id = self.store.create().await;
        metrics::counter!("restyle_jobs_submitted_total").increment(1);
        metrics::gauge!("restyle_jobs_live").set(self.store.len().await as f64);

        let request = GenerationRequest::new(&self.model, prompt, &image_bytes, self.max_tokens);
        let span = tracing::info_span!("restyle_job", job_id = %job_id);
        let upstream = Arc::clone(&self.upstream);
        let work = async move { run_job(&upstream, &request).await };
        tokio::spawn(supervise(Arc::clone(&self.store), job_id, work).instrument(span));

        info!(job_id = %job_id, prompt_len = prompt.len(), "Job accepted");
        Ok(job_id)
    }
}

/// Fault boundary for one job: runs the work on its own task so a panic is
/// observed here as a `JoinError` and still ends in a terminal state.
async fn supervise<F>(store: Arc<JobStore>, job_id: Uuid, work: F)
where
    F: Future<Output = Result<String, JobError>> + Send + 'static,
{
    let started = Instant::now();
    let work = tokio::spawn(work.in_current_span());

    let update = match work.await {
        Ok(Ok(result_image)) => {
            metrics::counter!("restyle_jobs_completed_total").increment(1);
            info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Job completed successfully"
            );
            JobUpdate::Completed { result_image }
        }
        Ok(Err(e)) => {
            metrics::counter!("restyle_jobs_failed_total").increment(1);
            error!(error = %e, "Job processing failed");
            JobUpdate::Failed {
                error: GENERIC_FAILURE_MESSAGE.to_string(),
            }
        }
        Err(join_error) => {
            metrics::counter!("restyle_jobs_failed_total").increment(1);
            error!(error = %join_error, "Job task aborted");
            JobUpdate::Failed {
                error: GENERIC_FAILURE_MESSAGE.to_string(),
            }
        }
    };
    metrics::histogram!("restyle_job_processing_seconds").record(started.elapsed().as_secs_f64());

    // The sweeper may have removed the record meanwhile; nothing to do then.
    if let Err(e) = store.update(job_id, update).await {
        warn!(error = %e, "Dropping job outcome");
    }
}

async fn run_job(upstream: &UpstreamClient, request: &GenerationRequest) -> Result<String, JobError> {
    let raw = upstream.submit(request).await?;
    let image = extractor::extract_image_reference(&raw).inspect_err(|e| {
        warn!(error = %e, body_len = raw.len(), "Could not extract image from upstream response");
    })?;
    info!(result_len = image.len(), "Found image reference in upstream response");
    Ok(image)
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("{0}")]
    Validation(String),
}

/// Internal failure of a background job; never shown to clients.
#[derive(Debug, thiserror::Error)]
enum JobError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::{Job, JobStatus};
    use crate::services::upstream::RetryPolicy;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            attempt_timeout: Duration::from_millis(500),
            backoff_step: Duration::from_millis(10),
        }
    }

    fn orchestrator(server: &MockServer) -> (JobOrchestrator, Arc<JobStore>) {
        let store = Arc::new(JobStore::new());
        let upstream = Arc::new(UpstreamClient::new(
            format!("{}/v1/chat/completions", server.uri()),
            "sk-test".to_string(),
            fast_policy(),
        ));
        let orchestrator =
            JobOrchestrator::new(Arc::clone(&store), upstream, "image-model".to_string(), 300);
        (orchestrator, store)
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        })
    }

    async fn wait_for_terminal(store: &JobStore, id: Uuid) -> Job {
        for _ in 0..200 {
            let job = store.get(id).await.expect("job should exist");
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {id} never left processing");
    }

    #[tokio::test]
    async fn test_returns_id_before_upstream_responds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("![r](https://cdn.example.com/slow.png)"))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
        let (orchestrator, store) = orchestrator(&server);

        let id = orchestrator
            .process_image(b"jpeg".to_vec(), "Sketch")
            .await
            .unwrap();

        assert_eq!(store.get(id).await.unwrap().status, JobStatus::Processing);

        let job = wait_for_terminal(&store, id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result_image.as_deref(), Some("https://cdn.example.com/slow.png"));
        assert!(job.error.is_none());
    }

    #[tokio::test]
    async fn test_missing_image_in_response_fails_with_generic_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Sorry, I can't.")))
            .mount(&server)
            .await;
        let (orchestrator, store) = orchestrator(&server);

        let id = orchestrator
            .process_image(b"jpeg".to_vec(), "Sketch")
            .await
            .unwrap();
        let job = wait_for_terminal(&store, id).await;

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some(GENERIC_FAILURE_MESSAGE));
        assert!(job.result_image.is_none());
    }

    #[tokio::test]
    async fn test_exhausted_retries_fail_job() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("secret upstream detail"))
            .expect(3)
            .mount(&server)
            .await;
        let (orchestrator, store) = orchestrator(&server);

        let id = orchestrator
            .process_image(b"jpeg".to_vec(), "Sketch")
            .await
            .unwrap();
        let job = wait_for_terminal(&store, id).await;

        assert_eq!(job.status, JobStatus::Failed);
        let error = job.error.unwrap();
        assert_eq!(error, GENERIC_FAILURE_MESSAGE);
        assert!(!error.contains("secret"));
    }

    async fn exploding_work() -> Result<String, JobError> {
        panic!("extractor blew up")
    }

    #[tokio::test]
    async fn test_panicking_work_ends_failed() {
        let store = Arc::new(JobStore::new());
        let id = store.create().await;

        supervise(Arc::clone(&store), id, exploding_work()).await;

        let job = store.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some(GENERIC_FAILURE_MESSAGE));
        assert!(job.result_image.is_none());
    }

    #[tokio::test]
    async fn test_validation_creates_no_job() {
        let server = MockServer::start().await;
        let (orchestrator, store) = orchestrator(&server);

        let result = orchestrator.process_image(b"jpeg".to_vec(), "   ").await;
        assert!(matches!(result, Err(ProcessError::Validation(_))));

        let result = orchestrator.process_image(Vec::new(), "Sketch").await;
        assert!(matches!(result, Err(ProcessError::Validation(_))));

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_swept_job_outcome_is_dropped_quietly() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("![r](https://cdn.example.com/x.png)"))
                    .set_delay(Duration::from_millis(100)),
            )
            .mount(&server)
            .await;
        let (orchestrator, store) = orchestrator(&server);

        let id = orchestrator
            .process_image(b"jpeg".to_vec(), "Sketch")
            .await
            .unwrap();
        store
            .sweep_at(chrono::Utc::now() + chrono::Duration::hours(2), Duration::from_secs(3600))
            .await;

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(store.get(id).await.is_err());
        assert!(store.is_empty().await);
    }
}
