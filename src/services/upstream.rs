use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::{info, warn};

use crate::models::upstream::GenerationRequest;

/// Attempt bound, per-attempt timeout and linear backoff for upstream calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    /// Delay after failed attempt `n` is `backoff_step * n`.
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(15 * 60),
            backoff_step: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_step.checked_mul(attempt).unwrap_or(Duration::MAX)
    }
}

/// Client for the multimodal generation API.
pub struct UpstreamClient {
    http: Client,
    endpoint: String,
    api_key: String,
    policy: RetryPolicy,
}

impl UpstreamClient {
    pub fn new(endpoint: String, api_key: String, policy: RetryPolicy) -> Self {
        Self {
            http: Client::new(),
            endpoint,
            api_key,
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Send `request` upstream, retrying transport failures, timeouts and
    /// non-success statuses. Returns the body of the first successful response.
    pub async fn submit(&self, request: &GenerationRequest) -> Result<String, UpstreamError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let started = Instant::now();
            info!(
                endpoint = %self.endpoint,
                model = %request.model,
                attempt,
                max_attempts = self.policy.max_attempts,
                prompt_len = request.prompt().len(),
                image_payload_len = request.image_payload_len(),
                "Sending upstream generation request"
            );

            let outcome =
                match tokio::time::timeout(self.policy.attempt_timeout, self.send_once(request))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(UpstreamError::Timeout(self.policy.attempt_timeout)),
                };
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(body) => {
                    info!(
                        attempt,
                        elapsed_ms,
                        body_len = body.len(),
                        "Upstream request succeeded"
                    );
                    return Ok(body);
                }
                Err(e) if attempt >= self.policy.max_attempts => {
                    warn!(attempt, elapsed_ms, error = %e, "Upstream request failed, giving up");
                    return Err(UpstreamError::Unavailable {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.policy.delay_after(attempt);
                    warn!(
                        attempt,
                        elapsed_ms,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %e,
                        "Upstream request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn send_once(&self, request: &GenerationRequest) -> Result<String, UpstreamError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        info!(status = status.as_u16(), "Upstream response status");

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.text().await?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("upstream unavailable after {attempts} attempts: {last}")]
    Unavailable {
        attempts: u32,
        last: Box<UpstreamError>,
    },
}
