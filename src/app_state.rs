use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{
    job_store::JobStore, orchestrator::JobOrchestrator, rate_limit::RateLimiter,
    upstream::UpstreamClient,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<JobStore>,
    pub orchestrator: Arc<JobOrchestrator>,
    pub rate_limiter: Arc<RateLimiter>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        jobs: Arc<JobStore>,
        orchestrator: JobOrchestrator,
        rate_limiter: RateLimiter,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            jobs,
            orchestrator: Arc::new(orchestrator),
            rate_limiter: Arc::new(rate_limiter),
            max_upload_bytes,
        }
    }

    /// Wire every service from configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let jobs = Arc::new(JobStore::new());
        let upstream = UpstreamClient::new(
            config.api_endpoint.clone(),
            config.api_key.clone(),
            config.retry_policy(),
        );
        let orchestrator = JobOrchestrator::new(
            Arc::clone(&jobs),
            Arc::new(upstream),
            config.api_model.clone(),
            config.max_tokens,
        );
        let rate_limiter =
            RateLimiter::new(config.rate_limit_window(), config.rate_limit_max_requests);

        Self::new(jobs, orchestrator, rate_limiter, config.max_upload_bytes)
    }
}
