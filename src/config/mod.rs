use std::time::Duration;

use serde::Deserialize;

use crate::services::upstream::RetryPolicy;

#[derive(Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Chat-completions endpoint of the generation API
    pub api_endpoint: String,

    /// Bearer credential for the generation API
    pub api_key: String,

    /// Model identifier sent with every request
    pub api_model: String,

    /// Token budget for the upstream response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Length of the per-client submission window in milliseconds
    #[serde(default = "default_rate_limit_window_ms")]
    pub rate_limit_window_ms: u64,

    /// Submissions allowed per client within one window
    #[serde(default = "default_rate_limit_max_requests")]
    pub rate_limit_max_requests: u32,

    #[serde(default = "default_upstream_max_attempts")]
    pub upstream_max_attempts: u32,

    /// Per-attempt timeout for the upstream call
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,

    /// Linear backoff step between upstream attempts
    #[serde(default = "default_upstream_retry_delay_secs")]
    pub upstream_retry_delay_secs: u64,

    /// Jobs older than this are removed by the sweeper, whatever their status
    #[serde(default = "default_job_retention_secs")]
    pub job_retention_secs: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Upper bound for an uploaded image
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_max_tokens() -> u32 {
    300
}

fn default_rate_limit_window_ms() -> u64 {
    24 * 60 * 60 * 1000
}

fn default_rate_limit_max_requests() -> u32 {
    5
}

fn default_upstream_max_attempts() -> u32 {
    3
}

fn default_upstream_timeout_secs() -> u64 {
    15 * 60
}

fn default_upstream_retry_delay_secs() -> u64 {
    5
}

fn default_job_retention_secs() -> u64 {
    60 * 60
}

fn default_sweep_interval_secs() -> u64 {
    15 * 60
}

fn default_max_upload_bytes() -> usize {
    5 * 1024 * 1024
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.upstream_max_attempts.max(1),
            attempt_timeout: Duration::from_secs(self.upstream_timeout_secs),
            backoff_step: Duration::from_secs(self.upstream_retry_delay_secs),
        }
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit_window_ms)
    }

    pub fn job_retention(&self) -> Duration {
        Duration::from_secs(self.job_retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        // A zero period would make the sweeper's interval panic.
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// Debug output never includes the API key.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("api_endpoint", &self.api_endpoint)
            .field("api_key", &"<redacted>")
            .field("api_model", &self.api_model)
            .field("max_tokens", &self.max_tokens)
            .field("rate_limit_window_ms", &self.rate_limit_window_ms)
            .field("rate_limit_max_requests", &self.rate_limit_max_requests)
            .field("upstream_max_attempts", &self.upstream_max_attempts)
            .field("upstream_timeout_secs", &self.upstream_timeout_secs)
            .field("upstream_retry_delay_secs", &self.upstream_retry_delay_secs)
            .field("job_retention_secs", &self.job_retention_secs)
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}
