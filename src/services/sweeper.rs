//! Periodic removal of expired jobs.
//!
//! Spawned once at start-up; deletes every job older than the retention
//! window on a fixed interval until the [`CancellationToken`] fires.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::services::job_store::JobStore;

pub async fn run(
    store: Arc<JobStore>,
    interval: Duration,
    retention: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        retention_secs = retention.as_secs(),
        "Job sweeper started"
    );

    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately; nothing can be expired yet.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Job sweeper stopping");
                break;
            }
            _ = ticker.tick() => {
                let removed = store.sweep(retention).await;
                let live = store.len().await;
                metrics::counter!("restyle_jobs_swept_total").increment(removed as u64);
                metrics::gauge!("restyle_jobs_live").set(live as f64);
                if removed > 0 {
                    tracing::info!(removed, live, "Swept expired jobs");
                } else {
                    tracing::debug!(live, "No expired jobs to sweep");
                }
            }
        }
    }
}
