use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::job::{Job, JobStatus, JobUpdate};

/// In-memory store of restyle jobs.
///
/// All state is process-local and lost on restart. Mutations take the write
/// lock, so `create`, `update` and `sweep` never interleave; `get` hands out
/// clones under the read lock.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new job in `processing` state and return its id.
    pub async fn create(&self) -> Uuid {
        self.create_at(Utc::now()).await
    }

    pub async fn create_at(&self, now: DateTime<Utc>) -> Uuid {
        let mut jobs = self.jobs.write().await;
        let mut id = Uuid::new_v4();
        while jobs.contains_key(&id) {
            id = Uuid::new_v4();
        }
        jobs.insert(id, Job::new(id, now));
        debug!(job_id = %id, "Job created");
        id
    }

    /// Apply the terminal transition for `id` and return the resulting snapshot.
    ///
    /// Only the first terminal transition is applied; later ones fail with
    /// [`StoreError::AlreadyFinished`] and leave the record as it was.
    pub async fn update(&self, id: Uuid, update: JobUpdate) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or_else(|| {
            warn!(job_id = %id, "Job update failed: job not found");
            StoreError::NotFound(id)
        })?;

        if job.status.is_terminal() {
            warn!(
                job_id = %id,
                current_status = %job.status,
                rejected_status = %update.status(),
                "Job update rejected: job already finished"
            );
            return Err(StoreError::AlreadyFinished {
                id,
                status: job.status,
            });
        }

        let old_status = job.status;
        update.apply(job);
        info!(
            job_id = %id,
            old_status = %old_status,
            new_status = %job.status,
            "Job updated"
        );
        Ok(job.clone())
    }

    pub async fn get(&self, id: Uuid) -> Result<Job, StoreError> {
        self.jobs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    /// Delete every job created more than `max_age` ago. Returns how many were removed.
    pub async fn sweep(&self, max_age: Duration) -> usize {
        self.sweep_at(Utc::now(), max_age).await
    }

    pub async fn sweep_at(&self, now: DateTime<Utc>, max_age: Duration) -> usize {
        let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        let cutoff = now.checked_sub_signed(max_age).unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| job.created_at >= cutoff);
        before - jobs.len()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Job {0} not found or expired")]
    NotFound(Uuid),

    #[error("Job {id} already finished with status {status}")]
    AlreadyFinished { id: Uuid, status: JobStatus },
}
