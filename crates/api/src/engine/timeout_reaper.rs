//! Fails jobs whose worker never reported back.

use std::sync::Arc;

use seo_writer_core::lifecycle::{processing_duration_secs, JobStatus};
use seo_writer_core::staleness::{cutoff, timeout_message};
use seo_writer_core::types::Timestamp;
use seo_writer_db::models::job::TransitionFields;
use seo_writer_db::store::{JobStore, StoreError, StoreResult};

/// One-shot sweep over stale non-terminal jobs.
#[derive(Clone)]
pub struct TimeoutReaper {
    jobs: Arc<dyn JobStore>,
    staleness: chrono::Duration,
}

impl TimeoutReaper {
    pub fn new(jobs: Arc<dyn JobStore>, staleness: chrono::Duration) -> Self {
        Self { jobs, staleness }
    }

    /// Fail every job older than the staleness threshold that is still
    /// `pending` or `processing`. Returns how many jobs this sweep failed.
    ///
    /// Jobs that reach a terminal state or disappear between the scan and
    /// the write are skipped. A storage error on one job does not stop the
    /// sweep.
    pub async fn reap(&self, now: Timestamp) -> StoreResult<usize> {
        let stale = self.jobs.list_stale(cutoff(now, self.staleness)).await?;
        if stale.is_empty() {
            return Ok(0);
        }

        let message = timeout_message(self.staleness);
        let mut failed = 0;

        for job in stale {
            let fields = TransitionFields::failed(
                message.clone(),
                processing_duration_secs(job.created_at, now),
                now,
            );
            match self
                .jobs
                .transition(job.id, job.status, JobStatus::Failed, fields)
                .await
            {
                Ok(_) => {
                    failed += 1;
                    tracing::info!(job_id = %job.id, from = %job.status, "Job timed out");
                }
                Err(StoreError::Conflict { actual, .. }) => {
                    tracing::debug!(job_id = %job.id, status = %actual, "Stale job moved on before reaping");
                }
                Err(StoreError::NotFound { .. }) => {
                    tracing::debug!(job_id = %job.id, "Stale job deleted before reaping");
                }
                Err(e) => {
                    tracing::error!(job_id = %job.id, error = %e, "Failed to reap job");
                }
            }
        }

        Ok(failed)
    }
}
