//! Submission flow: quota, create, dispatch, record the dispatch outcome.

use std::sync::Arc;

use chrono::Utc;
use seo_writer_core::article::ArticleInput;
use seo_writer_core::lifecycle::{processing_duration_secs, JobStatus};
use seo_writer_core::quota::{QuotaDecision, ACTION_ARTICLE_GENERATED};
use seo_writer_core::types::OwnerId;
use seo_writer_db::models::job::{Job, TransitionFields};
use seo_writer_db::store::{JobStore, QuotaStore, StoreError};

use super::dispatcher::WorkerDispatch;

/// Why a submission produced no job.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Monthly quota exceeded ({used}/{limit})")]
    QuotaExceeded { used: i32, limit: i32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A job that was created. Dispatch may still have failed.
#[derive(Debug, Clone)]
pub enum Submission {
    /// The worker accepted the job; it is `processing`.
    Dispatched(Job),
    /// The worker could not be triggered; the job is `failed`.
    DispatchFailed(Job),
}

impl Submission {
    pub fn job(&self) -> &Job {
        match self {
            Submission::Dispatched(job) | Submission::DispatchFailed(job) => job,
        }
    }
}

/// Drives a validated submission through quota, storage and dispatch.
#[derive(Clone)]
pub struct JobSubmitter {
    jobs: Arc<dyn JobStore>,
    quota: Arc<dyn QuotaStore>,
    dispatcher: Arc<dyn WorkerDispatch>,
}

impl JobSubmitter {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        quota: Arc<dyn QuotaStore>,
        dispatcher: Arc<dyn WorkerDispatch>,
    ) -> Self {
        Self {
            jobs,
            quota,
            dispatcher,
        }
    }

    /// Count the submission against the owner's quota, create the job and
    /// dispatch it once.
    ///
    /// Quota is consumed as soon as the job is created, whatever the
    /// dispatch outcome.
    pub async fn submit(
        &self,
        owner_id: OwnerId,
        input: ArticleInput,
    ) -> Result<Submission, SubmitError> {
        match self.quota.check_and_increment(owner_id, Utc::now()).await? {
            QuotaDecision::Allowed { used, limit } => {
                tracing::debug!(owner_id = %owner_id, used, limit, "Quota reserved");
            }
            QuotaDecision::Exceeded { used, limit } => {
                tracing::info!(owner_id = %owner_id, used, limit, "Submission rejected, quota exceeded");
                return Err(SubmitError::QuotaExceeded { used, limit });
            }
        }

        let job = self.jobs.create(owner_id, input).await?;
        tracing::info!(job_id = %job.id, owner_id = %owner_id, "Job created");

        let outcome = self.dispatcher.send(&job).await;

        match outcome.failure_message() {
            None => self.mark_processing(job).await,
            Some(message) => self.mark_failed(job, message).await,
        }
    }

    async fn mark_processing(&self, job: Job) -> Result<Submission, SubmitError> {
        let result = self
            .jobs
            .transition(job.id, JobStatus::Pending, JobStatus::Processing, TransitionFields::processing())
            .await;

        let job = match result {
            Ok(job) => job,
            // The reaper got there first; report whatever state won.
            Err(StoreError::Conflict { actual, .. }) => {
                tracing::warn!(job_id = %job.id, status = %actual, "Job left pending before dispatch was recorded");
                self.jobs
                    .find_by_id(job.id)
                    .await?
                    .ok_or(StoreError::NotFound { id: job.id })?
            }
            Err(e) => return Err(e.into()),
        };

        if job.status != JobStatus::Processing {
            return Ok(Submission::DispatchFailed(job));
        }

        tracing::info!(job_id = %job.id, "Job dispatched to worker");

        if let Err(e) = self
            .quota
            .record_usage(job.owner_id, job.id, ACTION_ARTICLE_GENERATED)
            .await
        {
            tracing::error!(job_id = %job.id, error = %e, "Failed to record usage");
        }

        Ok(Submission::Dispatched(job))
    }

    async fn mark_failed(&self, job: Job, message: String) -> Result<Submission, SubmitError> {
        tracing::warn!(job_id = %job.id, error = %message, "Dispatch failed");

        let now = Utc::now();
        let fields = TransitionFields::failed(
            message,
            processing_duration_secs(job.created_at, now),
            now,
        );
        let job = match self
            .jobs
            .transition(job.id, JobStatus::Pending, JobStatus::Failed, fields)
            .await
        {
            Ok(job) => job,
            Err(StoreError::Conflict { .. }) => self
                .jobs
                .find_by_id(job.id)
                .await?
                .ok_or(StoreError::NotFound { id: job.id })?,
            Err(e) => return Err(e.into()),
        };
        Ok(Submission::DispatchFailed(job))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use seo_writer_db::memory::{InMemoryJobStore, InMemoryQuotaStore};
    use uuid::Uuid;

    use super::*;
    use crate::engine::dispatcher::DispatchOutcome;

    /// Returns a fixed outcome and remembers which jobs it saw.
    struct Scripted {
        outcome: DispatchOutcome,
        sent: Mutex<Vec<Job>>,
    }

    #[async_trait]
    impl WorkerDispatch for Scripted {
        async fn send(&self, job: &Job) -> DispatchOutcome {
            self.sent.lock().unwrap().push(job.clone());
            self.outcome.clone()
        }
    }

    fn setup(
        outcome: DispatchOutcome,
        limit: i32,
    ) -> (JobSubmitter, Arc<InMemoryQuotaStore>, Arc<Scripted>) {
        let quota = Arc::new(InMemoryQuotaStore::new(limit));
        let dispatcher = Arc::new(Scripted {
            outcome,
            sent: Mutex::new(Vec::new()),
        });
        let submitter = JobSubmitter::new(
            Arc::new(InMemoryJobStore::new()),
            quota.clone(),
            dispatcher.clone(),
        );
        (submitter, quota, dispatcher)
    }

    fn input() -> ArticleInput {
        ArticleInput {
            topic: "A".into(),
            keywords: Some("b,c".into()),
            word_limit: 1000,
        }
    }

    #[tokio::test]
    async fn accepted_dispatch_moves_job_to_processing() {
        let (submitter, quota, dispatcher) = setup(DispatchOutcome::Accepted, 10);
        let owner = Uuid::new_v4();

        let submission = submitter.submit(owner, input()).await.unwrap();
        let job = assert_matches!(submission, Submission::Dispatched(job) => job);
        assert_eq!(job.status, JobStatus::Processing);

        let sent = dispatcher.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].status, JobStatus::Pending);

        let log = quota.usage_log(owner).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].job_id, Some(job.id));
    }

    #[tokio::test]
    async fn network_failure_fails_job_and_keeps_quota_spent() {
        let (submitter, quota, _) =
            setup(DispatchOutcome::NetworkFailure("connection refused".into()), 10);
        let owner = Uuid::new_v4();

        let submission = submitter.submit(owner, input()).await.unwrap();
        let job = assert_matches!(submission, Submission::DispatchFailed(job) => job);
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(
            job.error_message.as_deref(),
            Some("Failed to connect to generation service: connection refused")
        );
        assert!(job.output_data.is_none());
        assert!(job.completed_at.is_some());

        assert_eq!(quota.usage(owner, Utc::now()).await.unwrap().used, 1);
        assert!(quota.usage_log(owner).unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_dispatch_fails_job() {
        let (submitter, _, _) =
            setup(DispatchOutcome::Rejected("worker returned HTTP 503".into()), 10);

        let submission = submitter.submit(Uuid::new_v4(), input()).await.unwrap();
        assert_eq!(submission.job().status, JobStatus::Failed);
        assert_eq!(
            submission.job().error_message.as_deref(),
            Some("Failed to trigger article generation workflow: worker returned HTTP 503")
        );
    }

    #[tokio::test]
    async fn exceeded_quota_creates_nothing() {
        let (submitter, _, dispatcher) = setup(DispatchOutcome::Accepted, 1);
        let owner = Uuid::new_v4();

        submitter.submit(owner, input()).await.unwrap();
        let result = submitter.submit(owner, input()).await;
        assert_matches!(result, Err(SubmitError::QuotaExceeded { used: 1, limit: 1 }));
        assert_eq!(dispatcher.sent.lock().unwrap().len(), 1);
    }

    /// Accepts the job, but only after the reaper has already failed it.
    struct OvertakenByReaper {
        jobs: Arc<InMemoryJobStore>,
    }

    #[async_trait]
    impl WorkerDispatch for OvertakenByReaper {
        async fn send(&self, job: &Job) -> DispatchOutcome {
            let now = Utc::now();
            self.jobs
                .transition(
                    job.id,
                    JobStatus::Pending,
                    JobStatus::Failed,
                    TransitionFields::failed("Job timed out after 10 minutes", 600, now),
                )
                .await
                .unwrap();
            DispatchOutcome::Accepted
        }
    }

    #[tokio::test]
    async fn accept_after_reaper_win_records_no_usage() {
        let jobs = Arc::new(InMemoryJobStore::new());
        let quota = Arc::new(InMemoryQuotaStore::new(10));
        let submitter = JobSubmitter::new(
            jobs.clone(),
            quota.clone(),
            Arc::new(OvertakenByReaper { jobs: jobs.clone() }),
        );
        let owner = Uuid::new_v4();

        let submission = submitter.submit(owner, input()).await.unwrap();
        let job = assert_matches!(submission, Submission::DispatchFailed(job) => job);
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("Job timed out after 10 minutes"));

        assert!(quota.usage_log(owner).unwrap().is_empty());
        assert_eq!(quota.usage(owner, Utc::now()).await.unwrap().used, 1);
    }
}
