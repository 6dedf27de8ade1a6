//! Storage contracts for jobs and quota counters.
//!
//! Every lifecycle write goes through [`JobStore::transition`], a
//! compare-and-set on the job's status. It is the single synchronization
//! point between the dispatch path, the callback reconciler and the timeout
//! reaper.

use async_trait::async_trait;
use seo_writer_core::article::{ArticleInput, ArticleOutput};
use seo_writer_core::lifecycle::{JobStatus, TransitionError};
use seo_writer_core::quota::{QuotaCounter, QuotaDecision};
use seo_writer_core::types::{DbId, OwnerId, Timestamp};

use crate::models::job::{Job, JobListQuery, JobPage, TransitionFields};

/// Errors raised by job and quota stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Job {id} not found")]
    NotFound { id: DbId },

    /// The job was not in the expected status; nothing was written.
    #[error("Job {id} is {actual}, expected {expected}")]
    Conflict {
        id: DbId,
        expected: JobStatus,
        actual: JobStatus,
    },

    #[error(transparent)]
    Lifecycle(#[from] TransitionError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be decoded into a domain value.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// True when the write lost a race against another writer.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable keyed storage for job records.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new `pending` job.
    async fn create(&self, owner_id: OwnerId, input: ArticleInput) -> StoreResult<Job>;

    async fn find_by_id(&self, id: DbId) -> StoreResult<Option<Job>>;

    /// Owner-scoped listing, newest first.
    async fn list_by_owner(&self, owner_id: OwnerId, query: &JobListQuery) -> StoreResult<JobPage>;

    /// Atomically move a job from `expected` to `next`.
    ///
    /// Illegal edges fail with [`StoreError::Lifecycle`] before storage is
    /// touched. A job whose current status differs from `expected` yields
    /// [`StoreError::Conflict`] and is left unchanged.
    async fn transition(
        &self,
        id: DbId,
        expected: JobStatus,
        next: JobStatus,
        fields: TransitionFields,
    ) -> StoreResult<Job>;

    /// Non-terminal jobs created before `cutoff`, oldest first.
    async fn list_stale(&self, cutoff: Timestamp) -> StoreResult<Vec<Job>>;

    /// Owner content edit of a completed job's output. Not a lifecycle event.
    async fn update_output(
        &self,
        id: DbId,
        owner_id: OwnerId,
        output: ArticleOutput,
    ) -> StoreResult<Job>;

    /// Remove an owned job regardless of status. Returns `false` when no
    /// owned job with that id exists.
    async fn delete(&self, id: DbId, owner_id: OwnerId) -> StoreResult<bool>;
}

/// Per-owner monthly submission quota.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Roll over if due, then reject at the limit or count one submission,
    /// all as one atomic step.
    async fn check_and_increment(&self, owner_id: OwnerId, now: Timestamp)
        -> StoreResult<QuotaDecision>;

    /// Current usage without counting anything.
    async fn usage(&self, owner_id: OwnerId, now: Timestamp) -> StoreResult<QuotaCounter>;

    /// Append an entry to the usage ledger.
    async fn record_usage(
        &self,
        owner_id: OwnerId,
        job_id: DbId,
        action_type: &str,
    ) -> StoreResult<()>;
}

/// Validate an edge before any storage round-trip.
pub(crate) fn validate_edge(expected: JobStatus, next: JobStatus) -> StoreResult<()> {
    seo_writer_core::lifecycle::check_transition(expected, next)?;
    Ok(())
}
