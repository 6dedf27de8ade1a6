//! PostgreSQL implementation of [`JobStore`] over the `jobs` table.
//!
//! Status transitions are single conditional `UPDATE ... WHERE status_id = $n`
//! statements, so concurrent writers resolve by row lock: the first commit
//! wins and later ones match zero rows.

use async_trait::async_trait;
use seo_writer_core::article::{ArticleInput, ArticleOutput};
use seo_writer_core::lifecycle::{JobStatus, StatusId, ACTIVE_STATUSES};
use seo_writer_core::pagination::{clamp_limit, clamp_offset, page_number, DEFAULT_LIMIT, MAX_LIMIT};
use seo_writer_core::types::{DbId, OwnerId, Timestamp};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use crate::models::job::{Job, JobListQuery, JobPage, TransitionFields};
use crate::store::{validate_edge, JobStore, StoreError, StoreResult};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, owner_id, status_id, input_data, output_data, error_message, \
    processing_duration_secs, created_at, updated_at, completed_at";

/// Raw `jobs` row before status and payload decoding.
#[derive(Debug, FromRow)]
struct JobRow {
    id: DbId,
    owner_id: OwnerId,
    status_id: StatusId,
    input_data: Json<ArticleInput>,
    output_data: Option<Json<ArticleOutput>>,
    error_message: Option<String>,
    processing_duration_secs: Option<i32>,
    created_at: Timestamp,
    updated_at: Timestamp,
    completed_at: Option<Timestamp>,
}

impl TryFrom<JobRow> for Job {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status = JobStatus::try_from(row.status_id)
            .map_err(|e| StoreError::Corrupt(format!("job {}: {e}", row.id)))?;
        Ok(Job {
            id: row.id,
            owner_id: row.owner_id,
            status,
            input_data: row.input_data.0,
            output_data: row.output_data.map(|o| o.0),
            error_message: row.error_message,
            processing_duration_secs: row.processing_duration_secs,
            created_at: row.created_at,
            updated_at: row.updated_at,
            completed_at: row.completed_at,
        })
    }
}

fn decode_status(id: DbId, status_id: StatusId) -> StoreResult<JobStatus> {
    JobStatus::try_from(status_id).map_err(|e| StoreError::Corrupt(format!("job {id}: {e}")))
}

/// Job repository backed by PostgreSQL.
#[derive(Clone)]
pub struct JobRepo {
    pool: PgPool,
}

impl JobRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Current status of a job, optionally scoped to an owner.
    async fn current_status(&self, id: DbId, owner_id: Option<OwnerId>) -> StoreResult<Option<JobStatus>> {
        let status_id: Option<StatusId> = sqlx::query_scalar(
            "SELECT status_id FROM jobs WHERE id = $1 AND ($2::UUID IS NULL OR owner_id = $2)",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        status_id.map(|s| decode_status(id, s)).transpose()
    }

    /// Turn a zero-row conditional update into `NotFound` or `Conflict`.
    async fn explain_miss(
        &self,
        id: DbId,
        owner_id: Option<OwnerId>,
        expected: JobStatus,
    ) -> StoreError {
        match self.current_status(id, owner_id).await {
            Ok(Some(actual)) => StoreError::Conflict {
                id,
                expected,
                actual,
            },
            Ok(None) => StoreError::NotFound { id },
            Err(e) => e,
        }
    }
}

#[async_trait]
impl JobStore for JobRepo {
    async fn create(&self, owner_id: OwnerId, input: ArticleInput) -> StoreResult<Job> {
        let query = format!(
            "INSERT INTO jobs (id, owner_id, status_id, input_data) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(uuid::Uuid::now_v7())
            .bind(owner_id)
            .bind(JobStatus::Pending.id())
            .bind(Json(&input))
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn find_by_id(&self, id: DbId) -> StoreResult<Option<Job>> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Job::try_from)
            .transpose()
    }

    async fn list_by_owner(&self, owner_id: OwnerId, params: &JobListQuery) -> StoreResult<JobPage> {
        let limit = clamp_limit(params.limit, DEFAULT_LIMIT, MAX_LIMIT);
        let offset = clamp_offset(params.offset);

        let status_filter = if params.status.is_some() {
            "AND status_id = $2"
        } else {
            ""
        };
        let (limit_idx, offset_idx) = if params.status.is_some() { (3, 4) } else { (2, 3) };

        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             WHERE owner_id = $1 {status_filter} \
             ORDER BY created_at DESC, id DESC \
             LIMIT ${limit_idx} OFFSET ${offset_idx}"
        );
        let count_query = format!("SELECT COUNT(*) FROM jobs WHERE owner_id = $1 {status_filter}");

        let mut q = sqlx::query_as::<_, JobRow>(&query).bind(owner_id);
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_query).bind(owner_id);
        if let Some(status) = params.status {
            q = q.bind(status.id());
            count_q = count_q.bind(status.id());
        }

        let rows = q.bind(limit).bind(offset).fetch_all(&self.pool).await?;
        let total = count_q.fetch_one(&self.pool).await?;

        let jobs = rows
            .into_iter()
            .map(Job::try_from)
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(JobPage {
            jobs,
            total,
            page: page_number(offset, limit),
            limit,
        })
    }

    async fn transition(
        &self,
        id: DbId,
        expected: JobStatus,
        next: JobStatus,
        fields: TransitionFields,
    ) -> StoreResult<Job> {
        validate_edge(expected, next)?;

        let query = format!(
            "UPDATE jobs \
             SET status_id = $3, \
                 output_data = COALESCE($4, output_data), \
                 error_message = COALESCE($5, error_message), \
                 processing_duration_secs = COALESCE($6, processing_duration_secs), \
                 completed_at = COALESCE($7, completed_at), \
                 updated_at = NOW() \
             WHERE id = $1 AND status_id = $2 \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .bind(expected.id())
            .bind(next.id())
            .bind(fields.output_data.as_ref().map(Json))
            .bind(fields.error_message.as_deref())
            .bind(fields.processing_duration_secs)
            .bind(fields.completed_at)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(self.explain_miss(id, None, expected).await),
        }
    }

    async fn list_stale(&self, cutoff: Timestamp) -> StoreResult<Vec<Job>> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             WHERE status_id IN ($1, $2) AND created_at < $3 \
             ORDER BY created_at ASC"
        );
        let rows = sqlx::query_as::<_, JobRow>(&query)
            .bind(ACTIVE_STATUSES[0].id())
            .bind(ACTIVE_STATUSES[1].id())
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Job::try_from).collect()
    }

    async fn update_output(
        &self,
        id: DbId,
        owner_id: OwnerId,
        output: ArticleOutput,
    ) -> StoreResult<Job> {
        let query = format!(
            "UPDATE jobs SET output_data = $3, updated_at = NOW() \
             WHERE id = $1 AND owner_id = $2 AND status_id = $4 \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .bind(owner_id)
            .bind(Json(&output))
            .bind(JobStatus::Completed.id())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(self
                .explain_miss(id, Some(owner_id), JobStatus::Completed)
                .await),
        }
    }

    async fn delete(&self, id: DbId, owner_id: OwnerId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
