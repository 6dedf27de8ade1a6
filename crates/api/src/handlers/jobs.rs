//! Handlers for the `/jobs` resource.
//!
//! All endpoints require authentication via [`AuthUser`]. Owners only ever
//! see their own jobs; another owner's job is reported as not found.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use seo_writer_core::article::{normalize_input, ArticleOutput};
use seo_writer_core::error::CoreError;
use seo_writer_core::types::DbId;
use seo_writer_db::models::job::{Job, JobListQuery};
use seo_writer_db::store::StoreError;

use crate::engine::submission::Submission;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::JobListParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /jobs`. Every field is optional at the wire level so that
/// missing values produce validation errors rather than extractor rejections.
#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    pub topic: Option<String>,
    pub keywords: Option<String>,
    pub word_limit: Option<i64>,
}

/// Body of `PATCH /jobs/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateJobRequest {
    pub output_data: Option<ArticleOutput>,
}

#[derive(Debug, Serialize)]
pub struct TimeoutSweep {
    pub count: usize,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn job_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Job", id })
}

/// Fetch a job by ID, treating another owner's job as missing.
async fn find_owned(state: &AppState, job_id: DbId, auth: &AuthUser) -> AppResult<Job> {
    state
        .jobs
        .find_by_id(job_id)
        .await?
        .filter(|job| job.owner_id == auth.owner_id)
        .ok_or_else(|| job_not_found(job_id))
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs
///
/// Validate, count against the monthly quota, create and dispatch. Returns
/// 201 with the `processing` job, or 502 with the `failed` job when the
/// worker could not be triggered.
pub async fn submit_job(
    auth: AuthUser,
    State(state): State<AppState>,
    body: Result<Json<SubmitJobRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(body) = body?;
    let input = normalize_input(
        body.topic.as_deref(),
        body.keywords.as_deref(),
        body.word_limit,
        state.config.jobs.default_word_limit,
    )?;

    match state.submitter().submit(auth.owner_id, input).await? {
        Submission::Dispatched(job) => {
            tracing::info!(job_id = %job.id, owner_id = %auth.owner_id, "Job submitted");
            Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
        }
        Submission::DispatchFailed(job) => Err(AppError::DispatchFailed(Box::new(job))),
    }
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs
///
/// The caller's jobs, newest first. Supports optional `status`, `limit`
/// and `offset` query parameters.
pub async fn list_jobs(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<JobListParams>,
) -> AppResult<impl IntoResponse> {
    let query = JobListQuery::try_from(params)?;
    let page = state.jobs.list_by_owner(auth.owner_id, &query).await?;
    Ok(Json(DataResponse { data: page }))
}

// ---------------------------------------------------------------------------
// Get
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs/{id}
pub async fn get_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = find_owned(&state, job_id, &auth).await?;
    Ok(Json(DataResponse { data: job }))
}

// ---------------------------------------------------------------------------
// Edit
// ---------------------------------------------------------------------------

/// PATCH /api/v1/jobs/{id}
///
/// Replace the generated content of a completed job. Does not touch the
/// lifecycle.
pub async fn update_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
    body: Result<Json<UpdateJobRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(body) = body?;
    let output = body
        .output_data
        .ok_or_else(|| AppError::BadRequest("output_data is required".into()))?;

    let job = match state.jobs.update_output(job_id, auth.owner_id, output).await {
        Ok(job) => job,
        Err(StoreError::NotFound { .. }) => return Err(job_not_found(job_id)),
        Err(StoreError::Conflict { actual, .. }) => {
            return Err(AppError::Core(CoreError::Conflict(format!(
                "Only completed jobs can be edited (job is {actual})"
            ))))
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(job_id = %job.id, owner_id = %auth.owner_id, "Job output edited");
    Ok(Json(DataResponse { data: job }))
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// DELETE /api/v1/jobs/{id}
///
/// Removes the job whatever its status. A callback arriving afterwards
/// sees 404.
pub async fn delete_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<StatusCode> {
    if state.jobs.delete(job_id, auth.owner_id).await? {
        tracing::info!(job_id = %job_id, owner_id = %auth.owner_id, "Job deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(job_not_found(job_id))
    }
}

// ---------------------------------------------------------------------------
// Timeout sweep
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs/check-timeout
///
/// Run one reaper sweep now. The background task does the same on a timer.
pub async fn check_timeout(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let count = state.reaper().reap(Utc::now()).await?;
    Ok(Json(DataResponse {
        data: TimeoutSweep { count },
    }))
}
