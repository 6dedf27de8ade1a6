//! Shared query parameter types for API handlers.

use serde::Deserialize;
use seo_writer_core::lifecycle::JobStatus;
use seo_writer_db::models::job::JobListQuery;

use crate::error::AppError;

/// Raw `?status=&limit=&offset=` parameters for job listing.
///
/// `status` stays a string here so an unknown value produces a JSON 400
/// rather than an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct JobListParams {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TryFrom<JobListParams> for JobListQuery {
    type Error = AppError;

    fn try_from(params: JobListParams) -> Result<Self, Self::Error> {
        let status = params
            .status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<JobStatus>())
            .transpose()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        Ok(JobListQuery {
            status,
            limit: params.limit,
            offset: params.offset,
        })
    }
}
