//! Job entity and the DTOs that travel with it.

use serde::{Deserialize, Serialize};
use seo_writer_core::article::{ArticleInput, ArticleOutput};
use seo_writer_core::lifecycle::JobStatus;
use seo_writer_core::types::{DbId, OwnerId, Timestamp};

/// An article generation job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub id: DbId,
    pub owner_id: OwnerId,
    pub status: JobStatus,
    pub input_data: ArticleInput,
    pub output_data: Option<ArticleOutput>,
    pub error_message: Option<String>,
    pub processing_duration_secs: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl Job {
    /// A freshly created pending job.
    pub fn new_pending(owner_id: OwnerId, input: ArticleInput, now: Timestamp) -> Self {
        Self {
            id: uuid::Uuid::now_v7(),
            owner_id,
            status: JobStatus::Pending,
            input_data: input,
            output_data: None,
            error_message: None,
            processing_duration_secs: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Apply the fields of an already-validated transition.
    pub(crate) fn apply(&mut self, next: JobStatus, fields: &TransitionFields, now: Timestamp) {
        self.status = next;
        if let Some(output) = &fields.output_data {
            self.output_data = Some(output.clone());
        }
        if let Some(message) = &fields.error_message {
            self.error_message = Some(message.clone());
        }
        if let Some(duration) = fields.processing_duration_secs {
            self.processing_duration_secs = Some(duration);
        }
        if let Some(at) = fields.completed_at {
            self.completed_at = Some(at);
        }
        self.updated_at = now;
    }
}

/// Lifecycle fields written alongside a status transition.
///
/// Fields left as `None` are not touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionFields {
    pub output_data: Option<ArticleOutput>,
    pub error_message: Option<String>,
    pub processing_duration_secs: Option<i32>,
    pub completed_at: Option<Timestamp>,
}

impl TransitionFields {
    /// `pending -> processing` carries no extra fields.
    pub fn processing() -> Self {
        Self::default()
    }

    pub fn completed(output: ArticleOutput, duration_secs: i32, at: Timestamp) -> Self {
        Self {
            output_data: Some(output),
            processing_duration_secs: Some(duration_secs),
            completed_at: Some(at),
            ..Self::default()
        }
    }

    pub fn failed(message: impl Into<String>, duration_secs: i32, at: Timestamp) -> Self {
        Self {
            error_message: Some(message.into()),
            processing_duration_secs: Some(duration_secs),
            completed_at: Some(at),
            ..Self::default()
        }
    }
}

/// Filter and pagination for owner-scoped listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobListQuery {
    pub status: Option<JobStatus>,
    /// Maximum number of results. Defaults to 20, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

/// One page of an owner's jobs, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct JobPage {
    pub jobs: Vec<Job>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}
