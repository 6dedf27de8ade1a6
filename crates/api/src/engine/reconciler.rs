//! Reconciliation of worker callbacks with stored job state.
//!
//! A callback is applied with a conditional `processing -> terminal`
//! transition. Replays and callbacks that lose a race against the timeout
//! reaper change nothing.

use std::sync::Arc;

use serde_json::Value;
use seo_writer_core::callback::{build_output, failure_message, ReportedStatus};
use seo_writer_core::lifecycle::{processing_duration_secs, JobStatus};
use seo_writer_core::types::{DbId, Timestamp};
use seo_writer_db::models::job::{Job, TransitionFields};
use seo_writer_db::store::{JobStore, StoreError, StoreResult};

/// A parsed, authenticated worker callback.
#[derive(Debug, Clone)]
pub struct CallbackReport {
    pub job_id: DbId,
    pub status: String,
    pub result: Option<Value>,
    pub error: Option<String>,
}

/// What applying a callback did.
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// The job moved to the reported terminal status.
    Applied(Job),
    /// The job was already terminal; nothing changed.
    AlreadyTerminal(Job),
    /// No job with that id exists.
    NotFound,
    /// The report cannot be applied; nothing changed.
    Invalid(String),
    /// The job is still `pending`: the callback overtook the dispatch
    /// acknowledgement. The worker should redeliver.
    NotDispatched(Job),
}

/// Applies worker callbacks to the job store.
#[derive(Clone)]
pub struct CallbackReconciler {
    jobs: Arc<dyn JobStore>,
}

impl CallbackReconciler {
    pub fn new(jobs: Arc<dyn JobStore>) -> Self {
        Self { jobs }
    }

    pub async fn apply(&self, report: CallbackReport, now: Timestamp) -> StoreResult<ReconcileOutcome> {
        let Some(job) = self.jobs.find_by_id(report.job_id).await? else {
            return Ok(ReconcileOutcome::NotFound);
        };

        if job.status.is_terminal() {
            return Ok(already_terminal(job, &report.status));
        }

        let (next, fields) = match ReportedStatus::parse(&report.status) {
            Some(ReportedStatus::Completed) => match &report.result {
                Some(result @ Value::Object(_)) => {
                    let output = build_output(result, &job.input_data);
                    let duration = processing_duration_secs(job.created_at, now);
                    (
                        JobStatus::Completed,
                        TransitionFields::completed(output, duration, now),
                    )
                }
                _ => {
                    return Ok(ReconcileOutcome::Invalid(
                        "Completed callback must include a result object".into(),
                    ))
                }
            },
            Some(ReportedStatus::Failed) => {
                let message = failure_message(report.error.as_deref());
                let duration = processing_duration_secs(job.created_at, now);
                (JobStatus::Failed, TransitionFields::failed(message, duration, now))
            }
            None => {
                return Ok(ReconcileOutcome::Invalid(format!(
                    "Unsupported callback status '{}'",
                    report.status
                )))
            }
        };

        if job.status == JobStatus::Pending {
            tracing::warn!(job_id = %job.id, "Callback arrived before dispatch was recorded");
            return Ok(ReconcileOutcome::NotDispatched(job));
        }

        match self
            .jobs
            .transition(job.id, JobStatus::Processing, next, fields)
            .await
        {
            Ok(job) => {
                tracing::info!(job_id = %job.id, status = %job.status, "Callback applied");
                Ok(ReconcileOutcome::Applied(job))
            }
            Err(StoreError::Conflict { actual, .. }) => {
                // Lost the race; reload to report what won.
                match self.jobs.find_by_id(job.id).await? {
                    Some(current) if current.status.is_terminal() => {
                        Ok(already_terminal(current, &report.status))
                    }
                    Some(current) => {
                        tracing::warn!(job_id = %job.id, status = %actual, "Callback conflicted with non-terminal job");
                        Ok(ReconcileOutcome::NotDispatched(current))
                    }
                    None => Ok(ReconcileOutcome::NotFound),
                }
            }
            Err(StoreError::NotFound { .. }) => Ok(ReconcileOutcome::NotFound),
            Err(e) => Err(e),
        }
    }
}

fn already_terminal(job: Job, reported: &str) -> ReconcileOutcome {
    if reported != job.status.as_str() {
        tracing::warn!(
            job_id = %job.id,
            stored = %job.status,
            reported,
            "Dropping callback for job in a different terminal state",
        );
    } else {
        tracing::debug!(job_id = %job.id, "Duplicate callback ignored");
    }
    ReconcileOutcome::AlreadyTerminal(job)
}
