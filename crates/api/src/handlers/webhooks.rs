//! Handler for worker callbacks.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use seo_writer_core::error::CoreError;
use seo_writer_core::lifecycle::JobStatus;
use seo_writer_core::types::DbId;

use crate::engine::reconciler::{CallbackReport, ReconcileOutcome};
use crate::error::{AppError, AppResult};
use crate::middleware::worker_auth::WorkerCallbackAuth;
use crate::response::DataResponse;
use crate::state::AppState;

/// Raw callback body.
///
/// Every field is read as loose JSON: absent or wrongly typed identifiers
/// are reported as a 400 with a JSON error body, and a failure report keeps
/// its `error` whatever shape the worker gave it.
#[derive(Debug, Default, Deserialize)]
pub struct WorkerCallbackRequest {
    pub job_id: Option<Value>,
    pub status: Option<Value>,
    pub result: Option<Value>,
    pub error: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct CallbackAck {
    pub job_id: DbId,
    pub outcome: &'static str,
    pub status: JobStatus,
}

/// A required string field. Missing, null and blank are all "required".
fn required_str(value: Option<Value>, field: &str) -> Result<String, AppError> {
    match value {
        None | Some(Value::Null) => Err(AppError::BadRequest(format!("{field} is required"))),
        Some(Value::String(s)) if s.trim().is_empty() => {
            Err(AppError::BadRequest(format!("{field} is required")))
        }
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(other) => Err(AppError::BadRequest(format!(
            "Invalid {field} '{other}', expected a string"
        ))),
    }
}

/// The worker's error report as text. Non-string values keep their JSON
/// rendering.
fn error_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

impl TryFrom<WorkerCallbackRequest> for CallbackReport {
    type Error = AppError;

    fn try_from(body: WorkerCallbackRequest) -> Result<Self, Self::Error> {
        let raw_id = required_str(body.job_id, "job_id")?;
        let status = required_str(body.status, "status")?;
        let job_id = raw_id
            .parse::<DbId>()
            .map_err(|_| AppError::BadRequest(format!("Invalid job_id '{raw_id}'")))?;

        Ok(CallbackReport {
            job_id,
            status,
            result: body.result,
            error: error_text(body.error),
        })
    }
}

/// POST /api/v1/webhooks/worker-callback
///
/// Apply a worker's terminal report. Replays and callbacks for jobs that
/// already timed out are acknowledged with `already_terminal`.
pub async fn worker_callback(
    _auth: WorkerCallbackAuth,
    State(state): State<AppState>,
    body: Result<Json<WorkerCallbackRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(body) = body?;
    let report = CallbackReport::try_from(body)?;
    let job_id = report.job_id;

    let ack = match state.reconciler().apply(report, Utc::now()).await? {
        ReconcileOutcome::Applied(job) => CallbackAck {
            job_id,
            outcome: "applied",
            status: job.status,
        },
        ReconcileOutcome::AlreadyTerminal(job) => CallbackAck {
            job_id,
            outcome: "already_terminal",
            status: job.status,
        },
        ReconcileOutcome::NotFound => {
            tracing::warn!(job_id = %job_id, "Callback for unknown job");
            return Err(AppError::Core(CoreError::NotFound {
                entity: "Job",
                id: job_id,
            }));
        }
        ReconcileOutcome::Invalid(reason) => {
            tracing::warn!(job_id = %job_id, reason = %reason, "Invalid callback");
            return Err(AppError::Core(CoreError::Validation(reason)));
        }
        ReconcileOutcome::NotDispatched(_) => {
            return Err(AppError::Core(CoreError::Conflict(
                "Job has not been dispatched yet".into(),
            )));
        }
    };

    Ok(Json(DataResponse { data: ack }))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    fn body(value: Value) -> WorkerCallbackRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn missing_fields_are_bad_requests() {
        assert_matches!(
            CallbackReport::try_from(body(json!({ "status": "failed" }))),
            Err(AppError::BadRequest(msg)) if msg == "job_id is required"
        );
        assert_matches!(
            CallbackReport::try_from(body(json!({ "job_id": Uuid::new_v4().to_string(), "status": null }))),
            Err(AppError::BadRequest(msg)) if msg == "status is required"
        );
        assert_matches!(
            CallbackReport::try_from(body(json!({ "job_id": "42", "status": "failed" }))),
            Err(AppError::BadRequest(_))
        );
    }

    #[test]
    fn wrongly_typed_fields_are_bad_requests() {
        let id = Uuid::new_v4().to_string();
        assert_matches!(
            CallbackReport::try_from(body(json!({ "job_id": 42, "status": "failed" }))),
            Err(AppError::BadRequest(msg)) if msg.starts_with("Invalid job_id")
        );
        assert_matches!(
            CallbackReport::try_from(body(json!({ "job_id": id, "status": 5 }))),
            Err(AppError::BadRequest(msg)) if msg.starts_with("Invalid status")
        );
    }

    #[test]
    fn well_formed_body_converts() {
        let id = Uuid::new_v4();
        let report =
            CallbackReport::try_from(body(json!({ "job_id": id.to_string(), "status": " completed " })))
                .unwrap();
        assert_eq!(report.job_id, id);
        assert_eq!(report.status, "completed");
        assert!(report.error.is_none());
    }

    #[test]
    fn error_of_any_shape_is_kept() {
        let id = Uuid::new_v4().to_string();
        let report = CallbackReport::try_from(body(json!({
            "job_id": id,
            "status": "failed",
            "error": { "message": "boom" }
        })))
        .unwrap();
        assert_eq!(report.error.as_deref(), Some(r#"{"message":"boom"}"#));

        let report = CallbackReport::try_from(body(json!({ "job_id": id, "status": "failed", "error": null })))
            .unwrap();
        assert!(report.error.is_none());
    }
}
