//! Outbound dispatch of jobs to the external worker.
//!
//! One HTTP `POST` per job, bounded by the client timeout. There are no
//! retries: a job whose dispatch fails is failed immediately by the
//! submission flow.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use seo_writer_core::types::DbId;
use seo_writer_db::models::job::Job;

/// Result of a single dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The worker acknowledged the job (2xx).
    Accepted,
    /// The worker answered, but refused the job.
    Rejected(String),
    /// The worker could not be reached or did not answer in time.
    NetworkFailure(String),
}

impl DispatchOutcome {
    /// Error message recorded on the job, or `None` when accepted.
    pub fn failure_message(&self) -> Option<String> {
        match self {
            DispatchOutcome::Accepted => None,
            DispatchOutcome::Rejected(reason) => Some(format!(
                "Failed to trigger article generation workflow: {reason}"
            )),
            DispatchOutcome::NetworkFailure(reason) => {
                Some(format!("Failed to connect to generation service: {reason}"))
            }
        }
    }
}

/// Body of the dispatch request.
#[derive(Debug, Serialize)]
pub struct DispatchRequest<'a> {
    pub job_id: DbId,
    pub topic: &'a str,
    pub keywords: &'a str,
    pub word_limit: i32,
}

impl<'a> From<&'a Job> for DispatchRequest<'a> {
    fn from(job: &'a Job) -> Self {
        Self {
            job_id: job.id,
            topic: &job.input_data.topic,
            keywords: job.input_data.keywords.as_deref().unwrap_or_default(),
            word_limit: job.input_data.word_limit,
        }
    }
}

/// Hands a job to the worker.
#[async_trait]
pub trait WorkerDispatch: Send + Sync {
    /// Attempt delivery exactly once. Never errors; every failure mode is an
    /// outcome.
    async fn send(&self, job: &Job) -> DispatchOutcome;
}

/// [`WorkerDispatch`] over HTTP.
pub struct HttpDispatcher {
    client: reqwest::Client,
    url: String,
}

impl HttpDispatcher {
    /// Build a dispatcher whose every request is bounded by `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl WorkerDispatch for HttpDispatcher {
    async fn send(&self, job: &Job) -> DispatchOutcome {
        let payload = DispatchRequest::from(job);

        match self.client.post(&self.url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(job_id = %job.id, status = %response.status(), "Worker accepted job");
                DispatchOutcome::Accepted
            }
            Ok(response) => {
                let code = response.status().as_u16();
                tracing::warn!(job_id = %job.id, status = code, "Worker rejected job");
                DispatchOutcome::Rejected(format!("worker returned HTTP {code}"))
            }
            Err(e) => {
                let reason = if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                };
                tracing::warn!(job_id = %job.id, error = %e, "Worker unreachable");
                DispatchOutcome::NetworkFailure(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use chrono::Utc;
    use seo_writer_core::article::ArticleInput;
    use uuid::Uuid;

    use super::*;

    fn job() -> Job {
        Job::new_pending(
            Uuid::new_v4(),
            ArticleInput {
                topic: "Rust".into(),
                keywords: None,
                word_limit: 1000,
            },
            Utc::now(),
        )
    }

    /// Serve `router` on an ephemeral port and return its URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/webhook")
    }

    #[test]
    fn failure_messages_name_the_cause() {
        assert_eq!(DispatchOutcome::Accepted.failure_message(), None);
        assert_eq!(
            DispatchOutcome::Rejected("worker returned HTTP 500".into()).failure_message(),
            Some("Failed to trigger article generation workflow: worker returned HTTP 500".into())
        );
        assert_eq!(
            DispatchOutcome::NetworkFailure("connection refused".into()).failure_message(),
            Some("Failed to connect to generation service: connection refused".into())
        );
    }

    #[test]
    fn request_body_carries_input_fields() {
        let job = job();
        let body = serde_json::to_value(DispatchRequest::from(&job)).unwrap();
        assert_eq!(body["job_id"], job.id.to_string());
        assert_eq!(body["topic"], "Rust");
        assert_eq!(body["keywords"], "");
        assert_eq!(body["word_limit"], 1000);
    }

    #[tokio::test]
    async fn success_status_is_accepted() {
        let url = serve(Router::new().route(
            "/webhook",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["topic"], "Rust");
                StatusCode::OK
            }),
        ))
        .await;

        let dispatcher = HttpDispatcher::new(url, Duration::from_secs(2)).unwrap();
        assert_eq!(dispatcher.send(&job()).await, DispatchOutcome::Accepted);
    }

    #[tokio::test]
    async fn error_status_is_rejected() {
        let url = serve(Router::new().route(
            "/webhook",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        ))
        .await;

        let dispatcher = HttpDispatcher::new(url, Duration::from_secs(2)).unwrap();
        assert_eq!(
            dispatcher.send(&job()).await,
            DispatchOutcome::Rejected("worker returned HTTP 500".into())
        );
    }

    #[tokio::test]
    async fn slow_worker_is_network_failure() {
        let url = serve(Router::new().route(
            "/webhook",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                StatusCode::OK
            }),
        ))
        .await;

        let dispatcher = HttpDispatcher::new(url, Duration::from_millis(200)).unwrap();
        assert_eq!(
            dispatcher.send(&job()).await,
            DispatchOutcome::NetworkFailure("request timed out".into())
        );
    }

    #[tokio::test]
    async fn unreachable_worker_is_network_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dispatcher =
            HttpDispatcher::new(format!("http://{addr}/webhook"), Duration::from_secs(2)).unwrap();
        assert!(matches!(
            dispatcher.send(&job()).await,
            DispatchOutcome::NetworkFailure(_)
        ));
    }
}
