#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use seo_writer_api::auth::jwt::{generate_access_token, JwtConfig};
use seo_writer_api::config::{JobSettings, ServerConfig, WorkerConfig};
use seo_writer_api::engine::dispatcher::{DispatchOutcome, WorkerDispatch};
use seo_writer_api::router::build_app_router;
use seo_writer_api::state::AppState;
use seo_writer_core::types::OwnerId;
use seo_writer_db::memory::{InMemoryJobStore, InMemoryQuotaStore};
use seo_writer_db::models::job::Job;

pub const WEBHOOK_SECRET: &str = "test-webhook-secret";

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin, a 10-minute staleness
/// threshold and a monthly quota of 100.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        database_url: None,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
        worker: WorkerConfig {
            webhook_url: "http://127.0.0.1:9/webhook".to_string(),
            callback_secret: WEBHOOK_SECRET.to_string(),
            dispatch_timeout_secs: 5,
        },
        jobs: JobSettings {
            staleness_secs: 600,
            reaper_interval_secs: 60,
            default_word_limit: 1000,
            monthly_quota_limit: 100,
        },
    }
}

/// Dispatcher double that answers with a configurable outcome.
pub struct ScriptedDispatcher {
    outcome: Mutex<DispatchOutcome>,
    sent: Mutex<Vec<Job>>,
}

impl ScriptedDispatcher {
    pub fn new(outcome: DispatchOutcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn set_outcome(&self, outcome: DispatchOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl WorkerDispatch for ScriptedDispatcher {
    async fn send(&self, job: &Job) -> DispatchOutcome {
        self.sent.lock().unwrap().push(job.clone());
        self.outcome.lock().unwrap().clone()
    }
}

/// The router plus handles on its in-memory collaborators.
pub struct TestApp {
    pub router: Router,
    pub jobs: Arc<InMemoryJobStore>,
    pub quota: Arc<InMemoryQuotaStore>,
    pub dispatcher: Arc<ScriptedDispatcher>,
    pub config: ServerConfig,
}

impl TestApp {
    /// A signed access token for `owner`.
    pub fn token(&self, owner: OwnerId) -> String {
        generate_access_token(owner, &self.config.jwt).expect("token generation should succeed")
    }
}

/// Build the full application router over in-memory stores, with a
/// dispatcher that accepts every job.
pub fn build_test_app() -> TestApp {
    build_test_app_with(test_config(), DispatchOutcome::Accepted)
}

pub fn build_test_app_with(config: ServerConfig, outcome: DispatchOutcome) -> TestApp {
    let jobs = Arc::new(InMemoryJobStore::new());
    let quota = Arc::new(InMemoryQuotaStore::new(config.jobs.monthly_quota_limit));
    let dispatcher = Arc::new(ScriptedDispatcher::new(outcome));

    let state = AppState {
        jobs: jobs.clone(),
        quota: quota.clone(),
        dispatcher: dispatcher.clone(),
        config: Arc::new(config.clone()),
        pool: None,
    };

    TestApp {
        router: build_app_router(state, &config),
        jobs,
        quota,
        dispatcher,
        config,
    }
}

pub fn new_owner() -> OwnerId {
    Uuid::new_v4()
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let request = builder.body(body).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Unauthenticated GET.
pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, &[], None).await
}

pub async fn get_auth(app: &Router, uri: &str, token: &str) -> Response<Body> {
    let auth = bearer(token);
    send(app, Method::GET, uri, &[("authorization", auth.as_str())], None).await
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let auth = bearer(token);
    send(app, Method::POST, uri, &[("authorization", auth.as_str())], Some(body)).await
}

pub async fn patch_json(
    app: &Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let auth = bearer(token);
    send(app, Method::PATCH, uri, &[("authorization", auth.as_str())], Some(body)).await
}

pub async fn delete(app: &Router, uri: &str, token: &str) -> Response<Body> {
    let auth = bearer(token);
    send(app, Method::DELETE, uri, &[("authorization", auth.as_str())], None).await
}

/// POST a worker callback, with the shared secret when given.
pub async fn post_callback(
    app: &Router,
    secret: Option<&str>,
    body: serde_json::Value,
) -> Response<Body> {
    let headers: Vec<(&str, &str)> = secret
        .map(|s| vec![("x-webhook-secret", s)])
        .unwrap_or_default();
    send(
        app,
        Method::POST,
        "/api/v1/webhooks/worker-callback",
        &headers,
        Some(body),
    )
    .await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
