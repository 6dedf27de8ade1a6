pub mod health;
pub mod jobs;
pub mod quota;
pub mod webhooks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /jobs                                  list, submit
/// /jobs/check-timeout                    run a timeout sweep
/// /jobs/{id}                             get, edit output, delete
///
/// /quota                                 current period usage
///
/// /webhooks/worker-callback              worker result (shared secret)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/jobs", jobs::router())
        .nest("/quota", quota::router())
        .nest("/webhooks", webhooks::router())
}
