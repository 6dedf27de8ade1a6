//! Route definitions for the `/jobs` resource.
//!
//! All endpoints require authentication.

use axum::routing::get;
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// GET    /                -> list_jobs
/// POST   /                -> submit_job
/// GET    /check-timeout   -> check_timeout
/// GET    /{id}            -> get_job
/// PATCH  /{id}            -> update_job
/// DELETE /{id}            -> delete_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(jobs::list_jobs).post(jobs::submit_job))
        .route("/check-timeout", get(jobs::check_timeout))
        .route(
            "/{id}",
            get(jobs::get_job)
                .patch(jobs::update_job)
                .delete(jobs::delete_job),
        )
}
