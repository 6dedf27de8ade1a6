//! Handler for the `/quota` resource.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use seo_writer_core::types::Timestamp;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct QuotaResponse {
    pub used: i32,
    pub limit: i32,
    pub remaining: i32,
    pub period_reset_at: Timestamp,
}

/// GET /api/v1/quota
///
/// The caller's usage for the current period. Does not count anything.
pub async fn get_quota(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let counter = state.quota.usage(auth.owner_id, Utc::now()).await?;
    Ok(Json(DataResponse {
        data: QuotaResponse {
            used: counter.used,
            limit: counter.limit,
            remaining: counter.remaining(),
            period_reset_at: counter.period_reset_at,
        },
    }))
}
