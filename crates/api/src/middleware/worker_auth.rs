//! Shared-secret authentication for inbound worker callbacks.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use seo_writer_core::error::CoreError;
use seo_writer_core::secrets::verify_shared_secret;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the worker's shared secret.
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// Marker extractor: present only when the request carries the configured
/// worker secret. Runs before the body is parsed, so unauthenticated callers
/// learn nothing about job existence.
#[derive(Debug, Clone, Copy)]
pub struct WorkerCallbackAuth;

impl FromRequestParts<AppState> for WorkerCallbackAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get(WEBHOOK_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if !verify_shared_secret(&state.config.worker.callback_secret, provided) {
            tracing::warn!("Rejected worker callback with missing or invalid secret");
            return Err(AppError::Core(CoreError::Unauthorized(
                "Invalid webhook secret".into(),
            )));
        }

        Ok(WorkerCallbackAuth)
    }
}
