//! Inbound worker callbacks. Authenticated by shared secret, not JWT.

use axum::routing::post;
use axum::Router;

use crate::handlers::webhooks;
use crate::state::AppState;

/// Routes mounted at `/webhooks`.
///
/// ```text
/// POST   /worker-callback  -> worker_callback
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/worker-callback", post(webhooks::worker_callback))
}
