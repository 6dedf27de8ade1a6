//! Request extractors that authenticate callers.
//!
//! - [`auth::AuthUser`] -- Extracts the owner from a JWT Bearer token.
//! - [`worker_auth::WorkerCallbackAuth`] -- Verifies the worker's shared secret.

pub mod auth;
pub mod worker_auth;
