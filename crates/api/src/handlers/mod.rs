//! Request handlers.
//!
//! Handlers parse and authenticate, then delegate to the stores or the
//! [`crate::engine`] components and map errors via [`crate::error::AppError`].

pub mod jobs;
pub mod quota;
pub mod webhooks;
