//! Domain logic for the SEO writer job orchestrator.
//!
//! This crate has no I/O. It defines the job lifecycle state machine, the
//! article input/output model, quota period rules, staleness rules, and the
//! helpers shared by the persistence and HTTP layers.

pub mod article;
pub mod callback;
pub mod error;
pub mod lifecycle;
pub mod pagination;
pub mod quota;
pub mod secrets;
pub mod staleness;
pub mod types;
