//! Repository layer.
//!
//! Each repository wraps a `PgPool` and implements one of the storage
//! contracts in [`crate::store`].

pub mod job_repo;
pub mod quota_repo;

pub use job_repo::JobRepo;
pub use quota_repo::QuotaRepo;
