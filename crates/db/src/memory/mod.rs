//! In-process implementations of the storage contracts.
//!
//! Intended for development without a database and for tests. Records are
//! held behind per-key mutexes, so a conditional transition on one job or
//! a quota check for one owner never blocks work on another.

mod jobs;
mod quota;

pub use jobs::InMemoryJobStore;
pub use quota::InMemoryQuotaStore;

use crate::store::StoreError;

fn poisoned() -> StoreError {
    StoreError::Corrupt("in-memory store lock poisoned".to_string())
}
