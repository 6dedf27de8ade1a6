use std::sync::Arc;

use seo_writer_db::store::{JobStore, QuotaStore};
use seo_writer_db::DbPool;

use crate::config::ServerConfig;
use crate::engine::dispatcher::WorkerDispatch;
use crate::engine::reconciler::CallbackReconciler;
use crate::engine::submission::JobSubmitter;
use crate::engine::timeout_reaper::TimeoutReaper;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything is behind an `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Job records.
    pub jobs: Arc<dyn JobStore>,
    /// Quota counters and usage ledger.
    pub quota: Arc<dyn QuotaStore>,
    /// Outbound channel to the worker.
    pub dispatcher: Arc<dyn WorkerDispatch>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Database pool, when running against PostgreSQL. Used for health checks.
    pub pool: Option<DbPool>,
}

impl AppState {
    pub fn submitter(&self) -> JobSubmitter {
        JobSubmitter::new(
            Arc::clone(&self.jobs),
            Arc::clone(&self.quota),
            Arc::clone(&self.dispatcher),
        )
    }

    pub fn reconciler(&self) -> CallbackReconciler {
        CallbackReconciler::new(Arc::clone(&self.jobs))
    }

    pub fn reaper(&self) -> TimeoutReaper {
        TimeoutReaper::new(Arc::clone(&self.jobs), self.config.jobs.staleness())
    }
}
