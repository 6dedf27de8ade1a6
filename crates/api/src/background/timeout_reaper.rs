//! Periodic timeout sweep.
//!
//! Runs [`TimeoutReaper::reap`] on a fixed interval using
//! `tokio::time::interval` until the cancellation token fires.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::engine::timeout_reaper::TimeoutReaper;

/// Run the reaper loop.
pub async fn run(reaper: TimeoutReaper, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Timeout reaper started");

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Timeout reaper stopping");
                break;
            }
            _ = interval.tick() => {
                match reaper.reap(Utc::now()).await {
                    Ok(0) => tracing::debug!("Timeout reaper: no stale jobs"),
                    Ok(failed) => tracing::info!(failed, "Timeout reaper: failed stale jobs"),
                    Err(e) => tracing::error!(error = %e, "Timeout reaper: sweep failed"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use seo_writer_core::article::ArticleInput;
    use seo_writer_core::lifecycle::JobStatus;
    use seo_writer_db::memory::InMemoryJobStore;
    use seo_writer_db::models::job::Job;
    use seo_writer_db::store::JobStore;
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn loop_reaps_then_stops_on_cancel() {
        let store = Arc::new(InMemoryJobStore::new());
        let job = Job::new_pending(
            Uuid::new_v4(),
            ArticleInput {
                topic: "A".into(),
                keywords: None,
                word_limit: 1000,
            },
            Utc::now() - chrono::Duration::minutes(30),
        );
        store.insert(job.clone()).unwrap();

        let reaper = TimeoutReaper::new(store.clone(), chrono::Duration::minutes(10));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(reaper, Duration::from_millis(20), cancel.clone()));

        let mut status = JobStatus::Pending;
        for _ in 0..50 {
            status = store.find_by_id(job.id).await.unwrap().unwrap().status;
            if status == JobStatus::Failed {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(status, JobStatus::Failed);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("reaper loop should stop after cancel")
            .unwrap();
    }
}
