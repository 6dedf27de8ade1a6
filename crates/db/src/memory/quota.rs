use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use seo_writer_core::quota::{QuotaCounter, QuotaDecision};
use seo_writer_core::types::{DbId, OwnerId, Timestamp};

use super::poisoned;
use crate::models::usage::UsageLog;
use crate::store::{QuotaStore, StoreResult};

/// In-memory quota counters and usage ledger.
#[derive(Debug)]
pub struct InMemoryQuotaStore {
    default_limit: i32,
    counters: Mutex<HashMap<OwnerId, Arc<Mutex<QuotaCounter>>>>,
    ledger: Mutex<Vec<UsageLog>>,
}

impl InMemoryQuotaStore {
    pub fn new(default_limit: i32) -> Self {
        Self {
            default_limit,
            counters: Mutex::new(HashMap::new()),
            ledger: Mutex::new(Vec::new()),
        }
    }

    /// Replace an owner's counter, e.g. to grant a custom limit.
    pub fn set_counter(&self, counter: QuotaCounter) -> StoreResult<()> {
        let mut counters = self.counters.lock().map_err(|_| poisoned())?;
        counters.insert(counter.owner_id, Arc::new(Mutex::new(counter)));
        Ok(())
    }

    /// Ledger entries for one owner, oldest first.
    pub fn usage_log(&self, owner_id: OwnerId) -> StoreResult<Vec<UsageLog>> {
        let ledger = self.ledger.lock().map_err(|_| poisoned())?;
        Ok(ledger
            .iter()
            .filter(|entry| entry.owner_id == owner_id)
            .cloned()
            .collect())
    }

    /// The owner's counter, created with the default limit on first use.
    fn counter(&self, owner_id: OwnerId, now: Timestamp) -> StoreResult<Arc<Mutex<QuotaCounter>>> {
        let mut counters = self.counters.lock().map_err(|_| poisoned())?;
        let counter = counters
            .entry(owner_id)
            .or_insert_with(|| Arc::new(Mutex::new(QuotaCounter::new(owner_id, self.default_limit, now))));
        Ok(Arc::clone(counter))
    }
}

#[async_trait]
impl QuotaStore for InMemoryQuotaStore {
    async fn check_and_increment(
        &self,
        owner_id: OwnerId,
        now: Timestamp,
    ) -> StoreResult<QuotaDecision> {
        let slot = self.counter(owner_id, now)?;
        let mut counter = slot.lock().map_err(|_| poisoned())?;
        Ok(counter.check_and_increment(now))
    }

    async fn usage(&self, owner_id: OwnerId, now: Timestamp) -> StoreResult<QuotaCounter> {
        let existing = {
            let counters = self.counters.lock().map_err(|_| poisoned())?;
            counters.get(&owner_id).cloned()
        };
        match existing {
            Some(slot) => {
                let mut counter = slot.lock().map_err(|_| poisoned())?.clone();
                counter.roll_over(now);
                Ok(counter)
            }
            None => Ok(QuotaCounter::new(owner_id, self.default_limit, now)),
        }
    }

    async fn record_usage(
        &self,
        owner_id: OwnerId,
        job_id: DbId,
        action_type: &str,
    ) -> StoreResult<()> {
        let mut ledger = self.ledger.lock().map_err(|_| poisoned())?;
        ledger.push(UsageLog {
            id: uuid::Uuid::now_v7(),
            owner_id,
            job_id: Some(job_id),
            action_type: action_type.to_string(),
            credits_used: 1,
            created_at: Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone};
    use seo_writer_core::quota::{next_period_start, ACTION_ARTICLE_GENERATED};
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn first_use_creates_counter_with_default_limit() {
        let store = InMemoryQuotaStore::new(3);
        let owner = Uuid::new_v4();
        let now = Utc::now();

        let before = store.usage(owner, now).await.unwrap();
        assert_eq!((before.used, before.limit), (0, 3));

        let decision = store.check_and_increment(owner, now).await.unwrap();
        assert_eq!(decision, QuotaDecision::Allowed { used: 1, limit: 3 });
        assert_eq!(store.usage(owner, now).await.unwrap().used, 1);
    }

    #[tokio::test]
    async fn concurrent_submissions_never_exceed_the_limit() {
        let store = Arc::new(InMemoryQuotaStore::new(100));
        let owner = Uuid::new_v4();
        let now = Utc::now();
        store
            .set_counter(QuotaCounter {
                owner_id: owner,
                used: 97,
                limit: 100,
                period_reset_at: next_period_start(now),
            })
            .unwrap();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.check_and_increment(owner, now).await })
            })
            .collect();
        let decisions: Vec<_> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap().unwrap())
            .collect();

        let allowed = decisions
            .iter()
            .filter(|d| matches!(d, QuotaDecision::Allowed { .. }))
            .count();
        assert_eq!(allowed, 3);
        assert_eq!(store.usage(owner, now).await.unwrap().used, 100);
    }

    #[tokio::test]
    async fn elapsed_period_resets_before_checking() {
        let store = InMemoryQuotaStore::new(100);
        let owner = Uuid::new_v4();
        let march = Utc.with_ymd_and_hms(2026, 3, 31, 23, 0, 0).unwrap();
        store
            .set_counter(QuotaCounter {
                owner_id: owner,
                used: 100,
                limit: 100,
                period_reset_at: next_period_start(march),
            })
            .unwrap();

        assert_eq!(
            store.check_and_increment(owner, march).await.unwrap(),
            QuotaDecision::Exceeded { used: 100, limit: 100 }
        );

        let april = march + Duration::hours(2);
        assert_eq!(
            store.check_and_increment(owner, april).await.unwrap(),
            QuotaDecision::Allowed { used: 1, limit: 100 }
        );
        let counter = store.usage(owner, april).await.unwrap();
        assert_eq!(counter.period_reset_at, Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn zero_limit_rejects_everything() {
        let store = InMemoryQuotaStore::new(0);
        let decision = store.check_and_increment(Uuid::new_v4(), Utc::now()).await.unwrap();
        assert_eq!(decision, QuotaDecision::Exceeded { used: 0, limit: 0 });
    }

    #[tokio::test]
    async fn usage_ledger_is_per_owner() {
        let store = InMemoryQuotaStore::new(10);
        let owner = Uuid::new_v4();
        let job = Uuid::new_v4();
        store.record_usage(owner, job, ACTION_ARTICLE_GENERATED).await.unwrap();
        store
            .record_usage(Uuid::new_v4(), Uuid::new_v4(), ACTION_ARTICLE_GENERATED)
            .await
            .unwrap();

        let log = store.usage_log(owner).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].job_id, Some(job));
        assert_eq!(log[0].action_type, "article_generated");
        assert_eq!(log[0].credits_used, 1);
    }
}
