//! PostgreSQL implementation of [`QuotaStore`] over `quota_counters` and
//! `usage_logs`.

use async_trait::async_trait;
use seo_writer_core::quota::{next_period_start, QuotaCounter, QuotaDecision};
use seo_writer_core::types::{DbId, OwnerId, Timestamp};
use sqlx::{FromRow, PgPool};

use crate::store::{QuotaStore, StoreResult};

#[derive(Debug, FromRow)]
struct CounterRow {
    used: i32,
    quota_limit: i32,
    period_reset_at: Timestamp,
}

/// Quota repository backed by PostgreSQL.
#[derive(Clone)]
pub struct QuotaRepo {
    pool: PgPool,
    default_limit: i32,
}

impl QuotaRepo {
    /// `default_limit` is applied to counters created lazily on first use.
    pub fn new(pool: PgPool, default_limit: i32) -> Self {
        Self {
            pool,
            default_limit,
        }
    }

    async fn fetch_counter(&self, owner_id: OwnerId) -> StoreResult<Option<CounterRow>> {
        let row = sqlx::query_as::<_, CounterRow>(
            "SELECT used, quota_limit, period_reset_at FROM quota_counters WHERE owner_id = $1",
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl QuotaStore for QuotaRepo {
    async fn check_and_increment(
        &self,
        owner_id: OwnerId,
        now: Timestamp,
    ) -> StoreResult<QuotaDecision> {
        let next_reset = next_period_start(now);

        sqlx::query(
            "INSERT INTO quota_counters (owner_id, used, quota_limit, period_reset_at) \
             VALUES ($1, 0, $2, $3) \
             ON CONFLICT (owner_id) DO NOTHING",
        )
        .bind(owner_id)
        .bind(self.default_limit)
        .bind(next_reset)
        .execute(&self.pool)
        .await?;

        // Rollover, limit check and increment in one row-locked statement.
        let allowed = sqlx::query_as::<_, (i32, i32)>(
            "UPDATE quota_counters \
             SET used = CASE WHEN period_reset_at <= $2 THEN 1 ELSE used + 1 END, \
                 period_reset_at = CASE WHEN period_reset_at <= $2 THEN $3 ELSE period_reset_at END, \
                 updated_at = NOW() \
             WHERE owner_id = $1 \
               AND quota_limit > 0 \
               AND (period_reset_at <= $2 OR used < quota_limit) \
             RETURNING used, quota_limit",
        )
        .bind(owner_id)
        .bind(now)
        .bind(next_reset)
        .fetch_optional(&self.pool)
        .await?;

        if let Some((used, limit)) = allowed {
            return Ok(QuotaDecision::Allowed { used, limit });
        }

        let (used, limit) = match self.fetch_counter(owner_id).await? {
            Some(row) if row.period_reset_at <= now => (0, row.quota_limit),
            Some(row) => (row.used, row.quota_limit),
            None => (0, self.default_limit),
        };
        Ok(QuotaDecision::Exceeded { used, limit })
    }

    async fn usage(&self, owner_id: OwnerId, now: Timestamp) -> StoreResult<QuotaCounter> {
        let counter = match self.fetch_counter(owner_id).await? {
            Some(row) => {
                let mut counter = QuotaCounter {
                    owner_id,
                    used: row.used,
                    limit: row.quota_limit,
                    period_reset_at: row.period_reset_at,
                };
                counter.roll_over(now);
                counter
            }
            None => QuotaCounter::new(owner_id, self.default_limit, now),
        };
        Ok(counter)
    }

    async fn record_usage(
        &self,
        owner_id: OwnerId,
        job_id: DbId,
        action_type: &str,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO usage_logs (id, owner_id, job_id, action_type, credits_used) \
             VALUES ($1, $2, $3, $4, 1)",
        )
        .bind(uuid::Uuid::now_v7())
        .bind(owner_id)
        .bind(job_id)
        .bind(action_type)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
