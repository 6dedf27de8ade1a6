//! Monthly submission quota rules.
//!
//! A counter is created lazily on an owner's first submission. Periods are
//! calendar months in UTC; once `now` reaches `period_reset_at` the counter
//! rolls over to zero before the next check.

use chrono::{Datelike, TimeZone, Utc};
use serde::Serialize;

use crate::types::{OwnerId, Timestamp};

/// Monthly limit applied to new counters when none is configured.
pub const DEFAULT_MONTHLY_LIMIT: i32 = 100;

/// Usage ledger action recorded for every dispatched article.
pub const ACTION_ARTICLE_GENERATED: &str = "article_generated";

/// Per-owner usage tally for the current period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaCounter {
    pub owner_id: OwnerId,
    pub used: i32,
    pub limit: i32,
    pub period_reset_at: Timestamp,
}

/// Result of an atomic check-and-increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    /// The submission was counted; `used` is the post-increment value.
    Allowed { used: i32, limit: i32 },
    /// The owner has no remaining quota; nothing was counted.
    Exceeded { used: i32, limit: i32 },
}

/// First instant of the calendar month after `now`.
pub fn next_period_start(now: Timestamp) -> Timestamp {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

impl QuotaCounter {
    /// A fresh counter for an owner seen for the first time.
    pub fn new(owner_id: OwnerId, limit: i32, now: Timestamp) -> Self {
        Self {
            owner_id,
            used: 0,
            limit,
            period_reset_at: next_period_start(now),
        }
    }

    /// Reset the tally if the period has elapsed.
    pub fn roll_over(&mut self, now: Timestamp) {
        if now >= self.period_reset_at {
            self.used = 0;
            self.period_reset_at = next_period_start(now);
        }
    }

    /// Rollover, check, and increment as one step.
    ///
    /// Callers must hold exclusive access to the counter for the duration
    /// of the call.
    pub fn check_and_increment(&mut self, now: Timestamp) -> QuotaDecision {
        self.roll_over(now);
        if self.used >= self.limit {
            return QuotaDecision::Exceeded {
                used: self.used,
                limit: self.limit,
            };
        }
        self.used += 1;
        QuotaDecision::Allowed {
            used: self.used,
            limit: self.limit,
        }
    }

    pub fn remaining(&self) -> i32 {
        (self.limit - self.used).max(0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use uuid::Uuid;

    use super::*;

    fn at(y: i32, m: u32, d: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn next_period_is_first_of_following_month() {
        assert_eq!(
            next_period_start(at(2026, 3, 15)),
            Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            next_period_start(at(2026, 12, 31)),
            Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn allows_until_limit_then_rejects_without_counting() {
        let now = at(2026, 5, 10);
        let mut counter = QuotaCounter::new(Uuid::new_v4(), 2, now);

        assert_eq!(
            counter.check_and_increment(now),
            QuotaDecision::Allowed { used: 1, limit: 2 }
        );
        assert_eq!(
            counter.check_and_increment(now),
            QuotaDecision::Allowed { used: 2, limit: 2 }
        );
        assert_eq!(
            counter.check_and_increment(now),
            QuotaDecision::Exceeded { used: 2, limit: 2 }
        );
        assert_eq!(counter.used, 2);
        assert_eq!(counter.remaining(), 0);
    }

    #[test]
    fn rollover_resets_before_checking() {
        let now = at(2026, 5, 10);
        let mut counter = QuotaCounter::new(Uuid::new_v4(), 1, now);
        counter.check_and_increment(now);

        let next_month = counter.period_reset_at + Duration::hours(1);
        assert_eq!(
            counter.check_and_increment(next_month),
            QuotaDecision::Allowed { used: 1, limit: 1 }
        );
        assert_eq!(
            counter.period_reset_at,
            Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn zero_limit_never_allows() {
        let now = at(2026, 1, 1);
        let mut counter = QuotaCounter::new(Uuid::new_v4(), 0, now);
        assert_eq!(
            counter.check_and_increment(now),
            QuotaDecision::Exceeded { used: 0, limit: 0 }
        );
    }
}
