//! Staleness rules for the timeout reaper.
//!
//! A non-terminal job is stale once strictly more than the threshold has
//! elapsed since it was created.

use chrono::Duration;

use crate::types::Timestamp;

/// Default staleness threshold: 10 minutes.
pub const DEFAULT_STALENESS_SECS: u64 = 600;

/// Creation-time cutoff: jobs created before it are stale at `now`.
pub fn cutoff(now: Timestamp, threshold: Duration) -> Timestamp {
    now - threshold
}

pub fn is_stale(created_at: Timestamp, now: Timestamp, threshold: Duration) -> bool {
    now - created_at > threshold
}

/// Error message recorded on reaped jobs.
pub fn timeout_message(threshold: Duration) -> String {
    let secs = threshold.num_seconds();
    if secs >= 60 && secs % 60 == 0 {
        let mins = secs / 60;
        let unit = if mins == 1 { "minute" } else { "minutes" };
        format!("Job timed out after {mins} {unit}")
    } else {
        format!("Job timed out after {secs} seconds")
    }
}
