//! Pagination helpers shared by list endpoints and repositories.

/// Default page size for job listing.
pub const DEFAULT_LIMIT: i64 = 20;

/// Maximum page size for job listing.
pub const MAX_LIMIT: i64 = 100;

/// Clamp a user-provided limit to valid bounds.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

/// Clamp a user-provided offset to non-negative.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

/// 1-based page number for an already-clamped offset and limit.
pub fn page_number(offset: i64, limit: i64) -> i64 {
    offset / limit.max(1) + 1
}
