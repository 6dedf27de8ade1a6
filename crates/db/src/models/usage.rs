use serde::Serialize;
use seo_writer_core::types::{DbId, OwnerId, Timestamp};
use sqlx::FromRow;

/// A row from the `usage_logs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UsageLog {
    pub id: DbId,
    pub owner_id: OwnerId,
    pub job_id: Option<DbId>,
    pub action_type: String,
    pub credits_used: i32,
    pub created_at: Timestamp,
}
