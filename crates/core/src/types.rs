/// All primary keys are UUIDs (v7, time-ordered).
pub type DbId = uuid::Uuid;

/// Opaque identifier of the principal that owns a job, supplied by the
/// identity layer.
pub type OwnerId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
