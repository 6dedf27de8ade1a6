//! Job lifecycle state machine.
//!
//! [`JobStatus`] discriminants match the seed data of the `job_statuses`
//! lookup table (1-based). [`TRANSITIONS`] is the authoritative list of legal
//! edges; every writer validates against it through [`check_transition`]
//! before attempting a conditional update.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

/// Article generation job status.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending = 1,
    Processing = 2,
    Completed = 3,
    Failed = 4,
}

/// Every legal `(from, to)` edge of the lifecycle graph.
pub const TRANSITIONS: [(JobStatus, JobStatus); 4] = [
    (JobStatus::Pending, JobStatus::Processing),
    (JobStatus::Pending, JobStatus::Failed),
    (JobStatus::Processing, JobStatus::Completed),
    (JobStatus::Processing, JobStatus::Failed),
];

/// Statuses the timeout reaper is allowed to fail.
pub const ACTIVE_STATUSES: [JobStatus; 2] = [JobStatus::Pending, JobStatus::Processing];

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Pending,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// `completed` and `failed` admit no further lifecycle transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        TRANSITIONS.contains(&(self, next))
    }
}

impl From<JobStatus> for StatusId {
    fn from(value: JobStatus) -> Self {
        value as StatusId
    }
}

/// A status ID or name that does not correspond to any [`JobStatus`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown job status '{0}'")]
pub struct UnknownStatus(pub String);

impl TryFrom<StatusId> for JobStatus {
    type Error = UnknownStatus;

    fn try_from(value: StatusId) -> Result<Self, Self::Error> {
        JobStatus::ALL
            .into_iter()
            .find(|s| s.id() == value)
            .ok_or_else(|| UnknownStatus(value.to_string()))
    }
}

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transition rejected by the lifecycle table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("Job is already {from} and cannot move to {to}")]
    AlreadyTerminal { from: JobStatus, to: JobStatus },

    #[error("Illegal job transition {from} -> {to}")]
    Illegal { from: JobStatus, to: JobStatus },
}

/// Validate a `from -> to` edge against [`TRANSITIONS`].
pub fn check_transition(from: JobStatus, to: JobStatus) -> Result<(), TransitionError> {
    if from.can_transition_to(to) {
        Ok(())
    } else if from.is_terminal() {
        Err(TransitionError::AlreadyTerminal { from, to })
    } else {
        Err(TransitionError::Illegal { from, to })
    }
}

/// Whole seconds between job creation and `now`, floored at zero.
pub fn processing_duration_secs(created_at: Timestamp, now: Timestamp) -> i32 {
    let secs = (now - created_at).num_seconds().max(0);
    i32::try_from(secs).unwrap_or(i32::MAX)
}
