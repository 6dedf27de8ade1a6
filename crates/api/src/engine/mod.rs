//! Job orchestration: dispatch, submission, callback reconciliation and
//! timeout reaping.
//!
//! Every lifecycle write goes through `JobStore::transition`, so the three
//! writers (submission, reconciler, reaper) never overwrite each other.

pub mod dispatcher;
pub mod reconciler;
pub mod submission;
pub mod timeout_reaper;
