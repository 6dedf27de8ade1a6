//! Long-running background tasks spawned by the server binary.

pub mod timeout_reaper;
