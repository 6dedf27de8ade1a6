//! Domain model structs and DTOs.
//!
//! Models are storage-agnostic: the Postgres repositories decode rows into
//! them and the in-memory stores hold them directly.

pub mod job;
pub mod usage;
