//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - `FromRow` + `Serialize` structs matching database rows
//! - `Create*` DTOs for inserts

pub mod monitoring;
pub mod patient;
