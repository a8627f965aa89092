//! PulseWard domain logic.
//!
//! Pure, I/O-free building blocks shared by the simulation loop and the
//! HTTP layer:
//!
//! - [`severity`]: tier classification of a vitals reading.
//! - [`simulation`]: per-patient simulation state and its update rule.
//! - [`episodes`]: grouping of the raw alert log into display episodes.
//! - [`channels`]: fan-out event names and group naming.

pub mod channels;
pub mod episodes;
pub mod error;
pub mod severity;
pub mod simulation;
pub mod types;
