//! PulseWard real-time monitoring pipeline.
//!
//! This crate wires the pure simulation logic from `pulseward_core` to its
//! collaborators:
//!
//! - [`SimulationScheduler`]: the background loop that advances every
//!   patient, classifies the reading and fans it out.
//! - [`VitalsHub`]: the fan-out contract implemented by the WebSocket
//!   connection manager, with the [`HubEvent`] payloads it carries.
//! - [`WriteBehindBuffer`] and [`RecordFlusher`]: in-memory staging of
//!   alert and vital records with a periodic batched flush.
//! - [`PatientDirectory`] / [`RecordSink`]: the store seams, implemented
//!   for PostgreSQL by [`PgStore`].

pub mod buffer;
pub mod hub;
pub mod scheduler;
pub mod store;

pub use buffer::{FlushReport, RecordFlusher, WriteBehindBuffer};
pub use hub::{DashboardPayload, HubError, HubEvent, VitalsHub, WaveformPayload};
pub use scheduler::{SimulationScheduler, TickReport};
pub use store::{PatientDirectory, PgStore, RecordSink, StoreError};
