//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod monitoring_repo;
pub mod patient_repo;

pub use monitoring_repo::MonitoringRepo;
pub use patient_repo::PatientRepo;
