//! Store seams used by the monitoring pipeline.
//!
//! The scheduler reads the patient directory every tick and the record
//! flusher writes batches; both go through the traits here so the loop can
//! be driven against in-memory doubles. [`PgStore`] is the PostgreSQL
//! implementation backed by the `pulseward_db` repositories.

use async_trait::async_trait;
use pulseward_db::models::monitoring::{CreateAlertRecord, CreateVitalRecord};
use pulseward_db::models::patient::PatientEntry;
use pulseward_db::repositories::{MonitoringRepo, PatientRepo};
use pulseward_db::DbPool;

/// Errors raised by the store seams.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Read side: the set of patients the simulation should drive.
#[async_trait]
pub trait PatientDirectory: Send + Sync {
    /// Fresh snapshot of every known patient.
    async fn snapshot(&self) -> Result<Vec<PatientEntry>, StoreError>;
}

/// Write side: durable, all-or-nothing batch append.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Persist a batch. On error nothing from the batch may be stored.
    async fn persist(
        &self,
        alerts: &[CreateAlertRecord],
        vitals: &[CreateVitalRecord],
    ) -> Result<(), StoreError>;
}

/// PostgreSQL-backed directory and sink.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PatientDirectory for PgStore {
    async fn snapshot(&self) -> Result<Vec<PatientEntry>, StoreError> {
        Ok(PatientRepo::list_entries(&self.pool).await?)
    }
}

#[async_trait]
impl RecordSink for PgStore {
    async fn persist(
        &self,
        alerts: &[CreateAlertRecord],
        vitals: &[CreateVitalRecord],
    ) -> Result<(), StoreError> {
        MonitoringRepo::insert_batch(&self.pool, alerts, vitals).await?;
        Ok(())
    }
}
