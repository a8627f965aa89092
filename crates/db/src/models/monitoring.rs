//! Alert history and vital sign records written by the simulation loop.

use pulseward_core::severity::Tier;
use pulseward_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity structs (match database tables)
// ---------------------------------------------------------------------------

/// An `alert_history` row joined with the patient's name, as read by the
/// alert log query.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AlertLogRow {
    pub id: DbId,
    pub patient_id: DbId,
    pub patient_name: String,
    pub severity: String,
    pub message: String,
    pub created_at: Timestamp,
}

/// A row from the `vital_signs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VitalSign {
    pub id: DbId,
    pub patient_id: DbId,
    pub heart_rate: i32,
    pub oxygen: i32,
    pub temperature: f32,
    pub fetal_heart_rate: Option<i32>,
    pub recorded_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Create DTOs
// ---------------------------------------------------------------------------

/// An abnormal reading queued for the `alert_history` table.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateAlertRecord {
    pub patient_id: DbId,
    pub tier: Tier,
    pub message: String,
    pub timestamp: Timestamp,
}

impl CreateAlertRecord {
    /// Build an alert with the standard `"{tier} Vitals: HR .., SpO2 ..%"`
    /// message.
    pub fn for_reading(
        patient_id: DbId,
        tier: Tier,
        heart_rate: i32,
        oxygen: i32,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            patient_id,
            tier,
            message: format!("{tier} Vitals: HR {heart_rate}, SpO2 {oxygen}%"),
            timestamp,
        }
    }
}

/// A reading queued for the `vital_signs` table.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateVitalRecord {
    pub patient_id: DbId,
    pub heart_rate: i32,
    pub oxygen: i32,
    pub temperature: f32,
    pub fetal_rate: Option<i32>,
    pub timestamp: Timestamp,
}
