//! Patient, doctor and patient history models.

use chrono::NaiveDate;
use pulseward_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Minimal patient projection read by the simulation loop every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize)]
pub struct PatientEntry {
    pub id: DbId,
    /// Enables fetal heart rate simulation.
    pub is_pregnant: bool,
}

/// A patient row joined with the attending doctor's name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PatientWithDoctor {
    pub id: DbId,
    pub name: String,
    pub is_pregnant: bool,
    pub admission_date: Timestamp,
    pub date_of_birth: Option<NaiveDate>,
    pub mobile: Option<String>,
    pub address: Option<String>,
    pub blood_type: Option<String>,
    pub family_history: Option<String>,
    pub doctor_name: Option<String>,
}

/// A row from the `medications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Medication {
    pub id: DbId,
    pub patient_id: DbId,
    pub drug_name: String,
    pub dosage: String,
}

/// A row from the `conditions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Condition {
    pub id: DbId,
    pub patient_id: DbId,
    pub diagnosis: String,
}

/// A row from the `surgeries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Surgery {
    pub id: DbId,
    pub patient_id: DbId,
    pub procedure_name: String,
    pub year: i32,
}

/// DTO for admitting a patient.
#[derive(Debug, Clone)]
pub struct CreatePatient {
    pub name: String,
    pub is_pregnant: bool,
    pub doctor_id: Option<DbId>,
}
