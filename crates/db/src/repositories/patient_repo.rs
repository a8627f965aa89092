//! Repository for `patients` and the patient history tables.

use pulseward_core::types::DbId;
use sqlx::PgPool;

use crate::models::patient::{
    Condition, CreatePatient, Medication, PatientEntry, PatientWithDoctor, Surgery,
};

/// Column list for the dashboard patient listing (joined with `doctors`).
const LISTING_COLUMNS: &str = "p.id, p.name, p.is_pregnant, p.admission_date, p.date_of_birth, \
     p.mobile, p.address, p.blood_type, p.family_history, d.name AS doctor_name";

/// Provides read/write operations for patients and their history.
pub struct PatientRepo;

impl PatientRepo {
    /// Admit a new patient, returning the generated ID.
    pub async fn create(pool: &PgPool, input: &CreatePatient) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO patients (name, is_pregnant, doctor_id) \
             VALUES ($1, $2, $3) \
             RETURNING id",
        )
        .bind(&input.name)
        .bind(input.is_pregnant)
        .bind(input.doctor_id)
        .fetch_one(pool)
        .await
    }

    /// Whether a patient with the given ID exists.
    pub async fn exists(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM patients WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Snapshot of every patient the simulation loop should drive.
    pub async fn list_entries(pool: &PgPool) -> Result<Vec<PatientEntry>, sqlx::Error> {
        sqlx::query_as::<_, PatientEntry>("SELECT id, is_pregnant FROM patients ORDER BY id")
            .fetch_all(pool)
            .await
    }

    /// List all patients with their attending doctor's name.
    pub async fn list_with_doctor(pool: &PgPool) -> Result<Vec<PatientWithDoctor>, sqlx::Error> {
        let query = format!(
            "SELECT {LISTING_COLUMNS} FROM patients p \
             LEFT JOIN doctors d ON d.id = p.doctor_id \
             ORDER BY p.id"
        );
        sqlx::query_as::<_, PatientWithDoctor>(&query)
            .fetch_all(pool)
            .await
    }

    /// Medications for the given patients.
    pub async fn list_medications(
        pool: &PgPool,
        patient_ids: &[DbId],
    ) -> Result<Vec<Medication>, sqlx::Error> {
        sqlx::query_as::<_, Medication>(
            "SELECT id, patient_id, drug_name, dosage FROM medications \
             WHERE patient_id = ANY($1) ORDER BY id",
        )
        .bind(patient_ids)
        .fetch_all(pool)
        .await
    }

    /// Conditions for the given patients.
    pub async fn list_conditions(
        pool: &PgPool,
        patient_ids: &[DbId],
    ) -> Result<Vec<Condition>, sqlx::Error> {
        sqlx::query_as::<_, Condition>(
            "SELECT id, patient_id, diagnosis FROM conditions \
             WHERE patient_id = ANY($1) ORDER BY id",
        )
        .bind(patient_ids)
        .fetch_all(pool)
        .await
    }

    /// Surgeries for the given patients.
    pub async fn list_surgeries(
        pool: &PgPool,
        patient_ids: &[DbId],
    ) -> Result<Vec<Surgery>, sqlx::Error> {
        sqlx::query_as::<_, Surgery>(
            "SELECT id, patient_id, procedure_name, year FROM surgeries \
             WHERE patient_id = ANY($1) ORDER BY year, id",
        )
        .bind(patient_ids)
        .fetch_all(pool)
        .await
    }
}
