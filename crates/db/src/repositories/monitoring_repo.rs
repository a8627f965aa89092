//! Repository for the `alert_history` and `vital_signs` tables.

use pulseward_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::monitoring::{AlertLogRow, CreateAlertRecord, CreateVitalRecord, VitalSign};

/// Column list for `vital_signs` queries.
const VITAL_COLUMNS: &str =
    "id, patient_id, heart_rate, oxygen, temperature, fetal_heart_rate, recorded_at";

/// Provides batch writes and tail reads for monitoring history.
pub struct MonitoringRepo;

impl MonitoringRepo {
    /// Insert a batch of alerts and vitals in a single transaction.
    ///
    /// Either every row is written or none is, so a failed batch can be
    /// retried without duplicating rows. Rows for patients that no longer
    /// exist are dropped instead of failing the whole batch.
    pub async fn insert_batch(
        pool: &PgPool,
        alerts: &[CreateAlertRecord],
        vitals: &[CreateVitalRecord],
    ) -> Result<(), sqlx::Error> {
        if alerts.is_empty() && vitals.is_empty() {
            return Ok(());
        }

        let mut tx = pool.begin().await?;

        if !alerts.is_empty() {
            let patient_ids: Vec<DbId> = alerts.iter().map(|a| a.patient_id).collect();
            let severities: Vec<&str> = alerts.iter().map(|a| a.tier.as_str()).collect();
            let messages: Vec<&str> = alerts.iter().map(|a| a.message.as_str()).collect();
            let timestamps: Vec<Timestamp> = alerts.iter().map(|a| a.timestamp).collect();

            sqlx::query(
                "INSERT INTO alert_history (patient_id, severity, message, created_at) \
                 SELECT t.* FROM UNNEST($1::bigint[], $2::text[], $3::text[], $4::timestamptz[]) \
                     AS t(patient_id, severity, message, created_at) \
                 WHERE EXISTS (SELECT 1 FROM patients p WHERE p.id = t.patient_id)",
            )
            .bind(&patient_ids)
            .bind(&severities)
            .bind(&messages)
            .bind(&timestamps)
            .execute(&mut *tx)
            .await?;
        }

        if !vitals.is_empty() {
            let patient_ids: Vec<DbId> = vitals.iter().map(|v| v.patient_id).collect();
            let heart_rates: Vec<i32> = vitals.iter().map(|v| v.heart_rate).collect();
            let oxygen: Vec<i32> = vitals.iter().map(|v| v.oxygen).collect();
            let temperatures: Vec<f32> = vitals.iter().map(|v| v.temperature).collect();
            let fetal_rates: Vec<Option<i32>> = vitals.iter().map(|v| v.fetal_rate).collect();
            let timestamps: Vec<Timestamp> = vitals.iter().map(|v| v.timestamp).collect();

            sqlx::query(
                "INSERT INTO vital_signs \
                    (patient_id, heart_rate, oxygen, temperature, fetal_heart_rate, recorded_at) \
                 SELECT t.* FROM UNNEST($1::bigint[], $2::int[], $3::int[], $4::real[], \
                                        $5::int[], $6::timestamptz[]) \
                     AS t(patient_id, heart_rate, oxygen, temperature, fetal_heart_rate, \
                          recorded_at) \
                 WHERE EXISTS (SELECT 1 FROM patients p WHERE p.id = t.patient_id)",
            )
            .bind(&patient_ids)
            .bind(&heart_rates)
            .bind(&oxygen)
            .bind(&temperatures)
            .bind(&fetal_rates)
            .bind(&timestamps)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(
            alerts = alerts.len(),
            vitals = vitals.len(),
            "Monitoring batch committed"
        );
        Ok(())
    }

    /// The most recent alerts, newest first, joined with the patient name.
    pub async fn list_recent_alerts(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<AlertLogRow>, sqlx::Error> {
        sqlx::query_as::<_, AlertLogRow>(
            "SELECT a.id, a.patient_id, p.name AS patient_name, a.severity, a.message, \
                    a.created_at \
             FROM alert_history a \
             JOIN patients p ON p.id = a.patient_id \
             ORDER BY a.created_at DESC, a.id DESC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Recorded vitals for one patient, newest first.
    pub async fn list_vitals_for_patient(
        pool: &PgPool,
        patient_id: DbId,
        limit: i64,
    ) -> Result<Vec<VitalSign>, sqlx::Error> {
        let query = format!(
            "SELECT {VITAL_COLUMNS} FROM vital_signs \
             WHERE patient_id = $1 \
             ORDER BY recorded_at DESC, id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, VitalSign>(&query)
            .bind(patient_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
