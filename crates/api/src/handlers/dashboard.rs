//! Handlers for the ward dashboard.
//!
//! The live vitals arrive over the WebSocket; these endpoints serve the
//! surrounding data: the grouped alert log, the patient roster and the
//! recorded vitals of one patient.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use pulseward_core::episodes::{group_episodes, Episode, RawAlert};
use pulseward_core::error::CoreError;
use pulseward_core::severity::Tier;
use pulseward_core::types::{DbId, Timestamp};
use pulseward_db::models::monitoring::{AlertLogRow, VitalSign};
use pulseward_db::models::patient::{Condition, Medication, PatientWithDoctor, Surgery};
use pulseward_db::repositories::{MonitoringRepo, PatientRepo};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Shown when a patient has no attending doctor.
const UNASSIGNED_DOCTOR: &str = "Unassigned";

/// Default number of vitals rows returned.
const DEFAULT_VITALS_LIMIT: i64 = 50;

/// Upper bound on `limit` for the vitals endpoint.
const MAX_VITALS_LIMIT: i64 = 500;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// A patient with their history collections for the roster view.
#[derive(Debug, Serialize)]
pub struct PatientListing {
    pub id: DbId,
    pub name: String,
    pub is_pregnant: bool,
    pub admission_date: Timestamp,
    pub date_of_birth: Option<chrono::NaiveDate>,
    pub mobile: Option<String>,
    pub address: Option<String>,
    pub blood_type: Option<String>,
    pub family_history: Option<String>,
    /// Attending doctor, or `"Unassigned"`.
    pub doctor: String,
    pub medications: Vec<Medication>,
    pub conditions: Vec<Condition>,
    pub surgeries: Vec<Surgery>,
}

impl PatientListing {
    fn new(
        patient: PatientWithDoctor,
        medications: Vec<Medication>,
        conditions: Vec<Condition>,
        surgeries: Vec<Surgery>,
    ) -> Self {
        Self {
            id: patient.id,
            name: patient.name,
            is_pregnant: patient.is_pregnant,
            admission_date: patient.admission_date,
            date_of_birth: patient.date_of_birth,
            mobile: patient.mobile,
            address: patient.address,
            blood_type: patient.blood_type,
            family_history: patient.family_history,
            doctor: patient
                .doctor_name
                .unwrap_or_else(|| UNASSIGNED_DOCTOR.to_string()),
            medications,
            conditions,
            surgeries,
        }
    }
}

/// Query params for `GET /dashboard/patients/{id}/vitals`.
#[derive(Debug, Deserialize)]
pub struct VitalsQuery {
    pub limit: Option<i64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/dashboard/alerts
///
/// Reads the most recent alerts and collapses them into episodes, newest
/// first.
pub async fn alert_episodes(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Episode>>>> {
    let rows = MonitoringRepo::list_recent_alerts(&state.pool, state.config.alert_log_limit).await?;
    let alerts: Vec<RawAlert> = rows.into_iter().filter_map(to_raw_alert).collect();

    let episodes = group_episodes(&alerts, &state.config.alert_log_offset);
    Ok(Json(DataResponse { data: episodes }))
}

/// GET /api/v1/dashboard/patients
pub async fn list_patients(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<PatientListing>>>> {
    let patients = PatientRepo::list_with_doctor(&state.pool).await?;
    let ids: Vec<DbId> = patients.iter().map(|p| p.id).collect();

    let mut medications = by_patient(
        PatientRepo::list_medications(&state.pool, &ids).await?,
        |m| m.patient_id,
    );
    let mut conditions = by_patient(
        PatientRepo::list_conditions(&state.pool, &ids).await?,
        |c| c.patient_id,
    );
    let mut surgeries = by_patient(
        PatientRepo::list_surgeries(&state.pool, &ids).await?,
        |s| s.patient_id,
    );

    let listings = patients
        .into_iter()
        .map(|patient| {
            let id = patient.id;
            PatientListing::new(
                patient,
                medications.remove(&id).unwrap_or_default(),
                conditions.remove(&id).unwrap_or_default(),
                surgeries.remove(&id).unwrap_or_default(),
            )
        })
        .collect();

    Ok(Json(DataResponse { data: listings }))
}

/// GET /api/v1/dashboard/patients/{id}/vitals
pub async fn patient_vitals(
    State(state): State<AppState>,
    Path(patient_id): Path<DbId>,
    Query(params): Query<VitalsQuery>,
) -> AppResult<Json<DataResponse<Vec<VitalSign>>>> {
    if !PatientRepo::exists(&state.pool, patient_id).await? {
        return Err(CoreError::NotFound {
            entity: "Patient",
            id: patient_id,
        }
        .into());
    }

    let limit = params
        .limit
        .unwrap_or(DEFAULT_VITALS_LIMIT)
        .clamp(1, MAX_VITALS_LIMIT);
    let vitals = MonitoringRepo::list_vitals_for_patient(&state.pool, patient_id, limit).await?;

    Ok(Json(DataResponse { data: vitals }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn to_raw_alert(row: AlertLogRow) -> Option<RawAlert> {
    let tier = match row.severity.parse::<Tier>() {
        Ok(tier) => tier,
        Err(e) => {
            tracing::warn!(alert_id = row.id, error = %e, "Skipping alert with unknown severity");
            return None;
        }
    };

    Some(RawAlert {
        patient_id: row.patient_id,
        patient_name: row.patient_name,
        tier,
        message: row.message,
        timestamp: row.created_at,
    })
}

fn by_patient<T>(rows: Vec<T>, key: impl Fn(&T) -> DbId) -> HashMap<DbId, Vec<T>> {
    let mut grouped: HashMap<DbId, Vec<T>> = HashMap::new();
    for row in rows {
        grouped.entry(key(&row)).or_default().push(row);
    }
    grouped
}
