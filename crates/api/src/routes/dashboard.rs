//! Route definitions for the ward dashboard.

use axum::routing::get;
use axum::Router;

use crate::handlers::dashboard;
use crate::state::AppState;

/// Dashboard routes mounted at `/dashboard`.
///
/// ```text
/// GET  /alerts                 -> alert_episodes
/// GET  /patients               -> list_patients
/// GET  /patients/{id}/vitals   -> patient_vitals
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/alerts", get(dashboard::alert_episodes))
        .route("/patients", get(dashboard::list_patients))
        .route("/patients/{id}/vitals", get(dashboard::patient_vitals))
}
