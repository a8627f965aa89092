//! Well-known fan-out event names and subscription group naming.
//!
//! These must match the event names the dashboard client listens for on the
//! WebSocket and the group names used by the connection manager.

use crate::types::DbId;

/// High-rate per-patient event carrying the full vitals snapshot.
///
/// Delivered only to connections that joined the patient's group.
pub const EVENT_WAVEFORM_UPDATE: &str = "waveform-update";

/// Low-rate summary event delivered to every connected client.
pub const EVENT_DASHBOARD_UPDATE: &str = "dashboard-update";

/// Prefix of every per-patient subscription group.
pub const PATIENT_GROUP_PREFIX: &str = "patient_";

/// Subscription group name for a single patient, e.g. `"patient_12"`.
pub fn patient_group(patient_id: DbId) -> String {
    format!("{PATIENT_GROUP_PREFIX}{patient_id}")
}
