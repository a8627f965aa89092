//! Fan-out contract and wire payloads.
//!
//! The scheduler publishes two kinds of [`HubEvent`]: a high-rate
//! [`WaveformPayload`] scoped to one patient's subscription group and a
//! low-rate [`DashboardPayload`] broadcast to every client. Delivery is
//! behind the [`VitalsHub`] trait so the loop can run against the WebSocket
//! manager in production and an in-memory double in tests.

use async_trait::async_trait;
use pulseward_core::severity::Tier;
use pulseward_core::simulation::VitalsSnapshot;
use pulseward_core::types::DbId;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Full vitals for the bedside monitor view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveformPayload {
    pub patient_id: DbId,
    pub heart_rate: i32,
    pub oxygen: i32,
    /// Rounded to one decimal place.
    pub temperature: f64,
    pub fetal_rate: Option<i32>,
    pub tier: Tier,
}

/// Summary row for the ward overview grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPayload {
    pub patient_id: DbId,
    pub tier: Tier,
    pub heart_rate: i32,
    pub oxygen: i32,
    /// Rounded to one decimal place.
    pub temperature: f64,
}

/// An event pushed to WebSocket clients.
///
/// Serializes as `{"event": "<name>", "data": {...}}`; the event names match
/// [`pulseward_core::channels`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum HubEvent {
    #[serde(rename = "waveform-update")]
    Waveform(WaveformPayload),
    #[serde(rename = "dashboard-update")]
    Dashboard(DashboardPayload),
}

impl HubEvent {
    /// Build the per-patient waveform event from a snapshot.
    pub fn waveform(snapshot: &VitalsSnapshot) -> Self {
        HubEvent::Waveform(WaveformPayload {
            patient_id: snapshot.patient_id,
            heart_rate: snapshot.heart_rate,
            oxygen: snapshot.oxygen,
            temperature: round_temperature(snapshot.temperature),
            fetal_rate: snapshot.fetal_rate,
            tier: snapshot.tier,
        })
    }

    /// Build the ward-wide dashboard event from a snapshot.
    pub fn dashboard(snapshot: &VitalsSnapshot) -> Self {
        HubEvent::Dashboard(DashboardPayload {
            patient_id: snapshot.patient_id,
            tier: snapshot.tier,
            heart_rate: snapshot.heart_rate,
            oxygen: snapshot.oxygen,
            temperature: round_temperature(snapshot.temperature),
        })
    }

    /// Patient the event is about.
    pub fn patient_id(&self) -> DbId {
        match self {
            HubEvent::Waveform(p) => p.patient_id,
            HubEvent::Dashboard(p) => p.patient_id,
        }
    }

    /// Wire event name.
    pub fn name(&self) -> &'static str {
        match self {
            HubEvent::Waveform(_) => pulseward_core::channels::EVENT_WAVEFORM_UPDATE,
            HubEvent::Dashboard(_) => pulseward_core::channels::EVENT_DASHBOARD_UPDATE,
        }
    }

    /// Serialize to the JSON text sent over the socket.
    pub fn to_json(&self) -> Result<String, HubError> {
        Ok(serde_json::to_string(self)?)
    }
}

fn round_temperature(celsius: f32) -> f64 {
    (f64::from(celsius) * 10.0).round() / 10.0
}

// ---------------------------------------------------------------------------
// VitalsHub
// ---------------------------------------------------------------------------

/// Errors surfaced by a [`VitalsHub`] implementation.
///
/// Individual subscriber failures are never reported here; they are
/// swallowed by the hub so one closed connection cannot block the others.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("Failed to serialize hub event: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Hub unavailable: {0}")]
    Unavailable(String),
}

/// Delivery side of the fan-out.
#[async_trait]
pub trait VitalsHub: Send + Sync {
    /// Deliver `event` to every connection in `group`.
    ///
    /// Returns the number of connections the event was handed to.
    async fn send_to_group(&self, group: &str, event: &HubEvent) -> Result<usize, HubError>;

    /// Deliver `event` to every connection.
    ///
    /// Returns the number of connections the event was handed to.
    async fn broadcast(&self, event: &HubEvent) -> Result<usize, HubError>;
}
