//! The simulation loop.
//!
//! [`SimulationScheduler`] owns the per-patient [`PatientState`] map and is
//! the only task that mutates it. Every iteration it re-reads the patient
//! directory, advances each patient, classifies the reading and then:
//!
//! 1. sends a `waveform-update` to the patient's subscription group,
//! 2. broadcasts a `dashboard-update` when the tier is abnormal or the last
//!    broadcast is at least [`DASHBOARD_THROTTLE_MS`] old,
//! 3. offers an alert plus vital record to the write-behind buffer when the
//!    tier is abnormal and either changed or the last alert is at least
//!    [`ALERT_REPEAT_MS`] old.
//!
//! Delivery failures for one patient are logged and counted; they never stop
//! the iteration or the loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use pulseward_core::channels::patient_group;
use pulseward_core::severity::{classify, Tier};
use pulseward_core::simulation::{PatientState, VitalsSnapshot};
use pulseward_core::types::{DbId, Timestamp};
use pulseward_db::models::monitoring::{CreateAlertRecord, CreateVitalRecord};
use pulseward_db::models::patient::PatientEntry;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;

use crate::buffer::WriteBehindBuffer;
use crate::hub::{HubEvent, VitalsHub};
use crate::store::PatientDirectory;

/// Default time between scheduler iterations.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(200);

/// Minimum time between two dashboard broadcasts for a normal patient.
pub const DASHBOARD_THROTTLE_MS: i64 = 1_000;

/// Minimum time between two alerts of the same tier for one patient.
pub const ALERT_REPEAT_MS: i64 = 60_000;

/// Counters for one scheduler iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub patients: usize,
    pub waveforms_sent: usize,
    pub dashboards_sent: usize,
    pub alerts_buffered: usize,
    pub delivery_failures: usize,
}

/// What a single patient's reading should trigger this iteration.
struct Decision {
    snapshot: VitalsSnapshot,
    broadcast: bool,
    alert: bool,
}

/// Background task driving the simulation.
pub struct SimulationScheduler<R = StdRng> {
    directory: Arc<dyn PatientDirectory>,
    hub: Arc<dyn VitalsHub>,
    buffer: Arc<WriteBehindBuffer>,
    states: HashMap<DbId, PatientState>,
    rng: R,
    tick_interval: Duration,
}

impl SimulationScheduler<StdRng> {
    /// Scheduler with an entropy-seeded generator.
    pub fn new(
        directory: Arc<dyn PatientDirectory>,
        hub: Arc<dyn VitalsHub>,
        buffer: Arc<WriteBehindBuffer>,
        tick_interval: Duration,
    ) -> Self {
        let rng = StdRng::from_rng(&mut rand::rng());
        SimulationScheduler::with_rng(directory, hub, buffer, tick_interval, rng)
    }
}

impl<R: Rng + Send> SimulationScheduler<R> {
    /// Scheduler drawing from the given generator.
    pub fn with_rng(
        directory: Arc<dyn PatientDirectory>,
        hub: Arc<dyn VitalsHub>,
        buffer: Arc<WriteBehindBuffer>,
        tick_interval: Duration,
        rng: R,
    ) -> Self {
        Self {
            directory,
            hub,
            buffer,
            states: HashMap::new(),
            rng,
            tick_interval,
        }
    }

    /// Current simulation state of a patient, if it has been seen.
    pub fn state(&self, patient_id: DbId) -> Option<&PatientState> {
        self.states.get(&patient_id)
    }

    /// Number of patients with simulation state.
    pub fn tracked_patients(&self) -> usize {
        self.states.len()
    }

    /// Run the loop until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!(
            tick_ms = self.tick_interval.as_millis() as u64,
            "Simulation scheduler started"
        );

        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            // A hung store read must not hold up shutdown.
            let report = tokio::select! {
                _ = cancel.cancelled() => break,
                report = self.tick(chrono::Utc::now()) => report,
            };
            if report.delivery_failures > 0 {
                tracing::debug!(?report, "Simulation tick completed with failures");
            }
        }

        tracing::info!(
            patients = self.states.len(),
            "Simulation scheduler stopping"
        );
    }

    /// Run one iteration at time `now`.
    pub async fn tick(&mut self, now: Timestamp) -> TickReport {
        let mut report = TickReport::default();

        let patients = match self.directory.snapshot().await {
            Ok(patients) => patients,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load patient directory, skipping tick");
                return report;
            }
        };
        report.patients = patients.len();

        for entry in patients {
            let decision = self.advance_patient(entry, now);
            self.publish(decision, &mut report).await;
        }

        report
    }

    /// Update the patient's state and decide what to publish.
    fn advance_patient(&mut self, entry: PatientEntry, now: Timestamp) -> Decision {
        let state = self
            .states
            .entry(entry.id)
            .or_insert_with(|| PatientState::new(entry.is_pregnant));

        state.advance(entry.is_pregnant, &mut self.rng, now);

        let tier = classify(state.heart_rate, state.oxygen, state.temperature);
        let snapshot = state.snapshot(entry.id, tier, now);

        let broadcast =
            tier.is_abnormal() || elapsed_at_least(state.last_broadcast_at, now, DASHBOARD_THROTTLE_MS);
        if broadcast {
            state.last_broadcast_at = Some(now);
        }

        let alert = should_alert(tier, state, now);
        if alert {
            state.last_alert_at = Some(now);
        }
        state.last_tier = tier;

        Decision {
            snapshot,
            broadcast,
            alert,
        }
    }

    async fn publish(&self, decision: Decision, report: &mut TickReport) {
        let snapshot = decision.snapshot;
        let patient_id = snapshot.patient_id;

        let group = patient_group(patient_id);
        match self.hub.send_to_group(&group, &HubEvent::waveform(&snapshot)).await {
            Ok(_) => report.waveforms_sent += 1,
            Err(e) => {
                report.delivery_failures += 1;
                tracing::warn!(patient_id, error = %e, "Failed to send waveform update");
            }
        }

        if decision.broadcast {
            match self.hub.broadcast(&HubEvent::dashboard(&snapshot)).await {
                Ok(_) => report.dashboards_sent += 1,
                Err(e) => {
                    report.delivery_failures += 1;
                    tracing::warn!(patient_id, error = %e, "Failed to broadcast dashboard update");
                }
            }
        }

        if decision.alert {
            let alert = CreateAlertRecord::for_reading(
                patient_id,
                snapshot.tier,
                snapshot.heart_rate,
                snapshot.oxygen,
                snapshot.timestamp,
            );
            let vital = CreateVitalRecord {
                patient_id,
                heart_rate: snapshot.heart_rate,
                oxygen: snapshot.oxygen,
                temperature: snapshot.temperature,
                fetal_rate: snapshot.fetal_rate,
                timestamp: snapshot.timestamp,
            };
            tracing::info!(patient_id, tier = %snapshot.tier, "Alert buffered");
            self.buffer.offer(alert, vital).await;
            report.alerts_buffered += 1;
        }
    }
}

/// Whether an abnormal reading should be persisted as an alert.
fn should_alert(tier: Tier, state: &PatientState, now: Timestamp) -> bool {
    tier.is_abnormal()
        && (tier != state.last_tier || elapsed_at_least(state.last_alert_at, now, ALERT_REPEAT_MS))
}

/// `true` when `last` is unset, at least `ms` before `now`, or after `now`
/// (the wall clock stepped backwards).
fn elapsed_at_least(last: Option<Timestamp>, now: Timestamp, ms: i64) -> bool {
    match last {
        Some(last) => !(0..ms).contains(&(now - last).num_milliseconds()),
        None => true,
    }
}
