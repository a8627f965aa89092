//! Per-patient vital sign simulation.
//!
//! [`PatientState`] holds the mutable simulation record for one patient and
//! [`PatientState::advance`] moves it forward. The scheduler calls `advance`
//! on every loop iteration, but physiological values only change on a *slow
//! tick* (at most once every [`SLOW_TICK_MS`]); faster calls are no-ops so
//! the fan-out loop can run at a much higher rate than the physiology.
//!
//! The dynamics are a plausible-looking stochastic process, not a
//! physiological model. Every random draw comes from the injected
//! [`rand::Rng`] so tests can run against a seeded generator.

use rand::Rng;
use serde::Serialize;

use crate::severity::Tier;
use crate::types::{DbId, Timestamp};

/// Minimum time between two slow ticks, in milliseconds.
pub const SLOW_TICK_MS: i64 = 1500;

/// Every Nth slow tick forces the heart rate into the critical band.
pub const FORCED_ABNORMAL_EVERY: u64 = 60;

/// Heart rate band `[low, high)` used for forced abnormal ticks.
pub const FORCED_HEART_RATE: (i32, i32) = (130, 160);

/// Resting heart rate the patient recovers to after an abnormal reading.
pub const BASELINE_HEART_RATE: i32 = 75;

/// Chance that an abnormal heart rate snaps back to baseline on a slow tick.
pub const RECOVERY_PROBABILITY: f64 = 0.7;

/// Inclusive band the resting drift keeps the heart rate in.
pub const RESTING_HEART_RATE: (i32, i32) = (60, 100);

/// Heart rate above which oxygen and temperature follow the patient into
/// distress.
pub const ELEVATED_HEART_RATE: i32 = 110;

/// Oxygen saturation `[low, high)` while the heart rate is elevated.
pub const DISTRESS_OXYGEN: (i32, i32) = (85, 94);

/// Inclusive band the healthy oxygen saturation drifts in.
pub const HEALTHY_OXYGEN: (i32, i32) = (95, 100);

/// Baseline oxygen saturation of a freshly admitted patient.
pub const BASELINE_OXYGEN: i32 = 98;

/// Temperature while the heart rate is elevated.
pub const FEVER_TEMPERATURE: f32 = 38.5;

/// Lower bound of the healthy temperature; a jitter of up to
/// [`HEALTHY_TEMPERATURE_JITTER`] is added on each slow tick.
pub const BASELINE_TEMPERATURE: f32 = 36.5;

/// Width of the healthy temperature band above [`BASELINE_TEMPERATURE`].
pub const HEALTHY_TEMPERATURE_JITTER: f32 = 0.2;

/// Baseline fetal heart rate for pregnant patients.
pub const BASELINE_FETAL_RATE: i32 = 140;

/// Inclusive band the fetal heart rate drifts in.
pub const FETAL_RATE_BAND: (i32, i32) = (110, 160);

/// Outcome of a call to [`PatientState::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlowTick {
    /// Less than [`SLOW_TICK_MS`] elapsed; nothing changed.
    Skipped,
    /// Physiological values were updated.
    Applied {
        /// Slow tick counter after the update.
        tick: u64,
        /// Whether this tick forced the heart rate into the critical band.
        forced_abnormal: bool,
    },
}

/// Mutable simulation record for a single patient.
///
/// Created with baseline values the first time the scheduler sees a patient
/// and kept for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct PatientState {
    pub heart_rate: i32,
    pub oxygen: i32,
    pub temperature: f32,
    /// Only present for pregnant patients.
    pub fetal_rate: Option<i32>,
    /// Number of slow ticks applied so far.
    pub tick_counter: u64,
    /// Tier computed on the previous scheduler iteration.
    pub last_tier: Tier,
    /// When an alert was last buffered for persistence.
    pub last_alert_at: Option<Timestamp>,
    /// When the dashboard summary was last broadcast.
    pub last_broadcast_at: Option<Timestamp>,
    /// When the last slow tick was applied.
    pub last_simulated_at: Option<Timestamp>,
}

impl PatientState {
    /// Fresh state with baseline vitals.
    pub fn new(is_pregnant: bool) -> Self {
        Self {
            heart_rate: BASELINE_HEART_RATE,
            oxygen: BASELINE_OXYGEN,
            temperature: BASELINE_TEMPERATURE,
            fetal_rate: is_pregnant.then_some(BASELINE_FETAL_RATE),
            tick_counter: 0,
            last_tier: Tier::Normal,
            last_alert_at: None,
            last_broadcast_at: None,
            last_simulated_at: None,
        }
    }

    /// Advance the simulation to `now`.
    ///
    /// Returns [`SlowTick::Skipped`] when the previous slow tick was less
    /// than [`SLOW_TICK_MS`] ago. The first call on a fresh state always
    /// applies.
    pub fn advance<R: Rng>(
        &mut self,
        is_pregnant: bool,
        rng: &mut R,
        now: Timestamp,
    ) -> SlowTick {
        // A clock that stepped backwards counts as elapsed.
        if let Some(last) = self.last_simulated_at {
            if (0..SLOW_TICK_MS).contains(&(now - last).num_milliseconds()) {
                self.sync_fetal_rate(is_pregnant);
                return SlowTick::Skipped;
            }
        }

        self.tick_counter += 1;
        self.last_simulated_at = Some(now);

        let forced_abnormal = self.tick_counter % FORCED_ABNORMAL_EVERY == 0;

        if forced_abnormal {
            self.heart_rate = rng.random_range(FORCED_HEART_RATE.0..FORCED_HEART_RATE.1);
        } else if self.last_tier.is_abnormal() {
            if rng.random_bool(RECOVERY_PROBABILITY) {
                self.heart_rate = BASELINE_HEART_RATE;
            }
        } else {
            let drift = rng.random_range(-1..=1);
            self.heart_rate =
                (self.heart_rate + drift).clamp(RESTING_HEART_RATE.0, RESTING_HEART_RATE.1);
        }

        if self.heart_rate > ELEVATED_HEART_RATE {
            self.oxygen = rng.random_range(DISTRESS_OXYGEN.0..DISTRESS_OXYGEN.1);
            self.temperature = FEVER_TEMPERATURE;
        } else {
            let drift = rng.random_range(-1..=1);
            self.oxygen = (self.oxygen + drift).clamp(HEALTHY_OXYGEN.0, HEALTHY_OXYGEN.1);
            self.temperature =
                BASELINE_TEMPERATURE + rng.random::<f32>() * HEALTHY_TEMPERATURE_JITTER;
        }

        self.fetal_rate = if is_pregnant {
            let current = self.fetal_rate.unwrap_or(BASELINE_FETAL_RATE);
            let drift = rng.random_range(-1..=1);
            Some((current + drift).clamp(FETAL_RATE_BAND.0, FETAL_RATE_BAND.1))
        } else {
            None
        };

        SlowTick::Applied {
            tick: self.tick_counter,
            forced_abnormal,
        }
    }

    /// Make `fetal_rate` present exactly when the patient is flagged.
    fn sync_fetal_rate(&mut self, is_pregnant: bool) {
        match (is_pregnant, self.fetal_rate) {
            (true, None) => self.fetal_rate = Some(BASELINE_FETAL_RATE),
            (false, Some(_)) => self.fetal_rate = None,
            _ => {}
        }
    }

    /// Capture the current values as an immutable snapshot.
    pub fn snapshot(&self, patient_id: DbId, tier: Tier, now: Timestamp) -> VitalsSnapshot {
        VitalsSnapshot {
            patient_id,
            heart_rate: self.heart_rate,
            oxygen: self.oxygen,
            temperature: self.temperature,
            fetal_rate: self.fetal_rate,
            tier,
            timestamp: now,
        }
    }
}

/// Vitals of one patient at one scheduler iteration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VitalsSnapshot {
    pub patient_id: DbId,
    pub heart_rate: i32,
    pub oxygen: i32,
    pub temperature: f32,
    pub fetal_rate: Option<i32>,
    pub tier: Tier,
    pub timestamp: Timestamp,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::severity::classify;

    fn start() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    fn slow_step(n: i64) -> Timestamp {
        start() + Duration::milliseconds(SLOW_TICK_MS * n)
    }

    #[test]
    fn fresh_state_has_baseline_values() {
        let state = PatientState::new(false);
        assert_eq!(state.heart_rate, BASELINE_HEART_RATE);
        assert_eq!(state.oxygen, BASELINE_OXYGEN);
        assert_eq!(state.temperature, BASELINE_TEMPERATURE);
        assert_eq!(state.fetal_rate, None);
        assert_eq!(state.tick_counter, 0);
        assert_eq!(state.last_tier, Tier::Normal);

        let pregnant = PatientState::new(true);
        assert_eq!(pregnant.fetal_rate, Some(BASELINE_FETAL_RATE));
    }

    #[test]
    fn first_advance_always_applies() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = PatientState::new(false);

        let outcome = state.advance(false, &mut rng, start());

        assert_eq!(
            outcome,
            SlowTick::Applied {
                tick: 1,
                forced_abnormal: false
            }
        );
        assert_eq!(state.last_simulated_at, Some(start()));
    }

    #[test]
    fn calls_inside_the_slow_tick_window_are_noops() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut state = PatientState::new(true);
        state.advance(true, &mut rng, start());
        let before = state.clone();

        for ms in [200, 400, 1000, 1499] {
            let outcome = state.advance(true, &mut rng, start() + Duration::milliseconds(ms));
            assert_eq!(outcome, SlowTick::Skipped);
        }

        assert_eq!(state.heart_rate, before.heart_rate);
        assert_eq!(state.oxygen, before.oxygen);
        assert_eq!(state.fetal_rate, before.fetal_rate);
        assert_eq!(state.tick_counter, 1);

        let outcome = state.advance(true, &mut rng, start() + Duration::milliseconds(1500));
        assert!(matches!(outcome, SlowTick::Applied { tick: 2, .. }));
    }

    #[test]
    fn forced_abnormal_fires_every_sixtieth_slow_tick() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut state = PatientState::new(false);
        let mut forced_ticks = Vec::new();

        for n in 0..360 {
            match state.advance(false, &mut rng, slow_step(n)) {
                SlowTick::Applied {
                    tick,
                    forced_abnormal: true,
                } => {
                    assert!(
                        (FORCED_HEART_RATE.0..FORCED_HEART_RATE.1).contains(&state.heart_rate),
                        "forced heart rate out of band: {}",
                        state.heart_rate
                    );
                    forced_ticks.push(tick);
                }
                SlowTick::Applied { .. } => {}
                SlowTick::Skipped => panic!("every step is a full slow tick apart"),
            }
            state.last_tier = classify(state.heart_rate, state.oxygen, state.temperature);
        }

        assert_eq!(forced_ticks, vec![60, 120, 180, 240, 300, 360]);
    }

    #[test]
    fn forced_schedule_is_independent_of_seed() {
        for seed in [0, 7, 99] {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut state = PatientState::new(false);
            let mut forced = 0;
            for n in 0..120 {
                if let SlowTick::Applied {
                    forced_abnormal: true,
                    tick,
                } = state.advance(false, &mut rng, slow_step(n))
                {
                    assert_eq!(tick % FORCED_ABNORMAL_EVERY, 0);
                    forced += 1;
                }
            }
            assert_eq!(forced, 2);
        }
    }

    #[test]
    fn resting_drift_stays_in_band() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut state = PatientState::new(false);

        for n in 0..2000 {
            let outcome = state.advance(false, &mut rng, slow_step(n));
            if let SlowTick::Applied {
                forced_abnormal: false,
                ..
            } = outcome
            {
                assert!(
                    (RESTING_HEART_RATE.0..=RESTING_HEART_RATE.1).contains(&state.heart_rate),
                    "heart rate {} escaped the resting band",
                    state.heart_rate
                );
            }
            // Pin the prior tier to Normal so every unforced tick drifts.
            state.last_tier = Tier::Normal;
        }
    }

    #[test]
    fn drift_moves_at_most_one_beat_per_tick() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut state = PatientState::new(false);

        for n in 0..59 {
            let before = state.heart_rate;
            state.advance(false, &mut rng, slow_step(n));
            assert!((state.heart_rate - before).abs() <= 1);
        }
    }

    #[test]
    fn abnormal_heart_rate_drags_oxygen_and_temperature() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut state = PatientState::new(false);
        state.tick_counter = FORCED_ABNORMAL_EVERY - 1;

        let outcome = state.advance(false, &mut rng, start());

        assert!(matches!(
            outcome,
            SlowTick::Applied {
                forced_abnormal: true,
                ..
            }
        ));
        assert!((DISTRESS_OXYGEN.0..DISTRESS_OXYGEN.1).contains(&state.oxygen));
        assert_eq!(state.temperature, FEVER_TEMPERATURE);
        assert_eq!(
            classify(state.heart_rate, state.oxygen, state.temperature),
            Tier::Critical
        );
    }

    #[test]
    fn healthy_heart_rate_keeps_oxygen_and_temperature_in_band() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut state = PatientState::new(false);

        for n in 0..59 {
            state.advance(false, &mut rng, slow_step(n));
            assert!((HEALTHY_OXYGEN.0..=HEALTHY_OXYGEN.1).contains(&state.oxygen));
            assert!(state.temperature >= BASELINE_TEMPERATURE);
            assert!(state.temperature <= BASELINE_TEMPERATURE + HEALTHY_TEMPERATURE_JITTER);
        }
    }

    #[test]
    fn recovery_returns_to_baseline_or_holds() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut recovered = 0;

        for n in 0..200 {
            let mut state = PatientState::new(false);
            state.heart_rate = 145;
            state.last_tier = Tier::Critical;
            state.advance(false, &mut rng, slow_step(n));
            match state.heart_rate {
                BASELINE_HEART_RATE => recovered += 1,
                145 => {}
                other => panic!("unexpected heart rate after recovery step: {other}"),
            }
        }

        // Roughly 70% recover; allow a wide margin.
        assert!(recovered > 100 && recovered < 180, "recovered = {recovered}");
    }

    #[test]
    fn fetal_rate_only_for_pregnant_patients() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut pregnant = PatientState::new(true);
        let mut other = PatientState::new(false);

        for n in 0..500 {
            pregnant.advance(true, &mut rng, slow_step(n));
            other.advance(false, &mut rng, slow_step(n));

            let fetal = pregnant.fetal_rate.expect("pregnant patient has a fetal rate");
            assert!((FETAL_RATE_BAND.0..=FETAL_RATE_BAND.1).contains(&fetal));
            assert_eq!(other.fetal_rate, None);
        }
    }

    #[test]
    fn fetal_rate_follows_flag_changes() {
        let mut rng = StdRng::seed_from_u64(19);
        let mut state = PatientState::new(false);

        state.advance(true, &mut rng, slow_step(0));
        let fetal = state.fetal_rate.expect("flag turned on");
        assert!((fetal - BASELINE_FETAL_RATE).abs() <= 1);

        state.advance(false, &mut rng, slow_step(1));
        assert_eq!(state.fetal_rate, None);
    }

    #[test]
    fn flag_change_applies_between_slow_ticks() {
        let mut rng = StdRng::seed_from_u64(23);
        let mut state = PatientState::new(false);
        state.advance(false, &mut rng, start());

        let outcome = state.advance(true, &mut rng, start() + Duration::milliseconds(200));
        assert_eq!(outcome, SlowTick::Skipped);
        assert_eq!(state.fetal_rate, Some(BASELINE_FETAL_RATE));
        assert_eq!(state.tick_counter, 1);

        let outcome = state.advance(false, &mut rng, start() + Duration::milliseconds(400));
        assert_eq!(outcome, SlowTick::Skipped);
        assert_eq!(state.fetal_rate, None);
    }

    #[test]
    fn clock_stepping_backwards_does_not_stall_the_simulation() {
        let mut rng = StdRng::seed_from_u64(29);
        let mut state = PatientState::new(false);
        state.advance(false, &mut rng, start());

        let earlier = start() - Duration::minutes(5);
        let outcome = state.advance(false, &mut rng, earlier);

        assert!(matches!(outcome, SlowTick::Applied { tick: 2, .. }));
        assert_eq!(state.last_simulated_at, Some(earlier));
    }

    #[test]
    fn same_seed_produces_same_trajectory() {
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut state = PatientState::new(true);
            (0..100)
                .map(|n| {
                    state.advance(true, &mut rng, slow_step(n));
                    state.last_tier = classify(state.heart_rate, state.oxygen, state.temperature);
                    (state.heart_rate, state.oxygen, state.fetal_rate)
                })
                .collect::<Vec<_>>()
        };

        assert_eq!(run(23), run(23));
    }
}
