//! Alert episode grouping.
//!
//! The alert log persists one row per buffered alert, which for a sustained
//! abnormal condition means a row roughly every minute. [`group_episodes`]
//! folds the newest-first tail of that log into display episodes: runs of
//! alerts for the same patient and tier where consecutive records are less
//! than [`EPISODE_GAP_MS`] apart.

use chrono::FixedOffset;
use serde::Serialize;

use crate::severity::Tier;
use crate::types::{DbId, Timestamp};

/// Records closer than this to the episode start are merged into it.
pub const EPISODE_GAP_MS: i64 = 90_000;

/// How many of the most recent alerts are read to rebuild episodes.
pub const DEFAULT_ALERT_WINDOW: i64 = 100;

/// A persisted alert joined with the patient's display name.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAlert {
    pub patient_id: DbId,
    pub patient_name: String,
    pub tier: Tier,
    pub message: String,
    pub timestamp: Timestamp,
}

/// A run of same-patient, same-tier alerts collapsed into one row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Episode {
    pub tier: Tier,
    /// Message of the most recent alert in the episode.
    pub message: String,
    pub patient_name: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    /// `HH:MM:SS` for a single alert, `HH:MM - HH:MM (N min)` otherwise.
    #[serde(rename = "time")]
    pub time_label: String,
}

/// Episode under construction while walking the log.
struct Candidate<'a> {
    anchor: &'a RawAlert,
    start: Timestamp,
}

impl<'a> Candidate<'a> {
    fn new(anchor: &'a RawAlert) -> Self {
        Self {
            anchor,
            start: anchor.timestamp,
        }
    }

    /// Whether an older `alert` continues this episode.
    fn accepts(&self, alert: &RawAlert) -> bool {
        alert.patient_id == self.anchor.patient_id
            && alert.tier == self.anchor.tier
            && (self.start - alert.timestamp).num_milliseconds() < EPISODE_GAP_MS
    }

    fn finish(self, offset: &FixedOffset) -> Episode {
        let end = self.anchor.timestamp;
        Episode {
            tier: self.anchor.tier,
            message: self.anchor.message.clone(),
            patient_name: self.anchor.patient_name.clone(),
            start_time: self.start,
            end_time: end,
            time_label: format_time_label(self.start, end, offset),
        }
    }
}

/// Group a newest-first slice of alerts into newest-first episodes.
///
/// Times in the labels are rendered in `offset`.
pub fn group_episodes(alerts: &[RawAlert], offset: &FixedOffset) -> Vec<Episode> {
    let mut episodes = Vec::new();
    let mut iter = alerts.iter();

    let Some(first) = iter.next() else {
        return episodes;
    };
    let mut current = Candidate::new(first);

    for alert in iter {
        if current.accepts(alert) {
            current.start = alert.timestamp;
        } else {
            episodes.push(current.finish(offset));
            current = Candidate::new(alert);
        }
    }

    episodes.push(current.finish(offset));
    episodes
}

/// Render the display label for an episode spanning `start..=end`.
///
/// The duration counts both boundary minutes (`+1`) and rounds half to even,
/// which keeps labels identical to the ones already shown to operators.
pub fn format_time_label(start: Timestamp, end: Timestamp, offset: &FixedOffset) -> String {
    let start_local = start.with_timezone(offset);
    if start == end {
        return start_local.format("%H:%M:%S").to_string();
    }

    let end_local = end.with_timezone(offset);
    let minutes = (end - start).num_milliseconds() as f64 / 60_000.0;
    let duration = (minutes + 1.0).round_ties_even() as i64;

    format!(
        "{} - {} ({duration} min)",
        start_local.format("%H:%M"),
        end_local.format("%H:%M")
    )
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    fn alert(patient_id: DbId, tier: Tier, secs_after_t0: i64) -> RawAlert {
        RawAlert {
            patient_id,
            patient_name: format!("Patient {patient_id}"),
            tier,
            message: format!("{tier} at +{secs_after_t0}s"),
            timestamp: t0() + Duration::seconds(secs_after_t0),
        }
    }

    /// Build a newest-first log from ascending offsets.
    fn log(entries: &[(DbId, Tier, i64)]) -> Vec<RawAlert> {
        let mut alerts: Vec<_> = entries.iter().map(|&(p, t, s)| alert(p, t, s)).collect();
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        alerts
    }

    #[test]
    fn empty_log_has_no_episodes() {
        assert!(group_episodes(&[], &utc()).is_empty());
    }

    #[test]
    fn single_alert_is_a_timestamp() {
        let alerts = log(&[(1, Tier::Critical, 5)]);

        let episodes = group_episodes(&alerts, &utc());

        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].time_label, "08:00:05");
        assert_eq!(episodes[0].start_time, episodes[0].end_time);
    }

    #[test]
    fn gap_of_ninety_seconds_splits_episode() {
        // T, T+30s, T+2min: the 90s gap between T+30s and T+2min is not < 90s.
        let alerts = log(&[
            (1, Tier::Critical, 0),
            (1, Tier::Critical, 30),
            (1, Tier::Critical, 120),
        ]);

        let episodes = group_episodes(&alerts, &utc());

        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].start_time, t0() + Duration::seconds(120));
        assert_eq!(episodes[0].time_label, "08:02:00");
        assert_eq!(episodes[1].start_time, t0());
        assert_eq!(episodes[1].end_time, t0() + Duration::seconds(30));
        // 0.5 min + 1 = 1.5, rounded half to even.
        assert_eq!(episodes[1].time_label, "08:00 - 08:00 (2 min)");
    }

    #[test]
    fn eighty_seconds_apart_merge_into_one_episode() {
        let alerts = log(&[(1, Tier::Warning, 0), (1, Tier::Warning, 80)]);

        let episodes = group_episodes(&alerts, &utc());

        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].time_label, "08:00 - 08:01 (2 min)");
    }

    #[test]
    fn gap_is_measured_from_the_extended_start() {
        // Each step is 60s, the whole run spans 4 minutes.
        let alerts = log(&[
            (1, Tier::Critical, 0),
            (1, Tier::Critical, 60),
            (1, Tier::Critical, 120),
            (1, Tier::Critical, 180),
            (1, Tier::Critical, 240),
        ]);

        let episodes = group_episodes(&alerts, &utc());

        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].start_time, t0());
        assert_eq!(episodes[0].time_label, "08:00 - 08:04 (5 min)");
    }

    #[test]
    fn duration_rounds_half_to_even() {
        // 90s span: 1.5 + 1 = 2.5 -> 2.
        let alerts = log(&[
            (1, Tier::Critical, 0),
            (1, Tier::Critical, 45),
            (1, Tier::Critical, 90),
        ]);

        let episodes = group_episodes(&alerts, &utc());

        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].time_label, "08:00 - 08:01 (2 min)");
    }

    #[test]
    fn different_patient_or_tier_breaks_episode() {
        let alerts = log(&[
            (1, Tier::Critical, 0),
            (2, Tier::Critical, 10),
            (2, Tier::Warning, 20),
            (2, Tier::Warning, 30),
        ]);

        let episodes = group_episodes(&alerts, &utc());

        let summary: Vec<_> = episodes
            .iter()
            .map(|e| (e.patient_name.as_str(), e.tier))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Patient 2", Tier::Warning),
                ("Patient 2", Tier::Critical),
                ("Patient 1", Tier::Critical),
            ]
        );
    }

    #[test]
    fn interleaved_patients_do_not_merge_across_each_other() {
        let alerts = log(&[
            (1, Tier::Critical, 0),
            (2, Tier::Critical, 10),
            (1, Tier::Critical, 20),
        ]);

        assert_eq!(group_episodes(&alerts, &utc()).len(), 3);
    }

    #[test]
    fn message_comes_from_most_recent_alert() {
        let alerts = log(&[(1, Tier::Critical, 0), (1, Tier::Critical, 60)]);

        let episodes = group_episodes(&alerts, &utc());

        assert_eq!(episodes[0].message, "Critical at +60s");
        assert_eq!(episodes[0].end_time, t0() + Duration::seconds(60));
    }

    #[test]
    fn labels_render_in_display_offset() {
        let alerts = log(&[(1, Tier::Critical, 0)]);
        let plus_one = FixedOffset::east_opt(3600).unwrap();

        let episodes = group_episodes(&alerts, &plus_one);

        assert_eq!(episodes[0].time_label, "09:00:00");
    }

    #[test]
    fn episode_serializes_label_as_time() {
        let alerts = log(&[(1, Tier::Warning, 0)]);
        let episode = &group_episodes(&alerts, &utc())[0];

        let json = serde_json::to_value(episode).unwrap();

        assert_eq!(json["time"], "08:00:00");
        assert_eq!(json["tier"], "Warning");
        assert_eq!(json["patient_name"], "Patient 1");
    }
}
