//! Rule-based guard detectors
//!
//! Guards run over the raw series, independent of the outlier model:
//! - appliance-left-on, a single hysteresis pass over the power channel;
//! - sleep-session reconstruction from bedroom pressure during quiet hours,
//!   with a derived immobility check per session.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Timelike, Utc};

use crate::config::DetectionConfig;
use crate::types::{AlertDraft, AlertType, TimeSeries};

/// Detect the appliance left on, one alert per continuous episode.
///
/// Power above the on-threshold grows the on-streak; the alert fires once
/// when the streak reaches the configured minutes. The streak survives brief
/// dips: only `appliance_off_min_minutes` consecutive samples below the
/// off-threshold end the episode and re-arm the detector. Non-finite power
/// samples are skipped entirely.
pub fn appliance_left_on(series: &TimeSeries, config: &DetectionConfig) -> Vec<AlertDraft> {
    let mut alerts = Vec::new();
    let mut streak: u32 = 0;
    let mut off_streak: u32 = 0;
    let mut on_start: Option<DateTime<Utc>> = None;

    for record in series.records() {
        let watts = record.appliance_power_w;
        if !watts.is_finite() {
            continue;
        }

        if watts > config.appliance_on_watts {
            if streak == 0 {
                on_start = Some(record.timestamp);
            }
            streak += 1;

            if streak == config.appliance_min_on_minutes {
                alerts.push(AlertDraft {
                    ts_start: on_start.unwrap_or(record.timestamp),
                    ts_end: record.timestamp,
                    kind: AlertType::Guard,
                    label: "appliance_left_on".to_string(),
                    score: None,
                    features: BTreeMap::from([
                        ("power_w".to_string(), watts),
                        ("minutes_on".to_string(), streak as f64),
                    ]),
                    explanations: vec![format!(
                        "Appliance power > {}W for >={} min",
                        config.appliance_on_watts, config.appliance_min_on_minutes
                    )],
                });
            }

            off_streak = 0;
        } else {
            if watts < config.appliance_off_watts {
                off_streak += 1;
            }
            if off_streak >= config.appliance_off_min_minutes {
                streak = 0;
                off_streak = 0;
                on_start = None;
            }
        }
    }

    alerts
}

/// Reconstruct sleep sessions from bedroom pressure during quiet hours.
///
/// A session runs while bedroom motion stays at or above the pressure floor
/// and the timestamp is quiet; either condition failing closes it (sessions
/// cross day boundaries naturally since quietness is checked per sample).
/// Each retained session yields an informational summary, plus an immobility
/// guard when the largest gap between turnovers (bounded by session start and
/// end) reaches the configured threshold.
pub fn sleep_sessions(series: &TimeSeries, config: &DetectionConfig) -> Vec<AlertDraft> {
    let records = series.records();

    // Session bounds, end-exclusive.
    let mut sessions: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::new();
    let mut session_start: Option<DateTime<Utc>> = None;

    for record in records {
        let pressed = record.bedroom_motion >= config.sleep_min_pressure;
        let quiet = config.is_quiet_hour(record.timestamp.hour());

        if pressed && quiet {
            session_start.get_or_insert(record.timestamp);
        } else if let Some(start) = session_start.take() {
            sessions.push((start, record.timestamp));
        }
    }
    if let (Some(start), Some(last)) = (session_start, records.last()) {
        sessions.push((start, last.timestamp + Duration::minutes(1)));
    }

    let mut alerts = Vec::new();
    for (start, end) in sessions {
        let duration_min = (end - start).num_minutes();
        if duration_min < config.sleep_min_session_minutes {
            continue;
        }

        let turnover_times: Vec<DateTime<Utc>> = records
            .iter()
            .filter(|r| {
                r.timestamp >= start
                    && r.timestamp < end
                    && r.bedroom_motion >= config.sleep_turnover_threshold
            })
            .map(|r| r.timestamp)
            .collect();

        alerts.push(AlertDraft {
            ts_start: start,
            ts_end: end - Duration::seconds(1),
            kind: AlertType::Info,
            label: "sleep_session".to_string(),
            score: None,
            features: BTreeMap::from([
                ("duration_min".to_string(), duration_min as f64),
                ("turnovers".to_string(), turnover_times.len() as f64),
                ("quiet_hours".to_string(), 1.0),
            ]),
            explanations: vec![
                format!(
                    "Continuous bed pressure for {} min during quiet hours",
                    duration_min
                ),
                format!("{} position changes detected", turnover_times.len()),
            ],
        });

        if config.sleep_immobility_gap_minutes > 0 {
            let mut marks = Vec::with_capacity(turnover_times.len() + 2);
            marks.push(start);
            marks.extend(turnover_times);
            marks.push(end);

            let max_gap = marks
                .windows(2)
                .map(|pair| (pair[1] - pair[0]).num_minutes())
                .max()
                .unwrap_or(0);

            if max_gap >= config.sleep_immobility_gap_minutes {
                alerts.push(AlertDraft {
                    ts_start: start,
                    ts_end: end - Duration::seconds(1),
                    kind: AlertType::Guard,
                    label: "possible_immobility".to_string(),
                    score: None,
                    features: BTreeMap::from([
                        ("max_gap_min".to_string(), max_gap as f64),
                        (
                            "threshold_min".to_string(),
                            config.sleep_immobility_gap_minutes as f64,
                        ),
                    ]),
                    explanations: vec![format!(
                        "No turnover >= {} for >= {} min during sleep",
                        config.sleep_turnover_threshold, config.sleep_immobility_gap_minutes
                    )],
                });
            }
        }
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SeriesRecord;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn power_series(watts: &[f64]) -> TimeSeries {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let records = watts
            .iter()
            .enumerate()
            .map(|(i, &w)| SeriesRecord {
                timestamp: start + Duration::minutes(i as i64),
                hall_motion: 0,
                kitchen_motion: 0,
                bedroom_motion: 0,
                appliance_power_w: w,
            })
            .collect();
        TimeSeries::new(records).unwrap()
    }

    /// Bedroom-only series starting at the given hour, one sample per minute.
    fn bedroom_series(start_hour: u32, motion: &[u32]) -> TimeSeries {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, start_hour, 0, 0).unwrap();
        let records = motion
            .iter()
            .enumerate()
            .map(|(i, &m)| SeriesRecord {
                timestamp: start + Duration::minutes(i as i64),
                hall_motion: 0,
                kitchen_motion: 0,
                bedroom_motion: m,
                appliance_power_w: 0.0,
            })
            .collect();
        TimeSeries::new(records).unwrap()
    }

    #[test]
    fn test_sustained_power_fires_exactly_once() {
        // 900W for 35 minutes against a 300W/30min guard.
        let series = power_series(&vec![900.0; 35]);
        let alerts = appliance_left_on(&series, &DetectionConfig::default());

        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.label, "appliance_left_on");
        assert_eq!(alert.kind, AlertType::Guard);
        assert!(alert.features["minutes_on"] >= 30.0);
        assert_eq!(alert.features["power_w"], 900.0);
        // Fires at minute index 29 (the 30th on-sample).
        assert_eq!(
            alert.ts_end - alert.ts_start,
            Duration::minutes(29)
        );
    }

    #[test]
    fn test_oscillation_produces_no_alert() {
        // Alternating above-on / below-off for 40 minutes: neither threshold
        // is sustained long enough.
        let watts: Vec<f64> = (0..40)
            .map(|i| if i % 2 == 0 { 350.0 } else { 100.0 })
            .collect();
        let series = power_series(&watts);

        assert!(appliance_left_on(&series, &DetectionConfig::default()).is_empty());
    }

    #[test]
    fn test_short_dip_does_not_reset_the_episode() {
        // 20 on, 2 below-off (shorter than the 3-minute off requirement),
        // 10 more on: the episode is continuous and fires once.
        let mut watts = vec![900.0; 20];
        watts.extend([100.0, 100.0]);
        watts.extend(vec![900.0; 12]);
        let series = power_series(&watts);

        let alerts = appliance_left_on(&series, &DetectionConfig::default());
        assert_eq!(alerts.len(), 1);
    }

    #[test]
    fn test_sustained_off_rearms_the_detector() {
        // Two full 30-minute episodes separated by a sustained off period.
        let mut watts = vec![900.0; 30];
        watts.extend(vec![50.0; 5]);
        watts.extend(vec![900.0; 30]);
        let series = power_series(&watts);

        let alerts = appliance_left_on(&series, &DetectionConfig::default());
        assert_eq!(alerts.len(), 2);
    }

    #[test]
    fn test_mid_band_power_holds_the_streak() {
        // Power between off (200) and on (300) neither grows nor ends the
        // episode: 29 on, 5 mid-band, 1 on completes the streak.
        let mut watts = vec![400.0; 29];
        watts.extend(vec![250.0; 5]);
        watts.push(400.0);
        let series = power_series(&watts);

        let alerts = appliance_left_on(&series, &DetectionConfig::default());
        assert_eq!(alerts.len(), 1);
    }

    #[test]
    fn test_non_finite_power_is_skipped() {
        let mut watts = vec![900.0; 15];
        watts.push(f64::NAN);
        watts.extend(vec![900.0; 15]);
        let series = power_series(&watts);

        let alerts = appliance_left_on(&series, &DetectionConfig::default());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].features["minutes_on"], 30.0);
    }

    #[test]
    fn test_sleep_session_with_regular_turnovers() {
        // Quiet hours 22:00-07:00 for this household. Bedroom pressure from
        // 23:00 to 06:30 with a turnover every 10 minutes.
        let cfg = DetectionConfig {
            quiet_end_hour: 7,
            ..Default::default()
        };
        // Series runs 22:00 - 08:00; pressure active minutes 60..510.
        let motion: Vec<u32> = (0..600)
            .map(|i| {
                if (60..510).contains(&i) {
                    if i % 10 == 0 {
                        6 // turnover
                    } else {
                        1 // steady pressure
                    }
                } else {
                    0
                }
            })
            .collect();
        let series = bedroom_series(22, &motion);

        let alerts = sleep_sessions(&series, &cfg);
        assert_eq!(alerts.len(), 1);
        let info = &alerts[0];
        assert_eq!(info.label, "sleep_session");
        assert_eq!(info.kind, AlertType::Info);
        assert_eq!(info.features["duration_min"], 450.0);
        assert_eq!(info.features["turnovers"], 45.0);
    }

    #[test]
    fn test_single_early_turnover_raises_immobility() {
        let cfg = DetectionConfig {
            quiet_end_hour: 7,
            ..Default::default()
        };
        // Pressure 23:00-06:30, one turnover at 23:10, nothing after.
        let motion: Vec<u32> = (0..600)
            .map(|i| {
                if (60..510).contains(&i) {
                    if i == 70 {
                        6
                    } else {
                        1
                    }
                } else {
                    0
                }
            })
            .collect();
        let series = bedroom_series(22, &motion);

        let alerts = sleep_sessions(&series, &cfg);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].label, "sleep_session");
        assert_eq!(alerts[1].label, "possible_immobility");
        assert_eq!(alerts[1].kind, AlertType::Guard);
        // Gap from the 23:10 turnover to the 06:30 session end is 440 min.
        assert_eq!(alerts[1].features["max_gap_min"], 440.0);
    }

    #[test]
    fn test_short_sessions_are_discarded() {
        let cfg = DetectionConfig::default();
        // 30 minutes of pressure starting at 23:00: below the 60-minute floor.
        let motion: Vec<u32> = (0..120).map(|i| u32::from(i < 30)).collect();
        let series = bedroom_series(23, &motion);

        assert!(sleep_sessions(&series, &cfg).is_empty());
    }

    #[test]
    fn test_daytime_pressure_is_not_a_session() {
        let cfg = DetectionConfig::default();
        let motion = vec![1; 120];
        let series = bedroom_series(10, &motion);

        assert!(sleep_sessions(&series, &cfg).is_empty());
    }

    #[test]
    fn test_session_leaving_quiet_hours_closes() {
        // Pressure continues past quiet end (06:00 default); the session
        // closes at the quiet boundary.
        let cfg = DetectionConfig::default();
        // 04:00 start, pressure for 180 minutes (04:00-07:00).
        let motion = vec![1; 180];
        let series = bedroom_series(4, &motion);

        let alerts = sleep_sessions(&series, &cfg);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].features["duration_min"], 120.0);
    }

    #[test]
    fn test_open_tail_session_is_closed_at_series_end() {
        let cfg = DetectionConfig::default();
        // Pressure from 23:00 through the end of the series.
        let motion = vec![1; 90];
        let series = bedroom_series(23, &motion);

        let alerts = sleep_sessions(&series, &cfg);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].features["duration_min"], 90.0);
    }

    #[test]
    fn test_all_zero_motion_produces_nothing() {
        let cfg = DetectionConfig::default();
        let series = bedroom_series(0, &vec![0; 24 * 60]);

        assert!(sleep_sessions(&series, &cfg).is_empty());
    }
}
