//! Pipeline orchestration
//!
//! This module provides the public API for Hearthguard. One run processes one
//! validated series end to end: presence debouncing, room tracing, windowed
//! feature extraction, per-run outlier model fit and scoring, adaptive
//! thresholds, candidate filtering, guard detectors, incident grouping, and
//! alert normalization. Runs are stateless and independent; every model
//! object is constructed inside the run and dropped with it.

use crate::config::DetectionConfig;
use crate::debounce::debounce;
use crate::error::PipelineError;
use crate::features::extract_features;
use crate::guards::{appliance_left_on, sleep_sessions};
use crate::incidents::group_incidents;
use crate::model::OutlierModel;
use crate::normalizer::AlertNormalizer;
use crate::presence::room_trace;
use crate::threshold::{assign_thresholds, candidates};
use crate::types::{Alert, AlertType, Room, TimeSeries};

/// Batch detection pipeline bound to one configuration.
pub struct DetectionPipeline {
    config: DetectionConfig,
}

impl DetectionPipeline {
    /// Validate the configuration and build a pipeline.
    pub fn new(config: DetectionConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Run detection over one series and return normalized alerts.
    ///
    /// Fails only on input validation; every downstream condition degrades to
    /// a logged fallback and a complete (possibly empty) alert list.
    pub fn run(&self, series: &TimeSeries, household_id: &str) -> Result<Vec<Alert>, PipelineError> {
        let config = &self.config;

        if series.len() < config.window_minutes {
            return Err(PipelineError::TooFewRows {
                rows: series.len(),
                required: config.window_minutes,
            });
        }

        log::info!(
            "starting detection run: {} rows, household {}",
            series.len(),
            household_id
        );

        // Presence: raw per-room activity, debounced per room.
        let debounced: Vec<Vec<bool>> = Room::ALL
            .iter()
            .map(|&room| {
                let raw: Vec<Option<bool>> = series
                    .records()
                    .iter()
                    .map(|r| Some(r.motion(room) > 0))
                    .collect();
                debounce(&raw, config.debounce_stable_samples)
            })
            .collect();
        let trace = room_trace([&debounced[0], &debounced[1], &debounced[2]]);

        // Windowed features.
        let features = extract_features(series, &trace, config);
        if features.is_empty() {
            log::warn!("no complete windows; returning an empty alert list");
            return Ok(Vec::new());
        }

        // Per-run model fit and scoring.
        let model = OutlierModel::fit(&features, config);
        let scores: Vec<f64> = features.iter().map(|f| model.score(f)).collect();

        // Thresholds and candidate anomalies.
        let windows = assign_thresholds(features, scores, config);
        let candidate_windows = candidates(&windows, config);

        // Guards run over the raw series, independent of the model.
        let guard_alerts = appliance_left_on(series, config);
        let sleep_alerts = sleep_sessions(series, config);

        let incident_alerts = group_incidents(&candidate_windows, config);

        let mut drafts = guard_alerts;
        drafts.extend(incident_alerts);
        drafts.extend(sleep_alerts);

        let normalizer = AlertNormalizer::new(config, household_id);
        let alerts = normalizer.normalize_all(drafts);

        log::info!(
            "run complete: {} alerts ({} guard, {} anomaly, {} info)",
            alerts.len(),
            alerts.iter().filter(|a| a.kind == AlertType::Guard).count(),
            alerts.iter().filter(|a| a.kind == AlertType::Anomaly).count(),
            alerts.iter().filter(|a| a.kind == AlertType::Info).count(),
        );

        Ok(alerts)
    }
}

/// Run detection with the default configuration (stateless, one-shot).
pub fn detect_alerts(series: &TimeSeries, household_id: &str) -> Result<Vec<Alert>, PipelineError> {
    DetectionPipeline::new(DetectionConfig::default())?.run(series, household_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SeriesRecord;
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    /// Deterministic 24-hour household day, one sample per minute:
    /// - bedroom pressure overnight with a turnover every 10 minutes;
    /// - a wandering episode 02:00-02:24 alternating hall/kitchen, with the
    ///   bed left empty;
    /// - modest hall/kitchen activity 06:00-22:00;
    /// - lunch cooking 13:00-13:24 (shorter than the left-on guard);
    /// - oven left at 900 W from 23:00 to 23:59.
    fn demo_day() -> TimeSeries {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let records = (0..24 * 60)
            .map(|i| {
                let hour = i / 60;
                let night = !(6..22).contains(&hour);
                let wandering = (120..145).contains(&i);

                let mut hall = 0;
                let mut kitchen = 0;
                let mut bedroom = 0;
                let mut power = 0.0;

                if night && !wandering {
                    bedroom = if i % 10 == 0 { 6 } else { 1 };
                }
                if wandering {
                    if (i / 2) % 2 == 0 {
                        hall = 6;
                    } else {
                        kitchen = 6;
                    }
                }
                if (6..22).contains(&hour) {
                    hall = 1 + (i % 2) as u32;
                    kitchen = ((i / 7) % 2) as u32;
                }
                if (780..805).contains(&i) {
                    power = 850.0; // lunch
                }
                if hour == 23 {
                    power = 900.0; // left on
                }

                SeriesRecord {
                    timestamp: start + Duration::minutes(i),
                    hall_motion: hall,
                    kitchen_motion: kitchen,
                    bedroom_motion: bedroom,
                    appliance_power_w: power,
                }
            })
            .collect();
        TimeSeries::new(records).unwrap()
    }

    fn quiet_day() -> TimeSeries {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let records = (0..24 * 60)
            .map(|i| SeriesRecord {
                timestamp: start + Duration::minutes(i),
                hall_motion: 0,
                kitchen_motion: 0,
                bedroom_motion: 0,
                appliance_power_w: 0.0,
            })
            .collect();
        TimeSeries::new(records).unwrap()
    }

    #[test]
    fn test_too_few_rows_is_rejected_before_any_work() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let records = (0..10)
            .map(|i| SeriesRecord {
                timestamp: start + Duration::minutes(i),
                hall_motion: 0,
                kitchen_motion: 0,
                bedroom_motion: 0,
                appliance_power_w: 0.0,
            })
            .collect();
        let series = TimeSeries::new(records).unwrap();

        let err = detect_alerts(&series, "H1").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::TooFewRows {
                rows: 10,
                required: 15
            }
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let cfg = DetectionConfig {
            hop_minutes: 0,
            ..Default::default()
        };
        assert!(DetectionPipeline::new(cfg).is_err());
    }

    #[test]
    fn test_all_zero_day_yields_no_alerts() {
        let alerts = detect_alerts(&quiet_day(), "H1").unwrap();
        assert_eq!(alerts.len(), 0);
    }

    #[test]
    fn test_demo_day_fires_the_appliance_guard_once() {
        let alerts = detect_alerts(&demo_day(), "H1").unwrap();

        let appliance: Vec<_> = alerts
            .iter()
            .filter(|a| a.label == "appliance_left_on")
            .collect();
        assert_eq!(appliance.len(), 1);
        assert_eq!(appliance[0].kind, AlertType::Guard);
        assert!(appliance[0].features["minutes_on"] >= 30.0);
        // Lunch cooking (25 min) must not fire.
        assert!(appliance[0].ts_start.starts_with("2025-01-01T23:00"));
    }

    #[test]
    fn test_demo_day_detects_night_wandering() {
        let alerts = detect_alerts(&demo_day(), "H1").unwrap();

        let anomalies: Vec<_> = alerts
            .iter()
            .filter(|a| a.kind == AlertType::Anomaly)
            .collect();
        assert!(!anomalies.is_empty(), "expected a wandering incident");
        for anomaly in &anomalies {
            assert_eq!(anomaly.label, "night_wandering");
            assert!(anomaly.score.is_some());
            assert!(anomaly.ts_start.starts_with("2025-01-01T02:"));
        }
    }

    #[test]
    fn test_demo_day_reconstructs_sleep_sessions() {
        let alerts = detect_alerts(&demo_day(), "H1").unwrap();

        let sessions: Vec<_> = alerts
            .iter()
            .filter(|a| a.label == "sleep_session")
            .collect();
        // Night pressure split by the wandering episode, plus the evening
        // tail session: 00:00-02:00, 02:25-06:00, 22:00-end.
        assert_eq!(sessions.len(), 3);
        for s in &sessions {
            assert_eq!(s.kind, AlertType::Info);
            assert!(s.features["duration_min"] >= 60.0);
        }
        // Turnovers every 10 minutes: nobody is immobile.
        assert!(alerts.iter().all(|a| a.label != "possible_immobility"));
    }

    #[test]
    fn test_alerts_carry_uniform_normalized_shape() {
        let alerts = detect_alerts(&demo_day(), "H7").unwrap();
        assert!(!alerts.is_empty());

        let mut ids = std::collections::HashSet::new();
        for alert in &alerts {
            assert!(ids.insert(alert.id.clone()), "duplicate alert id");
            assert_eq!(alert.household_id, "H7");
            assert_eq!(alert.policy_context.quiet_hours, "22:00-06:00");
            assert!(alert.snoozed_until.is_none());
        }
    }

    #[test]
    fn test_runs_are_deterministic_apart_from_ids() {
        let series = demo_day();
        let a = detect_alerts(&series, "H1").unwrap();
        let b = detect_alerts(&series, "H1").unwrap();

        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.label, y.label);
            assert_eq!(x.ts_start, y.ts_start);
            assert_eq!(x.ts_end, y.ts_end);
            assert_eq!(x.score, y.score);
            assert_eq!(x.features, y.features);
        }
    }

    #[test]
    fn test_custom_quiet_hours_flow_into_policy_context() {
        let cfg = DetectionConfig {
            quiet_start_hour: 23,
            quiet_end_hour: 7,
            ..Default::default()
        };
        let pipeline = DetectionPipeline::new(cfg).unwrap();
        let alerts = pipeline.run(&demo_day(), "H1").unwrap();

        assert!(alerts
            .iter()
            .all(|a| a.policy_context.quiet_hours == "23:00-07:00"));
    }
}
