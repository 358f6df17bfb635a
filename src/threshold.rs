//! Adaptive thresholds and candidate filtering
//!
//! Scores only become alerts when two independent tests agree: the score
//! clears an hour-specific percentile threshold, and the window's activity
//! shape looks behaviorally meaningful. The shape test keeps sparse
//! quiet-hour data from flooding the output with statistically-high but
//! behaviorally-empty windows.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::config::DetectionConfig;
use crate::types::{FeatureVector, ScoredWindow};

/// Percentile with linear interpolation between order statistics.
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let rank = (pct / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (rank - lo as f64) * (sorted[hi] - sorted[lo])
    }
}

/// Pair every window with its hour-specific threshold.
///
/// Each hour present in the run gets the configured percentile of its own
/// scores; hours with fewer than `min_hour_samples` windows fall back to the
/// global percentile across all windows.
pub fn assign_thresholds(
    features: Vec<FeatureVector>,
    scores: Vec<f64>,
    config: &DetectionConfig,
) -> Vec<ScoredWindow> {
    debug_assert_eq!(features.len(), scores.len());

    let mut by_hour: HashMap<u32, Vec<f64>> = HashMap::new();
    for (feature, &score) in features.iter().zip(scores.iter()) {
        by_hour.entry(feature.hour).or_default().push(score);
    }

    let global = percentile(&scores, config.anomaly_percentile);
    let hourly: HashMap<u32, f64> = by_hour
        .iter()
        .filter(|(_, s)| s.len() >= config.min_hour_samples)
        .map(|(&hour, s)| (hour, percentile(s, config.anomaly_percentile)))
        .collect();

    features
        .into_iter()
        .zip(scores)
        .map(|(feature, score)| {
            let threshold = hourly.get(&feature.hour).copied().unwrap_or(global);
            ScoredWindow {
                feature,
                score,
                threshold,
            }
        })
        .collect()
}

/// Whether a scored window passes both the score and the shape test.
///
/// The quiet low-motion suppression rule is checked first and wins over any
/// score: routine single-room quiet presence is never a candidate.
pub fn is_candidate(window: &ScoredWindow, config: &DetectionConfig) -> bool {
    let f = &window.feature;
    let adjusted = window.threshold
        * if f.is_quiet {
            config.quiet_threshold_factor
        } else {
            1.0
        };

    // Routine quiet presence: one room, no movement between rooms, no
    // appliance, low motion. Suppressed regardless of score.
    if f.is_quiet
        && f.unique_rooms == 1
        && f.room_transitions == 0
        && f.appliance_on_frac == 0.0
        && f.motion_sum <= config.quiet_low_motion_max
    {
        return false;
    }

    let pressure_only = f.unique_rooms == 1 && f.appliance_on_frac == 0.0;
    let shape_plausible = (f.is_quiet && f.room_transitions >= config.wandering_transitions)
        || f.motion_sum > config.high_motion_threshold
        || (pressure_only && f.motion_sum >= config.pressure_only_motion_min);

    window.score >= adjusted && shape_plausible
}

/// Filter a run's windows down to candidate anomalies, preserving order.
pub fn candidates(windows: &[ScoredWindow], config: &DetectionConfig) -> Vec<ScoredWindow> {
    windows
        .iter()
        .filter(|w| is_candidate(w, config))
        .cloned()
        .collect()
}
