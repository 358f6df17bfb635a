//! Windowing and feature extraction
//!
//! Slides a fixed-length window over the series in fixed hops and produces
//! one [`FeatureVector`] per full window. Partial windows at the tail are
//! dropped, so a series of length `L` yields `floor((L - W) / H) + 1`
//! windows.

use std::f64::consts::PI;

use chrono::Timelike;

use crate::config::DetectionConfig;
use crate::presence::count_transitions;
use crate::types::{FeatureVector, Room, TimeSeries};

/// End indices of every full-length window.
pub fn window_end_indices(len: usize, window: usize, hop: usize) -> Vec<usize> {
    if len < window || window == 0 || hop == 0 {
        return Vec::new();
    }
    (window - 1..len).step_by(hop).collect()
}

/// Extract one feature vector per full window.
///
/// `trace` is the current-room trace aligned with the series; transition
/// counting is restricted to each window's slice of it.
pub fn extract_features(
    series: &TimeSeries,
    trace: &[Option<Room>],
    config: &DetectionConfig,
) -> Vec<FeatureVector> {
    let records = series.records();
    let window = config.window_minutes;

    window_end_indices(records.len(), window, config.hop_minutes)
        .into_iter()
        .map(|end| {
            let start = end + 1 - window;
            let rows = &records[start..=end];

            let motion_sum: f64 = rows.iter().map(|r| r.total_motion() as f64).sum();
            let unique_rooms = Room::ALL
                .iter()
                .filter(|&&room| rows.iter().any(|r| r.motion(room) > 0))
                .count() as u32;

            let appliance_on_minutes = rows
                .iter()
                .filter(|r| {
                    r.appliance_power_w.is_finite()
                        && r.appliance_power_w > config.appliance_on_watts
                })
                .count() as f64;

            let ts_end = rows[rows.len() - 1].timestamp;
            let hour = ts_end.hour();

            FeatureVector {
                ts_end,
                motion_sum,
                unique_rooms,
                appliance_on_minutes,
                appliance_on_frac: appliance_on_minutes / window as f64,
                room_transitions: count_transitions(&trace[start..=end]),
                hour,
                is_quiet: config.is_quiet_hour(hour),
                motion_sum_sqrt: motion_sum.sqrt(),
                sin_hour: (2.0 * PI * hour as f64 / 24.0).sin(),
                cos_hour: (2.0 * PI * hour as f64 / 24.0).cos(),
            }
        })
        .collect()
}
