//! Detection configuration
//!
//! Every tunable the pipeline uses lives here as an explicit field. The
//! defaults are the values the detectors were calibrated with; callers
//! override them by constructing or deserializing a modified config and
//! passing it through [`crate::pipeline::DetectionPipeline::new`]. No
//! component reads configuration from anywhere else.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Immutable configuration passed through every pipeline component.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Quiet hours start (inclusive, 0-23). May wrap past midnight.
    pub quiet_start_hour: u32,
    /// Quiet hours end (exclusive, 0-23).
    pub quiet_end_hour: u32,
    /// Feature window length in samples (minutes).
    pub window_minutes: usize,
    /// Hop between consecutive window end-points in samples (minutes).
    pub hop_minutes: usize,
    /// Seed for the outlier model, for reproducible runs.
    pub rng_seed: u64,

    /// Power above this (watts) counts as the appliance being on.
    pub appliance_on_watts: f64,
    /// Minutes of continuous on-power before the left-on guard fires.
    pub appliance_min_on_minutes: u32,
    /// Power must drop below this (watts) to start ending an episode.
    pub appliance_off_watts: f64,
    /// Consecutive below-off samples required to end an episode.
    pub appliance_off_min_minutes: u32,

    /// Percentile (0-100) of per-hour scores used as the anomaly threshold.
    pub anomaly_percentile: f64,
    /// Hours with fewer scored windows than this fall back to the global
    /// percentile.
    pub min_hour_samples: usize,
    /// Candidates within this many minutes of each other merge into one
    /// incident.
    pub incident_merge_gap_minutes: i64,
    /// Consecutive agreeing samples required to commit a presence change.
    pub debounce_stable_samples: u32,

    /// Multiplier applied to the threshold during quiet hours.
    pub quiet_threshold_factor: f64,
    /// Suppression ceiling: quiet single-room windows with motion at or below
    /// this are never candidates.
    pub quiet_low_motion_max: f64,
    /// Motion above this is anomalous activity regardless of time of day.
    pub high_motion_threshold: f64,
    /// Candidacy floor for single-room, no-appliance windows.
    pub pressure_only_motion_min: f64,
    /// Room transitions at or above this during quiet hours count as
    /// wandering.
    pub wandering_transitions: u32,

    /// Minimum bedroom motion for a sample to count as bed pressure.
    pub sleep_min_pressure: u32,
    /// Sessions shorter than this many minutes are discarded.
    pub sleep_min_session_minutes: i64,
    /// Bedroom motion at or above this marks a turnover (position change).
    pub sleep_turnover_threshold: u32,
    /// Turnover gaps at or above this many minutes raise an immobility guard.
    pub sleep_immobility_gap_minutes: i64,

    /// Number of trees in the isolation forest.
    pub forest_trees: usize,
    /// Minimum windows for the daytime training subset before falling back.
    pub min_training_windows: usize,
    /// Fallback: train on the first N windows by time.
    pub training_fallback_windows: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            quiet_start_hour: 22,
            quiet_end_hour: 6,
            window_minutes: 15,
            hop_minutes: 5,
            rng_seed: 42,

            appliance_on_watts: 300.0,
            appliance_min_on_minutes: 30,
            appliance_off_watts: 200.0,
            appliance_off_min_minutes: 3,

            anomaly_percentile: 97.5,
            min_hour_samples: 4,
            incident_merge_gap_minutes: 30,
            debounce_stable_samples: 2,

            quiet_threshold_factor: 0.90,
            quiet_low_motion_max: 30.0,
            high_motion_threshold: 60.0,
            pressure_only_motion_min: 12.0,
            wandering_transitions: 3,

            sleep_min_pressure: 1,
            sleep_min_session_minutes: 60,
            sleep_turnover_threshold: 5,
            sleep_immobility_gap_minutes: 240,

            forest_trees: 200,
            min_training_windows: 10,
            training_fallback_windows: 50,
        }
    }
}

impl DetectionConfig {
    /// Whether an hour of day falls within the configured quiet window.
    ///
    /// The window may wrap past midnight (start 22, end 6 covers 22:00-05:59)
    /// or not (start 0, end 6 covers 00:00-05:59). Start == end means no
    /// quiet hours.
    pub fn is_quiet_hour(&self, hour: u32) -> bool {
        if self.quiet_start_hour == self.quiet_end_hour {
            return false;
        }
        if self.quiet_start_hour < self.quiet_end_hour {
            hour >= self.quiet_start_hour && hour < self.quiet_end_hour
        } else {
            hour >= self.quiet_start_hour || hour < self.quiet_end_hour
        }
    }

    /// Quiet window rendered as "HH:MM-HH:MM" for alert policy context.
    pub fn quiet_hours_label(&self) -> String {
        format!(
            "{:02}:00-{:02}:00",
            self.quiet_start_hour, self.quiet_end_hour
        )
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.window_minutes == 0 {
            return Err(PipelineError::InvalidConfig(
                "window_minutes must be positive".into(),
            ));
        }
        if self.hop_minutes == 0 {
            return Err(PipelineError::InvalidConfig(
                "hop_minutes must be positive".into(),
            ));
        }
        if self.quiet_start_hour > 23 || self.quiet_end_hour > 23 {
            return Err(PipelineError::InvalidConfig(
                "quiet hours must be within 0-23".into(),
            ));
        }
        if !(0.0..=100.0).contains(&self.anomaly_percentile) {
            return Err(PipelineError::InvalidConfig(
                "anomaly_percentile must be within 0-100".into(),
            ));
        }
        if self.debounce_stable_samples == 0 {
            return Err(PipelineError::InvalidConfig(
                "debounce_stable_samples must be positive".into(),
            ));
        }
        if self.forest_trees == 0 {
            return Err(PipelineError::InvalidConfig(
                "forest_trees must be positive".into(),
            ));
        }
        Ok(())
    }
}
