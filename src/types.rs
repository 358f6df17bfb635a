//! Core types for the Hearthguard pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: the validated input series, per-window feature vectors, scored
//! windows, and the normalized alert records handed to downstream consumers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Monitored rooms, in canonical order.
///
/// The ordering doubles as the deterministic tie-break when several rooms are
/// simultaneously active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Room {
    Hall,
    Kitchen,
    Bedroom,
}

impl Room {
    /// All rooms in canonical order.
    pub const ALL: [Room; 3] = [Room::Hall, Room::Kitchen, Room::Bedroom];

    pub fn as_str(&self) -> &'static str {
        match self {
            Room::Hall => "hall",
            Room::Kitchen => "kitchen",
            Room::Bedroom => "bedroom",
        }
    }
}

/// One telemetry row: per-room motion counts and the appliance power reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesRecord {
    /// Sample timestamp (UTC). Nominal cadence is one minute.
    pub timestamp: DateTime<Utc>,
    /// Motion events observed in the hall during this sample.
    pub hall_motion: u32,
    /// Motion events observed in the kitchen during this sample.
    pub kitchen_motion: u32,
    /// Motion events observed in the bedroom during this sample.
    pub bedroom_motion: u32,
    /// Appliance power draw in watts. Non-finite values are tolerated and
    /// skipped by per-sample checks.
    pub appliance_power_w: f64,
}

impl SeriesRecord {
    /// Motion count for one room.
    pub fn motion(&self, room: Room) -> u32 {
        match room {
            Room::Hall => self.hall_motion,
            Room::Kitchen => self.kitchen_motion,
            Room::Bedroom => self.bedroom_motion,
        }
    }

    /// Motion summed across all rooms.
    pub fn total_motion(&self) -> u32 {
        Room::ALL.iter().map(|&r| self.motion(r)).sum()
    }
}

/// Validated, time-ordered input series.
///
/// Construction goes through [`TimeSeries::new`] or [`TimeSeries::from_json`]
/// and enforces the input contract: non-empty, strictly increasing
/// timestamps, no duplicates. Irregular sampling is logged as a warning, not
/// rejected.
#[derive(Debug, Clone, Serialize)]
pub struct TimeSeries {
    records: Vec<SeriesRecord>,
}

impl TimeSeries {
    /// Validate and wrap a vector of records.
    pub fn new(records: Vec<SeriesRecord>) -> Result<Self, PipelineError> {
        if records.is_empty() {
            return Err(PipelineError::Parse("input series is empty".into()));
        }

        for i in 1..records.len() {
            let prev = records[i - 1].timestamp;
            let cur = records[i].timestamp;
            if cur == prev {
                return Err(PipelineError::DuplicateTimestamp {
                    at: i,
                    timestamp: cur.to_rfc3339(),
                });
            }
            if cur < prev {
                return Err(PipelineError::UnsortedTimestamps { at: i });
            }
        }

        let series = Self { records };
        series.warn_on_irregular_cadence();
        Ok(series)
    }

    /// Parse a JSON array of records and validate it.
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        let records: Vec<SeriesRecord> =
            serde_json::from_str(json).map_err(|e| PipelineError::Parse(e.to_string()))?;
        Self::new(records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[SeriesRecord] {
        &self.records
    }

    /// Median sampling interval in seconds.
    pub fn median_interval_secs(&self) -> Option<i64> {
        if self.records.len() < 2 {
            return None;
        }
        let mut diffs: Vec<i64> = self
            .records
            .windows(2)
            .map(|p| (p[1].timestamp - p[0].timestamp).num_seconds())
            .collect();
        diffs.sort_unstable();
        Some(diffs[diffs.len() / 2])
    }

    fn warn_on_irregular_cadence(&self) {
        if let Some(median) = self.median_interval_secs() {
            if median > 120 {
                log::warn!(
                    "series cadence is coarser than expected: median interval {}s, expected ~60s",
                    median
                );
            }
        }
        let gaps = self
            .records
            .windows(2)
            .filter(|p| (p[1].timestamp - p[0].timestamp).num_seconds() > 120)
            .count();
        if gaps > 0 {
            log::warn!("series contains {} gaps longer than 2 minutes", gaps);
        }
    }
}

/// Fixed-schema feature vector for one window.
///
/// One vector is emitted per full-length window; the window is identified by
/// the timestamp of its last sample.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureVector {
    /// Timestamp of the window's last sample.
    pub ts_end: DateTime<Utc>,
    /// Motion summed across all rooms and samples in the window.
    pub motion_sum: f64,
    /// Rooms with any nonzero motion anywhere in the window.
    pub unique_rooms: u32,
    /// Samples with appliance power above the on-threshold.
    pub appliance_on_minutes: f64,
    /// `appliance_on_minutes` as a fraction of the window length.
    pub appliance_on_frac: f64,
    /// Room transitions within the window.
    pub room_transitions: u32,
    /// Hour of day of the window's last sample.
    pub hour: u32,
    /// Whether that hour falls in the configured quiet window.
    pub is_quiet: bool,
    /// Square root of `motion_sum`, compressing heavy-tailed counts.
    pub motion_sum_sqrt: f64,
    /// Sine of the cyclic hour encoding.
    pub sin_hour: f64,
    /// Cosine of the cyclic hour encoding.
    pub cos_hour: f64,
}

/// Number of feature columns fed to the outlier model.
pub const MODEL_DIMS: usize = 7;

impl FeatureVector {
    /// The numeric columns the outlier model is fit on.
    pub fn model_row(&self) -> [f64; MODEL_DIMS] {
        [
            self.motion_sum_sqrt,
            self.unique_rooms as f64,
            self.appliance_on_frac,
            self.room_transitions as f64,
            self.sin_hour,
            self.cos_hour,
            if self.is_quiet { 1.0 } else { 0.0 },
        ]
    }
}

/// A feature window with its anomaly score and hour-specific threshold.
#[derive(Debug, Clone)]
pub struct ScoredWindow {
    pub feature: FeatureVector,
    /// Unitless anomaly score, higher = more anomalous. Only comparable
    /// within a single run's model fit.
    pub score: f64,
    /// Hour-specific threshold the score is judged against.
    pub threshold: f64,
}

/// Alert category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    /// Rule-based detector independent of the outlier model.
    Guard,
    /// Statistical anomaly from the outlier model.
    Anomaly,
    /// Informational summary, not an alarm.
    Info,
}

/// Acknowledgment lifecycle state. Alerts are emitted as `New`; transitions
/// are owned by the downstream consumer, not this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckStatus {
    New,
    Acknowledged,
    Dismissed,
}

/// Pre-normalization alert produced by a detector.
#[derive(Debug, Clone)]
pub struct AlertDraft {
    pub ts_start: DateTime<Utc>,
    pub ts_end: DateTime<Utc>,
    pub kind: AlertType,
    pub label: String,
    pub score: Option<f64>,
    pub features: BTreeMap<String, f64>,
    pub explanations: Vec<String>,
}

/// Run-level policy context stamped onto every alert for auditability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyContext {
    /// Quiet-hour window the run used, as "HH:MM-HH:MM".
    pub quiet_hours: String,
    /// Engine version that produced the alert.
    pub engine_version: String,
}

/// Normalized alert record, the universal pipeline output.
///
/// Immutable once emitted; acknowledgment and snoozing belong to the
/// downstream consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Unique alert id.
    pub id: String,
    /// Window start, RFC 3339.
    pub ts_start: String,
    /// Window end, RFC 3339.
    pub ts_end: String,
    #[serde(rename = "type")]
    pub kind: AlertType,
    pub label: String,
    pub score: Option<f64>,
    /// Named numeric features relevant to the decision.
    pub features: BTreeMap<String, f64>,
    /// Human-readable explanation strings.
    pub explanations: Vec<String>,
    /// Snooze deadline; always `None` at emission.
    pub snoozed_until: Option<String>,
    pub ack_status: AckStatus,
    pub household_id: String,
    pub policy_context: PolicyContext,
}
