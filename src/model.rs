//! Outlier model fitting and scoring
//!
//! Wraps feature standardization and the isolation forest into one per-run
//! model. The model is fit on a training subset of windows (daytime windows
//! by default, as a proxy for routine activity), then scores every window.
//! Scores are relative to a single run's fit and must never be compared
//! across runs. Each pipeline run owns its model; nothing here is shared or
//! global.

use crate::config::DetectionConfig;
use crate::forest::IsolationForest;
use crate::types::{FeatureVector, MODEL_DIMS};

/// End-hour cutoff for the default training subset: windows ending before
/// noon stand in for routine daytime activity.
const TRAIN_HOUR_CUTOFF: u32 = 12;

/// Per-column standardization fit on the training subset only.
pub struct Standardizer {
    means: [f64; MODEL_DIMS],
    stds: [f64; MODEL_DIMS],
}

impl Standardizer {
    /// Fit means and standard deviations on the given rows.
    ///
    /// Zero or non-finite spread degrades to a unit scale so constant
    /// columns pass through unchanged.
    pub fn fit(rows: &[[f64; MODEL_DIMS]]) -> Self {
        let n = rows.len().max(1) as f64;
        let mut means = [0.0; MODEL_DIMS];
        let mut stds = [1.0; MODEL_DIMS];

        for col in 0..MODEL_DIMS {
            let mean = rows.iter().map(|r| r[col]).sum::<f64>() / n;
            let var = rows.iter().map(|r| (r[col] - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            means[col] = mean;
            stds[col] = if std.is_finite() && std > 0.0 { std } else { 1.0 };
        }

        Self { means, stds }
    }

    pub fn transform(&self, row: &[f64; MODEL_DIMS]) -> Vec<f64> {
        (0..MODEL_DIMS)
            .map(|col| (row[col] - self.means[col]) / self.stds[col])
            .collect()
    }
}

/// One run's fitted scaler and forest.
pub struct OutlierModel {
    scaler: Standardizer,
    forest: IsolationForest,
}

impl OutlierModel {
    /// Select the training subset, fit the scaler and forest on it.
    ///
    /// Falls back to the first windows by time when the daytime subset is too
    /// small; the fallback is logged, never an error.
    pub fn fit(features: &[FeatureVector], config: &DetectionConfig) -> Self {
        let rows: Vec<[f64; MODEL_DIMS]> = features.iter().map(|f| f.model_row()).collect();

        let mut train_idx: Vec<usize> = features
            .iter()
            .enumerate()
            .filter(|(_, f)| f.hour < TRAIN_HOUR_CUTOFF)
            .map(|(i, _)| i)
            .collect();

        if train_idx.len() < config.min_training_windows {
            log::warn!(
                "daytime training subset has {} windows (need {}); training on first {} windows",
                train_idx.len(),
                config.min_training_windows,
                rows.len().min(config.training_fallback_windows)
            );
            train_idx = (0..rows.len().min(config.training_fallback_windows)).collect();
        }

        let train_rows: Vec<[f64; MODEL_DIMS]> = train_idx.iter().map(|&i| rows[i]).collect();
        let scaler = Standardizer::fit(&train_rows);

        let scaled_train: Vec<Vec<f64>> = train_rows.iter().map(|r| scaler.transform(r)).collect();
        let forest = IsolationForest::fit(&scaled_train, config.forest_trees, config.rng_seed);

        Self { scaler, forest }
    }

    /// Anomaly score for one window; higher = more anomalous.
    pub fn score(&self, feature: &FeatureVector) -> f64 {
        self.forest.score(&self.scaler.transform(&feature.model_row()))
    }
}
