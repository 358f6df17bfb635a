//! Error types for Hearthguard

use thiserror::Error;

/// Errors raised before any detection work begins.
///
/// Everything past input validation recovers locally (logged fallbacks,
/// skipped samples) and never surfaces here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to parse input series: {0}")]
    Parse(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Series has {rows} rows but at least {required} are required for one window")]
    TooFewRows { rows: usize, required: usize },

    #[error("Timestamps must be strictly increasing (violation at row {at})")]
    UnsortedTimestamps { at: usize },

    #[error("Duplicate timestamp at row {at}: {timestamp}")]
    DuplicateTimestamp { at: usize, timestamp: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
