//! Hearthguard - behavioral anomaly detection for household sensor telemetry
//!
//! Hearthguard turns per-minute room motion and appliance power readings into
//! a normalized list of alerts through a deterministic batch pipeline:
//! presence debouncing → room tracing → windowed feature extraction → per-run
//! outlier scoring → adaptive thresholds → incident grouping, with rule-based
//! guard detectors (appliance left on, sleep sessions and immobility) running
//! alongside the statistical path.
//!
//! ## Modules
//!
//! - **Pipeline**: one-shot batch runs over a validated [`TimeSeries`]
//! - **Guards**: rule-based detectors independent of the outlier model
//! - **Model**: seeded isolation forest with per-run standardization

pub mod config;
pub mod debounce;
pub mod error;
pub mod features;
pub mod forest;
pub mod guards;
pub mod incidents;
pub mod model;
pub mod normalizer;
pub mod pipeline;
pub mod presence;
pub mod threshold;
pub mod types;

pub use config::DetectionConfig;
pub use error::PipelineError;
pub use pipeline::{detect_alerts, DetectionPipeline};
pub use types::{Alert, AlertType, Room, SeriesRecord, TimeSeries};

/// Engine version stamped into every alert's policy context
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for logs and tooling
pub const PRODUCER_NAME: &str = "hearthguard";
