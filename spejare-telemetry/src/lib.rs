//! # Spejare Telemetry
//!
//! Crate for logging and metrics around the observer core. The core itself
//! stays pure; embedders wire its outputs through the recorder here and into
//! whatever scrape endpoint or log pipeline they run.

pub mod logging;
pub mod metrics;

pub use logging::{EventLogger, ObserverEvent};
pub use metrics::MetricsRecorder;
