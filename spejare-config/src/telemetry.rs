//! Observability configuration.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// Metrics collection parameters.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct MetricsConfig {
    /// Whether the Prometheus registry is populated at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Tracing subscriber parameters.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct TracingConfig {
    /// Emit span enter events alongside log lines.
    #[serde(default)]
    pub span_events: bool,
}

/// Telemetry configuration.
#[derive(Default, Debug, Serialize, Deserialize, Validate, Clone)]
pub struct TelemetryConfig {
    #[validate(nested)]
    pub metrics: MetricsConfig,

    #[validate(nested)]
    pub tracing: TracingConfig,
}

fn default_true() -> bool {
    true
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self { span_events: false }
    }
}
