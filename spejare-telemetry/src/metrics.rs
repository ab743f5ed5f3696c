//! ## spejare-telemetry::metrics
//! Prometheus counters and histograms for the observer pipeline.
//!
//! The recorder owns its registry so embedders can run several observers in
//! one process without metric collisions. When the metrics section of the
//! configuration is disabled, nothing registers and the scrape output stays
//! empty; the increment paths become no-ops the caller never has to guard.

use prometheus::{Counter, Histogram, HistogramOpts, Registry};

use spejare_config::MetricsConfig;
use spejare_protocols::mqtt::StitchResult;

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub parsed_frames: Counter,
    pub invalid_frames: Counter,
    pub stitched_records: Counter,
    pub stitch_errors: Counter,
    pub parse_latency: Histogram,
    enabled: bool,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new(&MetricsConfig::default())
    }
}

impl MetricsRecorder {
    pub fn new(config: &MetricsConfig) -> Self {
        let registry = Registry::new();
        let parsed_frames =
            Counter::new("spejare_parsed_frames_total", "Complete frames parsed").unwrap();
        let invalid_frames = Counter::new(
            "spejare_invalid_frames_total",
            "Malformed stretches dropped during parsing",
        )
        .unwrap();
        let stitched_records = Counter::new(
            "spejare_stitched_records_total",
            "Request/response records emitted",
        )
        .unwrap();
        let stitch_errors = Counter::new(
            "spejare_stitch_errors_total",
            "Responses and aged-out requests left unmatched",
        )
        .unwrap();
        let parse_latency = Histogram::with_opts(
            HistogramOpts::new("spejare_parse_latency_ns", "Frame parsing time")
                .buckets(vec![100.0, 1_000.0, 10_000.0, 100_000.0]),
        )
        .unwrap();

        if config.enabled {
            registry.register(Box::new(parsed_frames.clone())).unwrap();
            registry.register(Box::new(invalid_frames.clone())).unwrap();
            registry
                .register(Box::new(stitched_records.clone()))
                .unwrap();
            registry.register(Box::new(stitch_errors.clone())).unwrap();
            registry.register(Box::new(parse_latency.clone())).unwrap();
        }

        Self {
            registry,
            parsed_frames,
            invalid_frames,
            stitched_records,
            stitch_errors,
            parse_latency,
            enabled: config.enabled,
        }
    }

    /// Folds one stitching pass into the counters.
    pub fn observe_stitch(&self, result: &StitchResult) {
        if !self.enabled {
            return;
        }
        self.stitched_records.inc_by(result.records.len() as f64);
        self.stitch_errors.inc_by(result.error_count as f64);
    }

    pub fn inc_parsed_frames(&self) {
        if self.enabled {
            self.parsed_frames.inc();
        }
    }

    pub fn inc_invalid_frames(&self) {
        if self.enabled {
            self.invalid_frames.inc();
        }
    }

    pub fn observe_parse_latency(&self, nanos: f64) {
        if self.enabled {
            self.parse_latency.observe(nanos);
        }
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer).unwrap_or_default())
    }
}
