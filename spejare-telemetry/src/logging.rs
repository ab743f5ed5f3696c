//! ## spejare-telemetry::logging
//! Structured logging for the observer pipeline.
//!
//! Log lines are driven by typed [`ObserverEvent`]s built from parser and
//! stitcher outcomes, so every emission carries the same field names and a
//! downstream pipeline can filter on `event_type` without string matching
//! free-form messages.

use opentelemetry::KeyValue;
use spejare_config::TracingConfig;
use spejare_protocols::mqtt::{Direction, StitchResult, StreamParse};
use tracing_subscriber::fmt::format::FmtSpan;

/// A pipeline milestone worth a log line.
#[derive(Debug)]
pub enum ObserverEvent {
    /// One capture chunk was drained by the frame parser.
    FramesParsed {
        direction: Direction,
        frames: usize,
        invalid: u64,
    },
    /// One stitching pass over a connection's deques finished.
    StitchCompleted { records: usize, errors: u64 },
}

impl ObserverEvent {
    pub fn frames_parsed(direction: Direction, outcome: &StreamParse) -> Self {
        Self::FramesParsed {
            direction,
            frames: outcome.frames.len(),
            invalid: outcome.invalid_count,
        }
    }

    pub fn stitch_completed(outcome: &StitchResult) -> Self {
        Self::StitchCompleted {
            records: outcome.records.len(),
            errors: outcome.error_count,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FramesParsed { .. } => "frames_parsed",
            Self::StitchCompleted { .. } => "stitch_completed",
        }
    }

    /// The event's fields as OpenTelemetry attributes, for embedders that
    /// forward events to an OTLP exporter instead of (or besides) the log.
    pub fn attributes(&self) -> Vec<KeyValue> {
        match self {
            Self::FramesParsed {
                direction,
                frames,
                invalid,
            } => vec![
                KeyValue::new(
                    "direction",
                    match direction {
                        Direction::Request => "request",
                        Direction::Response => "response",
                    },
                ),
                KeyValue::new("frames", *frames as i64),
                KeyValue::new("invalid", *invalid as i64),
            ],
            Self::StitchCompleted { records, errors } => vec![
                KeyValue::new("records", *records as i64),
                KeyValue::new("errors", *errors as i64),
            ],
        }
    }
}

pub struct EventLogger;

impl EventLogger {
    /// Installs the process-wide subscriber with default tracing settings.
    pub fn init() {
        Self::init_with(&TracingConfig::default());
    }

    /// Installs the process-wide subscriber honoring the tracing section of
    /// the loaded configuration.
    pub fn init_with(config: &TracingConfig) {
        let span_events = if config.span_events {
            FmtSpan::ENTER
        } else {
            FmtSpan::NONE
        };
        tracing_subscriber::fmt()
            .with_span_events(span_events)
            .with_thread_names(true)
            .init();
    }

    /// Emits one observer event at info level.
    pub fn log_event(event: &ObserverEvent) {
        match event {
            ObserverEvent::FramesParsed {
                direction,
                frames,
                invalid,
            } => {
                tracing::info!(
                    event_type = event.name(),
                    ?direction,
                    frames,
                    invalid,
                    "capture chunk drained"
                );
            }
            ObserverEvent::StitchCompleted { records, errors } => {
                tracing::info!(
                    event_type = event.name(),
                    records,
                    errors,
                    "stitch pass finished"
                );
            }
        }
    }
}
