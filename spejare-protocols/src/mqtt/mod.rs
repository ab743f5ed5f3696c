//! ## spejare-protocols::mqtt
//! MQTT v5 observer core: a streaming control-packet parser and a
//! request/response stitcher over per-connection frame deques.
//!
//! The parser works on bytes captured off the wire, so it is deliberately
//! tolerant: it decodes what a well-behaved peer would send and reports
//! everything else as either incomplete or malformed without ever consuming
//! input it cannot account for.

mod payload;
mod properties;
mod stitcher;
mod types;
mod variable_header;

pub mod parse;

pub use parse::{find_frame_boundary, parse_frame, parse_frames, StreamParse};
pub use stitcher::{process_frames, process_frames_with, StitchOptions, StitchResult};
pub use types::{
    ControlPacketType, Direction, Message, MqttParseError, PayloadValue, PropertyValue, Record,
    SubscriptionOptions,
};
