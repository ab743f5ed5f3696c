//! # Spejare Protocol Parsers
//!
//! Crate for turning captured byte streams into structured protocol records.
//! Currently MQTT v5 is implemented: a streaming frame parser plus a
//! request/response stitcher.

pub mod decoder;
pub mod mqtt;

pub use decoder::{BinaryDecoder, DecodeError};
pub use mqtt::Message;
