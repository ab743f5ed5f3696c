//! Frame-level parsing over a captured byte stream.
//!
//! `parse_frame` consumes exactly one control packet off the front of the
//! buffer. On `NeedsMoreData` and `Invalid` the buffer is untouched; only a
//! successful parse advances it. `parse_frames` drives the same routine until
//! the buffer runs dry, skipping past unparseable stretches via
//! `find_frame_boundary`.

use bytes::{Buf, Bytes};

use crate::decoder::{BinaryDecoder, DecodeError};
use crate::mqtt::payload::parse_payload;
use crate::mqtt::types::{ControlPacketType, Direction, Message, MqttParseError};
use crate::mqtt::variable_header::parse_variable_header;

/// Maps a fixed-header varint failure: a continuation past the buffer means
/// the length field itself is still in flight; a fifth byte is malformed.
fn remaining_length_error(err: DecodeError) -> MqttParseError {
    match err {
        DecodeError::EndOfBuffer => MqttParseError::NeedsMoreData,
        DecodeError::VarintOverflow => MqttParseError::Invalid,
    }
}

/// Parses one MQTT v5 control packet off the front of `buf`.
///
/// On success the frame's bytes are consumed from `buf` and the decoded
/// [`Message`] is returned with a zero capture timestamp for the caller to
/// stamp. On error `buf` is left exactly as it was.
pub fn parse_frame(_direction: Direction, buf: &mut Bytes) -> Result<Message, MqttParseError> {
    if buf.len() < 2 {
        return Err(MqttParseError::NeedsMoreData);
    }

    let mut dec = BinaryDecoder::new(&buf[..]);

    let first_byte = dec.take_be::<u8>().map_err(|_| MqttParseError::NeedsMoreData)?;
    let control_packet_code = first_byte >> 4;
    let control_packet_flags = first_byte & 0x0F;

    let control_packet_type = ControlPacketType::from_code(control_packet_code);
    let mut msg = Message::new(control_packet_type);

    if control_packet_type == ControlPacketType::Publish {
        msg.dup = (control_packet_flags >> 3) & 0x1 != 0;
        msg.retain = control_packet_flags & 0x1 != 0;
        msg.header_fields
            .insert("qos", u64::from((control_packet_flags >> 1) & 0x3));
    }

    // PINGREQ/PINGRESP are complete once the zero remaining length is seen.
    if matches!(
        control_packet_type,
        ControlPacketType::Pingreq | ControlPacketType::Pingresp
    ) {
        let (remaining_length, _) = dec.take_varint().map_err(remaining_length_error)?;
        if remaining_length != 0 {
            return Err(MqttParseError::Invalid);
        }
        let consumed = buf.len() - dec.remaining();
        buf.advance(consumed);
        return Ok(msg);
    }

    let (remaining_length, _) = dec.take_varint().map_err(remaining_length_error)?;
    if dec.remaining() < remaining_length as usize {
        return Err(MqttParseError::NeedsMoreData);
    }
    msg.header_fields
        .insert("remaining_length", u64::from(remaining_length));

    parse_variable_header(&mut msg, &mut dec, control_packet_type)?;
    parse_payload(&mut msg, &mut dec, control_packet_type)?;

    let consumed = buf.len() - dec.remaining();
    buf.advance(consumed);
    Ok(msg)
}

/// Offset of the next plausible frame start after a malformed stretch.
///
/// MQTT carries no in-stream resynchronization marker, so the only safe
/// recovery is to drop the rest of the current buffer; TCP reassembly
/// upstream delivers fresh ones, and the lost window is bounded.
pub fn find_frame_boundary(_direction: Direction, buf: &[u8], _start_pos: usize) -> usize {
    buf.len()
}

/// Outcome of draining one buffer with [`parse_frames`].
#[derive(Debug, Default)]
pub struct StreamParse {
    /// Complete frames, in wire order.
    pub frames: Vec<Message>,
    /// Malformed stretches skipped via [`find_frame_boundary`].
    pub invalid_count: u64,
}

/// Parses complete frames off the front of `buf` until it is exhausted or a
/// partial frame remains. The unconsumed tail stays in `buf` for the caller
/// to extend with the next capture chunk.
pub fn parse_frames(direction: Direction, buf: &mut Bytes) -> StreamParse {
    let mut result = StreamParse::default();
    while !buf.is_empty() {
        match parse_frame(direction, buf) {
            Ok(msg) => result.frames.push(msg),
            Err(MqttParseError::NeedsMoreData) => break,
            Err(MqttParseError::Invalid) => {
                result.invalid_count += 1;
                let boundary = find_frame_boundary(direction, &buf[..], 1);
                buf.advance(boundary.min(buf.len()));
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt::types::{PayloadValue, PropertyValue};

    // CONNECT, clean start, keep-alive 60, client id "p2".
    const CONNECT_FRAME: &[u8] = &[
        0x10, 0x0F, 0x00, 0x04, 0x4D, 0x51, 0x54, 0x54, 0x05, 0x02, 0x00, 0x3C, 0x00, 0x00,
        0x02, 0x70, 0x32,
    ];

    // PUBLISH, qos 0, retain, topic "topic", body "Hi".
    const PUBLISH_FRAME: &[u8] = &[
        0x31, 0x0A, 0x00, 0x05, 0x74, 0x6F, 0x70, 0x69, 0x63, 0x00, 0x48, 0x69,
    ];

    // PUBACK, packet id 42, reason code 0, empty properties.
    const PUBACK_FRAME: &[u8] = &[0x40, 0x04, 0x00, 0x2A, 0x00, 0x00];

    fn parse_ok(frame: &[u8]) -> Message {
        let mut buf = Bytes::copy_from_slice(frame);
        let msg = parse_frame(Direction::Request, &mut buf).unwrap();
        assert!(buf.is_empty(), "frame not fully consumed");
        msg
    }

    #[test]
    fn parses_minimal_connect() {
        let msg = parse_ok(CONNECT_FRAME);
        assert_eq!(msg.control_packet_type, ControlPacketType::Connect);
        assert_eq!(msg.header_fields["keep_alive"], 60);
        assert_eq!(msg.header_fields["clean_start"], 1);
        assert_eq!(msg.header_fields["remaining_length"], 15);
        assert_eq!(msg.payload["client_id"], PayloadValue::Text("p2".into()));
    }

    #[test]
    fn parses_publish_qos0_retain() {
        let msg = parse_ok(PUBLISH_FRAME);
        assert_eq!(msg.control_packet_type, ControlPacketType::Publish);
        assert!(msg.retain);
        assert!(!msg.dup);
        assert_eq!(msg.header_fields["qos"], 0);
        assert_eq!(msg.packet_identifier(), None);
        assert_eq!(msg.payload["topic_name"], PayloadValue::Text("topic".into()));
        assert_eq!(msg.payload["publish_message"].to_string(), "Hi");
    }

    #[test]
    fn parses_publish_qos1_with_identifier() {
        // dup + qos 1: flags 0b1010, topic "t", packet id 7, body "x".
        let frame = [0x3A, 0x07, 0x00, 0x01, b't', 0x00, 0x07, 0x00, b'x'];
        let mut buf = Bytes::copy_from_slice(&frame);
        let msg = parse_frame(Direction::Request, &mut buf).unwrap();
        assert!(msg.dup);
        assert_eq!(msg.header_fields["qos"], 1);
        assert_eq!(msg.packet_identifier(), Some(7));
        assert_eq!(msg.payload["publish_message"].to_string(), "x");
    }

    #[test]
    fn parses_puback_with_reason_and_empty_properties() {
        let msg = parse_ok(PUBACK_FRAME);
        assert_eq!(msg.control_packet_type, ControlPacketType::Puback);
        assert_eq!(msg.header_fields["packet_identifier"], 42);
        assert_eq!(msg.header_fields["reason_code"], 0);
        assert!(msg.properties.is_empty());
    }

    #[test]
    fn parses_pingreq_without_fields() {
        let msg = parse_ok(&[0xC0, 0x00]);
        assert_eq!(msg.control_packet_type, ControlPacketType::Pingreq);
        assert!(msg.header_fields.is_empty());
        assert!(msg.properties.is_empty());
        assert!(msg.payload.is_empty());
    }

    #[test]
    fn pingresp_with_nonzero_length_is_invalid() {
        let mut buf = Bytes::copy_from_slice(&[0xD0, 0x02, 0x00, 0x00]);
        assert_eq!(
            parse_frame(Direction::Response, &mut buf),
            Err(MqttParseError::Invalid)
        );
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn every_strict_prefix_needs_more_data() {
        for frame in [CONNECT_FRAME, PUBLISH_FRAME, PUBACK_FRAME] {
            for split in 0..frame.len() {
                let mut buf = Bytes::copy_from_slice(&frame[..split]);
                assert_eq!(
                    parse_frame(Direction::Request, &mut buf),
                    Err(MqttParseError::NeedsMoreData),
                    "prefix of {split} bytes should be incomplete"
                );
                assert_eq!(buf.len(), split, "failed parse must not consume input");
            }
        }
    }

    #[test]
    fn remaining_length_overflow_is_invalid() {
        let mut buf = Bytes::copy_from_slice(&[0x30, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
        assert_eq!(
            parse_frame(Direction::Request, &mut buf),
            Err(MqttParseError::Invalid)
        );
    }

    #[test]
    fn unknown_packet_type_is_invalid() {
        let mut buf = Bytes::copy_from_slice(&[0x00, 0x00]);
        assert_eq!(
            parse_frame(Direction::Request, &mut buf),
            Err(MqttParseError::Invalid)
        );
        let mut buf = Bytes::copy_from_slice(&[0xF0, 0x00]);
        assert_eq!(
            parse_frame(Direction::Request, &mut buf),
            Err(MqttParseError::Invalid)
        );
    }

    #[test]
    fn unknown_property_code_is_invalid() {
        // CONNACK with a one-property block carrying an unassigned code.
        let mut buf = Bytes::copy_from_slice(&[0x20, 0x05, 0x00, 0x00, 0x02, 0x7E, 0x00]);
        assert_eq!(
            parse_frame(Direction::Response, &mut buf),
            Err(MqttParseError::Invalid)
        );
    }

    #[test]
    fn boundary_is_end_of_buffer() {
        assert_eq!(find_frame_boundary(Direction::Request, &[1, 2, 3], 0), 3);
        assert_eq!(find_frame_boundary(Direction::Request, &[1, 2, 3], 2), 3);
    }

    #[test]
    fn drains_back_to_back_frames() {
        let mut stream = Vec::new();
        stream.extend_from_slice(CONNECT_FRAME);
        stream.extend_from_slice(PUBLISH_FRAME);
        stream.extend_from_slice(&[0xC0, 0x00]);
        let mut buf = Bytes::from(stream);

        let result = parse_frames(Direction::Request, &mut buf);
        assert_eq!(result.invalid_count, 0);
        assert_eq!(result.frames.len(), 3);
        assert_eq!(
            result.frames[0].control_packet_type,
            ControlPacketType::Connect
        );
        assert_eq!(
            result.frames[1].control_packet_type,
            ControlPacketType::Publish
        );
        assert_eq!(
            result.frames[2].control_packet_type,
            ControlPacketType::Pingreq
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn keeps_partial_tail_for_next_chunk() {
        let mut stream = Vec::new();
        stream.extend_from_slice(PUBLISH_FRAME);
        stream.extend_from_slice(&CONNECT_FRAME[..5]);
        let mut buf = Bytes::from(stream);

        let result = parse_frames(Direction::Request, &mut buf);
        assert_eq!(result.frames.len(), 1);
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn malformed_stretch_drops_rest_of_buffer() {
        let mut stream = Vec::new();
        stream.extend_from_slice(PUBLISH_FRAME);
        stream.extend_from_slice(&[0x00, 0x00]); // unknown packet type
        stream.extend_from_slice(PUBLISH_FRAME); // unreachable after drop
        let mut buf = Bytes::from(stream);

        let result = parse_frames(Direction::Request, &mut buf);
        assert_eq!(result.frames.len(), 1);
        assert_eq!(result.invalid_count, 1);
        assert!(buf.is_empty());
    }

    #[test]
    fn publish_with_properties_serializes_catalog_keys() {
        // topic "t", props: message_expiry_interval 60, then body "ok".
        let frame = [
            0x30, 0x0B, 0x00, 0x01, b't', 0x05, 0x02, 0x00, 0x00, 0x00, 0x3C, b'o', b'k',
        ];
        let mut buf = Bytes::copy_from_slice(&frame);
        let msg = parse_frame(Direction::Request, &mut buf).unwrap();
        assert_eq!(
            msg.properties["message_expiry_interval"],
            PropertyValue::U32(60)
        );
        assert_eq!(msg.payload["publish_message"].to_string(), "ok");

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["properties"]["message_expiry_interval"], "60");
        assert_eq!(json["payload"]["topic_name"], "t");
    }
}
