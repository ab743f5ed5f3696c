//! Per-type variable header decoding.
//!
//! Each branch decodes the fixed portion for its control packet type and then
//! hands the varint-prefixed property block to the property decoder. PUBLISH
//! and the SUBSCRIBE family also record `variable_header_length` so the
//! payload decoder can derive how many payload bytes remain.

use crate::decoder::BinaryDecoder;
use crate::mqtt::properties::parse_property_block;
use crate::mqtt::types::{ControlPacketType, Message, MqttParseError, PayloadValue};

pub(crate) fn parse_variable_header(
    msg: &mut Message,
    dec: &mut BinaryDecoder<'_>,
    control_packet_type: ControlPacketType,
) -> Result<(), MqttParseError> {
    match control_packet_type {
        ControlPacketType::Connect => {
            let name_length = dec.take_be::<u16>()? as usize;
            let protocol_name = dec.take_bytes(name_length)?;
            if protocol_name != b"MQTT" {
                return Err(MqttParseError::Invalid);
            }
            let protocol_version = dec.take_be::<u8>()?;
            if protocol_version != 5 {
                return Err(MqttParseError::Invalid);
            }

            let connect_flags = dec.take_be::<u8>()?;
            msg.header_fields
                .insert("username_flag", u64::from(connect_flags >> 7));
            msg.header_fields
                .insert("password_flag", u64::from((connect_flags >> 6) & 0x1));
            msg.header_fields
                .insert("will_retain", u64::from((connect_flags >> 5) & 0x1));
            msg.header_fields
                .insert("will_qos", u64::from((connect_flags >> 3) & 0x3));
            msg.header_fields
                .insert("will_flag", u64::from((connect_flags >> 2) & 0x1));
            msg.header_fields
                .insert("clean_start", u64::from((connect_flags >> 1) & 0x1));

            let keep_alive = dec.take_be::<u16>()?;
            msg.header_fields.insert("keep_alive", u64::from(keep_alive));

            parse_property_block(msg, dec)?;
            Ok(())
        }
        ControlPacketType::Connack => {
            let connack_flags = dec.take_be::<u8>()?;
            msg.header_fields
                .insert("session_present", u64::from(connack_flags & 0x1));
            let reason_code = dec.take_be::<u8>()?;
            msg.header_fields
                .insert("reason_code", u64::from(reason_code));

            parse_property_block(msg, dec)?;
            Ok(())
        }
        ControlPacketType::Publish => {
            let topic_length = dec.take_be::<u16>()? as usize;
            let topic_name = dec.take_string(topic_length)?;
            msg.payload
                .insert("topic_name", PayloadValue::Text(topic_name.into_owned()));

            let mut variable_header_length = 2 + topic_length as u64;

            let qos = *msg
                .header_fields
                .get("qos")
                .ok_or(MqttParseError::Invalid)?;
            if qos != 0 {
                let packet_identifier = dec.take_be::<u16>()?;
                msg.header_fields
                    .insert("packet_identifier", u64::from(packet_identifier));
                variable_header_length += 2;
            }

            variable_header_length += parse_property_block(msg, dec)? as u64;
            msg.header_fields
                .insert("variable_header_length", variable_header_length);
            Ok(())
        }
        ControlPacketType::Puback
        | ControlPacketType::Pubrec
        | ControlPacketType::Pubrel
        | ControlPacketType::Pubcomp => {
            let packet_identifier = dec.take_be::<u16>()?;
            msg.header_fields
                .insert("packet_identifier", u64::from(packet_identifier));

            let remaining_length = *msg
                .header_fields
                .get("remaining_length")
                .ok_or(MqttParseError::Invalid)?;
            if remaining_length >= 3 {
                let reason_code = dec.take_be::<u8>()?;
                msg.header_fields
                    .insert("reason_code", u64::from(reason_code));
            }
            if remaining_length >= 4 {
                parse_property_block(msg, dec)?;
            }
            Ok(())
        }
        ControlPacketType::Subscribe
        | ControlPacketType::Suback
        | ControlPacketType::Unsubscribe
        | ControlPacketType::Unsuback => {
            let packet_identifier = dec.take_be::<u16>()?;
            msg.header_fields
                .insert("packet_identifier", u64::from(packet_identifier));

            let variable_header_length = 2 + parse_property_block(msg, dec)? as u64;
            msg.header_fields
                .insert("variable_header_length", variable_header_length);
            Ok(())
        }
        ControlPacketType::Disconnect => {
            let reason_code = dec.take_be::<u8>()?;
            msg.header_fields
                .insert("reason_code", u64::from(reason_code));

            let remaining_length = *msg
                .header_fields
                .get("remaining_length")
                .ok_or(MqttParseError::Invalid)?;
            if remaining_length > 1 {
                parse_property_block(msg, dec)?;
            }
            Ok(())
        }
        // PINGREQ/PINGRESP carry no variable header; unknown types decode
        // nothing here and fail at the payload dispatch.
        _ => Ok(()),
    }
}
