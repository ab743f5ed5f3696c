//! Per-type payload decoding.
//!
//! Payload length is not carried on the wire; it is what remains of
//! `remaining_length` after the variable header. List-shaped payloads parse
//! inside a decoder bounded to exactly that many bytes.

use crate::decoder::BinaryDecoder;
use crate::mqtt::properties::parse_property_block;
use crate::mqtt::types::{
    ControlPacketType, Message, MqttParseError, PayloadValue, SubscriptionOptions,
};

/// Payload bytes left after the variable header. Invalid if either length
/// field is missing or the subtraction would underflow.
fn payload_length(msg: &Message) -> Result<usize, MqttParseError> {
    let remaining_length = msg
        .header_fields
        .get("remaining_length")
        .ok_or(MqttParseError::Invalid)?;
    let variable_header_length = msg
        .header_fields
        .get("variable_header_length")
        .ok_or(MqttParseError::Invalid)?;
    remaining_length
        .checked_sub(*variable_header_length)
        .map(|len| len as usize)
        .ok_or(MqttParseError::Invalid)
}

pub(crate) fn parse_payload(
    msg: &mut Message,
    dec: &mut BinaryDecoder<'_>,
    control_packet_type: ControlPacketType,
) -> Result<(), MqttParseError> {
    match control_packet_type {
        ControlPacketType::Connect => {
            let client_id_length = dec.take_be::<u16>()? as usize;
            let client_id = dec.take_string(client_id_length)?;
            msg.payload
                .insert("client_id", PayloadValue::Text(client_id.into_owned()));

            if msg.header_fields.get("will_flag").copied().unwrap_or(0) != 0 {
                parse_property_block(msg, dec)?;

                let will_topic_length = dec.take_be::<u16>()? as usize;
                let will_topic = dec.take_string(will_topic_length)?;
                msg.payload
                    .insert("will_topic", PayloadValue::Text(will_topic.into_owned()));

                let will_payload_length = dec.take_be::<u16>()? as usize;
                let will_payload = dec.take_bytes(will_payload_length)?;
                msg.payload
                    .insert("will_payload", PayloadValue::Binary(will_payload.to_vec()));
            }

            if msg.header_fields.get("username_flag").copied().unwrap_or(0) != 0 {
                let username_length = dec.take_be::<u16>()? as usize;
                let username = dec.take_string(username_length)?;
                msg.payload
                    .insert("username", PayloadValue::Text(username.into_owned()));
            }

            // The password is consumed to keep the cursor honest, never kept.
            if msg.header_fields.get("password_flag").copied().unwrap_or(0) != 0 {
                let password_length = dec.take_be::<u16>()? as usize;
                dec.take_bytes(password_length)?;
            }
            Ok(())
        }
        ControlPacketType::Publish => {
            let length = payload_length(msg)?;
            let body = dec.take_bytes(length)?;
            msg.payload
                .insert("publish_message", PayloadValue::Binary(body.to_vec()));
            Ok(())
        }
        ControlPacketType::Subscribe => {
            let mut body = dec.sub_decoder(payload_length(msg)?)?;
            let mut filters = Vec::new();
            let mut options = Vec::new();
            while !body.is_empty() {
                let filter_length = body.take_be::<u16>()? as usize;
                let filter = body.take_string(filter_length)?;
                filters.push(filter.into_owned());
                options.push(SubscriptionOptions::from_byte(body.take_be::<u8>()?));
            }
            msg.payload
                .insert("topic_filter", PayloadValue::TopicFilters(filters));
            msg.payload.insert(
                "subscription_options",
                PayloadValue::SubscriptionOptions(options),
            );
            Ok(())
        }
        ControlPacketType::Unsubscribe => {
            let mut body = dec.sub_decoder(payload_length(msg)?)?;
            let mut filters = Vec::new();
            while !body.is_empty() {
                let filter_length = body.take_be::<u16>()? as usize;
                let filter = body.take_string(filter_length)?;
                filters.push(filter.into_owned());
            }
            msg.payload
                .insert("topic_filter", PayloadValue::TopicFilters(filters));
            Ok(())
        }
        ControlPacketType::Suback | ControlPacketType::Unsuback => {
            let mut body = dec.sub_decoder(payload_length(msg)?)?;
            let mut codes = Vec::new();
            while !body.is_empty() {
                codes.push(body.take_be::<u8>()?);
            }
            msg.payload
                .insert("reason_code", PayloadValue::ReasonCodes(codes));
            Ok(())
        }
        ControlPacketType::Connack
        | ControlPacketType::Puback
        | ControlPacketType::Pubrec
        | ControlPacketType::Pubrel
        | ControlPacketType::Pubcomp
        | ControlPacketType::Pingreq
        | ControlPacketType::Pingresp
        | ControlPacketType::Disconnect => Ok(()),
        ControlPacketType::Invalid => Err(MqttParseError::Invalid),
    }
}
