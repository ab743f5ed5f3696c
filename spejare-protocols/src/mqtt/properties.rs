//! MQTT v5 property block decoding.
//!
//! A property block is a varint-prefixed run of (code, value) pairs. The
//! caller hands in a decoder bounded to exactly the declared block length, so
//! a property that overruns the block fails instead of eating into the next
//! field. Keys are the stable names emitted downstream.

use crate::decoder::BinaryDecoder;
use crate::mqtt::types::{Message, MqttParseError, PropertyValue};

/// MQTT v5 property identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PropertyCode {
    PayloadFormatIndicator,
    MessageExpiryInterval,
    ContentType,
    ResponseTopic,
    CorrelationData,
    SubscriptionIdentifier,
    SessionExpiryInterval,
    AssignedClientIdentifier,
    ServerKeepAlive,
    AuthenticationMethod,
    AuthenticationData,
    RequestProblemInformation,
    WillDelayInterval,
    RequestResponseInformation,
    ResponseInformation,
    ServerReference,
    ReasonString,
    ReceiveMaximum,
    TopicAliasMaximum,
    TopicAlias,
    MaximumQos,
    RetainAvailable,
    UserProperty,
    MaximumPacketSize,
    WildcardSubscriptionAvailable,
    SubscriptionIdentifiersAvailable,
    SharedSubscriptionAvailable,
}

impl PropertyCode {
    fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0x01 => Self::PayloadFormatIndicator,
            0x02 => Self::MessageExpiryInterval,
            0x03 => Self::ContentType,
            0x08 => Self::ResponseTopic,
            0x09 => Self::CorrelationData,
            0x0B => Self::SubscriptionIdentifier,
            0x11 => Self::SessionExpiryInterval,
            0x12 => Self::AssignedClientIdentifier,
            0x13 => Self::ServerKeepAlive,
            0x15 => Self::AuthenticationMethod,
            0x16 => Self::AuthenticationData,
            0x17 => Self::RequestProblemInformation,
            0x18 => Self::WillDelayInterval,
            0x19 => Self::RequestResponseInformation,
            0x1A => Self::ResponseInformation,
            0x1C => Self::ServerReference,
            0x1F => Self::ReasonString,
            0x21 => Self::ReceiveMaximum,
            0x22 => Self::TopicAliasMaximum,
            0x23 => Self::TopicAlias,
            0x24 => Self::MaximumQos,
            0x25 => Self::RetainAvailable,
            0x26 => Self::UserProperty,
            0x27 => Self::MaximumPacketSize,
            0x28 => Self::WildcardSubscriptionAvailable,
            0x29 => Self::SubscriptionIdentifiersAvailable,
            0x2A => Self::SharedSubscriptionAvailable,
            _ => return None,
        })
    }
}

/// Reads a varint-prefixed property block off `dec` and decodes it.
/// Returns the total bytes consumed (length prefix plus block), which PUBLISH
/// and the SUBSCRIBE family fold into `variable_header_length`.
pub(crate) fn parse_property_block(
    msg: &mut Message,
    dec: &mut BinaryDecoder<'_>,
) -> Result<usize, MqttParseError> {
    let (length, prefix_bytes) = dec.take_varint()?;
    let mut block = dec.sub_decoder(length as usize)?;
    parse_properties(msg, &mut block)?;
    Ok(prefix_bytes + length as usize)
}

fn take_prefixed_string(dec: &mut BinaryDecoder<'_>) -> Result<String, MqttParseError> {
    let len = dec.take_be::<u16>()? as usize;
    Ok(dec.take_string(len)?.into_owned())
}

fn take_prefixed_bytes(dec: &mut BinaryDecoder<'_>) -> Result<Vec<u8>, MqttParseError> {
    let len = dec.take_be::<u16>()? as usize;
    Ok(dec.take_bytes(len)?.to_vec())
}

/// Decodes the whole property block in `dec` into `msg.properties`.
/// Unknown codes and overruns are Invalid.
pub(crate) fn parse_properties(
    msg: &mut Message,
    dec: &mut BinaryDecoder<'_>,
) -> Result<(), MqttParseError> {
    while !dec.is_empty() {
        let code = dec.take_be::<u8>()?;
        let code = PropertyCode::from_code(code).ok_or(MqttParseError::Invalid)?;

        match code {
            PropertyCode::PayloadFormatIndicator => {
                let indicator = match dec.take_be::<u8>()? {
                    0x00 => "unspecified",
                    0x01 => "utf-8",
                    _ => return Err(MqttParseError::Invalid),
                };
                msg.properties
                    .insert("payload_format", PropertyValue::Keyword(indicator));
            }
            PropertyCode::MessageExpiryInterval => {
                let interval = dec.take_be::<u32>()?;
                msg.properties
                    .insert("message_expiry_interval", PropertyValue::U32(interval));
            }
            PropertyCode::ContentType => {
                let content_type = take_prefixed_string(dec)?;
                msg.properties
                    .insert("content_type", PropertyValue::Utf8(content_type));
            }
            PropertyCode::ResponseTopic => {
                let topic = take_prefixed_string(dec)?;
                msg.properties
                    .insert("response_topic", PropertyValue::Utf8(topic));
            }
            PropertyCode::CorrelationData => {
                let data = take_prefixed_bytes(dec)?;
                msg.properties
                    .insert("correlation_data", PropertyValue::Binary(data));
            }
            PropertyCode::SubscriptionIdentifier => {
                let (id, _) = dec.take_varint()?;
                msg.properties
                    .insert("subscription_id", PropertyValue::VarInt(id));
            }
            PropertyCode::SessionExpiryInterval => {
                let interval = dec.take_be::<u32>()?;
                msg.properties
                    .insert("session_expiry_interval", PropertyValue::U32(interval));
            }
            PropertyCode::AssignedClientIdentifier => {
                let id = take_prefixed_string(dec)?;
                msg.properties
                    .insert("assigned_client_identifier", PropertyValue::Utf8(id));
            }
            PropertyCode::ServerKeepAlive => {
                let keep_alive = dec.take_be::<u16>()?;
                msg.properties
                    .insert("server_keep_alive", PropertyValue::U16(keep_alive));
            }
            PropertyCode::AuthenticationMethod => {
                let method = take_prefixed_string(dec)?;
                msg.properties
                    .insert("auth_method", PropertyValue::Utf8(method));
            }
            PropertyCode::AuthenticationData => {
                let data = take_prefixed_bytes(dec)?;
                msg.properties
                    .insert("auth_data", PropertyValue::Binary(data));
            }
            PropertyCode::RequestProblemInformation => {
                let value = dec.take_be::<u8>()?;
                msg.properties
                    .insert("request_problem_information", PropertyValue::Byte(value));
            }
            PropertyCode::WillDelayInterval => {
                let interval = dec.take_be::<u32>()?;
                msg.properties
                    .insert("will_delay_interval", PropertyValue::U32(interval));
            }
            PropertyCode::RequestResponseInformation => {
                let value = dec.take_be::<u8>()?;
                msg.properties
                    .insert("request_response_information", PropertyValue::Byte(value));
            }
            PropertyCode::ResponseInformation => {
                let info = take_prefixed_string(dec)?;
                msg.properties
                    .insert("response_information", PropertyValue::Utf8(info));
            }
            PropertyCode::ServerReference => {
                let reference = take_prefixed_string(dec)?;
                msg.properties
                    .insert("server_reference", PropertyValue::Utf8(reference));
            }
            PropertyCode::ReasonString => {
                let reason = take_prefixed_string(dec)?;
                msg.properties
                    .insert("reason_string", PropertyValue::Utf8(reason));
            }
            PropertyCode::ReceiveMaximum => {
                let maximum = dec.take_be::<u16>()?;
                msg.properties
                    .insert("receive_maximum", PropertyValue::U16(maximum));
            }
            PropertyCode::TopicAliasMaximum => {
                let maximum = dec.take_be::<u16>()?;
                msg.properties
                    .insert("topic_alias_maximum", PropertyValue::U16(maximum));
            }
            PropertyCode::TopicAlias => {
                let alias = dec.take_be::<u16>()?;
                msg.properties
                    .insert("topic_alias", PropertyValue::U16(alias));
            }
            PropertyCode::MaximumQos => {
                let qos = dec.take_be::<u8>()?;
                msg.properties
                    .insert("maximum_qos", PropertyValue::Byte(qos));
            }
            PropertyCode::RetainAvailable => {
                let available = dec.take_be::<u8>()?;
                msg.properties
                    .insert("retain_available", PropertyValue::Byte(available));
            }
            PropertyCode::UserProperty => {
                let key = take_prefixed_string(dec)?;
                let value = take_prefixed_string(dec)?;
                match msg.properties.get_mut("user-properties") {
                    Some(PropertyValue::UserProperties(pairs)) => pairs.push((key, value)),
                    _ => {
                        msg.properties.insert(
                            "user-properties",
                            PropertyValue::UserProperties(vec![(key, value)]),
                        );
                    }
                }
            }
            PropertyCode::MaximumPacketSize => {
                let size = dec.take_be::<u32>()?;
                msg.properties
                    .insert("maximum_packet_size", PropertyValue::U32(size));
            }
            PropertyCode::WildcardSubscriptionAvailable => {
                let available = dec.take_be::<u8>()?;
                msg.properties.insert(
                    "wildcard_subscription_available",
                    PropertyValue::Flag(available == 1),
                );
            }
            PropertyCode::SubscriptionIdentifiersAvailable => {
                let available = dec.take_be::<u8>()?;
                msg.properties.insert(
                    "subscription_id_available",
                    PropertyValue::Flag(available == 1),
                );
            }
            PropertyCode::SharedSubscriptionAvailable => {
                let available = dec.take_be::<u8>()?;
                msg.properties.insert(
                    "shared_subscription_available",
                    PropertyValue::Flag(available == 1),
                );
            }
        }
    }
    Ok(())
}
