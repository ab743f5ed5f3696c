//! Message model for parsed MQTT v5 control packets.
//!
//! Values stay typed inside the parser; the string forms downstream exporters
//! want are produced at the serialization boundary (`Display`/`Serialize`).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::decoder::DecodeError;

/// Parse outcome other than success. `NeedsMoreData` is recoverable: the
/// input buffer is untouched and the caller retries after appending bytes.
/// `Invalid` means structurally malformed; the caller consults
/// [`find_frame_boundary`](crate::mqtt::find_frame_boundary) to resynchronize.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum MqttParseError {
    #[error("incomplete MQTT frame, need more data")]
    NeedsMoreData,
    #[error("malformed MQTT frame")]
    Invalid,
}

impl From<DecodeError> for MqttParseError {
    /// Inside a frame whose full length was already verified, running out of
    /// bytes means the declared lengths are inconsistent, not that the
    /// capture is short.
    fn from(_: DecodeError) -> Self {
        MqttParseError::Invalid
    }
}

/// Which side of the connection a frame was captured from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Request,
    Response,
}

/// MQTT control packet kind, from the high nibble of the first header byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ControlPacketType {
    Connect,
    Connack,
    Publish,
    Puback,
    Pubrec,
    Pubrel,
    Pubcomp,
    Subscribe,
    Suback,
    Unsubscribe,
    Unsuback,
    Pingreq,
    Pingresp,
    Disconnect,
    Invalid,
}

impl ControlPacketType {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Connect,
            2 => Self::Connack,
            3 => Self::Publish,
            4 => Self::Puback,
            5 => Self::Pubrec,
            6 => Self::Pubrel,
            7 => Self::Pubcomp,
            8 => Self::Subscribe,
            9 => Self::Suback,
            10 => Self::Unsubscribe,
            11 => Self::Unsuback,
            12 => Self::Pingreq,
            13 => Self::Pingresp,
            14 => Self::Disconnect,
            _ => Self::Invalid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Connack => "CONNACK",
            Self::Publish => "PUBLISH",
            Self::Puback => "PUBACK",
            Self::Pubrec => "PUBREC",
            Self::Pubrel => "PUBREL",
            Self::Pubcomp => "PUBCOMP",
            Self::Subscribe => "SUBSCRIBE",
            Self::Suback => "SUBACK",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Unsuback => "UNSUBACK",
            Self::Pingreq => "PINGREQ",
            Self::Pingresp => "PINGRESP",
            Self::Disconnect => "DISCONNECT",
            Self::Invalid => "INVALID",
        }
    }
}

impl fmt::Display for ControlPacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn write_text_or_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    match std::str::from_utf8(bytes) {
        Ok(text) => f.write_str(text),
        Err(_) => f.write_str(&hex::encode(bytes)),
    }
}

/// A decoded property value. The wire shape is preserved; the telemetry
/// string form comes from `Display`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyValue {
    Byte(u8),
    U16(u16),
    U32(u32),
    VarInt(u32),
    Utf8(String),
    Binary(Vec<u8>),
    Flag(bool),
    Keyword(&'static str),
    UserProperties(Vec<(String, String)>),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Byte(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::VarInt(v) => write!(f, "{v}"),
            Self::Utf8(s) => f.write_str(s),
            Self::Binary(b) => write_text_or_hex(f, b),
            Self::Flag(v) => f.write_str(if *v { "true" } else { "false" }),
            Self::Keyword(s) => f.write_str(s),
            Self::UserProperties(pairs) => {
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{{{k}:{v}}}")?;
                }
                Ok(())
            }
        }
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Per-entry subscription options from a SUBSCRIBE payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriptionOptions {
    pub maximum_qos: u8,
    pub no_local: bool,
    pub retain_as_published: bool,
    pub retain_handling: u8,
}

impl SubscriptionOptions {
    pub fn from_byte(options: u8) -> Self {
        Self {
            maximum_qos: options & 0x3,
            no_local: (options >> 2) & 0x1 != 0,
            retain_as_published: (options >> 3) & 0x1 != 0,
            retain_handling: (options >> 4) & 0x3,
        }
    }
}

impl fmt::Display for SubscriptionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{maximum_qos : {}, no_local : {}, retain_as_published : {}, retain_handling : {}}}",
            self.maximum_qos,
            u8::from(self.no_local),
            u8::from(self.retain_as_published),
            self.retain_handling,
        )
    }
}

/// A decoded payload field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PayloadValue {
    Text(String),
    Binary(Vec<u8>),
    TopicFilters(Vec<String>),
    SubscriptionOptions(Vec<SubscriptionOptions>),
    ReasonCodes(Vec<u8>),
}

impl fmt::Display for PayloadValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Binary(b) => write_text_or_hex(f, b),
            Self::TopicFilters(filters) => {
                for (i, filter) in filters.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(filter)?;
                }
                Ok(())
            }
            Self::SubscriptionOptions(entries) => {
                for entry in entries {
                    write!(f, "{entry}")?;
                }
                Ok(())
            }
            Self::ReasonCodes(codes) => {
                for (i, code) in codes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{code}")?;
                }
                Ok(())
            }
        }
    }
}

impl Serialize for PayloadValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One parsed MQTT control packet.
///
/// `timestamp_ns` is the monotonic capture timestamp, assigned by the capture
/// layer after parsing; a `Message` is immutable once it enters a frame deque.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Message {
    pub control_packet_type: ControlPacketType,
    pub dup: bool,
    pub retain: bool,
    pub header_fields: BTreeMap<&'static str, u64>,
    pub properties: BTreeMap<&'static str, PropertyValue>,
    pub payload: BTreeMap<&'static str, PayloadValue>,
    pub timestamp_ns: u64,
    #[serde(skip)]
    pub(crate) consumed: bool,
}

impl Message {
    pub fn new(control_packet_type: ControlPacketType) -> Self {
        Self {
            control_packet_type,
            dup: false,
            retain: false,
            header_fields: BTreeMap::new(),
            properties: BTreeMap::new(),
            payload: BTreeMap::new(),
            timestamp_ns: 0,
            consumed: false,
        }
    }

    /// Transaction identifier, for the packet types that carry one.
    pub fn packet_identifier(&self) -> Option<u64> {
        self.header_fields.get("packet_identifier").copied()
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::new(ControlPacketType::Invalid)
    }
}

/// A stitched request/response pair.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Record {
    pub req: Message,
    pub resp: Message,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_packet_type_round_trip() {
        assert_eq!(ControlPacketType::from_code(1), ControlPacketType::Connect);
        assert_eq!(ControlPacketType::from_code(14), ControlPacketType::Disconnect);
        assert_eq!(ControlPacketType::from_code(0), ControlPacketType::Invalid);
        assert_eq!(ControlPacketType::from_code(15), ControlPacketType::Invalid);
    }

    #[test]
    fn property_value_display() {
        assert_eq!(PropertyValue::U32(60).to_string(), "60");
        assert_eq!(PropertyValue::Flag(true).to_string(), "true");
        assert_eq!(PropertyValue::Keyword("utf-8").to_string(), "utf-8");
        assert_eq!(
            PropertyValue::Binary(vec![0xDE, 0xAD]).to_string(),
            "dead"
        );
        assert_eq!(PropertyValue::Binary(b"plain".to_vec()).to_string(), "plain");
        let pairs = PropertyValue::UserProperties(vec![
            ("a".into(), "1".into()),
            ("b".into(), "2".into()),
        ]);
        assert_eq!(pairs.to_string(), "{a:1}, {b:2}");
    }

    #[test]
    fn subscription_options_display() {
        let options = SubscriptionOptions::from_byte(0b0001_1101);
        assert_eq!(options.maximum_qos, 1);
        assert!(options.no_local);
        assert!(options.retain_as_published);
        assert_eq!(options.retain_handling, 1);
        assert_eq!(
            options.to_string(),
            "{maximum_qos : 1, no_local : 1, retain_as_published : 1, retain_handling : 1}"
        );
    }

    #[test]
    fn payload_value_display() {
        let filters =
            PayloadValue::TopicFilters(vec!["a/b".into(), "c/#".into()]);
        assert_eq!(filters.to_string(), "a/b, c/#");
        let codes = PayloadValue::ReasonCodes(vec![0, 1, 135]);
        assert_eq!(codes.to_string(), "0, 1, 135");
    }

    #[test]
    fn message_serializes_with_stable_keys() {
        let mut msg = Message::new(ControlPacketType::Publish);
        msg.retain = true;
        msg.header_fields.insert("qos", 0);
        msg.properties
            .insert("message_expiry_interval", PropertyValue::U32(60));
        msg.payload
            .insert("topic_name", PayloadValue::Text("topic".into()));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["control_packet_type"], "PUBLISH");
        assert_eq!(json["retain"], true);
        assert_eq!(json["properties"]["message_expiry_interval"], "60");
        assert_eq!(json["payload"]["topic_name"], "topic");
        assert!(json.get("consumed").is_none());
    }
}
