//! Outbound message records and their JSON representation.
//!
//! The JSON shape mirrors the SQS `SendMessageBatchRequestEntry` so that
//! entries written for the AWS CLI can be fed to this crate unchanged.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A message waiting to be packed into a `SendMessageBatch` call.
///
/// # Example
///
/// ```
/// use sqsbatch::{MessageAttribute, OutboundMessage};
///
/// let message = OutboundMessage::new("hello")
///     .with_attribute("source", MessageAttribute::string("String", "docs"));
/// assert!(message.id.is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutboundMessage {
    /// Entry identifier, unique within one batch call. Filled in by the packer when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub message_body: MessageBody,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub message_attributes: BTreeMap<String, MessageAttribute>,
    /// Out-of-band metadata such as `AWSTraceHeader`. Never counted toward the size limit.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub message_system_attributes: BTreeMap<String, MessageAttribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_deduplication_id: Option<String>,
}

impl OutboundMessage {
    /// A message with only a body. Text and raw bytes both convert into [`MessageBody`].
    pub fn new(body: impl Into<MessageBody>) -> Self {
        Self {
            id: None,
            message_body: body.into(),
            message_attributes: BTreeMap::new(),
            message_system_attributes: BTreeMap::new(),
            delay_seconds: None,
            message_group_id: None,
            message_deduplication_id: None,
        }
    }

    /// Sets a caller-chosen entry id, which the packer keeps as is.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Adds a message attribute, replacing any attribute with the same name.
    ///
    /// # Arguments
    /// * `name` - Attribute name
    /// * `attribute` - Declared type and value, counted toward the batch size
    pub fn with_attribute(mut self, name: impl Into<String>, attribute: MessageAttribute) -> Self {
        self.message_attributes.insert(name.into(), attribute);
        self
    }

    /// Adds a system attribute such as `AWSTraceHeader`. System attributes are
    /// delivered but never counted toward the batch size.
    pub fn with_system_attribute(
        mut self,
        name: impl Into<String>,
        attribute: MessageAttribute,
    ) -> Self {
        self.message_system_attributes
            .insert(name.into(), attribute);
        self
    }
}

/// Message payload. SQS only transports text, so binary bodies must hold UTF-8
/// by the time they are delivered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageBody {
    Text(String),
    Binary {
        #[serde(rename = "Base64", with = "base64_bytes")]
        bytes: Vec<u8>,
    },
}

impl MessageBody {
    /// The bytes counted toward the batch size.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            MessageBody::Text(text) => text.as_bytes(),
            MessageBody::Binary { bytes } => bytes,
        }
    }
}

impl From<&str> for MessageBody {
    fn from(value: &str) -> Self {
        MessageBody::Text(value.to_string())
    }
}

impl From<String> for MessageBody {
    fn from(value: String) -> Self {
        MessageBody::Text(value)
    }
}

impl From<Vec<u8>> for MessageBody {
    fn from(bytes: Vec<u8>) -> Self {
        MessageBody::Binary { bytes }
    }
}

/// A typed message attribute: declared kind plus at most one value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAttribute", into = "RawAttribute")]
pub struct MessageAttribute {
    /// Declared kind, e.g. `String`, `Number`, `Binary` or `String.custom`.
    pub data_type: String,
    pub value: Option<AttributeValue>,
}

impl MessageAttribute {
    /// An attribute carrying a `StringValue`.
    pub fn string(data_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            data_type: data_type.into(),
            value: Some(AttributeValue::String(value.into())),
        }
    }

    /// An attribute carrying a `BinaryValue`.
    pub fn binary(data_type: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            data_type: data_type.into(),
            value: Some(AttributeValue::Binary(value.into())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeValue {
    String(String),
    Binary(Vec<u8>),
}

impl AttributeValue {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            AttributeValue::String(value) => value.as_bytes(),
            AttributeValue::Binary(value) => value,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct AttributeConflict(String);

impl fmt::Display for AttributeConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attribute of type {} has both StringValue and BinaryValue",
            self.0
        )
    }
}

impl std::error::Error for AttributeConflict {}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawAttribute {
    data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    string_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_option")]
    binary_value: Option<Vec<u8>>,
}

impl TryFrom<RawAttribute> for MessageAttribute {
    type Error = AttributeConflict;

    fn try_from(raw: RawAttribute) -> Result<Self, Self::Error> {
        let value = match (raw.string_value, raw.binary_value) {
            (Some(_), Some(_)) => return Err(AttributeConflict(raw.data_type)),
            (Some(s), None) => Some(AttributeValue::String(s)),
            (None, Some(b)) => Some(AttributeValue::Binary(b)),
            (None, None) => None,
        };
        Ok(Self {
            data_type: raw.data_type,
            value,
        })
    }
}

impl From<MessageAttribute> for RawAttribute {
    fn from(attribute: MessageAttribute) -> Self {
        let (string_value, binary_value) = match attribute.value {
            Some(AttributeValue::String(s)) => (Some(s), None),
            Some(AttributeValue::Binary(b)) => (None, Some(b)),
            None => (None, None),
        };
        Self {
            data_type: attribute.data_type,
            string_value,
            binary_value,
        }
    }
}

/// An entry for `DeleteMessageBatch`. Only the receipt handle matters to SQS.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub receipt_handle: String,
}

impl DeleteEntry {
    /// An entry without an id; the packer generates one.
    pub fn new(receipt_handle: impl Into<String>) -> Self {
        Self {
            id: None,
            receipt_handle: receipt_handle.into(),
        }
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

mod base64_option {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => super::base64_bytes::serialize(bytes, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "super::base64_bytes")] Vec<u8>);

        Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(bytes)| bytes))
    }
}
