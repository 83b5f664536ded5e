//! Payload size model for `SendMessageBatch`.
//!
//! SQS enforces its 256 KiB limit on the serialized request, where every
//! variable-length attribute component is preceded by a 4-byte length field and
//! every attribute value by a 1-byte transport type tag. Counting only the
//! printable characters undercounts and lets oversized batches through.

use crate::message::OutboundMessage;

/// Bytes used by the length field in front of each variable-length component.
pub const LENGTH_PREFIX: usize = 4;
/// Bytes used by the transport type tag in front of an attribute value.
pub const TRANSPORT_TYPE_TAG: usize = 1;

/// Estimates how much `message` contributes to a batch's payload size.
///
/// The body counts as its UTF-8 (or raw) byte length. Each attribute adds its
/// name, its data type and its value, each with a length prefix, plus the type
/// tag for the value. System attributes are not part of the payload and are
/// ignored.
///
/// # Example
///
/// ```
/// use sqsbatch::{estimate_size, MessageAttribute, OutboundMessage};
///
/// let message = OutboundMessage::new("0123456789")
///     .with_attribute("text", MessageAttribute::string("String", "ab"));
/// assert_eq!(estimate_size(&message), 35);
/// ```
pub fn estimate_size(message: &OutboundMessage) -> usize {
    let attributes: usize = message
        .message_attributes
        .iter()
        .map(|(name, attribute)| {
            let mut size = LENGTH_PREFIX + name.len() + LENGTH_PREFIX + attribute.data_type.len();
            if let Some(value) = &attribute.value {
                size += TRANSPORT_TYPE_TAG + LENGTH_PREFIX + value.as_bytes().len();
            }
            size
        })
        .sum();

    message.message_body.as_bytes().len() + attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageAttribute;

    #[test]
    fn body_only_is_utf8_length() {
        assert_eq!(estimate_size(&OutboundMessage::new("1234567890")), 10);
        // four bytes per character
        assert_eq!(estimate_size(&OutboundMessage::new("\u{1F574}".repeat(3))), 12);
        assert_eq!(estimate_size(&OutboundMessage::new("")), 0);
    }

    #[test]
    fn binary_body_counts_raw_bytes() {
        assert_eq!(estimate_size(&OutboundMessage::new(vec![0u8; 7])), 7);
    }

    #[test]
    fn string_attribute_includes_prefixes() {
        let message = OutboundMessage::new("1234567890")
            .with_attribute("text", MessageAttribute::string("String", "ab"));
        // 10 + (4 + 4) + (4 + 6) + (1 + 4 + 2)
        assert_eq!(estimate_size(&message), 35);
    }

    #[test]
    fn mixed_attributes_with_multibyte_text() {
        let message = OutboundMessage::new("\u{1F574}".repeat(10))
            .with_attribute(
                "text",
                MessageAttribute::string("String", "\u{1F574}".repeat(2)),
            )
            .with_attribute("data", MessageAttribute::binary("Binary", vec![0u8; 10]));
        assert_eq!(estimate_size(&message), 104);
    }

    #[test]
    fn attribute_without_value_counts_name_and_type_only() {
        let mut message = OutboundMessage::new("x");
        message.message_attributes.insert(
            "flag".to_string(),
            MessageAttribute {
                data_type: "String".to_string(),
                value: None,
            },
        );
        assert_eq!(estimate_size(&message), 1 + 8 + 10);
    }

    #[test]
    fn system_attributes_are_free() {
        let plain = OutboundMessage::new("body");
        let traced = plain.clone().with_system_attribute(
            "AWSTraceHeader",
            MessageAttribute::string("String", "Root=1-5759e988-bd862e3fe1be46a994272793"),
        );
        assert_eq!(estimate_size(&plain), estimate_size(&traced));
    }
}
