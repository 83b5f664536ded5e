//! SQS client wrapper and the received-message view.

use anyhow::Context;
use aws_config::SdkConfig;
use aws_sdk_sqs as sqs;

/// Receives messages from an SQS queue.
///
/// Retrieves up to 10 messages at a time with a 15-second visibility timeout.
/// Messages become invisible to other consumers during this period.
///
/// # Errors
///
/// Returns an error if the SQS API call fails.
pub async fn receive(
    client: &aws_sdk_sqs::Client,
    queue_url: &str,
) -> anyhow::Result<aws_sdk_sqs::operation::receive_message::ReceiveMessageOutput> {
    let result = client
        .receive_message()
        .set_queue_url(Some(queue_url.to_string()))
        .set_max_number_of_messages(Some(10))
        .set_visibility_timeout(Some(15))
        .message_system_attribute_names(sqs::types::MessageSystemAttributeName::All)
        .message_attribute_names("All")
        .send()
        .await;

    result.context("failed to receive messages")
}

/// Client for one SQS account, optionally bound to a default queue.
///
/// # Example
///
/// ```no_run
/// use sqsbatch::{BatchLimits, OutboundMessage, SqsQueue};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = aws_config::from_env().load().await;
/// let queue = SqsQueue::from_config(config)
///     .with_queue_url("https://sqs.us-east-1.amazonaws.com/123456789/my-queue");
///
/// let messages = (0..25).map(|i| OutboundMessage::new(format!("message {i}")));
/// let result = queue.send_batches(messages, BatchLimits::default()).await?;
/// println!("{} sent, {} failed", result.successful.len(), result.failed.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SqsQueue {
    /// The AWS SDK configuration used for SQS operations
    pub config: SdkConfig,
    /// The SQS client instance
    pub client: sqs::Client,
    /// Queue used by [`SqsQueue::send_batches`] and [`SqsQueue::delete_batches`]
    pub default_queue_url: Option<String>,
}

impl SqsQueue {
    /// Creates a queue client from a pre-built AWS SDK config.
    ///
    /// The caller decides how credentials and endpoints are resolved (e.g. the
    /// CLI's `--local` flag for LocalStack).
    pub fn from_config(config: SdkConfig) -> Self {
        let client = sqs::Client::new(&config);
        Self {
            config,
            client,
            default_queue_url: None,
        }
    }

    pub fn with_queue_url(mut self, queue_url: impl Into<String>) -> Self {
        self.default_queue_url = Some(queue_url.into());
        self
    }

    /// Lists all SQS queue URLs in the account, following pagination tokens.
    pub async fn list(&self) -> anyhow::Result<Vec<String>> {
        let mut queues = Vec::new();
        let mut next_token = None;

        loop {
            let output = self
                .client
                .list_queues()
                .set_next_token(next_token)
                .send()
                .await
                .context("failed to list queues")?;

            if let Some(mut list) = output.queue_urls {
                queues.append(&mut list);
            }

            match output.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        Ok(queues)
    }

    /// Receives messages from a queue until it comes back empty or `max_rounds`
    /// receive calls have been made.
    pub async fn poll(
        &self,
        queue_url: &str,
        max_rounds: usize,
    ) -> anyhow::Result<Vec<ReceivedMessage>> {
        let mut received = Vec::new();

        for round in 1..=max_rounds {
            let output = receive(&self.client, queue_url).await?;

            // none or empty means the whole queue has been received recently
            let messages = output.messages.unwrap_or_default();
            if messages.is_empty() {
                break;
            }

            log::debug!("round {}: received {} messages", round, messages.len());
            for m in messages {
                received.push(ReceivedMessage::try_from(m)?);
            }
        }

        Ok(received)
    }
}

/// Serializable view of a received SQS message.
///
/// Its `ReceiptHandle` field lets the JSON be fed back as a
/// [`DeleteEntry`](crate::DeleteEntry).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReceivedMessage {
    /// Unique identifier for the message assigned by SQS
    pub message_id: String,
    /// Handle used to delete or change visibility of the message
    pub receipt_handle: String,
    /// MD5 digest of the message body
    #[serde(rename = "MD5OfBody")]
    pub md5_of_body: String,
    pub body: String,
    #[serde(
        rename = "MD5OfMessageAttributes",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub md5_of_message_attributes: Option<String>,
    /// System attributes such as `ApproximateReceiveCount`
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub attributes: std::collections::BTreeMap<String, String>,
}

impl TryFrom<aws_sdk_sqs::types::Message> for ReceivedMessage {
    type Error = anyhow::Error;

    fn try_from(message: aws_sdk_sqs::types::Message) -> anyhow::Result<Self> {
        Ok(Self {
            message_id: message.message_id.context("missing message_id")?,
            receipt_handle: message.receipt_handle.context("missing receipt_handle")?,
            md5_of_body: message.md5_of_body.context("missing md5_of_body")?,
            body: message.body.context("missing body")?,
            md5_of_message_attributes: message.md5_of_message_attributes,
            attributes: message
                .attributes
                .unwrap_or_default()
                .into_iter()
                .map(|(name, value)| (name.as_str().to_string(), value))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::DeleteEntry;

    fn sdk_message() -> aws_sdk_sqs::types::Message {
        aws_sdk_sqs::types::Message::builder()
            .message_id("m-1")
            .receipt_handle("handle-1")
            .md5_of_body("0".repeat(32))
            .body("hello")
            .attributes(
                sqs::types::MessageSystemAttributeName::ApproximateReceiveCount,
                "3",
            )
            .build()
    }

    #[test]
    fn converts_received_message() {
        let message = ReceivedMessage::try_from(sdk_message()).unwrap();
        assert_eq!(message.body, "hello");
        assert_eq!(message.attributes["ApproximateReceiveCount"], "3");
    }

    #[test]
    fn missing_receipt_handle_is_an_error() {
        let mut message = sdk_message();
        message.receipt_handle = None;
        assert!(ReceivedMessage::try_from(message).is_err());
    }

    #[test]
    fn received_json_feeds_delete_entries() {
        let message = ReceivedMessage::try_from(sdk_message()).unwrap();
        let json = serde_json::to_string(&message).unwrap();
        let entry: DeleteEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry.receipt_handle, "handle-1");
        assert_eq!(entry.id, None);
    }
}
