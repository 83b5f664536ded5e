use crate::batch::{BatchLimits, Packer, TokenSource};
use crate::message::{AttributeValue, DeleteEntry, MessageAttribute, MessageBody, OutboundMessage};
use crate::outcome::{BatchFailure, BatchResult, DeleteSuccess, SendSuccess};
use async_trait::async_trait;
use aws_sdk_sqs::error::SdkError;
use aws_sdk_sqs::operation::delete_message_batch::DeleteMessageBatchError;
use aws_sdk_sqs::operation::send_message_batch::SendMessageBatchError;
use aws_sdk_sqs::primitives::Blob;
use aws_sdk_sqs::types::{
    DeleteMessageBatchRequestEntry, MessageAttributeValue, MessageSystemAttributeNameForSends,
    MessageSystemAttributeValue, SendMessageBatchRequestEntry,
};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug)]
pub enum SendError {
    MissingQueueUrl,
    BuildEntryFailed(String),
    InvalidBody(String),
    Send(SdkError<SendMessageBatchError>),
    Delete(SdkError<DeleteMessageBatchError>),
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::MissingQueueUrl => write!(f, "queue URL was not specified"),
            SendError::BuildEntryFailed(msg) => write!(f, "failed to build message entry: {}", msg),
            SendError::InvalidBody(id) => {
                write!(f, "message {} has a binary body that is not valid UTF-8", id)
            }
            SendError::Send(e) => write!(f, "AWS SDK error while sending batch: {}", e),
            SendError::Delete(e) => write!(f, "AWS SDK error while deleting batch: {}", e),
        }
    }
}

impl std::error::Error for SendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SendError::Send(e) => Some(e),
            SendError::Delete(e) => Some(e),
            _ => None,
        }
    }
}

/// The bulk operations a batch is handed to.
///
/// Per-entry rejections come back inside [`BatchResult::failed`]; an `Err` means
/// the call as a whole did not go through.
#[async_trait]
pub trait BatchDelivery: Sync {
    async fn send_batch(
        &self,
        queue_url: &str,
        batch: Vec<OutboundMessage>,
    ) -> Result<BatchResult<SendSuccess>, SendError>;

    async fn delete_batch(
        &self,
        queue_url: &str,
        batch: Vec<DeleteEntry>,
    ) -> Result<BatchResult<DeleteSuccess>, SendError>;
}

#[async_trait]
impl BatchDelivery for aws_sdk_sqs::Client {
    async fn send_batch(
        &self,
        queue_url: &str,
        batch: Vec<OutboundMessage>,
    ) -> Result<BatchResult<SendSuccess>, SendError> {
        let entries = batch
            .into_iter()
            .map(send_entry)
            .collect::<Result<Vec<_>, _>>()?;

        let output = self
            .send_message_batch()
            .queue_url(queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(SendError::Send)?;

        Ok(BatchResult {
            successful: output.successful.into_iter().map(SendSuccess::from).collect(),
            failed: output.failed.into_iter().map(BatchFailure::from).collect(),
        })
    }

    async fn delete_batch(
        &self,
        queue_url: &str,
        batch: Vec<DeleteEntry>,
    ) -> Result<BatchResult<DeleteSuccess>, SendError> {
        let entries = batch
            .into_iter()
            .map(|entry| {
                DeleteMessageBatchRequestEntry::builder()
                    .set_id(entry.id)
                    .receipt_handle(entry.receipt_handle)
                    .build()
                    .map_err(|e| SendError::BuildEntryFailed(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output = self
            .delete_message_batch()
            .queue_url(queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(SendError::Delete)?;

        Ok(BatchResult {
            successful: output
                .successful
                .into_iter()
                .map(DeleteSuccess::from)
                .collect(),
            failed: output.failed.into_iter().map(BatchFailure::from).collect(),
        })
    }
}

fn send_entry(message: OutboundMessage) -> Result<SendMessageBatchRequestEntry, SendError> {
    let body = match message.message_body {
        MessageBody::Text(text) => text,
        MessageBody::Binary { bytes } => String::from_utf8(bytes)
            .map_err(|_| SendError::InvalidBody(message.id.clone().unwrap_or_default()))?,
    };

    let attributes = message
        .message_attributes
        .into_iter()
        .map(|(name, attribute)| {
            let (data_type, string_value, binary_value) = attribute_parts(attribute);
            MessageAttributeValue::builder()
                .data_type(data_type)
                .set_string_value(string_value)
                .set_binary_value(binary_value)
                .build()
                .map(|value| (name, value))
                .map_err(|e| SendError::BuildEntryFailed(e.to_string()))
        })
        .collect::<Result<HashMap<_, _>, _>>()?;

    let system_attributes = message
        .message_system_attributes
        .into_iter()
        .map(|(name, attribute)| {
            let (data_type, string_value, binary_value) = attribute_parts(attribute);
            MessageSystemAttributeValue::builder()
                .data_type(data_type)
                .set_string_value(string_value)
                .set_binary_value(binary_value)
                .build()
                .map(|value| (MessageSystemAttributeNameForSends::from(name.as_str()), value))
                .map_err(|e| SendError::BuildEntryFailed(e.to_string()))
        })
        .collect::<Result<HashMap<_, _>, _>>()?;

    SendMessageBatchRequestEntry::builder()
        .set_id(message.id)
        .message_body(body)
        .set_message_attributes((!attributes.is_empty()).then_some(attributes))
        .set_message_system_attributes((!system_attributes.is_empty()).then_some(system_attributes))
        .set_delay_seconds(message.delay_seconds)
        .set_message_group_id(message.message_group_id)
        .set_message_deduplication_id(message.message_deduplication_id)
        .build()
        .map_err(|e| SendError::BuildEntryFailed(e.to_string()))
}

fn attribute_parts(attribute: MessageAttribute) -> (String, Option<String>, Option<Blob>) {
    match attribute.value {
        Some(AttributeValue::String(value)) => (attribute.data_type, Some(value), None),
        Some(AttributeValue::Binary(value)) => (attribute.data_type, None, Some(Blob::new(value))),
        None => (attribute.data_type, None, None),
    }
}

/// Sends every message in `messages` to `queue_url`, one `SendMessageBatch`
/// call per batch produced by `packer`.
///
/// Entries without an `Id` get one generated for the run. Rejected entries are
/// returned in [`BatchResult::failed`]; the first call-level error stops the run.
pub async fn send_batches<D, T, I>(
    delivery: &D,
    queue_url: &str,
    messages: I,
    packer: &mut Packer<T>,
) -> Result<BatchResult<SendSuccess>, SendError>
where
    D: BatchDelivery + ?Sized,
    T: TokenSource,
    I: IntoIterator<Item = OutboundMessage>,
{
    let mut result = BatchResult::default();
    for (index, batch) in packer.pack(messages).enumerate() {
        log::info!(
            "sending batch {} ({} messages) to {}",
            index + 1,
            batch.len(),
            queue_url
        );
        let outcome = delivery.send_batch(queue_url, batch).await?;
        if !outcome.failed.is_empty() {
            log::warn!(
                "batch {}: {} messages rejected",
                index + 1,
                outcome.failed.len()
            );
        }
        result.extend(outcome);
    }

    Ok(result)
}

/// Deletes every entry in `entries` from `queue_url`, one `DeleteMessageBatch`
/// call per batch. Batches are bounded by count only; the packer's size limit
/// does not apply to deletes.
pub async fn delete_batches<D, T, I>(
    delivery: &D,
    queue_url: &str,
    entries: I,
    packer: &mut Packer<T>,
) -> Result<BatchResult<DeleteSuccess>, SendError>
where
    D: BatchDelivery + ?Sized,
    T: TokenSource,
    I: IntoIterator<Item = DeleteEntry>,
{
    let mut result = BatchResult::default();
    for (index, batch) in packer.pack_unsized(entries).enumerate() {
        log::info!(
            "deleting batch {} ({} entries) from {}",
            index + 1,
            batch.len(),
            queue_url
        );
        let outcome = delivery.delete_batch(queue_url, batch).await?;
        if !outcome.failed.is_empty() {
            log::warn!(
                "batch {}: {} deletes rejected",
                index + 1,
                outcome.failed.len()
            );
        }
        result.extend(outcome);
    }

    Ok(result)
}

impl crate::sqs::SqsQueue {
    /// Sends `messages` to the default queue, packed with `limits`.
    pub async fn send_batches(
        &self,
        messages: impl IntoIterator<Item = OutboundMessage>,
        limits: BatchLimits,
    ) -> Result<BatchResult<SendSuccess>, SendError> {
        let queue_url = self
            .default_queue_url
            .as_deref()
            .ok_or(SendError::MissingQueueUrl)?;

        send_batches(
            &self.client,
            queue_url,
            messages,
            &mut Packer::with_limits(limits),
        )
        .await
    }

    /// Deletes `entries` from the default queue, at most `limits.message_limit` per call.
    pub async fn delete_batches(
        &self,
        entries: impl IntoIterator<Item = DeleteEntry>,
        limits: BatchLimits,
    ) -> Result<BatchResult<DeleteSuccess>, SendError> {
        let queue_url = self
            .default_queue_url
            .as_deref()
            .ok_or(SendError::MissingQueueUrl)?;

        delete_batches(
            &self.client,
            queue_url,
            entries,
            &mut Packer::with_limits(limits),
        )
        .await
    }
}
