//! Per-entry outcomes of batch calls, aggregated across a whole run.

use serde::{Deserialize, Serialize};

/// Successes and failures collected from one or more batch calls, in the
/// order the batches were sent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchResult<S> {
    pub successful: Vec<S>,
    pub failed: Vec<BatchFailure>,
}

impl<S> Default for BatchResult<S> {
    fn default() -> Self {
        Self {
            successful: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<S> BatchResult<S> {
    /// Appends the outcome of a later batch.
    pub fn extend(&mut self, other: BatchResult<S>) {
        self.successful.extend(other.successful);
        self.failed.extend(other.failed);
    }

    /// True when no entry was rejected.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A message accepted by `SendMessageBatch`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SendSuccess {
    pub id: String,
    pub message_id: String,
    #[serde(rename = "MD5OfMessageBody")]
    pub md5_of_message_body: String,
    #[serde(
        rename = "MD5OfMessageAttributes",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub md5_of_message_attributes: Option<String>,
    #[serde(
        rename = "MD5OfMessageSystemAttributes",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub md5_of_message_system_attributes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<String>,
}

/// An entry removed by `DeleteMessageBatch`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteSuccess {
    pub id: String,
}

/// An entry rejected by a batch call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchFailure {
    pub id: String,
    /// Whether the error was caused by the request rather than the service.
    pub sender_fault: bool,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<aws_sdk_sqs::types::SendMessageBatchResultEntry> for SendSuccess {
    fn from(entry: aws_sdk_sqs::types::SendMessageBatchResultEntry) -> Self {
        Self {
            id: entry.id,
            message_id: entry.message_id,
            md5_of_message_body: entry.md5_of_message_body,
            md5_of_message_attributes: entry.md5_of_message_attributes,
            md5_of_message_system_attributes: entry.md5_of_message_system_attributes,
            sequence_number: entry.sequence_number,
        }
    }
}

impl From<aws_sdk_sqs::types::DeleteMessageBatchResultEntry> for DeleteSuccess {
    fn from(entry: aws_sdk_sqs::types::DeleteMessageBatchResultEntry) -> Self {
        Self { id: entry.id }
    }
}

impl From<aws_sdk_sqs::types::BatchResultErrorEntry> for BatchFailure {
    fn from(entry: aws_sdk_sqs::types::BatchResultErrorEntry) -> Self {
        Self {
            id: entry.id,
            sender_fault: entry.sender_fault,
            code: entry.code,
            message: entry.message,
        }
    }
}
