use crate::message::{DeleteEntry, OutboundMessage};
use crate::outcome::{BatchFailure, BatchResult, DeleteSuccess, SendSuccess};
use crate::send::{BatchDelivery, SendError};
use async_trait::async_trait;
use std::sync::Mutex;

/// In-memory [`BatchDelivery`] that records the ids of every batch it is handed.
///
/// `fail_on` makes every entry of that (1-based) call come back as a sender
/// fault; `error_on` makes that call fail outright without being recorded.
#[derive(Default)]
pub struct RecordingDelivery {
    calls: Mutex<Vec<Vec<String>>>,
    fail_on: Option<usize>,
    error_on: Option<usize>,
}

impl RecordingDelivery {
    pub fn failing_batch(call: usize) -> Self {
        Self {
            fail_on: Some(call),
            ..Default::default()
        }
    }

    pub fn erroring_batch(call: usize) -> Self {
        Self {
            error_on: Some(call),
            ..Default::default()
        }
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(Vec::len).collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.calls.lock().unwrap().concat()
    }

    fn record(&self, ids: Vec<String>) -> Result<BatchResult<String>, SendError> {
        let mut calls = self.calls.lock().unwrap();
        let call = calls.len() + 1;
        if self.error_on == Some(call) {
            return Err(SendError::BuildEntryFailed(format!("call {call} refused")));
        }
        calls.push(ids.clone());

        if self.fail_on == Some(call) {
            Ok(BatchResult {
                successful: Vec::new(),
                failed: ids
                    .into_iter()
                    .map(|id| BatchFailure {
                        id,
                        sender_fault: true,
                        code: "Unknown".to_string(),
                        message: Some("?".to_string()),
                    })
                    .collect(),
            })
        } else {
            Ok(BatchResult {
                successful: ids,
                failed: Vec::new(),
            })
        }
    }
}

#[async_trait]
impl BatchDelivery for RecordingDelivery {
    async fn send_batch(
        &self,
        _queue_url: &str,
        batch: Vec<OutboundMessage>,
    ) -> Result<BatchResult<SendSuccess>, SendError> {
        let ids = batch.into_iter().filter_map(|m| m.id).collect();
        let result = self.record(ids)?;
        Ok(BatchResult {
            successful: result
                .successful
                .into_iter()
                .map(|id| SendSuccess {
                    message_id: format!("msg-{id}"),
                    id,
                    md5_of_message_body: "0".repeat(32),
                    ..Default::default()
                })
                .collect(),
            failed: result.failed,
        })
    }

    async fn delete_batch(
        &self,
        _queue_url: &str,
        batch: Vec<DeleteEntry>,
    ) -> Result<BatchResult<DeleteSuccess>, SendError> {
        let ids = batch.into_iter().filter_map(|e| e.id).collect();
        let result = self.record(ids)?;
        Ok(BatchResult {
            successful: result
                .successful
                .into_iter()
                .map(|id| DeleteSuccess { id })
                .collect(),
            failed: result.failed,
        })
    }
}
