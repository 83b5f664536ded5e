use crate::reader::Line;
use anyhow::Context;
use sqsbatch::{
    estimate_size, BatchBuilder, BatchDelivery, BatchLimits, BatchResult, Batchable, DeleteEntry,
    DeleteSuccess, FixedToken, OutboundMessage, Packer, SendSuccess, SIZE_LIMIT,
};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tokio::sync::mpsc::Receiver;

/// Where entries come from and how they are batched.
#[derive(Debug, clap::Args)]
pub struct InputArgs {
    /// File with one entry per line (reads from stdin if omitted)
    pub file: Option<PathBuf>,

    /// Maximum entries per batch
    #[arg(long, default_value = "10")]
    pub message_limit: NonZeroUsize,

    /// Fixed prefix for generated entry ids (random per run if omitted)
    #[arg(long)]
    pub id_prefix: Option<String>,
}

#[derive(Debug, clap::Args)]
pub struct SizeArgs {
    /// Maximum payload bytes per batch
    #[arg(long, default_value_t = SIZE_LIMIT)]
    pub size_limit: usize,

    /// Batch by count only
    #[arg(long, action, conflicts_with = "size_limit")]
    pub no_size_limit: bool,

    /// Parse each line as a SendMessageBatchRequestEntry JSON object instead of a plain body
    #[arg(long, action)]
    pub json: bool,
}

impl InputArgs {
    pub fn limits(&self, size: Option<&SizeArgs>) -> BatchLimits {
        let size_limit = match size {
            Some(args) if !args.no_size_limit => Some(args.size_limit),
            _ => None,
        };
        BatchLimits::new(self.message_limit, size_limit)
    }

    pub fn builder<M: Batchable>(&self, limits: BatchLimits) -> BatchBuilder<M> {
        match &self.id_prefix {
            Some(prefix) => Packer::new(limits, FixedToken(prefix.clone())).builder(),
            None => Packer::with_limits(limits).builder(),
        }
    }

    pub async fn open(&self) -> anyhow::Result<Box<dyn tokio::io::AsyncRead + Unpin + Send>> {
        match &self.file {
            Some(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .with_context(|| format!("failed to open {}", path.display()))?;
                Ok(Box::new(file))
            }
            None => Ok(Box::new(tokio::io::stdin())),
        }
    }
}

pub fn parse_message(line: &Line, json: bool) -> anyhow::Result<OutboundMessage> {
    if json {
        serde_json::from_str(&line.text)
            .with_context(|| format!("line {}: invalid message entry", line.number))
    } else {
        Ok(OutboundMessage::new(line.text.as_str()))
    }
}

pub fn parse_delete(line: &Line) -> anyhow::Result<DeleteEntry> {
    serde_json::from_str(&line.text)
        .with_context(|| format!("line {}: expected an object with a ReceiptHandle", line.number))
}

/// Outcomes of the batches a run delivered, and the error that stopped it early.
///
/// Batches closed before the error already reached the queue, so their
/// outcomes are kept and must be reported even when `error` is set.
#[derive(Debug)]
pub struct Delivered<S> {
    pub result: BatchResult<S>,
    pub error: Option<anyhow::Error>,
}

/// Sends every line as it arrives, one `SendMessageBatch` call per closed batch.
///
/// A malformed line or a failed call stops the run; entries still pending in
/// the open batch are not sent.
pub async fn send<D: BatchDelivery + ?Sized>(
    delivery: &D,
    queue_url: &str,
    rx: Receiver<Line>,
    builder: BatchBuilder<OutboundMessage>,
    json: bool,
) -> Delivered<SendSuccess> {
    let mut result = BatchResult::default();
    let error = send_into(&mut result, delivery, queue_url, rx, builder, json)
        .await
        .err();
    Delivered { result, error }
}

async fn send_into<D: BatchDelivery + ?Sized>(
    result: &mut BatchResult<SendSuccess>,
    delivery: &D,
    queue_url: &str,
    mut rx: Receiver<Line>,
    mut builder: BatchBuilder<OutboundMessage>,
    json: bool,
) -> anyhow::Result<()> {
    let mut batches = 0;

    while let Some(line) = rx.recv().await {
        let message = parse_message(&line, json)?;
        if let Some(batch) = builder.push(message) {
            batches += 1;
            log::info!("sending batch {} ({} messages)", batches, batch.len());
            result.extend(delivery.send_batch(queue_url, batch).await?);
        }
    }

    if let Some(batch) = builder.finish() {
        batches += 1;
        log::info!("sending batch {} ({} messages)", batches, batch.len());
        result.extend(delivery.send_batch(queue_url, batch).await?);
    }

    Ok(())
}

/// Deletes every entry as it arrives, one `DeleteMessageBatch` call per closed batch.
pub async fn delete<D: BatchDelivery + ?Sized>(
    delivery: &D,
    queue_url: &str,
    rx: Receiver<Line>,
    builder: BatchBuilder<DeleteEntry>,
) -> Delivered<DeleteSuccess> {
    let mut result = BatchResult::default();
    let error = delete_into(&mut result, delivery, queue_url, rx, builder)
        .await
        .err();
    Delivered { result, error }
}

async fn delete_into<D: BatchDelivery + ?Sized>(
    result: &mut BatchResult<DeleteSuccess>,
    delivery: &D,
    queue_url: &str,
    mut rx: Receiver<Line>,
    mut builder: BatchBuilder<DeleteEntry>,
) -> anyhow::Result<()> {
    let mut batches = 0;

    while let Some(line) = rx.recv().await {
        if let Some(batch) = builder.push(parse_delete(&line)?) {
            batches += 1;
            log::info!("deleting batch {} ({} entries)", batches, batch.len());
            result.extend(delivery.delete_batch(queue_url, batch).await?);
        }
    }

    if let Some(batch) = builder.finish() {
        batches += 1;
        log::info!("deleting batch {} ({} entries)", batches, batch.len());
        result.extend(delivery.delete_batch(queue_url, batch).await?);
    }

    Ok(())
}

/// One line of `plan` output.
#[derive(Debug, serde::Serialize)]
pub struct PlannedBatch {
    pub batch: usize,
    pub count: usize,
    pub size: usize,
    pub ids: Vec<String>,
}

impl PlannedBatch {
    fn new(batch: usize, messages: &[OutboundMessage]) -> Self {
        Self {
            batch,
            count: messages.len(),
            size: messages.iter().map(estimate_size).sum(),
            ids: messages.iter().filter_map(|m| m.id.clone()).collect(),
        }
    }
}

/// Packs the input without sending anything and reports the batches.
pub async fn plan(
    mut rx: Receiver<Line>,
    mut builder: BatchBuilder<OutboundMessage>,
    json: bool,
) -> anyhow::Result<Vec<PlannedBatch>> {
    let mut planned = Vec::new();

    while let Some(line) = rx.recv().await {
        if let Some(batch) = builder.push(parse_message(&line, json)?) {
            planned.push(PlannedBatch::new(planned.len() + 1, &batch));
        }
    }

    if let Some(batch) = builder.finish() {
        planned.push(PlannedBatch::new(planned.len() + 1, &batch));
    }

    Ok(planned)
}
