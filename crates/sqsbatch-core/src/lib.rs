//! # sqsbatch-core
//!
//! Core library for delivering many messages to AWS SQS through its batch APIs.
//!
//! SQS caps every `SendMessageBatch` call at 10 entries and 256 KiB of payload,
//! and every `DeleteMessageBatch` call at 10 entries. This crate packs an
//! arbitrary stream of entries into the fewest in-order batches that respect
//! both limits and aggregates the per-entry results.
//!
//! ## Features
//!
//! - **Size Estimation**: Model the SQS wire size of a message, attributes included
//! - **Batch Packing**: Lazily split any iterator into count and size bounded batches
//! - **Batch Sending**: Send or delete batches and collect successes and failures
//! - **Queue Operations**: List queues and poll messages
//!
//! ## Example
//!
//! ```no_run
//! use sqsbatch::{send_batches, BatchLimits, OutboundMessage, Packer};
//!
//! # async fn example() -> Result<(), sqsbatch::SendError> {
//! let config = aws_config::from_env().load().await;
//! let client = aws_sdk_sqs::Client::new(&config);
//!
//! let messages = vec![
//!     OutboundMessage::new("Beautiful is better than ugly"),
//!     OutboundMessage::new("Explicit is better than implicit"),
//! ];
//! let result = send_batches(
//!     &client,
//!     "https://sqs.us-east-1.amazonaws.com/000000000000/my-queue",
//!     messages,
//!     &mut Packer::with_limits(BatchLimits::default()),
//! )
//! .await?;
//!
//! for failure in result.failed {
//!     eprintln!("{}: {}", failure.id, failure.code);
//! }
//! # Ok(())
//! # }
//! ```

mod batch;
mod message;
mod outcome;
mod send;
mod size;
mod sqs;

#[cfg(test)]
mod test_utils;

pub use batch::*;
pub use message::*;
pub use outcome::*;
pub use send::*;
pub use size::*;
pub use sqs::*;
