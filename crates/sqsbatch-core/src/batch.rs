//! Packing a stream of entries into count and size bounded batches.
//!
//! A batch closes as soon as the next entry would push it past either limit,
//! and that entry opens the following batch. The first entry of a batch is
//! always admitted, so an entry larger than the size limit travels alone
//! instead of stalling the run.

use crate::message::{DeleteEntry, OutboundMessage};
use crate::size::estimate_size;
use serde::{Deserialize, Serialize};
use std::iter::Fuse;
use std::num::NonZeroUsize;

/// Maximum number of entries SQS accepts in one batch call.
pub const MESSAGE_LIMIT: usize = 10;
/// Maximum payload of one `SendMessageBatch` call (256 KiB).
pub const SIZE_LIMIT: usize = 262_144;

/// An entry the packer can place in a batch.
pub trait Batchable {
    /// Caller-supplied id, if any.
    fn id(&self) -> Option<&str>;
    /// Sets the generated `{prefix}-{sequence}` id on an entry that had none.
    fn assign_id(&mut self, id: String);
    /// Contribution of this entry to the batch size limit.
    fn wire_size(&self) -> usize;
}

impl Batchable for OutboundMessage {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn assign_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn wire_size(&self) -> usize {
        estimate_size(self)
    }
}

impl Batchable for DeleteEntry {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn assign_id(&mut self, id: String) {
        self.id = Some(id);
    }

    /// Delete batches carry no size budget, only the count limit applies.
    fn wire_size(&self) -> usize {
        0
    }
}

/// Per-batch limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchLimits {
    pub message_limit: NonZeroUsize,
    /// `None` disables size accounting, as for delete batches.
    pub size_limit: Option<usize>,
}

impl BatchLimits {
    /// Creates limits from an entry cap and an optional payload cap in bytes.
    ///
    /// # Arguments
    /// * `message_limit` - Most entries one batch may hold
    /// * `size_limit` - Most estimated payload bytes per batch, or `None` to
    ///   batch by count only
    pub fn new(message_limit: NonZeroUsize, size_limit: Option<usize>) -> Self {
        Self {
            message_limit,
            size_limit,
        }
    }

    /// Count-only limits. Entry sizes are never computed.
    pub fn count_only(message_limit: NonZeroUsize) -> Self {
        Self::new(message_limit, None)
    }
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            message_limit: NonZeroUsize::new(MESSAGE_LIMIT).unwrap_or(NonZeroUsize::MIN),
            size_limit: Some(SIZE_LIMIT),
        }
    }
}

/// Supplies the prefix used to generate ids for entries that lack one.
pub trait TokenSource {
    fn token(&mut self) -> String;
}

/// Eight lowercase hex characters taken from a random v4 UUID.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomToken;

impl TokenSource for RandomToken {
    fn token(&mut self) -> String {
        let mut token = uuid::Uuid::new_v4().simple().to_string();
        token.truncate(8);
        token
    }
}

/// Always returns the same prefix. Useful for reproducible ids.
#[derive(Clone, Debug)]
pub struct FixedToken(pub String);

impl TokenSource for FixedToken {
    fn token(&mut self) -> String {
        self.0.clone()
    }
}

/// Push-based batch accumulator for one run.
///
/// Feed entries with [`BatchBuilder::push`]; a closed batch is returned as soon
/// as an entry does not fit. Call [`BatchBuilder::finish`] once the source is
/// exhausted to flush the last batch.
#[derive(Debug)]
pub struct BatchBuilder<M> {
    limits: BatchLimits,
    prefix: String,
    sequence: usize,
    current: Vec<M>,
    current_size: usize,
}

impl<M: Batchable> BatchBuilder<M> {
    /// Starts an empty run. Generated ids take the form `{prefix}-{sequence}`,
    /// with the sequence counting every pushed entry from 1.
    ///
    /// # Example
    /// ```
    /// use std::num::NonZeroUsize;
    /// use sqsbatch::{BatchBuilder, BatchLimits, OutboundMessage};
    ///
    /// let limits = BatchLimits::count_only(NonZeroUsize::new(1).unwrap());
    /// let mut builder = BatchBuilder::new(limits, "run");
    /// assert!(builder.push(OutboundMessage::new("a")).is_none());
    /// let closed = builder.push(OutboundMessage::new("b")).unwrap();
    /// assert_eq!(closed[0].id.as_deref(), Some("run-1"));
    /// ```
    pub fn new(limits: BatchLimits, prefix: impl Into<String>) -> Self {
        Self {
            limits,
            prefix: prefix.into(),
            sequence: 0,
            current: Vec::new(),
            current_size: 0,
        }
    }

    /// The id prefix of this run.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Adds `entry` and returns the batch it closed, if any.
    pub fn push(&mut self, mut entry: M) -> Option<Vec<M>> {
        self.sequence += 1;
        if entry.id().is_none() {
            entry.assign_id(format!("{}-{}", self.prefix, self.sequence));
        }

        let (size, reached_size) = match self.limits.size_limit {
            Some(limit) => {
                let size = entry.wire_size();
                (size, self.current_size + size > limit)
            }
            None => (0, false),
        };
        let reached_count = self.current.len() == self.limits.message_limit.get();

        let closed = if !self.current.is_empty() && (reached_count || reached_size) {
            log::debug!(
                "closing batch of {} entries ({} bytes)",
                self.current.len(),
                self.current_size
            );
            self.current_size = 0;
            Some(std::mem::take(&mut self.current))
        } else {
            None
        };

        if let Some(limit) = self.limits.size_limit.filter(|limit| size > *limit) {
            log::trace!("entry of {size} bytes exceeds the {limit} byte limit, sending alone");
        }

        self.current.push(entry);
        self.current_size += size;
        closed
    }

    /// Flushes the pending batch, if any.
    pub fn finish(self) -> Option<Vec<M>> {
        if self.current.is_empty() {
            None
        } else {
            Some(self.current)
        }
    }

    fn take(&mut self) -> Option<Vec<M>> {
        self.current_size = 0;
        if self.current.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.current))
        }
    }
}

/// Lazy sequence of batches over an entry source.
///
/// Forward-only: once drained it keeps returning `None`. Start a new run with
/// [`Packer::pack`] to batch again.
pub struct Batches<I: Iterator> {
    source: Fuse<I>,
    builder: BatchBuilder<I::Item>,
}

impl<I> Iterator for Batches<I>
where
    I: Iterator,
    I::Item: Batchable,
{
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        for entry in self.source.by_ref() {
            if let Some(batch) = self.builder.push(entry) {
                return Some(batch);
            }
        }
        self.builder.take()
    }
}

impl<I> std::iter::FusedIterator for Batches<I>
where
    I: Iterator,
    I::Item: Batchable,
{
}

/// Starts batching runs with fixed limits and an injected token source.
///
/// # Example
///
/// ```
/// use std::num::NonZeroUsize;
/// use sqsbatch::{BatchLimits, FixedToken, OutboundMessage, Packer};
///
/// let limits = BatchLimits::count_only(NonZeroUsize::new(2).unwrap());
/// let mut packer = Packer::new(limits, FixedToken("run".to_string()));
/// let batches: Vec<_> = packer
///     .pack((0..5).map(|i| OutboundMessage::new(i.to_string())))
///     .collect();
///
/// assert_eq!(batches.len(), 3);
/// assert_eq!(batches[2][0].id.as_deref(), Some("run-5"));
/// ```
#[derive(Clone, Debug)]
pub struct Packer<T = RandomToken> {
    limits: BatchLimits,
    tokens: T,
}

impl Packer<RandomToken> {
    /// A packer that draws a random prefix for every run.
    pub fn with_limits(limits: BatchLimits) -> Self {
        Self::new(limits, RandomToken)
    }
}

impl Default for Packer<RandomToken> {
    fn default() -> Self {
        Self::with_limits(BatchLimits::default())
    }
}

impl<T: TokenSource> Packer<T> {
    pub fn new(limits: BatchLimits, tokens: T) -> Self {
        Self { limits, tokens }
    }

    /// Limits applied to every run.
    pub fn limits(&self) -> BatchLimits {
        self.limits
    }

    /// Begins a run over `source`, drawing a fresh id prefix.
    pub fn pack<I>(&mut self, source: I) -> Batches<I::IntoIter>
    where
        I: IntoIterator,
        I::Item: Batchable,
    {
        Batches {
            source: source.into_iter().fuse(),
            builder: self.builder(),
        }
    }

    /// Like [`Packer::pack`], but bounded by count only. Entry sizes are never
    /// computed.
    pub fn pack_unsized<I>(&mut self, source: I) -> Batches<I::IntoIter>
    where
        I: IntoIterator,
        I::Item: Batchable,
    {
        let limits = BatchLimits::count_only(self.limits.message_limit);
        Batches {
            source: source.into_iter().fuse(),
            builder: BatchBuilder::new(limits, self.tokens.token()),
        }
    }

    /// Begins a push-based run, drawing a fresh id prefix.
    pub fn builder<M: Batchable>(&mut self) -> BatchBuilder<M> {
        BatchBuilder::new(self.limits, self.tokens.token())
    }
}
