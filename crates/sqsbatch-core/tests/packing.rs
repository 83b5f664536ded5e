use proptest::prelude::*;
use sqsbatch::{
    estimate_size, BatchLimits, FixedToken, MessageAttribute, OutboundMessage, Packer,
};
use std::collections::HashSet;
use std::num::NonZeroUsize;

fn message() -> impl Strategy<Value = OutboundMessage> {
    (
        "\\PC{0,40}",
        prop::option::of(("[a-z]{1,8}", "\\PC{0,16}")),
        prop::option::of(prop::collection::vec(any::<u8>(), 0..16)),
        prop::bool::weighted(0.2),
    )
        .prop_map(|(body, text, binary, with_id)| {
            let mut message = OutboundMessage::new(body);
            if let Some((name, value)) = text {
                message = message.with_attribute(name, MessageAttribute::string("String", value));
            }
            if let Some(bytes) = binary {
                message = message.with_attribute("blob", MessageAttribute::binary("Binary", bytes));
            }
            if with_id {
                let len = message.message_body.as_bytes().len();
                message = message.with_id(format!("own-{len}"));
            }
            message
        })
}

fn batch_limits() -> impl Strategy<Value = BatchLimits> {
    (1..12usize, prop::option::of(1..400usize)).prop_map(|(count, size)| {
        BatchLimits::new(NonZeroUsize::new(count).unwrap(), size)
    })
}

// Property-based test: batching never loses, duplicates or reorders entries
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_concatenation_reproduces_input(
        messages in prop::collection::vec(message(), 0..60),
        limits in batch_limits()
    ) {
        let bodies: Vec<_> = messages.iter().map(|m| m.message_body.clone()).collect();
        let mut packer = Packer::new(limits, FixedToken("p".to_string()));

        let packed: Vec<_> = packer
            .pack(messages)
            .flatten()
            .map(|m| m.message_body)
            .collect();

        prop_assert_eq!(packed, bodies);
    }
}

// Property-based test: every batch honors both limits unless it is an oversized singleton
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_batches_respect_limits(
        messages in prop::collection::vec(message(), 0..60),
        limits in batch_limits()
    ) {
        let input_len = messages.len();
        let mut packer = Packer::new(limits, FixedToken("p".to_string()));
        let batches: Vec<_> = packer.pack(messages).collect();

        prop_assert_eq!(batches.iter().map(Vec::len).sum::<usize>(), input_len);
        for batch in &batches {
            prop_assert!(!batch.is_empty());
            prop_assert!(batch.len() <= limits.message_limit.get());

            if let Some(size_limit) = limits.size_limit {
                let total: usize = batch.iter().map(estimate_size).sum();
                let oversized_singleton =
                    batch.len() == 1 && estimate_size(&batch[0]) > size_limit;
                prop_assert!(
                    total <= size_limit || oversized_singleton,
                    "batch of {} bytes over {} byte limit",
                    total,
                    size_limit
                );
            }
        }
    }
}

// Property-based test: batches are maximal, the next batch's head did not fit
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_batches_are_maximal(
        messages in prop::collection::vec(message(), 1..60),
        limits in batch_limits()
    ) {
        let mut packer = Packer::new(limits, FixedToken("p".to_string()));
        let batches: Vec<_> = packer.pack(messages).collect();

        for pair in batches.windows(2) {
            let (current, next) = (&pair[0], &pair[1]);
            let full = current.len() == limits.message_limit.get();
            let overflow = limits.size_limit.is_some_and(|limit| {
                current.iter().map(estimate_size).sum::<usize>() + estimate_size(&next[0]) > limit
            });
            prop_assert!(full || overflow);
        }
    }
}

// Property-based test: ids are unique within a run, and generated ones follow the sequence
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_generated_ids_are_unique(
        count in 0..200usize,
        limits in batch_limits()
    ) {
        let mut packer = Packer::with_limits(limits);
        let ids: Vec<_> = packer
            .pack((0..count).map(|i| OutboundMessage::new(i.to_string())))
            .flatten()
            .map(|m| m.id.unwrap())
            .collect();

        let unique: HashSet<_> = ids.iter().collect();
        prop_assert_eq!(unique.len(), count);
        for (i, id) in ids.iter().enumerate() {
            let (prefix, sequence) = id.split_once('-').unwrap();
            prop_assert_eq!(prefix.len(), 8);
            prop_assert_eq!(sequence, (i + 1).to_string());
        }
    }
}

#[test]
fn structurally_identical_runs_get_distinct_prefixes() {
    let run = || -> Vec<String> {
        Packer::with_limits(BatchLimits::default())
            .pack((0..3).map(|_| OutboundMessage::new("same")))
            .flatten()
            .map(|m| m.id.unwrap())
            .collect()
    };

    let first = run();
    let second = run();
    let sequence: Vec<_> = first
        .iter()
        .map(|id| id.rsplit('-').next().unwrap())
        .collect();
    assert_eq!(sequence, vec!["1", "2", "3"]);
    assert_ne!(first, second);
}

#[test]
fn size_then_count_cutoffs() {
    let mut messages: Vec<_> = (0..4).map(|_| OutboundMessage::new("1234567890")).collect();
    messages.push(OutboundMessage::new("123456789"));
    messages.extend((0..6).map(|_| OutboundMessage::new("1")));

    let limits = BatchLimits::new(NonZeroUsize::new(5).unwrap(), Some(49));
    let sizes: Vec<_> = Packer::new(limits, FixedToken("x".to_string()))
        .pack(messages)
        .map(|batch| batch.len())
        .collect();

    assert_eq!(sizes, vec![5, 5, 1]);
}
