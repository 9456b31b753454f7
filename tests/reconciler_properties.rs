//! Property-based tests for message reconciliation
//!
//! Whatever order messages, duplicates and receipts arrive in, the
//! reconciled sequence ends up the same.

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};

use pairchat::client::MessageReconciler;
use pairchat::shared::{Message, MessageId, NewMessage, ParticipantId};

#[derive(Debug, Clone)]
enum Delivery {
    Message(usize),
    Receipt(usize),
}

fn messages(offsets: &BTreeSet<i64>) -> Vec<Message> {
    offsets
        .iter()
        .enumerate()
        .map(|(i, offset)| {
            let sender = if i % 2 == 0 { ParticipantId::A } else { ParticipantId::B };
            let timestamp = DateTime::<Utc>::from_timestamp(1_700_000_000 + offset, 0).unwrap();
            Message::from_draft(NewMessage::text(sender, format!("#{}", i)), MessageId::new(format!("m{}", i)), timestamp)
        })
        .collect()
}

/// Distinct timestamps plus a delivery script: every message once or
/// twice, some receipts, shuffled
fn scenario() -> impl Strategy<Value = (BTreeSet<i64>, Vec<Delivery>)> {
    prop::collection::btree_set(0i64..100_000, 1..25).prop_flat_map(|offsets| {
        let n = offsets.len();
        let script = (
            prop::collection::vec(any::<bool>(), n),
            prop::collection::vec(any::<bool>(), n),
        )
            .prop_map(move |(duplicated, read)| {
                let mut script = Vec::new();
                for i in 0..n {
                    script.push(Delivery::Message(i));
                    if duplicated[i] {
                        script.push(Delivery::Message(i));
                    }
                    if read[i] {
                        script.push(Delivery::Receipt(i));
                    }
                }
                script
            })
            .prop_shuffle();
        (Just(offsets), script)
    })
}

fn replay(messages: &[Message], script: &[Delivery]) -> MessageReconciler {
    let mut reconciler = MessageReconciler::new();
    for delivery in script {
        match delivery {
            Delivery::Message(i) => {
                reconciler.apply_message(messages[*i].clone());
            }
            Delivery::Receipt(i) => {
                reconciler.apply_read_receipt(&[messages[*i].id.clone()]);
            }
        }
    }
    reconciler
}

proptest! {
    #[test]
    fn test_sequence_is_sorted_and_unique((offsets, script) in scenario()) {
        let messages = messages(&offsets);
        let reconciler = replay(&messages, &script);

        prop_assert_eq!(reconciler.len(), messages.len());
        let ids: HashSet<_> = reconciler.messages().iter().map(|m| m.id.clone()).collect();
        prop_assert_eq!(ids.len(), messages.len());
        prop_assert!(reconciler.messages().windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_receipts_apply_regardless_of_order((offsets, script) in scenario()) {
        let messages = messages(&offsets);
        let reconciler = replay(&messages, &script);

        let receipted: HashSet<usize> = script
            .iter()
            .filter_map(|d| match d {
                Delivery::Receipt(i) => Some(*i),
                Delivery::Message(_) => None,
            })
            .collect();
        for (i, message) in messages.iter().enumerate() {
            let stored = reconciler.get(&message.id).unwrap();
            prop_assert_eq!(stored.read, receipted.contains(&i));
        }
    }

    #[test]
    fn test_history_merge_matches_live_delivery((offsets, script) in scenario()) {
        let messages = messages(&offsets);
        let live = replay(&messages, &script);

        // Live view merged with a history snapshot that is already sorted.
        let mut merged = live.clone();
        prop_assert_eq!(merged.merge_history(messages.clone()), 0);
        prop_assert_eq!(merged.messages(), live.messages());

        let from_history = MessageReconciler::from_history(messages.clone());
        let ordered: Vec<_> = from_history.messages().iter().map(|m| m.id.clone()).collect();
        let replayed: Vec<_> = live.messages().iter().map(|m| m.id.clone()).collect();
        prop_assert_eq!(ordered, replayed);
    }
}
