//! Hash-chain primitives: hashing, verification and relinking.
//!
//! Hash input is exactly `canonical::encode_event` of the eight hashed
//! fields; `created_at` and the stored `hash` never contribute.

use sha2::{Digest, Sha256};

use forensic_contracts::{
    event::{Event, EventFields},
    report::VerifyReport,
};

use crate::canonical::encode_event;

/// Compute the SHA-256 hash of one event's canonical encoding.
///
/// Returns a lowercase 64-character hex string.
pub fn hash_event(fields: &EventFields<'_>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(encode_event(fields));
    hex::encode(hasher.finalize())
}

/// Walk `events` (in sequence order) and check every link.
///
/// An event at 1-based position `p` is valid when:
///
/// 1. its `sequence_number` equals `p`
/// 2. its `prev_hash` equals the stored `hash` of position `p - 1`, or
///    `Event::GENESIS_HASH` for `p == 1`
/// 3. its stored `hash` equals the hash recomputed from its own fields
///
/// The walk never stops early: the first failing position is recorded and
/// `total_events` always covers the whole slice. An empty slice is valid.
pub fn verify_events(events: &[Event]) -> VerifyReport {
    let mut expected_prev = Event::GENESIS_HASH;
    let mut first_invalid: Option<u64> = None;

    for (idx, event) in events.iter().enumerate() {
        let position = idx as u64 + 1;

        let in_place = event.sequence_number == position;
        let linked = event.prev_hash == expected_prev;
        let sealed = hash_event(&event.fields()) == event.hash;

        if !(in_place && linked && sealed) && first_invalid.is_none() {
            first_invalid = Some(position);
        }

        expected_prev = event.hash.as_str();
    }

    VerifyReport {
        valid: first_invalid.is_none(),
        total_events: events.len() as u64,
        first_invalid_sequence: first_invalid,
    }
}

/// Freshly computed link values for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLink {
    pub sequence_number: u64,
    pub prev_hash: String,
    pub hash: String,
}

/// Recompute `prev_hash`/`hash` for every event from genesis.
///
/// Each `prev_hash` comes from the newly computed hash of the previous event,
/// never from storage, so the result is a valid chain over the same payloads.
pub fn relink(events: &[Event]) -> Vec<ChainLink> {
    let mut links = Vec::with_capacity(events.len());
    let mut prev = Event::GENESIS_HASH.to_string();

    for event in events {
        let hash = hash_event(&EventFields {
            prev_hash: &prev,
            ..event.fields()
        });
        links.push(ChainLink {
            sequence_number: event.sequence_number,
            prev_hash: prev,
            hash: hash.clone(),
        });
        prev = hash;
    }

    links
}

/// True when `events` carry the sequence numbers `1..=N` in order.
pub fn is_gapless(events: &[Event]) -> bool {
    events
        .iter()
        .enumerate()
        .all(|(idx, event)| event.sequence_number == idx as u64 + 1)
}
