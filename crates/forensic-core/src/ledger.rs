//! The Chain Ledger: the only writer of new chain rows.
//!
//! One append is one unit of work under the order's write lock:
//!
//!   lock → read tail → assign sequence + prev_hash → hash → insert → commit
//!
//! The sequence number is always derived from the stored tail inside that
//! unit of work. Nothing is cached between calls, so any number of ledger
//! instances, in any number of processes, can share one store.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use forensic_contracts::{
    error::{LedgerError, LedgerResult},
    event::{Event, EventFields, NewEvent, OrderId},
    value::EventValue,
};

use crate::{chain::hash_event, config::AppendConfig, traits::ChainStore};

/// Appends events to order chains.
#[derive(Clone)]
pub struct ChainLedger {
    store: Arc<dyn ChainStore>,
    config: AppendConfig,
}

impl ChainLedger {
    pub fn new(store: Arc<dyn ChainStore>, config: AppendConfig) -> Self {
        Self { store, config }
    }

    /// Append one event to the tail of `order_id`'s chain.
    ///
    /// # Errors
    ///
    /// - `InvalidEvent` if the event type is malformed (no store access)
    /// - `NotFound` for an unknown order
    /// - `ConcurrencyConflict` once `max_attempts` lock waits have timed out
    ///   or lost the unique-constraint race
    /// - `StorageFailure` if the store is unreachable; nothing was written
    pub fn append(&self, order_id: &OrderId, new_event: NewEvent) -> LedgerResult<Event> {
        new_event.validate()?;

        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.try_append(order_id, &new_event) {
                Err(LedgerError::ConcurrencyConflict { .. }) if attempt < max_attempts => {
                    warn!(
                        order_id = %order_id,
                        event_type = %new_event.event_type,
                        attempt,
                        "append lost a race on the order lock, retrying"
                    );
                    std::thread::sleep(self.config.backoff(attempt));
                }
                Err(LedgerError::ConcurrencyConflict { .. }) => {
                    warn!(
                        order_id = %order_id,
                        event_type = %new_event.event_type,
                        attempts = attempt,
                        "append retries exhausted"
                    );
                    return Err(LedgerError::ConcurrencyConflict {
                        order_id: order_id.to_string(),
                        attempts: attempt,
                    });
                }
                other => return other,
            }
        }
    }

    /// Convenience wrapper for `append` with a bare type and payload.
    pub fn record(
        &self,
        order_id: &OrderId,
        event_type: &str,
        event_data: impl Into<EventValue>,
    ) -> LedgerResult<Event> {
        self.append(order_id, NewEvent::new(event_type, event_data))
    }

    fn try_append(&self, order_id: &OrderId, new_event: &NewEvent) -> LedgerResult<Event> {
        let txn = self.store.begin_append(order_id, self.config.lock_timeout())?;

        let (sequence_number, prev_hash) = match txn.last_event() {
            Some(last) => (last.sequence_number + 1, last.hash.clone()),
            None => (1, Event::GENESIS_HASH.to_string()),
        };

        let hash = hash_event(&EventFields {
            order_id,
            sequence_number,
            event_type: &new_event.event_type,
            event_data: &new_event.event_data,
            ip_address: new_event.ip_address.as_deref(),
            user_agent: new_event.user_agent.as_deref(),
            external_ref: new_event.external_ref.as_deref(),
            prev_hash: &prev_hash,
        });

        debug!(
            order_id = %order_id,
            sequence_number,
            event_type = %new_event.event_type,
            "committing chain event"
        );

        let event = txn.commit(Event {
            order_id: order_id.clone(),
            sequence_number,
            event_type: new_event.event_type.clone(),
            event_data: new_event.event_data.clone(),
            ip_address: new_event.ip_address.clone(),
            user_agent: new_event.user_agent.clone(),
            external_ref: new_event.external_ref.clone(),
            prev_hash,
            hash,
            created_at: Utc::now(),
        })?;

        info!(
            order_id = %order_id,
            sequence_number = event.sequence_number,
            event_type = %event.event_type,
            hash = %event.hash,
            "chain event appended"
        );

        Ok(event)
    }
}
