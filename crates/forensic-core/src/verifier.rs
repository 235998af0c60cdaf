//! The Chain Verifier: read-only, diagnostic walk of a stored chain.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use forensic_contracts::{
    error::LedgerResult,
    event::{Event, OrderId},
    report::{ChainExport, VerifyReport},
};

use crate::{chain::verify_events, traits::ChainStore};

/// Recomputes stored chains and reports the first broken link.
///
/// Never mutates anything and takes no write lock, so it may run alongside
/// appends and reseals. A verify that overlaps a reseal can observe the
/// chain from before the reseal committed; callers that see `valid = false`
/// right after a successful reseal should simply verify again.
#[derive(Clone)]
pub struct ChainVerifier {
    store: Arc<dyn ChainStore>,
}

impl ChainVerifier {
    pub fn new(store: Arc<dyn ChainStore>) -> Self {
        Self { store }
    }

    /// Verify `order_id`'s chain end to end.
    ///
    /// Returns `LedgerError::NotFound` for an unknown order. A broken chain
    /// is an `Ok` report with `valid = false`.
    pub fn verify(&self, order_id: &OrderId) -> LedgerResult<VerifyReport> {
        let events = self.load_ordered(order_id)?;
        Ok(self.report(order_id, &events))
    }

    /// Verify and snapshot the chain in one read.
    pub fn export(&self, order_id: &OrderId) -> LedgerResult<ChainExport> {
        let events = self.load_ordered(order_id)?;
        let verification = self.report(order_id, &events);
        let terminal_hash = events
            .last()
            .map(|e| e.hash.clone())
            .unwrap_or_else(|| Event::GENESIS_HASH.to_string());

        Ok(ChainExport {
            order_id: order_id.clone(),
            events,
            verification,
            terminal_hash,
            exported_at: Utc::now(),
        })
    }

    fn load_ordered(&self, order_id: &OrderId) -> LedgerResult<Vec<Event>> {
        let mut events = self.store.load_chain(order_id)?;
        events.sort_by_key(|e| e.sequence_number);
        Ok(events)
    }

    fn report(&self, order_id: &OrderId, events: &[Event]) -> VerifyReport {
        let report = verify_events(events);
        if report.valid {
            debug!(
                order_id = %order_id,
                total_events = report.total_events,
                "chain verified"
            );
        } else {
            warn!(
                order_id = %order_id,
                total_events = report.total_events,
                first_invalid_sequence = ?report.first_invalid_sequence,
                "chain verification failed"
            );
        }
        report
    }
}
