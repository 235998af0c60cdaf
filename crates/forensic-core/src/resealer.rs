//! The Chain Resealer: privileged recomputation of stored links.
//!
//! Reseal is the only sanctioned mutation of historical rows and it touches
//! only `prev_hash` and `hash`. It exists to repair chains that were hashed
//! before the current canonical encoding. It runs under the order's
//! exclusive write lock, commits all rewrites at once, and records every
//! successful call in the admin audit trail.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use forensic_contracts::{
    error::{LedgerError, LedgerResult},
    event::OrderId,
    report::{AdminActor, AdminAuditEntry, ResealReport},
};

use crate::{
    chain::{is_gapless, relink, verify_events},
    config::ResealConfig,
    traits::{AdminAuditTrail, ResealStore},
};

/// Action tag written to the admin audit trail.
pub const RESEAL_ACTION: &str = "chain.reseal";

/// Rewrites chain links with the current encoder.
///
/// Only constructible from a `ResealStore`, which ordinary business code
/// never holds. Whether `actor` may reseal at all is decided by the caller.
pub struct ChainResealer {
    store: Arc<dyn ResealStore>,
    audit: Arc<dyn AdminAuditTrail>,
    config: ResealConfig,
}

impl ChainResealer {
    pub fn new(
        store: Arc<dyn ResealStore>,
        audit: Arc<dyn AdminAuditTrail>,
        config: ResealConfig,
    ) -> Self {
        Self {
            store,
            audit,
            config,
        }
    }

    /// Reseal `order_id`'s chain on behalf of `actor`.
    ///
    /// Idempotent: a second run finds nothing to change and reports
    /// `resealed == 0`. After success the chain verifies.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown order
    /// - `ConcurrencyConflict` if the exclusive lock is not granted within
    ///   `max_attempts` waits
    /// - `ResealRefused` if stored sequence numbers are not `1..=N`; nothing
    ///   is written
    /// - `StorageFailure` if the rewrite cannot commit; nothing is written
    /// - `AuditWriteFailed` if the admin audit trail rejects the entry. The
    ///   rewrite has already committed at that point and stays in place: the
    ///   chain is resealed and verifies, only the audit record is missing.
    ///   Running the reseal again is a no-op that retries the audit write.
    pub fn reseal(&self, actor: &AdminActor, order_id: &OrderId) -> LedgerResult<ResealReport> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        let mut txn = loop {
            attempt += 1;
            match self.store.begin_reseal(order_id, self.config.lock_timeout()) {
                Ok(txn) => break txn,
                Err(LedgerError::ConcurrencyConflict { .. }) if attempt < max_attempts => {
                    warn!(
                        order_id = %order_id,
                        actor = %actor.id,
                        attempt,
                        "reseal lock wait timed out, retrying"
                    );
                    std::thread::sleep(self.config.backoff(attempt));
                }
                Err(LedgerError::ConcurrencyConflict { .. }) => {
                    warn!(
                        order_id = %order_id,
                        actor = %actor.id,
                        attempts = attempt,
                        "reseal retries exhausted"
                    );
                    return Err(LedgerError::ConcurrencyConflict {
                        order_id: order_id.to_string(),
                        attempts: attempt,
                    });
                }
                Err(other) => return Err(other),
            }
        };

        let mut rows = txn.events().to_vec();

        if !is_gapless(&rows) {
            warn!(
                order_id = %order_id,
                actor = %actor.id,
                "reseal refused: sequence numbers are not gapless"
            );
            return Err(LedgerError::ResealRefused {
                order_id: order_id.to_string(),
                reason: "stored sequence numbers are not a gapless run from 1".to_string(),
            });
        }

        let before = verify_events(&rows);
        let links = relink(&rows);

        for (row, link) in rows.iter_mut().zip(links) {
            if row.prev_hash == link.prev_hash && row.hash == link.hash {
                continue;
            }
            txn.rewrite_link(link.sequence_number, link.prev_hash.clone(), link.hash.clone())?;
            row.prev_hash = link.prev_hash;
            row.hash = link.hash;
        }

        let after = verify_events(&rows);
        if !after.valid {
            // Unreachable for a gapless chain; refuse rather than commit.
            return Err(LedgerError::ResealRefused {
                order_id: order_id.to_string(),
                reason: format!(
                    "relinked chain still fails at sequence {:?}",
                    after.first_invalid_sequence
                ),
            });
        }

        let resealed = txn.commit()?;
        let report = ResealReport {
            resealed,
            total_events: rows.len() as u64,
        };

        // Committed. An audit failure below does not undo the rewrite.
        self.audit.record(AdminAuditEntry {
            id: Uuid::new_v4(),
            actor: actor.clone(),
            order_id: order_id.clone(),
            action: RESEAL_ACTION.to_string(),
            before,
            after,
            resealed: report.resealed,
            total_events: report.total_events,
            recorded_at: Utc::now(),
        })?;

        info!(
            order_id = %order_id,
            actor = %actor.id,
            resealed = report.resealed,
            total_events = report.total_events,
            was_valid = before.valid,
            "chain resealed"
        );

        Ok(report)
    }
}
