//! The privileged rewrite handle for `InMemoryStore`.
//!
//! `PrivilegedChainAccess` is the only type in this crate that implements
//! `ResealStore`. It is obtained through `InMemoryStore::privileged` and
//! is meant to be wired into the resealer and nothing else.

use std::{sync::Arc, time::Duration};

use tracing::{debug, warn};

use forensic_contracts::{
    error::{LedgerError, LedgerResult},
    event::{Event, OrderId},
};
use forensic_core::traits::{ResealStore, ResealTxn};

use crate::memory::{conflict, InMemoryStore, SlotLease};

/// Rewrite-capable access to an `InMemoryStore`.
#[derive(Clone)]
pub struct PrivilegedChainAccess {
    store: Arc<InMemoryStore>,
}

impl PrivilegedChainAccess {
    pub(crate) fn new(store: Arc<InMemoryStore>) -> Self {
        Self { store }
    }
}

struct MemoryReseal<'a> {
    store: &'a InMemoryStore,
    order_id: OrderId,
    lease: SlotLease,
    original: Vec<Event>,
    staged: Vec<Event>,
}

impl ResealTxn for MemoryReseal<'_> {
    fn events(&self) -> &[Event] {
        &self.original
    }

    fn rewrite_link(&mut self, sequence_number: u64, prev_hash: String, hash: String) -> LedgerResult<()> {
        let row = self
            .staged
            .iter_mut()
            .find(|e| e.sequence_number == sequence_number)
            .ok_or_else(|| LedgerError::StorageFailure {
                reason: format!(
                    "order '{}' has no row with sequence number {}",
                    self.order_id, sequence_number
                ),
            })?;
        row.prev_hash = prev_hash;
        row.hash = hash;
        Ok(())
    }

    fn commit(self: Box<Self>) -> LedgerResult<u64> {
        self.store.check_available()?;

        let changed = self
            .original
            .iter()
            .zip(&self.staged)
            .filter(|(before, after)| before.prev_hash != after.prev_hash || before.hash != after.hash)
            .count() as u64;

        let MemoryReseal {
            order_id,
            lease,
            staged,
            ..
        } = *self;

        // Single swap under the row lock: readers see all or nothing.
        *lease.slot.rows.write() = staged;

        debug!(order_id = %order_id, changed, "reseal committed");
        Ok(changed)
    }
}

impl ResealStore for PrivilegedChainAccess {
    fn begin_reseal<'a>(
        &'a self,
        order_id: &OrderId,
        lock_timeout: Duration,
    ) -> LedgerResult<Box<dyn ResealTxn + 'a>> {
        self.store.check_available()?;
        let slot = self.store.slot(order_id)?;

        let lease = match slot.acquire(lock_timeout) {
            Some(lease) => lease,
            None => {
                warn!(
                    order_id = %order_id,
                    timeout_ms = lock_timeout.as_millis() as u64,
                    "timed out waiting for exclusive reseal lock"
                );
                return Err(conflict(order_id));
            }
        };

        let original = lease.slot.rows.read().clone();
        Ok(Box::new(MemoryReseal {
            store: &self.store,
            order_id: order_id.clone(),
            lease,
            staged: original.clone(),
            original,
        }))
    }
}
