//! In-memory implementation of `ChainStore` and `OrderDirectory`.
//!
//! `InMemoryStore` behaves like the relational store the chain is designed
//! for:
//!
//! - one slot per order, each with its own exclusive write lock, so writers
//!   on different orders never contend
//! - a bounded wait on that lock, after which the caller gets
//!   `ConcurrencyConflict` and may retry
//! - a unique `(order_id, sequence_number)` constraint checked at commit
//! - committed rows behind a `RwLock` that readers take without touching the
//!   write lock
//! - `set_available(false)` to simulate an unreachable database
//!
//! Rewrite access lives on a separate handle, see `privileged`.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex, RwLock};
use tracing::{debug, info, warn};

use forensic_contracts::{
    error::{LedgerError, LedgerResult},
    event::{Event, OrderId},
    order::{OrderRecord, OrderStatus},
};
use forensic_core::traits::{AppendTxn, ChainStore, OrderDirectory};

use crate::privileged::PrivilegedChainAccess;

// ── Per-order slot ────────────────────────────────────────────────────────────

/// Everything stored for one order.
pub(crate) struct OrderSlot {
    /// True while an append or reseal transaction holds the write lock.
    locked: Mutex<bool>,
    released: Condvar,

    /// Committed chain rows, ascending by sequence number.
    pub(crate) rows: RwLock<Vec<Event>>,

    record: Mutex<OrderRecord>,
}

impl OrderSlot {
    fn new(record: OrderRecord) -> Self {
        Self {
            locked: Mutex::new(false),
            released: Condvar::new(),
            rows: RwLock::new(Vec::new()),
            record: Mutex::new(record),
        }
    }

    /// Take the order's write lock, waiting at most `timeout`.
    pub(crate) fn acquire(self: &Arc<Self>, timeout: Duration) -> Option<SlotLease> {
        let deadline = Instant::now() + timeout;
        let mut held = self.locked.lock();
        while *held {
            if self.released.wait_until(&mut held, deadline).timed_out() && *held {
                return None;
            }
        }
        *held = true;
        Some(SlotLease {
            slot: Arc::clone(self),
        })
    }
}

/// Holds an order's write lock until dropped.
pub(crate) struct SlotLease {
    pub(crate) slot: Arc<OrderSlot>,
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        *self.slot.locked.lock() = false;
        self.slot.released.notify_one();
    }
}

// ── Store ─────────────────────────────────────────────────────────────────────

/// An in-memory, transactional store for order chains and order records.
///
/// # Thread safety
///
/// All methods take `&self`; share the store as `Arc<InMemoryStore>`.
pub struct InMemoryStore {
    slots: RwLock<HashMap<OrderId, Arc<OrderSlot>>>,
    available: AtomicBool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Insert a new order with an empty chain.
    ///
    /// Fails like a primary-key violation if the order already exists.
    pub fn create_order(&self, order_id: &OrderId, status: OrderStatus) -> LedgerResult<OrderRecord> {
        self.check_available()?;
        let mut slots = self.slots.write();
        if slots.contains_key(order_id) {
            return Err(LedgerError::StorageFailure {
                reason: format!("duplicate key: order '{}' already exists", order_id),
            });
        }
        let record = OrderRecord::new(order_id.clone(), status);
        slots.insert(order_id.clone(), Arc::new(OrderSlot::new(record.clone())));
        debug!(order_id = %order_id, "order created");
        Ok(record)
    }

    /// Bulk-load historical rows into an empty chain, exactly as given.
    ///
    /// Used to migrate chains written by earlier systems. Links are not
    /// checked; only the unique `(order_id, sequence_number)` constraint is.
    pub fn import_rows(&self, order_id: &OrderId, mut rows: Vec<Event>) -> LedgerResult<usize> {
        self.check_available()?;
        let slot = self.slot(order_id)?;
        let _lease = slot
            .acquire(Duration::from_secs(5))
            .ok_or_else(|| conflict(order_id))?;

        rows.sort_by_key(|e| e.sequence_number);
        if rows.iter().any(|e| &e.order_id != order_id) {
            return Err(LedgerError::StorageFailure {
                reason: format!("import for '{}' contains rows of another order", order_id),
            });
        }
        if rows.windows(2).any(|w| w[0].sequence_number == w[1].sequence_number) {
            return Err(LedgerError::StorageFailure {
                reason: "unique constraint (order_id, sequence_number) violated".to_string(),
            });
        }

        let mut stored = slot.rows.write();
        if !stored.is_empty() {
            return Err(LedgerError::StorageFailure {
                reason: format!("order '{}' already has chain rows", order_id),
            });
        }
        let count = rows.len();
        *stored = rows;

        info!(order_id = %order_id, rows = count, "historical chain rows imported");
        Ok(count)
    }

    /// Simulate the database going away (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// The rewrite-capable handle used by the resealer.
    ///
    /// Wiring code hands this only to the privileged reseal component.
    pub fn privileged(self: &Arc<Self>) -> PrivilegedChainAccess {
        PrivilegedChainAccess::new(Arc::clone(self))
    }

    pub(crate) fn check_available(&self) -> LedgerResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LedgerError::StorageFailure {
                reason: "store unreachable".to_string(),
            })
        }
    }

    pub(crate) fn slot(&self, order_id: &OrderId) -> LedgerResult<Arc<OrderSlot>> {
        self.slots
            .read()
            .get(order_id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound {
                order_id: order_id.to_string(),
            })
    }
}

pub(crate) fn conflict(order_id: &OrderId) -> LedgerError {
    LedgerError::ConcurrencyConflict {
        order_id: order_id.to_string(),
        attempts: 1,
    }
}

// ── ChainStore impl ───────────────────────────────────────────────────────────

struct MemoryAppend<'a> {
    store: &'a InMemoryStore,
    order_id: OrderId,
    lease: SlotLease,
    last: Option<Event>,
}

impl AppendTxn for MemoryAppend<'_> {
    fn last_event(&self) -> Option<&Event> {
        self.last.as_ref()
    }

    fn commit(self: Box<Self>, event: Event) -> LedgerResult<Event> {
        self.store.check_available()?;

        let mut rows = self.lease.slot.rows.write();
        if event.order_id != self.order_id
            || rows.iter().any(|r| r.sequence_number == event.sequence_number)
        {
            warn!(
                order_id = %self.order_id,
                sequence_number = event.sequence_number,
                "unique constraint rejected chain row"
            );
            return Err(conflict(&self.order_id));
        }
        rows.push(event.clone());
        Ok(event)
    }
}

impl ChainStore for InMemoryStore {
    fn load_chain(&self, order_id: &OrderId) -> LedgerResult<Vec<Event>> {
        self.check_available()?;
        let slot = self.slot(order_id)?;
        let rows = slot.rows.read().clone();
        Ok(rows)
    }

    fn begin_append<'a>(
        &'a self,
        order_id: &OrderId,
        lock_timeout: Duration,
    ) -> LedgerResult<Box<dyn AppendTxn + 'a>> {
        self.check_available()?;
        let slot = self.slot(order_id)?;

        let lease = match slot.acquire(lock_timeout) {
            Some(lease) => lease,
            None => {
                warn!(
                    order_id = %order_id,
                    timeout_ms = lock_timeout.as_millis() as u64,
                    "timed out waiting for order write lock"
                );
                return Err(conflict(order_id));
            }
        };

        let last = lease.slot.rows.read().last().cloned();
        Ok(Box::new(MemoryAppend {
            store: self,
            order_id: order_id.clone(),
            lease,
            last,
        }))
    }
}

// ── OrderDirectory impl ───────────────────────────────────────────────────────

impl OrderDirectory for InMemoryStore {
    fn get_order(&self, order_id: &OrderId) -> LedgerResult<OrderRecord> {
        self.check_available()?;
        let record = self.slot(order_id)?.record.lock().clone();
        Ok(record)
    }

    fn freeze_order(&self, order_id: &OrderId, at: DateTime<Utc>) -> LedgerResult<OrderRecord> {
        self.check_available()?;
        let slot = self.slot(order_id)?;
        let mut record = slot.record.lock();

        if record.is_frozen() {
            return Err(LedgerError::FreezeConflict {
                order_id: order_id.to_string(),
                reason: "evidence is already frozen".to_string(),
            });
        }

        record.evidence_frozen_at = Some(at);
        record.status = OrderStatus::Disputed;
        record.downloads_revoked = true;

        info!(order_id = %order_id, frozen_at = %at, "order frozen, downloads revoked");
        Ok(record.clone())
    }

    fn record_evidence_artifact(&self, order_id: &OrderId, key: &str) -> LedgerResult<OrderRecord> {
        self.check_available()?;
        let slot = self.slot(order_id)?;
        let mut record = slot.record.lock();

        if !record.is_frozen() {
            return Err(LedgerError::FreezeConflict {
                order_id: order_id.to_string(),
                reason: "evidence artifacts can only be attached to frozen orders".to_string(),
            });
        }

        record.frozen_evidence_pdf_key = Some(key.to_string());
        Ok(record.clone())
    }
}
