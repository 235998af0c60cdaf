//! Trait seams between the chain logic and its collaborators.
//!
//! Ordinary call sites only ever see `ChainStore`, which can read a chain
//! and insert one new row at its tail. Rewriting history goes through
//! `ResealStore`, a separate trait that storage backends implement on a
//! separate, privileged handle, so business code has no path to it.
//!
//! - `ChainStore`: insert-only persistence for chains (trusted sink)
//! - `ResealStore`: privileged rewrite of `prev_hash`/`hash`
//! - `OrderDirectory`: the external order entity
//! - `AdminAuditTrail`: higher-privilege record of administrative actions
//! - `EvidenceRenderer`: external evidence document generator

use std::time::Duration;

use chrono::{DateTime, Utc};

use forensic_contracts::{
    error::LedgerResult,
    event::{Event, OrderId},
    evidence::{EvidenceArtifact, EvidencePackage},
    order::OrderRecord,
    report::AdminAuditEntry,
};

/// Insert-only persistence for order chains.
///
/// Implementations must provide, per order:
///
/// - a unique `(order_id, sequence_number)` constraint
/// - an exclusive write lock shared by `begin_append` and
///   `ResealStore::begin_reseal`, never blocking other orders
/// - reads that do not wait for writers
pub trait ChainStore: Send + Sync {
    /// Load every committed event for `order_id`, ascending by sequence.
    ///
    /// Returns `LedgerError::NotFound` for an unknown order.
    fn load_chain(&self, order_id: &OrderId) -> LedgerResult<Vec<Event>>;

    /// Open an append transaction holding the order's write lock.
    ///
    /// Waits up to `lock_timeout` for the lock, then fails with
    /// `LedgerError::ConcurrencyConflict`.
    fn begin_append<'a>(
        &'a self,
        order_id: &OrderId,
        lock_timeout: Duration,
    ) -> LedgerResult<Box<dyn AppendTxn + 'a>>;
}

/// One open append. Dropping it without `commit` rolls it back.
pub trait AppendTxn {
    /// The current tail of the chain, read under the lock.
    fn last_event(&self) -> Option<&Event>;

    /// Persist `event` as the new tail and release the lock.
    ///
    /// Fails with `ConcurrencyConflict` if the unique constraint rejects the
    /// sequence number, or `StorageFailure` if the store cannot commit. In
    /// both cases nothing is written.
    fn commit(self: Box<Self>, event: Event) -> LedgerResult<Event>;
}

/// Privileged rewrite access to stored chains.
pub trait ResealStore: Send + Sync {
    /// Open a reseal transaction holding the order's exclusive write lock.
    ///
    /// Appends for the same order wait until the transaction ends.
    fn begin_reseal<'a>(
        &'a self,
        order_id: &OrderId,
        lock_timeout: Duration,
    ) -> LedgerResult<Box<dyn ResealTxn + 'a>>;
}

/// One open reseal. Dropping it without `commit` rolls it back.
pub trait ResealTxn {
    /// The chain as stored when the transaction opened, ascending.
    fn events(&self) -> &[Event];

    /// Stage new link values for one row.
    fn rewrite_link(&mut self, sequence_number: u64, prev_hash: String, hash: String)
        -> LedgerResult<()>;

    /// Apply every staged rewrite atomically and release the lock.
    ///
    /// Returns the number of rows whose values actually changed.
    fn commit(self: Box<Self>) -> LedgerResult<u64>;
}

/// The external order entity.
pub trait OrderDirectory: Send + Sync {
    fn get_order(&self, order_id: &OrderId) -> LedgerResult<OrderRecord>;

    /// Mark the order frozen at `at`, set it disputed and revoke downloads,
    /// as one atomic, one-way transition.
    ///
    /// Fails with `LedgerError::FreezeConflict` if it is already frozen.
    fn freeze_order(&self, order_id: &OrderId, at: DateTime<Utc>) -> LedgerResult<OrderRecord>;

    /// Remember where the frozen evidence document was stored.
    fn record_evidence_artifact(&self, order_id: &OrderId, key: &str) -> LedgerResult<OrderRecord>;
}

/// Append-only trail of privileged administrative actions.
pub trait AdminAuditTrail: Send + Sync {
    fn record(&self, entry: AdminAuditEntry) -> LedgerResult<()>;
}

/// External evidence document generator and storage.
pub trait EvidenceRenderer: Send + Sync {
    fn render(&self, package: &EvidencePackage) -> LedgerResult<EvidenceArtifact>;
}
