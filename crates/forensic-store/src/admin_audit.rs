//! In-memory `AdminAuditTrail`.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::info;

use forensic_contracts::{
    error::{LedgerError, LedgerResult},
    report::AdminAuditEntry,
};
use forensic_core::traits::AdminAuditTrail;

/// Keeps administrative audit entries in append order.
pub struct InMemoryAdminAuditTrail {
    entries: Mutex<Vec<AdminAuditEntry>>,
    available: AtomicBool,
}

impl Default for InMemoryAdminAuditTrail {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAdminAuditTrail {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Every entry recorded so far, oldest first.
    pub fn entries(&self) -> Vec<AdminAuditEntry> {
        self.entries.lock().clone()
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

impl AdminAuditTrail for InMemoryAdminAuditTrail {
    fn record(&self, entry: AdminAuditEntry) -> LedgerResult<()> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(LedgerError::AuditWriteFailed {
                reason: "admin audit trail unreachable".to_string(),
            });
        }

        info!(
            entry_id = %entry.id,
            actor = %entry.actor.id,
            role = %entry.actor.role,
            order_id = %entry.order_id,
            action = %entry.action,
            before_valid = entry.before.valid,
            after_valid = entry.after.valid,
            "admin action recorded"
        );

        self.entries.lock().push(entry);
        Ok(())
    }
}
