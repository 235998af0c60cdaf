//! The order entity as seen by the chain subsystem.
//!
//! Orders are owned by the surrounding commerce system. The chain only uses
//! the id as a key; the freeze workflow is the one place that mutates
//! `status`, `evidence_frozen_at`, `frozen_evidence_pdf_key` and
//! `downloads_revoked`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::OrderId;

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Fulfilled,
    Refunded,
    /// Set when evidence is frozen for a payment dispute.
    Disputed,
}

/// Snapshot of the order fields the freeze workflow reads and writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub evidence_frozen_at: Option<DateTime<Utc>>,
    pub frozen_evidence_pdf_key: Option<String>,
    pub downloads_revoked: bool,
}

impl OrderRecord {
    pub fn new(order_id: OrderId, status: OrderStatus) -> Self {
        Self {
            order_id,
            status,
            evidence_frozen_at: None,
            frozen_evidence_pdf_key: None,
            downloads_revoked: false,
        }
    }

    /// Frozen orders never thaw.
    pub fn is_frozen(&self) -> bool {
        self.evidence_frozen_at.is_some()
    }
}
