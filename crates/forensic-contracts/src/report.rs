//! Result types for verify, reseal, export and the admin audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::{Event, OrderId};

/// Outcome of walking a stored chain.
///
/// `valid = false` is a normal result, not an error. `total_events` always
/// counts the whole chain, even past the first failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    pub valid: bool,
    pub total_events: u64,
    /// 1-based position of the first event that failed any check.
    pub first_invalid_sequence: Option<u64>,
}

impl VerifyReport {
    /// The report for a chain with no events.
    pub fn empty() -> Self {
        Self {
            valid: true,
            total_events: 0,
            first_invalid_sequence: None,
        }
    }
}

/// Outcome of a reseal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResealReport {
    /// Rows whose `prev_hash` or `hash` actually changed.
    pub resealed: u64,
    pub total_events: u64,
}

/// A verified, point-in-time copy of an order's chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainExport {
    pub order_id: OrderId,
    pub events: Vec<Event>,
    pub verification: VerifyReport,
    /// Hash of the last event, or the genesis value for an empty chain.
    pub terminal_hash: String,
    pub exported_at: DateTime<Utc>,
}

/// The privileged operator behind an administrative action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminActor {
    pub id: String,
    pub role: String,
}

impl AdminActor {
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
        }
    }
}

/// One entry in the administrative audit trail.
///
/// This trail is separate from, and more privileged than, any order's chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAuditEntry {
    pub id: Uuid,
    pub actor: AdminActor,
    pub order_id: OrderId,
    /// Action tag, e.g. `chain.reseal`.
    pub action: String,
    pub before: VerifyReport,
    pub after: VerifyReport,
    pub resealed: u64,
    pub total_events: u64,
    pub recorded_at: DateTime<Utc>,
}
