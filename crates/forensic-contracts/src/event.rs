//! Chain event types.
//!
//! `Event` is one stored row of an order's chain. `NewEvent` is what call
//! sites hand to the ledger; the ledger assigns the sequence number, links
//! and hashes it. `EventFields` is the borrowed view of exactly the fields the
//! hash commits to.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{LedgerError, LedgerResult},
    value::EventValue,
};

/// Identifier of the order that owns a chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Well-known event type tags recorded by the surrounding commerce system.
pub mod event_types {
    pub const ORDER_CREATED: &str = "order.created";
    pub const TERMS_ACCEPTED: &str = "terms.accepted";
    pub const PAYMENT_CAPTURED: &str = "payment.captured";
    pub const LICENSE_ISSUED: &str = "license.issued";
    pub const DOWNLOAD_TOKEN_ISSUED: &str = "download.token_issued";
    pub const DOWNLOAD_COMPLETED: &str = "download.completed";
    pub const ADMIN_DOWNLOADS_REVOKED: &str = "admin.downloads_revoked";
    pub const ADMIN_DISPUTE_MODE_ACTIVATED: &str = "admin.dispute_mode_activated";
    pub const ADMIN_EVIDENCE_PDF_GENERATED: &str = "admin.evidence_pdf_generated";
    pub const DISPUTE_OPENED: &str = "dispute.opened";
}

/// Maximum byte length of an event type tag.
pub const MAX_EVENT_TYPE_LEN: usize = 128;

/// One persisted fact in an order's chain.
///
/// Rows are written once by the ledger. Only the privileged resealer may
/// later rewrite `prev_hash` and `hash`; every other field is fixed forever.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub order_id: OrderId,

    /// Position in the chain, starting at 1, gapless.
    pub sequence_number: u64,

    pub event_type: String,

    pub event_data: EventValue,

    pub ip_address: Option<String>,

    pub user_agent: Option<String>,

    /// Correlation id in an external system, e.g. a payment transaction.
    pub external_ref: Option<String>,

    /// Hash of the preceding event, or `Event::GENESIS_HASH` for event 1.
    pub prev_hash: String,

    /// SHA-256 (hex) of the canonical encoding of every field above.
    pub hash: String,

    /// Persistence timestamp. Not covered by the hash.
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// The `prev_hash` of the first event in every chain: 64 hex zeros.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";

    /// Borrow the hashed field set of this event.
    pub fn fields(&self) -> EventFields<'_> {
        EventFields {
            order_id: &self.order_id,
            sequence_number: self.sequence_number,
            event_type: &self.event_type,
            event_data: &self.event_data,
            ip_address: self.ip_address.as_deref(),
            user_agent: self.user_agent.as_deref(),
            external_ref: self.external_ref.as_deref(),
            prev_hash: &self.prev_hash,
        }
    }
}

/// Exactly the fields an event hash commits to.
#[derive(Debug, Clone, Copy)]
pub struct EventFields<'a> {
    pub order_id: &'a OrderId,
    pub sequence_number: u64,
    pub event_type: &'a str,
    pub event_data: &'a EventValue,
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
    pub external_ref: Option<&'a str>,
    pub prev_hash: &'a str,
}

/// A fact submitted for append, before the ledger links it into a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub event_type: String,
    pub event_data: EventValue,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub external_ref: Option<String>,
}

impl NewEvent {
    pub fn new(event_type: impl Into<String>, event_data: impl Into<EventValue>) -> Self {
        Self {
            event_type: event_type.into(),
            event_data: event_data.into(),
            ip_address: None,
            user_agent: None,
            external_ref: None,
        }
    }

    pub fn with_ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    pub fn with_external_ref(mut self, external_ref: impl Into<String>) -> Self {
        self.external_ref = Some(external_ref.into());
        self
    }

    /// Check the event type tag.
    ///
    /// A tag is two or more dot-separated segments of `[a-z0-9_]`, at most
    /// `MAX_EVENT_TYPE_LEN` bytes, e.g. `order.created`.
    pub fn validate(&self) -> LedgerResult<()> {
        let tag = self.event_type.as_str();
        if tag.is_empty() {
            return Err(LedgerError::InvalidEvent {
                reason: "event type must not be empty".to_string(),
            });
        }
        if tag.len() > MAX_EVENT_TYPE_LEN {
            return Err(LedgerError::InvalidEvent {
                reason: format!(
                    "event type is {} bytes, limit is {}",
                    tag.len(),
                    MAX_EVENT_TYPE_LEN
                ),
            });
        }

        let segments: Vec<&str> = tag.split('.').collect();
        let well_formed = segments.len() >= 2
            && segments.iter().all(|seg| {
                !seg.is_empty()
                    && seg
                        .bytes()
                        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
            });
        if !well_formed {
            return Err(LedgerError::InvalidEvent {
                reason: format!(
                    "event type '{}' must be namespaced like 'order.created'",
                    tag
                ),
            });
        }
        Ok(())
    }
}
