//! Evidence hand-off types.
//!
//! The chain subsystem does not lay out evidence documents. It hands an
//! `EvidencePackage` to an external renderer and records the returned
//! `EvidenceArtifact` in the chain.

use serde::{Deserialize, Serialize};

use crate::{
    event::{Event, OrderId},
    order::OrderRecord,
    report::VerifyReport,
};

/// Everything a renderer needs to produce dispute evidence for one order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidencePackage {
    pub order_id: OrderId,
    pub order: OrderRecord,
    pub events: Vec<Event>,
    pub verification: VerifyReport,
    pub terminal_hash: String,
}

/// A stored evidence document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceArtifact {
    /// Object storage key.
    pub key: String,
    /// SHA-256 (hex) of the document bytes.
    pub sha256: String,
    pub size_bytes: u64,
}
