//! # forensic-freeze
//!
//! Evidence freeze for disputed orders.
//!
//! `EvidenceFreezeOrchestrator` composes the ledger, the verifier, the order
//! directory and an evidence renderer into the one-way freeze workflow, plus
//! the resume path for freezes whose evidence step failed.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let orchestrator = EvidenceFreezeOrchestrator::new(ledger, verifier, store.clone(), renderer);
//! let outcome = orchestrator.freeze(
//!     &order_id,
//!     FreezeRequest::new(AdminActor::new("ops-lead", "superadmin"), "chargeback received"),
//! )?;
//! assert!(outcome.post_freeze.valid);
//! ```

pub mod orchestrator;

pub use orchestrator::{EvidenceFreezeOrchestrator, EvidenceOutcome, FreezeOutcome, FreezeRequest};

// ── Tests ─────────────────────────────────────────────────────────────────────
