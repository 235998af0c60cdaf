//! # forensic-core
//!
//! Append, verify and reseal for the per-order forensic event chain.
//!
//! This crate provides:
//! - the Canonical Encoder (`canonical`) and hash-chain primitives (`chain`)
//! - the trait seams to storage and external collaborators (`traits`)
//! - `ChainLedger`, `ChainVerifier` and the privileged `ChainResealer`
//! - `ChainConfig`, loaded from TOML
//!
//! ## Usage
//!
//! ```rust,ignore
//! use forensic_core::{ChainConfig, ChainLedger, ChainVerifier};
//!
//! let ledger = ChainLedger::new(store.clone(), config.append.clone());
//! ledger.append(&order_id, NewEvent::new("order.created", payload))?;
//! assert!(ChainVerifier::new(store).verify(&order_id)?.valid);
//! ```

pub mod canonical;
pub mod chain;
pub mod config;
pub mod ledger;
pub mod resealer;
pub mod traits;
pub mod verifier;

pub use config::{AppendConfig, ChainConfig, ResealConfig};
pub use ledger::ChainLedger;
pub use resealer::ChainResealer;
pub use verifier::ChainVerifier;

// ── Tests ─────────────────────────────────────────────────────────────────────
