//! Error types for the forensic event chain.
//!
//! All fallible chain operations return `LedgerResult<T>`. A corrupted chain
//! is deliberately absent from this enum: it is a normal `VerifyReport` with
//! `valid = false`, and callers decide what to do with it.

use thiserror::Error;

/// The unified error type for chain operations and their collaborators.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The operation targets an order the store does not know about.
    ///
    /// No state is touched.
    #[error("order '{order_id}' not found")]
    NotFound { order_id: String },

    /// Concurrent writers on the same order kept winning the per-order lock.
    ///
    /// The ledger retries internally; this only surfaces once the retry
    /// budget is exhausted.
    #[error("concurrent writes on order '{order_id}' did not settle after {attempts} attempt(s)")]
    ConcurrencyConflict { order_id: String, attempts: u32 },

    /// The durable store is unreachable or refused to commit.
    ///
    /// Fatal. The transaction is guaranteed to have left no partial write.
    #[error("storage failure: {reason}")]
    StorageFailure { reason: String },

    /// The order is not in a state that permits the requested freeze step.
    #[error("freeze conflict on order '{order_id}': {reason}")]
    FreezeConflict { order_id: String, reason: String },

    /// A reseal was requested for a chain whose shape cannot be repaired by
    /// rewriting `hash`/`prev_hash` alone.
    #[error("reseal refused for order '{order_id}': {reason}")]
    ResealRefused { order_id: String, reason: String },

    /// The event submitted for append is malformed.
    #[error("invalid event: {reason}")]
    InvalidEvent { reason: String },

    /// The external evidence generator failed to produce an artifact.
    #[error("evidence generation failed: {reason}")]
    EvidenceGenerationFailed { reason: String },

    /// The administrative audit trail could not persist an entry.
    #[error("admin audit write failed: {reason}")]
    AuditWriteFailed { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },
}

impl LedgerError {
    /// HTTP-style status code the transport boundary should surface.
    pub fn status_code(&self) -> u16 {
        match self {
            LedgerError::NotFound { .. } => 404,
            LedgerError::ConcurrencyConflict { .. } => 503,
            LedgerError::StorageFailure { .. } => 500,
            LedgerError::FreezeConflict { .. } => 409,
            LedgerError::ResealRefused { .. } => 409,
            LedgerError::InvalidEvent { .. } => 422,
            LedgerError::EvidenceGenerationFailed { .. } => 502,
            LedgerError::AuditWriteFailed { .. } => 500,
            LedgerError::ConfigError { .. } => 500,
        }
    }

    /// True when retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::ConcurrencyConflict { .. })
    }
}

/// Convenience alias used throughout the forensic crates.
pub type LedgerResult<T> = Result<T, LedgerError>;
