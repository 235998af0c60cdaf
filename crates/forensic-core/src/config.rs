//! Chain configuration loaded from TOML.
//!
//! Every field has a default, so an empty document is a valid config.
//!
//! ```toml
//! [append]
//! max_attempts = 5
//! lock_timeout_ms = 2000
//! retry_backoff_ms = 5
//!
//! [reseal]
//! max_attempts = 3
//! lock_timeout_ms = 30000
//! retry_backoff_ms = 50
//! ```

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use forensic_contracts::error::{LedgerError, LedgerResult};

/// Tuning for `ChainLedger::append`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppendConfig {
    /// Attempts before a lock conflict surfaces as `ConcurrencyConflict`.
    pub max_attempts: u32,

    /// How long one attempt waits for the order's write lock.
    pub lock_timeout_ms: u64,

    /// Backoff between attempts, multiplied by the attempt number.
    pub retry_backoff_ms: u64,
}

impl Default for AppendConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lock_timeout_ms: 2_000,
            retry_backoff_ms: 5,
        }
    }
}

impl AppendConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(u64::from(attempt)))
    }
}

/// Tuning for `ChainResealer::reseal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResealConfig {
    /// Exclusive-lock waits before a reseal gives up with `ConcurrencyConflict`.
    pub max_attempts: u32,

    pub lock_timeout_ms: u64,

    pub retry_backoff_ms: u64,
}

impl Default for ResealConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            lock_timeout_ms: 30_000,
            retry_backoff_ms: 50,
        }
    }
}

impl ResealConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(u64::from(attempt)))
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChainConfig {
    pub append: AppendConfig,
    pub reseal: ResealConfig,
}

impl ChainConfig {
    /// Parse `s` as TOML and validate it.
    ///
    /// Returns `LedgerError::ConfigError` if the TOML is malformed, has
    /// unknown keys, or carries out-of-range values.
    pub fn from_toml_str(s: &str) -> LedgerResult<Self> {
        let config: ChainConfig = toml::from_str(s).map_err(|e| LedgerError::ConfigError {
            reason: format!("failed to parse chain config TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file at `path` and parse it as chain configuration.
    pub fn from_file(path: &Path) -> LedgerResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| LedgerError::ConfigError {
            reason: format!("failed to read chain config '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.append.max_attempts == 0 {
            return Err(LedgerError::ConfigError {
                reason: "append.max_attempts must be at least 1".to_string(),
            });
        }
        if self.append.lock_timeout_ms == 0 {
            return Err(LedgerError::ConfigError {
                reason: "append.lock_timeout_ms must be positive".to_string(),
            });
        }
        if self.reseal.max_attempts == 0 {
            return Err(LedgerError::ConfigError {
                reason: "reseal.max_attempts must be at least 1".to_string(),
            });
        }
        if self.reseal.lock_timeout_ms == 0 {
            return Err(LedgerError::ConfigError {
                reason: "reseal.lock_timeout_ms must be positive".to_string(),
            });
        }
        Ok(())
    }
}
