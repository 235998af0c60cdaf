//! In-memory evidence renderer and object store.
//!
//! Stands in for the external document generator: it serializes the
//! `EvidencePackage` as JSON, stores the bytes under a content-derived key,
//! and reports their SHA-256 digest and size.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::info;

use forensic_contracts::{
    error::{LedgerError, LedgerResult},
    evidence::{EvidenceArtifact, EvidencePackage},
};
use forensic_core::traits::EvidenceRenderer;

/// Renders evidence packages to JSON documents held in memory.
pub struct InMemoryEvidenceRenderer {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    failing: AtomicBool,
}

impl Default for InMemoryEvidenceRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEvidenceRenderer {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Fetch a stored document by key.
    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().get(key).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().len()
    }

    /// Make subsequent renders fail, to exercise recovery paths.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl EvidenceRenderer for InMemoryEvidenceRenderer {
    fn render(&self, package: &EvidencePackage) -> LedgerResult<EvidenceArtifact> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LedgerError::EvidenceGenerationFailed {
                reason: "renderer unavailable".to_string(),
            });
        }

        let bytes = serde_json::to_vec_pretty(package).map_err(|e| {
            LedgerError::EvidenceGenerationFailed {
                reason: format!("failed to serialize evidence package: {}", e),
            }
        })?;

        let sha256 = hex::encode(Sha256::digest(&bytes));
        let key = format!("evidence/{}/{}.json", package.order_id, &sha256[..16]);
        let artifact = EvidenceArtifact {
            key: key.clone(),
            sha256,
            size_bytes: bytes.len() as u64,
        };

        self.objects.lock().insert(key, bytes);

        info!(
            order_id = %package.order_id,
            key = %artifact.key,
            size_bytes = artifact.size_bytes,
            "evidence document stored"
        );
        Ok(artifact)
    }
}
