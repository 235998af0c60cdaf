//! Component wiring shared by every scenario.

use std::sync::Arc;

use forensic_core::{ChainConfig, ChainLedger, ChainResealer, ChainVerifier};
use forensic_freeze::EvidenceFreezeOrchestrator;
use forensic_store::{InMemoryAdminAuditTrail, InMemoryEvidenceRenderer, InMemoryStore};

pub struct Runtime {
    pub store: Arc<InMemoryStore>,
    pub audit: Arc<InMemoryAdminAuditTrail>,
    pub renderer: Arc<InMemoryEvidenceRenderer>,
    pub ledger: ChainLedger,
    pub verifier: ChainVerifier,
    pub resealer: ChainResealer,
    pub orchestrator: EvidenceFreezeOrchestrator,
}

impl Runtime {
    pub fn new(config: &ChainConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let audit = Arc::new(InMemoryAdminAuditTrail::new());
        let renderer = Arc::new(InMemoryEvidenceRenderer::new());

        let ledger = ChainLedger::new(store.clone(), config.append.clone());
        let verifier = ChainVerifier::new(store.clone());
        // Only the resealer ever sees the privileged handle.
        let resealer = ChainResealer::new(
            Arc::new(store.privileged()),
            audit.clone(),
            config.reseal.clone(),
        );
        let orchestrator = EvidenceFreezeOrchestrator::new(
            ledger.clone(),
            verifier.clone(),
            store.clone(),
            renderer.clone(),
        );

        Self {
            store,
            audit,
            renderer,
            ledger,
            verifier,
            resealer,
            orchestrator,
        }
    }
}
