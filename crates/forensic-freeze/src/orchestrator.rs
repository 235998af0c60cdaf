//! The Evidence Freeze Orchestrator.
//!
//! Freezing an order for a payment dispute runs these steps in order:
//!
//!   (a) refuse if already frozen
//!   (b) verify the chain          → `pre_freeze`
//!   (c) freeze the order and revoke downloads
//!   (d) append `admin.dispute_mode_activated` and `admin.downloads_revoked`
//!   (e) verify again              → `post_freeze`
//!   (f) render the evidence document from the exported chain
//!   (g) append `admin.evidence_pdf_generated` and record the artifact key
//!
//! There is no way back from (c). When (f) or (g) fails the order stays
//! frozen, and `resume_evidence_generation` finishes the job without
//! repeating (c). If the run died between (c) and (d), resume appends the
//! missing freeze events first, dated with the stored freeze time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use forensic_contracts::{
    error::{LedgerError, LedgerResult},
    event::{event_types, Event, NewEvent, OrderId},
    evidence::{EvidenceArtifact, EvidencePackage},
    order::OrderRecord,
    report::{AdminActor, VerifyReport},
    value::EventValue,
};
use forensic_core::{
    traits::{EvidenceRenderer, OrderDirectory},
    ChainLedger, ChainVerifier,
};

/// Who is freezing the order and why.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreezeRequest {
    pub actor: AdminActor,
    pub reason: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl FreezeRequest {
    pub fn new(actor: AdminActor, reason: impl Into<String>) -> Self {
        Self {
            actor,
            reason: reason.into(),
            ip_address: None,
            user_agent: None,
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

    fn admin_event(&self, event_type: &str, event_data: EventValue) -> NewEvent {
        let mut event = NewEvent::new(event_type, event_data);
        event.ip_address = self.ip_address.clone();
        event.user_agent = self.user_agent.clone();
        event
    }
}

/// Result of a completed freeze.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreezeOutcome {
    /// Chain status before anything was touched.
    pub pre_freeze: VerifyReport,
    /// Chain status after the two freeze events, as handed to the renderer.
    pub post_freeze: VerifyReport,
    pub artifact: EvidenceArtifact,
    pub frozen_at: DateTime<Utc>,
    /// The `admin.evidence_pdf_generated` row.
    pub evidence_event: Event,
}

/// Result of `resume_evidence_generation`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceOutcome {
    pub verification: VerifyReport,
    pub artifact: EvidenceArtifact,
    pub evidence_event: Event,
}

/// Drives the one-way evidence freeze for disputed orders.
pub struct EvidenceFreezeOrchestrator {
    ledger: ChainLedger,
    verifier: ChainVerifier,
    orders: Arc<dyn OrderDirectory>,
    renderer: Arc<dyn EvidenceRenderer>,
}

impl EvidenceFreezeOrchestrator {
    pub fn new(
        ledger: ChainLedger,
        verifier: ChainVerifier,
        orders: Arc<dyn OrderDirectory>,
        renderer: Arc<dyn EvidenceRenderer>,
    ) -> Self {
        Self {
            ledger,
            verifier,
            orders,
            renderer,
        }
    }

    /// Freeze `order_id` and produce its evidence package.
    ///
    /// A corrupt chain does not stop the freeze: the reports in the outcome
    /// and in the chain itself say so, and the caller decides what to do.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown order
    /// - `FreezeConflict` if the order is already frozen; nothing is written
    /// - `EvidenceGenerationFailed` from the renderer; the order stays frozen
    ///   and `resume_evidence_generation` completes it
    /// - ledger and storage errors from the appends
    pub fn freeze(&self, order_id: &OrderId, request: FreezeRequest) -> LedgerResult<FreezeOutcome> {
        // (a)
        let order = self.orders.get_order(order_id)?;
        if order.is_frozen() {
            warn!(order_id = %order_id, actor = %request.actor.id, "freeze refused: already frozen");
            return Err(already_frozen(order_id, &order));
        }

        // (b)
        let pre_freeze = self.verifier.verify(order_id)?;
        if !pre_freeze.valid {
            warn!(
                order_id = %order_id,
                first_invalid_sequence = ?pre_freeze.first_invalid_sequence,
                "freezing an order whose chain does not verify"
            );
        }

        // (c) One-way from here on. The directory re-checks atomically, so a
        // concurrent freeze that slipped past (a) still gets FreezeConflict.
        let frozen_at = Utc::now();
        self.orders.freeze_order(order_id, frozen_at)?;
        info!(order_id = %order_id, actor = %request.actor.id, "order frozen for dispute");

        // (d)
        self.ledger.append(
            order_id,
            request.admin_event(
                event_types::ADMIN_DISPUTE_MODE_ACTIVATED,
                EventValue::from(json!({
                    "actor": request.actor.id,
                    "actorRole": request.actor.role,
                    "reason": request.reason,
                    "frozenAt": frozen_at.to_rfc3339(),
                    "preFreeze": report_json(&pre_freeze),
                })),
            ),
        )?;
        self.ledger.append(
            order_id,
            request.admin_event(
                event_types::ADMIN_DOWNLOADS_REVOKED,
                EventValue::from(json!({
                    "actor": request.actor.id,
                    "revokedAt": Utc::now().to_rfc3339(),
                })),
            ),
        )?;

        // (e)–(g)
        let evidence = self.generate_evidence(order_id, &request.actor)?;

        Ok(FreezeOutcome {
            pre_freeze,
            post_freeze: evidence.verification,
            artifact: evidence.artifact,
            frozen_at,
            evidence_event: evidence.evidence_event,
        })
    }

    /// Finish evidence generation for an order frozen by an earlier `freeze`
    /// that did not complete.
    ///
    /// If the evidence event was appended but the artifact key was never
    /// stored, the key is taken from that event and nothing is re-rendered.
    /// Otherwise any of `admin.dispute_mode_activated` and
    /// `admin.downloads_revoked` missing from the chain is appended first,
    /// so the rendered document always shows the freeze.
    ///
    /// # Errors
    ///
    /// `FreezeConflict` if the order is not frozen or already has evidence.
    pub fn resume_evidence_generation(
        &self,
        order_id: &OrderId,
        actor: &AdminActor,
    ) -> LedgerResult<EvidenceOutcome> {
        let order = self.orders.get_order(order_id)?;
        if !order.is_frozen() {
            return Err(LedgerError::FreezeConflict {
                order_id: order_id.to_string(),
                reason: "order is not frozen".to_string(),
            });
        }
        if order.frozen_evidence_pdf_key.is_some() {
            return Err(LedgerError::FreezeConflict {
                order_id: order_id.to_string(),
                reason: "evidence has already been generated".to_string(),
            });
        }

        let export = self.verifier.export(order_id)?;
        if let Some(event) = export
            .events
            .iter()
            .rev()
            .find(|e| e.event_type == event_types::ADMIN_EVIDENCE_PDF_GENERATED)
        {
            let artifact = artifact_from_event(event).ok_or_else(|| LedgerError::FreezeConflict {
                order_id: order_id.to_string(),
                reason: format!(
                    "evidence event {} does not name an artifact",
                    event.sequence_number
                ),
            })?;
            self.orders.record_evidence_artifact(order_id, &artifact.key)?;
            info!(
                order_id = %order_id,
                actor = %actor.id,
                key = %artifact.key,
                "evidence key restored from chain"
            );
            return Ok(EvidenceOutcome {
                verification: export.verification,
                artifact,
                evidence_event: event.clone(),
            });
        }

        let frozen_at = order.evidence_frozen_at.unwrap_or_else(Utc::now);
        self.append_missing_freeze_events(order_id, actor, &export.events, frozen_at)?;

        info!(order_id = %order_id, actor = %actor.id, "resuming evidence generation");
        self.generate_evidence(order_id, actor)
    }

    /// Step (d) for a freeze that stopped after (c).
    fn append_missing_freeze_events(
        &self,
        order_id: &OrderId,
        actor: &AdminActor,
        events: &[Event],
        frozen_at: DateTime<Utc>,
    ) -> LedgerResult<()> {
        let has = |event_type: &str| events.iter().any(|e| e.event_type == event_type);

        if !has(event_types::ADMIN_DISPUTE_MODE_ACTIVATED) {
            warn!(order_id = %order_id, "frozen without a dispute event; appending it");
            self.ledger.append(
                order_id,
                NewEvent::new(
                    event_types::ADMIN_DISPUTE_MODE_ACTIVATED,
                    EventValue::from(json!({
                        "actor": actor.id,
                        "actorRole": actor.role,
                        "frozenAt": frozen_at.to_rfc3339(),
                        "recovered": true,
                    })),
                ),
            )?;
        }
        if !has(event_types::ADMIN_DOWNLOADS_REVOKED) {
            warn!(order_id = %order_id, "frozen without a revocation event; appending it");
            self.ledger.append(
                order_id,
                NewEvent::new(
                    event_types::ADMIN_DOWNLOADS_REVOKED,
                    EventValue::from(json!({
                        "actor": actor.id,
                        "revokedAt": frozen_at.to_rfc3339(),
                        "recovered": true,
                    })),
                ),
            )?;
        }
        Ok(())
    }

    /// Steps (e) to (g).
    fn generate_evidence(&self, order_id: &OrderId, actor: &AdminActor) -> LedgerResult<EvidenceOutcome> {
        let export = self.verifier.export(order_id)?;
        let order = self.orders.get_order(order_id)?;
        let verification = export.verification;

        debug!(
            order_id = %order_id,
            total_events = verification.total_events,
            valid = verification.valid,
            "rendering evidence package"
        );

        let artifact = self
            .renderer
            .render(&EvidencePackage {
                order_id: order_id.clone(),
                order,
                events: export.events,
                verification,
                terminal_hash: export.terminal_hash.clone(),
            })
            .map_err(|err| {
                warn!(order_id = %order_id, error = %err, "evidence rendering failed; order stays frozen");
                err
            })?;

        let evidence_event = self.ledger.append(
            order_id,
            NewEvent::new(
                event_types::ADMIN_EVIDENCE_PDF_GENERATED,
                EventValue::from(json!({
                    "actor": actor.id,
                    "key": artifact.key,
                    "sha256": artifact.sha256,
                    "sizeBytes": artifact.size_bytes,
                    "terminalHash": export.terminal_hash,
                    "verification": report_json(&verification),
                })),
            ),
        )?;
        self.orders.record_evidence_artifact(order_id, &artifact.key)?;

        info!(
            order_id = %order_id,
            key = %artifact.key,
            sha256 = %artifact.sha256,
            size_bytes = artifact.size_bytes,
            "evidence generated"
        );

        Ok(EvidenceOutcome {
            verification,
            artifact,
            evidence_event,
        })
    }
}

fn already_frozen(order_id: &OrderId, order: &OrderRecord) -> LedgerError {
    let reason = match order.evidence_frozen_at {
        Some(at) if order.frozen_evidence_pdf_key.is_none() => format!(
            "already frozen at {}; evidence is missing, resume evidence generation instead",
            at.to_rfc3339()
        ),
        Some(at) => format!("already frozen at {}", at.to_rfc3339()),
        None => "already frozen".to_string(),
    };
    LedgerError::FreezeConflict {
        order_id: order_id.to_string(),
        reason,
    }
}

fn report_json(report: &VerifyReport) -> serde_json::Value {
    json!({
        "valid": report.valid,
        "totalEvents": report.total_events,
        "firstInvalidSequence": report.first_invalid_sequence,
    })
}

fn artifact_from_event(event: &Event) -> Option<EvidenceArtifact> {
    let data = &event.event_data;
    Some(EvidenceArtifact {
        key: data.get("key")?.as_str()?.to_string(),
        sha256: data.get("sha256")?.as_str()?.to_string(),
        size_bytes: u64::try_from(data.get("sizeBytes")?.as_i64()?).ok()?,
    })
}
