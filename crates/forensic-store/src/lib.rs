//! # forensic-store
//!
//! Reference storage backend for the forensic order event chain.
//!
//! ## Overview
//!
//! `InMemoryStore` implements `ChainStore` and `OrderDirectory` with
//! per-order write locks, a unique `(order_id, sequence_number)` constraint
//! and all-or-nothing commits. Its privileged twin, `PrivilegedChainAccess`,
//! is the only `ResealStore`. `InMemoryAdminAuditTrail` and
//! `InMemoryEvidenceRenderer` stand in for the administrative audit log and
//! the evidence generator.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use forensic_store::InMemoryStore;
//!
//! let store = Arc::new(InMemoryStore::new());
//! store.create_order(&order_id, OrderStatus::Paid)?;
//! let ledger = ChainLedger::new(store.clone(), config.append.clone());
//! let resealer = ChainResealer::new(Arc::new(store.privileged()), audit, config.reseal.clone());
//! ```

pub mod admin_audit;
pub mod evidence;
pub mod memory;
pub mod privileged;

pub use admin_audit::InMemoryAdminAuditTrail;
pub use evidence::InMemoryEvidenceRenderer;
pub use memory::InMemoryStore;
pub use privileged::PrivilegedChainAccess;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread, time::Duration};

    use chrono::Utc;
    use serde_json::json;
    use sha2::{Digest, Sha256};

    use forensic_contracts::{
        error::LedgerError,
        event::{event_types, Event, NewEvent, OrderId},
        evidence::EvidencePackage,
        order::OrderStatus,
        report::AdminActor,
        value::EventValue,
    };
    use forensic_core::{
        chain::relink,
        traits::{ChainStore, EvidenceRenderer, OrderDirectory, ResealStore},
        AppendConfig, ChainLedger, ChainResealer, ChainVerifier, ResealConfig,
    };

    use super::{InMemoryAdminAuditTrail, InMemoryEvidenceRenderer, InMemoryStore};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn store_with(order_id: &OrderId) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store.create_order(order_id, OrderStatus::Paid).unwrap();
        store
    }

    fn ledger(store: &Arc<InMemoryStore>) -> ChainLedger {
        ChainLedger::new(store.clone(), AppendConfig::default())
    }

    fn seed(store: &Arc<InMemoryStore>, order_id: &OrderId, n: u64) {
        let ledger = ledger(store);
        for i in 1..=n {
            ledger
                .append(
                    order_id,
                    NewEvent::new("order.note_added", json!({ "i": i }))
                        .with_ip_address("192.0.2.10")
                        .with_user_agent("curl/8.0")
                        .with_external_ref(format!("ext-{i}")),
                )
                .unwrap();
        }
    }

    /// Rows hashed the way an earlier system did: plain JSON of the payload
    /// with no canonical ordering and no coverage of the optional fields.
    fn legacy_rows(order_id: &OrderId, n: u64) -> Vec<Event> {
        let mut rows: Vec<Event> = Vec::new();
        for seq in 1..=n {
            let prev_hash = rows
                .last()
                .map(|e| e.hash.clone())
                .unwrap_or_else(|| Event::GENESIS_HASH.to_string());
            let data = EventValue::from(json!({ "step": seq, "note": "legacy" }));
            let mut hasher = Sha256::new();
            hasher.update(order_id.as_str().as_bytes());
            hasher.update(seq.to_le_bytes());
            hasher.update(serde_json::to_vec(&data).unwrap());
            hasher.update(prev_hash.as_bytes());
            rows.push(Event {
                order_id: order_id.clone(),
                sequence_number: seq,
                event_type: "order.note_added".to_string(),
                event_data: data,
                ip_address: None,
                user_agent: None,
                external_ref: None,
                prev_hash,
                hash: hex::encode(hasher.finalize()),
                created_at: Utc::now(),
            });
        }
        rows
    }

    fn tamper(store: &InMemoryStore, order_id: &OrderId, sequence_number: u64, f: impl FnOnce(&mut Event)) {
        let slot = store.slot(order_id).unwrap();
        let mut rows = slot.rows.write();
        let row = rows
            .iter_mut()
            .find(|e| e.sequence_number == sequence_number)
            .unwrap();
        f(row);
    }

    fn resealer(store: &Arc<InMemoryStore>, audit: &Arc<InMemoryAdminAuditTrail>) -> ChainResealer {
        ChainResealer::new(Arc::new(store.privileged()), audit.clone(), ResealConfig::default())
    }

    // ── Concurrency ───────────────────────────────────────────────────────────

    /// Fifty writers racing on one order produce exactly 1..=50.
    #[test]
    fn test_fifty_concurrent_appends() {
        let order_id = OrderId::from("ord-race");
        let store = store_with(&order_id);
        let ledger = ledger(&store);

        thread::scope(|s| {
            let handles: Vec<_> = (0..50)
                .map(|i| {
                    let ledger = &ledger;
                    let order_id = &order_id;
                    s.spawn(move || {
                        ledger.append(order_id, NewEvent::new("download.completed", json!({ "worker": i })))
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap().unwrap();
            }
        });

        let rows = store.load_chain(&order_id).unwrap();
        let sequences: Vec<u64> = rows.iter().map(|e| e.sequence_number).collect();
        assert_eq!(sequences, (1..=50).collect::<Vec<u64>>());

        let mut workers: Vec<i64> = rows
            .iter()
            .map(|e| e.event_data.get("worker").and_then(EventValue::as_i64).unwrap())
            .collect();
        workers.sort_unstable();
        assert_eq!(workers, (0..50).collect::<Vec<i64>>(), "no append may be dropped");

        let report = ChainVerifier::new(store).verify(&order_id).unwrap();
        assert!(report.valid);
        assert_eq!(report.total_events, 50);
    }

    /// Chains of different orders stay independent under concurrent load.
    #[test]
    fn test_concurrent_orders_are_independent() {
        let store = Arc::new(InMemoryStore::new());
        let orders: Vec<OrderId> = (0..4).map(|i| OrderId::new(format!("ord-multi-{i}"))).collect();
        for order_id in &orders {
            store.create_order(order_id, OrderStatus::Paid).unwrap();
        }
        let ledger = ledger(&store);

        thread::scope(|s| {
            for order_id in &orders {
                for _ in 0..10 {
                    let ledger = &ledger;
                    s.spawn(move || ledger.record(order_id, "license.issued", EventValue::Null).unwrap());
                }
            }
        });

        let verifier = ChainVerifier::new(store);
        for order_id in &orders {
            let report = verifier.verify(order_id).unwrap();
            assert!(report.valid);
            assert_eq!(report.total_events, 10);
        }
    }

    /// An append issued during a reseal waits, then links to the resealed tail.
    #[test]
    fn test_append_waits_for_reseal() {
        let order_id = OrderId::from("ord-reseal-wait");
        let store = store_with(&order_id);
        store.import_rows(&order_id, legacy_rows(&order_id, 3)).unwrap();
        let privileged = store.privileged();
        let ledger = ledger(&store);

        let appended = thread::scope(|s| {
            let mut txn = privileged
                .begin_reseal(&order_id, Duration::from_secs(1))
                .unwrap();

            let appender = s.spawn(|| ledger.record(&order_id, "dispute.opened", EventValue::Null));

            thread::sleep(Duration::from_millis(100));
            assert_eq!(
                store.load_chain(&order_id).unwrap().len(),
                3,
                "append must not interleave with an open reseal"
            );

            let links = relink(txn.events());
            for link in links {
                txn.rewrite_link(link.sequence_number, link.prev_hash, link.hash).unwrap();
            }
            assert_eq!(txn.commit().unwrap(), 3);

            appender.join().unwrap().unwrap()
        });

        let rows = store.load_chain(&order_id).unwrap();
        assert_eq!(appended.sequence_number, 4);
        assert_eq!(appended.prev_hash, rows[2].hash);
        assert!(ChainVerifier::new(store).verify(&order_id).unwrap().valid);
    }

    /// Reads never wait on the write lock.
    #[test]
    fn test_verify_runs_while_append_is_open() {
        let order_id = OrderId::from("ord-read");
        let store = store_with(&order_id);
        seed(&store, &order_id, 2);

        let open = store.begin_append(&order_id, Duration::from_secs(1)).unwrap();
        let report = ChainVerifier::new(store.clone()).verify(&order_id).unwrap();
        drop(open);

        assert!(report.valid);
        assert_eq!(report.total_events, 2);
    }

    /// A lock held past every retry surfaces as a transient conflict.
    #[test]
    fn test_lock_timeout_exhausts_retries() {
        let order_id = OrderId::from("ord-timeout");
        let store = store_with(&order_id);
        let privileged = store.privileged();
        let impatient = ChainLedger::new(
            store.clone(),
            AppendConfig {
                max_attempts: 2,
                lock_timeout_ms: 20,
                retry_backoff_ms: 1,
            },
        );

        let txn = privileged.begin_reseal(&order_id, Duration::from_secs(1)).unwrap();
        match impatient.record(&order_id, "order.created", EventValue::Null) {
            Err(err @ LedgerError::ConcurrencyConflict { .. }) => {
                assert!(err.is_transient());
                assert!(err.to_string().contains("2 attempt"));
            }
            other => panic!("expected ConcurrencyConflict, got {:?}", other),
        }
        drop(txn);

        let event = impatient.record(&order_id, "order.created", EventValue::Null).unwrap();
        assert_eq!(event.sequence_number, 1);
    }

    /// Dropping an open append is a rollback and frees the lock.
    #[test]
    fn test_uncommitted_append_rolls_back() {
        let order_id = OrderId::from("ord-rollback");
        let store = store_with(&order_id);

        let open = store.begin_append(&order_id, Duration::from_secs(1)).unwrap();
        assert!(open.last_event().is_none());
        drop(open);

        assert!(store.load_chain(&order_id).unwrap().is_empty());
        let event = ledger(&store).record(&order_id, "order.created", EventValue::Null).unwrap();
        assert_eq!(event.sequence_number, 1);
    }

    // ── Failure modes ─────────────────────────────────────────────────────────

    #[test]
    fn test_storage_outage_leaves_no_row() {
        let order_id = OrderId::from("ord-outage");
        let store = store_with(&order_id);
        seed(&store, &order_id, 1);

        store.set_available(false);
        let result = ledger(&store).record(&order_id, "payment.captured", json!({ "amount": 500 }));
        assert!(matches!(result, Err(LedgerError::StorageFailure { .. })));
        store.set_available(true);

        assert_eq!(store.load_chain(&order_id).unwrap().len(), 1);
        let next = ledger(&store).record(&order_id, "payment.captured", json!({ "amount": 500 })).unwrap();
        assert_eq!(next.sequence_number, 2);
    }

    #[test]
    fn test_unknown_order_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let ghost = OrderId::from("ghost");

        assert!(matches!(store.load_chain(&ghost), Err(LedgerError::NotFound { .. })));
        assert!(matches!(
            ledger(&store).record(&ghost, "order.created", EventValue::Null),
            Err(LedgerError::NotFound { .. })
        ));
        assert!(matches!(store.get_order(&ghost), Err(LedgerError::NotFound { .. })));
    }

    #[test]
    fn test_duplicate_order_is_rejected() {
        let order_id = OrderId::from("ord-dup");
        let store = store_with(&order_id);
        assert!(store.create_order(&order_id, OrderStatus::Pending).is_err());
    }

    // ── Tamper detection ──────────────────────────────────────────────────────

    /// Corrupting any single stored field of event 2 in a 3-event chain is
    /// reported at sequence 2, with the full event count.
    #[test]
    fn test_tamper_any_field_of_second_event() {
        let tampers: Vec<(&str, Box<dyn Fn(&mut Event)>)> = vec![
            ("order_id", Box::new(|e: &mut Event| e.order_id = OrderId::from("other"))),
            ("sequence_number", Box::new(|e: &mut Event| e.sequence_number = 9)),
            ("event_type", Box::new(|e: &mut Event| e.event_type = "order.refunded".to_string())),
            ("event_data", Box::new(|e: &mut Event| e.event_data = EventValue::from(json!({ "i": 77 })))),
            ("ip_address", Box::new(|e: &mut Event| e.ip_address = Some("10.0.0.1".to_string()))),
            ("user_agent", Box::new(|e: &mut Event| e.user_agent = None)),
            ("external_ref", Box::new(|e: &mut Event| e.external_ref = Some("ext-forged".to_string()))),
            ("prev_hash", Box::new(|e: &mut Event| e.prev_hash = "a".repeat(64))),
            ("hash", Box::new(|e: &mut Event| e.hash = "b".repeat(64))),
        ];

        for (field, mutate) in tampers {
            let order_id = OrderId::from("ord-tamper");
            let store = store_with(&order_id);
            seed(&store, &order_id, 3);

            tamper(&store, &order_id, 2, |e| mutate(e));

            let report = ChainVerifier::new(store).verify(&order_id).unwrap();
            assert!(!report.valid, "tampering {field} must be detected");
            assert_eq!(report.first_invalid_sequence, Some(2), "tampering {field}");
            assert_eq!(report.total_events, 3, "tampering {field}");
        }
    }

    // ── Reseal ────────────────────────────────────────────────────────────────

    #[test]
    fn test_reseal_repairs_imported_legacy_chain() {
        let order_id = OrderId::from("ord-legacy");
        let store = store_with(&order_id);
        let audit = Arc::new(InMemoryAdminAuditTrail::new());
        assert_eq!(store.import_rows(&order_id, legacy_rows(&order_id, 5)).unwrap(), 5);

        let verifier = ChainVerifier::new(store.clone());
        let before = verifier.verify(&order_id).unwrap();
        assert!(!before.valid);
        assert_eq!(before.first_invalid_sequence, Some(1));

        let actor = AdminActor::new("ops-lead", "superadmin");
        let resealer = resealer(&store, &audit);

        let first = resealer.reseal(&actor, &order_id).unwrap();
        assert_eq!(first.resealed, 5);
        assert_eq!(first.total_events, 5);
        assert!(verifier.verify(&order_id).unwrap().valid);
        let hashes: Vec<String> = store.load_chain(&order_id).unwrap().into_iter().map(|e| e.hash).collect();

        let second = resealer.reseal(&actor, &order_id).unwrap();
        assert_eq!(second.resealed, 0);
        let again: Vec<String> = store.load_chain(&order_id).unwrap().into_iter().map(|e| e.hash).collect();
        assert_eq!(hashes, again);

        let entries = audit.entries();
        assert_eq!(entries.len(), 2);
        assert!(!entries[0].before.valid);
        assert!(entries[0].after.valid);
        assert_eq!(entries[1].resealed, 0);
    }

    #[test]
    fn test_reseal_keeps_payloads_untouched() {
        let order_id = OrderId::from("ord-payloads");
        let store = store_with(&order_id);
        let audit = Arc::new(InMemoryAdminAuditTrail::new());
        let legacy = legacy_rows(&order_id, 3);
        store.import_rows(&order_id, legacy.clone()).unwrap();

        resealer(&store, &audit)
            .reseal(&AdminActor::new("ops-lead", "superadmin"), &order_id)
            .unwrap();

        for (old, new) in legacy.iter().zip(store.load_chain(&order_id).unwrap()) {
            assert_eq!(old.event_type, new.event_type);
            assert_eq!(old.event_data, new.event_data);
            assert_eq!(old.sequence_number, new.sequence_number);
            assert_eq!(old.created_at, new.created_at);
        }
    }

    #[test]
    fn test_reseal_audit_outage_keeps_committed_rewrite() {
        let order_id = OrderId::from("ord-audit-down");
        let store = store_with(&order_id);
        let audit = Arc::new(InMemoryAdminAuditTrail::new());
        store.import_rows(&order_id, legacy_rows(&order_id, 2)).unwrap();
        audit.set_available(false);

        let actor = AdminActor::new("ops", "superadmin");
        let result = resealer(&store, &audit).reseal(&actor, &order_id);
        assert!(matches!(result, Err(LedgerError::AuditWriteFailed { .. })));

        // The rewrite is not rolled back by the audit failure.
        assert!(ChainVerifier::new(store.clone()).verify(&order_id).unwrap().valid);
        assert!(audit.entries().is_empty());

        audit.set_available(true);
        let rerun = resealer(&store, &audit).reseal(&actor, &order_id).unwrap();
        assert_eq!(rerun.resealed, 0);
        assert_eq!(audit.entries().len(), 1);
    }

    /// An in-flight append outlasts the first exclusive-lock wait; reseal
    /// retries and completes once the append releases the lock.
    #[test]
    fn test_reseal_retries_behind_open_append() {
        let order_id = OrderId::from("ord-reseal-retry");
        let store = store_with(&order_id);
        let audit = Arc::new(InMemoryAdminAuditTrail::new());
        store.import_rows(&order_id, legacy_rows(&order_id, 3)).unwrap();
        let patient = ChainResealer::new(
            Arc::new(store.privileged()),
            audit.clone(),
            ResealConfig {
                max_attempts: 20,
                lock_timeout_ms: 30,
                retry_backoff_ms: 5,
            },
        );
        let actor = AdminActor::new("ops-lead", "superadmin");

        let report = thread::scope(|s| {
            let open = store.begin_append(&order_id, Duration::from_secs(1)).unwrap();
            let resealing = s.spawn(|| patient.reseal(&actor, &order_id));

            thread::sleep(Duration::from_millis(150));
            assert!(!resealing.is_finished(), "reseal must wait for the open append");
            drop(open);

            resealing.join().unwrap().unwrap()
        });

        assert_eq!(report.resealed, 3);
        assert!(ChainVerifier::new(store).verify(&order_id).unwrap().valid);
        assert_eq!(audit.entries().len(), 1);
    }

    /// With the lock held throughout, reseal stops after its configured
    /// attempts and writes nothing.
    #[test]
    fn test_reseal_gives_up_behind_held_lock() {
        let order_id = OrderId::from("ord-reseal-starved");
        let store = store_with(&order_id);
        let audit = Arc::new(InMemoryAdminAuditTrail::new());
        let legacy = legacy_rows(&order_id, 2);
        store.import_rows(&order_id, legacy.clone()).unwrap();
        let impatient = ChainResealer::new(
            Arc::new(store.privileged()),
            audit.clone(),
            ResealConfig {
                max_attempts: 2,
                lock_timeout_ms: 20,
                retry_backoff_ms: 1,
            },
        );

        let open = store.begin_append(&order_id, Duration::from_secs(1)).unwrap();
        match impatient.reseal(&AdminActor::new("ops", "superadmin"), &order_id) {
            Err(LedgerError::ConcurrencyConflict { attempts, .. }) => assert_eq!(attempts, 2),
            other => panic!("expected ConcurrencyConflict, got {:?}", other),
        }
        drop(open);

        assert_eq!(store.load_chain(&order_id).unwrap(), legacy);
        assert!(audit.entries().is_empty());
    }

    #[test]
    fn test_import_rejects_duplicate_sequence_numbers() {
        let order_id = OrderId::from("ord-import-dup");
        let store = store_with(&order_id);
        let mut rows = legacy_rows(&order_id, 2);
        rows[1].sequence_number = 1;

        assert!(store.import_rows(&order_id, rows).is_err());
        assert!(store.load_chain(&order_id).unwrap().is_empty());
    }

    // ── Orders and evidence ───────────────────────────────────────────────────

    #[test]
    fn test_freeze_is_one_way() {
        let order_id = OrderId::from("ord-freeze");
        let store = store_with(&order_id);
        let at = Utc::now();

        let frozen = store.freeze_order(&order_id, at).unwrap();
        assert!(frozen.is_frozen());
        assert!(frozen.downloads_revoked);
        assert_eq!(frozen.status, OrderStatus::Disputed);

        assert!(matches!(
            store.freeze_order(&order_id, Utc::now()),
            Err(LedgerError::FreezeConflict { .. })
        ));
        assert_eq!(store.get_order(&order_id).unwrap().evidence_frozen_at, Some(at));
    }

    #[test]
    fn test_evidence_key_requires_frozen_order() {
        let order_id = OrderId::from("ord-key");
        let store = store_with(&order_id);
        assert!(store.record_evidence_artifact(&order_id, "evidence/x.json").is_err());

        store.freeze_order(&order_id, Utc::now()).unwrap();
        let record = store.record_evidence_artifact(&order_id, "evidence/x.json").unwrap();
        assert_eq!(record.frozen_evidence_pdf_key.as_deref(), Some("evidence/x.json"));
    }

    #[test]
    fn test_renderer_digest_matches_stored_bytes() {
        let order_id = OrderId::from("ord-render");
        let store = store_with(&order_id);
        seed(&store, &order_id, 2);
        let export = ChainVerifier::new(store.clone()).export(&order_id).unwrap();
        let renderer = InMemoryEvidenceRenderer::new();

        let artifact = renderer
            .render(&EvidencePackage {
                order_id: order_id.clone(),
                order: store.get_order(&order_id).unwrap(),
                events: export.events,
                verification: export.verification,
                terminal_hash: export.terminal_hash,
            })
            .unwrap();

        let bytes = renderer.object(&artifact.key).unwrap();
        assert_eq!(artifact.size_bytes, bytes.len() as u64);
        assert_eq!(artifact.sha256, hex::encode(Sha256::digest(&bytes)));
        assert!(artifact.key.starts_with("evidence/ord-render/"));
    }

    #[test]
    fn test_failing_renderer_reports_generation_failure() {
        let order_id = OrderId::from("ord-render-fail");
        let store = store_with(&order_id);
        let renderer = InMemoryEvidenceRenderer::new();
        renderer.set_failing(true);

        let result = renderer.render(&EvidencePackage {
            order_id: order_id.clone(),
            order: store.get_order(&order_id).unwrap(),
            events: vec![],
            verification: ChainVerifier::new(store.clone()).verify(&order_id).unwrap(),
            terminal_hash: Event::GENESIS_HASH.to_string(),
        });
        assert!(matches!(result, Err(LedgerError::EvidenceGenerationFailed { .. })));
        assert_eq!(renderer.object_count(), 0);
    }

    #[test]
    fn test_well_known_event_types_append() {
        let order_id = OrderId::from("ord-lifecycle");
        let store = store_with(&order_id);
        let ledger = ledger(&store);

        for tag in [
            event_types::ORDER_CREATED,
            event_types::TERMS_ACCEPTED,
            event_types::PAYMENT_CAPTURED,
            event_types::LICENSE_ISSUED,
            event_types::DOWNLOAD_TOKEN_ISSUED,
        ] {
            ledger.record(&order_id, tag, EventValue::empty_map()).unwrap();
        }

        let report = ChainVerifier::new(store).verify(&order_id).unwrap();
        assert!(report.valid);
        assert_eq!(report.total_events, 5);
    }
}
