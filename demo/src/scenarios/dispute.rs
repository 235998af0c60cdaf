//! Scenario 1: Order dispute
//!
//! An order records its first two business events, verifies, is frozen for a
//! chargeback, and then a second freeze is rejected without touching the
//! chain.

use serde_json::json;

use forensic_contracts::{
    error::{LedgerError, LedgerResult},
    event::{event_types, NewEvent, OrderId},
    order::OrderStatus,
    report::AdminActor,
};
use forensic_core::{traits::OrderDirectory, ChainConfig};
use forensic_freeze::FreezeRequest;

use crate::{
    runtime::Runtime,
    scenarios::{print_report, short},
};

pub fn run_scenario(config: &ChainConfig) -> LedgerResult<()> {
    println!("=== Scenario 1: Order Dispute ===");
    println!();

    let rt = Runtime::new(config);
    let order_id = OrderId::from("ord-1001");
    rt.store.create_order(&order_id, OrderStatus::Paid)?;

    // ── Business events ───────────────────────────────────────────────────────

    let created = rt.ledger.append(
        &order_id,
        NewEvent::new(
            event_types::ORDER_CREATED,
            json!({ "amount": 4900, "currency": "EUR", "sku": "font-pro-desktop" }),
        )
        .with_ip_address("203.0.113.24")
        .with_user_agent("Mozilla/5.0")
        .with_external_ref("cs_test_a1b2c3"),
    )?;
    let accepted = rt.ledger.append(
        &order_id,
        NewEvent::new(event_types::TERMS_ACCEPTED, json!({ "termsVersion": "2024-01" }))
            .with_ip_address("203.0.113.24")
            .with_user_agent("Mozilla/5.0"),
    )?;

    for event in [&created, &accepted] {
        println!(
            "  seq={} {:<28} prev={}  hash={}",
            event.sequence_number,
            event.event_type,
            short(&event.prev_hash),
            short(&event.hash)
        );
    }
    println!();

    print_report("verify:", &rt.verifier.verify(&order_id)?);
    println!();

    // ── Freeze ────────────────────────────────────────────────────────────────

    let actor = AdminActor::new("ops-lead", "superadmin");
    let outcome = rt.orchestrator.freeze(
        &order_id,
        FreezeRequest::new(actor.clone(), "chargeback: product not received")
            .with_ip_address("198.51.100.7")
            .with_user_agent("admin-console/2.1"),
    )?;

    println!("  Order frozen at {}", outcome.frozen_at.to_rfc3339());
    print_report("pre-freeze:", &outcome.pre_freeze);
    print_report("post-freeze:", &outcome.post_freeze);
    println!(
        "  Evidence artifact:     {} ({} bytes, sha256 {})",
        outcome.artifact.key,
        outcome.artifact.size_bytes,
        short(&outcome.artifact.sha256)
    );
    println!(
        "  Evidence event:        seq={} {}",
        outcome.evidence_event.sequence_number, outcome.evidence_event.event_type
    );
    if let Some(bytes) = rt.renderer.object(&outcome.artifact.key) {
        println!("  Stored document:       {} bytes", bytes.len());
    }

    let order = rt.store.get_order(&order_id)?;
    println!(
        "  Order state:           status={:?} downloadsRevoked={}",
        order.status, order.downloads_revoked
    );
    println!();

    // ── Second freeze ─────────────────────────────────────────────────────────

    let before = rt.verifier.verify(&order_id)?;
    match rt
        .orchestrator
        .freeze(&order_id, FreezeRequest::new(actor, "duplicate click"))
    {
        Err(LedgerError::FreezeConflict { reason, .. }) => {
            println!("  Second freeze:         rejected ({})", reason);
        }
        Err(e) => return Err(e),
        Ok(_) => println!("  Second freeze:         unexpectedly succeeded"),
    }
    let after = rt.verifier.verify(&order_id)?;
    print_report("verify:", &after);
    println!(
        "  RESULT: {}",
        if after.total_events == before.total_events && after.valid {
            "chain unchanged by the rejected freeze (expected)"
        } else {
            "chain changed by a rejected freeze"
        }
    );
    println!();

    println!("  Scenario 1 complete.");
    println!();
    Ok(())
}
