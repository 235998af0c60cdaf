//! Scenario 2: Tamper detection
//!
//! Builds a healthy three-event chain, then loads the same rows with one
//! field of event 2 edited into a second store, the way a restored or
//! hand-patched database would look, and verifies both.

use serde_json::json;

use forensic_contracts::{
    error::LedgerResult,
    event::{event_types, OrderId},
    order::OrderStatus,
    value::EventValue,
};
use forensic_core::{traits::ChainStore, ChainConfig};

use crate::{runtime::Runtime, scenarios::print_report};

pub fn run_scenario(config: &ChainConfig) -> LedgerResult<()> {
    println!("=== Scenario 2: Tamper Detection ===");
    println!();

    let order_id = OrderId::from("ord-2001");

    let live = Runtime::new(config);
    live.store.create_order(&order_id, OrderStatus::Paid)?;
    live.ledger.record(&order_id, event_types::ORDER_CREATED, json!({ "amount": 4900 }))?;
    live.ledger.record(&order_id, event_types::PAYMENT_CAPTURED, json!({ "amount": 4900 }))?;
    live.ledger.record(&order_id, event_types::LICENSE_ISSUED, json!({ "seats": 1 }))?;
    print_report("live copy:", &live.verifier.verify(&order_id)?);

    // Stored hashes left intact; only the payload changes.
    let mut rows = live.store.load_chain(&order_id)?;
    rows[1].event_data = EventValue::from(json!({ "amount": 49 }));

    let patched = Runtime::new(config);
    patched.store.create_order(&order_id, OrderStatus::Paid)?;
    patched.store.import_rows(&order_id, rows)?;

    println!("  Edited:                event 2 eventData.amount 4900 -> 49");
    let report = patched.verifier.verify(&order_id)?;
    print_report("patched copy:", &report);

    println!(
        "  RESULT: {}",
        if report.first_invalid_sequence == Some(2) {
            "tampering detected at sequence 2 (expected)"
        } else {
            "tampering NOT located"
        }
    );
    println!();

    println!("  Scenario 2 complete.");
    println!();
    Ok(())
}
