//! Scenario 3: Concurrent appends
//!
//! `appends` threads race to append to the same order. Every append must
//! land exactly once, with sequence numbers 1..=appends and a valid chain.

use std::{thread, time::Instant};

use serde_json::json;

use forensic_contracts::{
    error::{LedgerError, LedgerResult},
    event::{event_types, OrderId},
    order::OrderStatus,
};
use forensic_core::{traits::ChainStore, ChainConfig};

use crate::{runtime::Runtime, scenarios::print_report};

pub fn run_scenario(config: &ChainConfig, appends: u64) -> LedgerResult<()> {
    println!("=== Scenario 3: Concurrent Appends ===");
    println!();

    let rt = Runtime::new(config);
    let order_id = OrderId::from("ord-3001");
    rt.store.create_order(&order_id, OrderStatus::Fulfilled)?;

    println!("  Threads:               {}", appends);
    let started = Instant::now();

    let results: Vec<LedgerResult<u64>> = thread::scope(|s| {
        let handles: Vec<_> = (0..appends)
            .map(|i| {
                let ledger = &rt.ledger;
                let order_id = &order_id;
                s.spawn(move || {
                    ledger
                        .record(order_id, event_types::DOWNLOAD_COMPLETED, json!({ "download": i }))
                        .map(|e| e.sequence_number)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join().unwrap_or_else(|_| {
                    Err(LedgerError::StorageFailure {
                        reason: "append thread panicked".to_string(),
                    })
                })
            })
            .collect()
    });

    let failed = results.iter().filter(|r| r.is_err()).count();
    if let Some(Err(e)) = results.iter().find(|r| r.is_err()) {
        println!("  First failure:         {}", e);
    }

    let sequences: Vec<u64> = rt
        .store
        .load_chain(&order_id)?
        .iter()
        .map(|e| e.sequence_number)
        .collect();
    let gapless = sequences.iter().copied().eq(1..=sequences.len() as u64);

    println!("  Elapsed:               {:?}", started.elapsed());
    println!("  Committed:             {} ({} failed)", sequences.len(), failed);
    println!("  Gapless 1..N:          {}", gapless);
    print_report("verify:", &rt.verifier.verify(&order_id)?);
    println!(
        "  RESULT: {}",
        if failed == 0 && gapless && sequences.len() as u64 == appends {
            "every append committed exactly once (expected)"
        } else {
            "appends lost or duplicated"
        }
    );
    println!();

    println!("  Scenario 3 complete.");
    println!();
    Ok(())
}
