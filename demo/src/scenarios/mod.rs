//! Demo scenarios.
//!
//! - `dispute`: order lifecycle, verify, evidence freeze, rejected re-freeze
//! - `tamper`: a single edited field is caught at its sequence number
//! - `stress`: concurrent appends on one order stay gapless
//! - `reseal`: a legacy-hashed chain is repaired and audited

pub mod dispute;
pub mod reseal;
pub mod stress;
pub mod tamper;

use forensic_contracts::report::VerifyReport;

pub(crate) fn print_report(label: &str, report: &VerifyReport) {
    match report.first_invalid_sequence {
        None => println!(
            "  {:<22} valid={} totalEvents={}",
            label, report.valid, report.total_events
        ),
        Some(seq) => println!(
            "  {:<22} valid={} totalEvents={} firstInvalidSequence={}",
            label, report.valid, report.total_events, seq
        ),
    }
}

pub(crate) fn short(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
