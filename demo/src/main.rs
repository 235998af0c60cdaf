//! Forensic Order Event Chain - Demo CLI
//!
//! Wires the ledger, verifier, resealer and freeze orchestrator onto the
//! in-memory store and walks through what each of them guarantees.
//!
//! Usage:
//!   cargo run -p forensic-demo -- scenario
//!   cargo run -p forensic-demo -- tamper
//!   cargo run -p forensic-demo -- stress --appends 200
//!   cargo run -p forensic-demo -- reseal
//!   cargo run -p forensic-demo -- --config config/chain.toml run-all

mod runtime;
mod scenarios;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use forensic_contracts::error::LedgerResult;
use forensic_core::ChainConfig;

use crate::scenarios::{dispute, reseal, stress, tamper};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Tamper-evident, per-order event chains for dispute evidence.
#[derive(Parser)]
#[command(
    name = "forensic-demo",
    about = "Forensic order event chain demo",
    long_about = "Runs demo scenarios showing gapless chain appends, tamper detection,\n\
                  privileged reseal and the one-way evidence freeze."
)]
struct Cli {
    /// Chain configuration TOML. Defaults apply when omitted.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every scenario in sequence.
    RunAll,
    /// Two business events, a verify, a dispute freeze and a rejected re-freeze.
    Scenario,
    /// Corrupt a stored event and watch verify find it.
    Tamper,
    /// Concurrent appends to one order, then verify.
    Stress {
        /// Number of concurrent appends.
        #[arg(long, default_value_t = 100)]
        appends: u64,
    },
    /// Import a chain hashed by a legacy encoder and reseal it.
    Reseal,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug for per-append detail.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = load_config(cli.config.as_ref()).and_then(|config| match cli.command {
        Command::RunAll => run_all(&config),
        Command::Scenario => dispute::run_scenario(&config),
        Command::Tamper => tamper::run_scenario(&config),
        Command::Stress { appends } => stress::run_scenario(&config, appends),
        Command::Reseal => reseal::run_scenario(&config),
    });

    match result {
        Ok(()) => {
            println!("All selected scenarios completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> LedgerResult<ChainConfig> {
    match path {
        Some(path) => ChainConfig::from_file(path),
        None => Ok(ChainConfig::default()),
    }
}

fn run_all(config: &ChainConfig) -> LedgerResult<()> {
    dispute::run_scenario(config)?;
    tamper::run_scenario(config)?;
    stress::run_scenario(config, 100)?;
    reseal::run_scenario(config)?;
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("Forensic Order Event Chain");
    println!("==========================");
    println!();
    println!("Per order, every append:");
    println!("  [1] takes the order's write lock");
    println!("  [2] reads the tail and assigns sequence = tail + 1, prevHash = tail hash");
    println!("  [3] hashes the canonical encoding of the event with SHA-256");
    println!("  [4] inserts under a unique (orderId, sequenceNumber) constraint and commits");
    println!();
}
