//! Ledger Verification CLI Tool
//!
//! Command-line tool for verifying and inspecting the inventory audit ledger.

use clap::{Parser, Subcommand};
use std::sync::Arc;

use inventory_ledger::config::AppConfig;
use inventory_ledger::crypto::SignatureService;
use inventory_ledger::database::Database;
use inventory_ledger::ledger::ChainVerifier;

#[derive(Parser)]
#[command(name = "ledger-verify")]
#[command(about = "Inventory audit ledger verification tool")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database URL (overrides the configured DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify the full hash chain and report tampered entries
    Verify,

    /// Show ledger statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load()?;
    let database_url = cli
        .database_url
        .unwrap_or_else(|| config.database_url.clone());

    let database = Database::connect(&database_url).await?;
    database.run_migrations().await?;

    match cli.command {
        Commands::Verify => {
            let signer = Arc::new(SignatureService::new(&config.hmac_secret));
            let verifier = ChainVerifier::new(database, signer);
            let report = verifier.verify().await?;

            println!("Verification run {}", report.run_id);
            println!("  Entries checked: {}", report.total_entries);

            if report.is_valid {
                println!("  Result: chain intact");
            } else {
                println!("  Result: TAMPERING DETECTED");
                for record in &report.tampered_entries {
                    println!("    entry {}: {}", record.index, record.reason);
                }
                std::process::exit(1);
            }
        }

        Commands::Stats => {
            let stats = database.stats().await?;

            println!("Ledger statistics:");
            println!("  Total entries: {}", stats.total_entries);
            println!("  Verified entries: {}", stats.verified_entries);
            println!("  Flagged entries: {}", stats.flagged_entries);
            match stats.head_hash {
                Some(hash) => println!("  Head hash: {}", hash),
                None => println!("  Head hash: (empty ledger)"),
            }
            if let Some(ts) = stats.last_timestamp {
                println!("  Last entry at: {}", ts);
            }
        }
    }

    Ok(())
}
