//! `disperse` - command-line front end for the dispersal engine.
//!
//! ```bash
//! # How much SOL does a 3-wallet run need?
//! disperse estimate --paths 3 --max 0.5
//!
//! # Generate wallets, wait for the deposit, disperse, then sweep. Every
//! # wallet's secret key lands in disperse_wallet_keys.txt first.
//! disperse --rpc-url https://api.devnet.solana.com run --paths 3 \
//!     --export landing_wallet_private_keys.txt --withdraw-to <address>
//! ```

mod cli;

use std::fs;
use std::time::Duration;

use anyhow::{Context, Result};
use disperse_sdk::core::constants::LAMPORTS_PER_SOL;
use disperse_sdk::{
    cancel_pair, parse_address, AmountRange, DisperseError, Disperser, RpcConnection, Run,
    RunSnapshot, SweepOutcome, SweepReport,
};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command.clone() {
        Commands::Estimate { paths, max } => estimate(&cli, paths, max),
        Commands::Run {
            paths,
            min,
            max,
            export,
            keys_file,
            withdraw_to,
            poll_secs,
            hop_delay_ms,
        } => {
            let config = cli
                .config()
                .with_poll_interval(Duration::from_secs(poll_secs))
                .with_hop_delay(Duration::from_millis(hop_delay_ms));
            config.validate()?;

            let range = AmountRange::from_sol(min, max)?;
            let destination = withdraw_to.as_deref().map(parse_address).transpose()?;

            let run = Run::generate(paths)?;
            fs::write(&keys_file, run.export_keys())
                .with_context(|| format!("failed to write {}", keys_file.display()))?;
            println!(
                "Secret keys of all {} wallets written to {}",
                run.wallets().len(),
                keys_file.display()
            );
            if let Some(path) = &export {
                fs::write(path, run.export_landing_keys())
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("Landing wallet keys written to {}", path.display());
            }

            let estimated = config.fees.estimated_total_cost(paths, range.max);
            let required = config.fees.required_deposit(paths, range.max);
            println!("Funding wallet: {}", run.funding_address());
            println!(
                "Send approximately {:.4} SOL; {:.4} SOL covers every random draw.",
                sol(estimated),
                sol(required)
            );
            for (i, landing) in run.landing_addresses().iter().enumerate() {
                println!("Landing wallet {}: {}", i + 1, landing);
            }

            let (handle, token) = cancel_pair();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Received Ctrl+C, cancelling run...");
                    handle.cancel();
                }
            });

            let connection = RpcConnection::new(&config);
            tracing::info!("Connecting to {}", connection.url());
            let mut disperser = Disperser::new(connection, config).with_cancel(token);
            let printer = tokio::spawn(print_status(disperser.subscribe(), cli.json));

            let outcome = disperser.disperse(&run, range).await;
            match &outcome {
                Ok(report) if cli.json => println!("{}", serde_json::to_string(report)?),
                Ok(report) => {
                    println!(
                        "{}/{} landing wallets funded",
                        report.landed_count(),
                        report.paths.len()
                    );
                    for (i, error) in report.abandoned() {
                        println!("  Landing Wallet {}: {}", i + 1, error);
                    }
                },
                Err(e) => eprintln!("Dispersal failed: {}", e),
            }

            let cancelled = matches!(outcome, Err(DisperseError::Cancelled));
            if !cancelled {
                let sheet = disperser.refresh_balances(&run).await;
                if cli.json {
                    println!("{}", serde_json::to_string(&sheet)?);
                } else {
                    println!("Landing wallets hold {:.4} SOL", sol(sheet.total_landed()));
                }
            }

            if let (Some(destination), false) = (destination, cancelled) {
                let report = disperser.withdraw_all(&run, &destination).await?;
                print_sweep(&report, cli.json)?;

                let stranded = matches!(&outcome, Ok(r) if r.abandoned().next().is_some());
                if stranded {
                    let report = disperser.recover_intermediates(&run, &destination).await?;
                    print_sweep(&report, cli.json)?;
                }
            } else {
                println!(
                    "Funds remain in the run's wallets; keys are in {}",
                    keys_file.display()
                );
            }

            drop(disperser);
            let _ = printer.await;
            outcome.map(|_| ()).map_err(Into::into)
        },
    }
}

fn estimate(cli: &Cli, paths: usize, max: f64) -> Result<()> {
    let range = AmountRange::from_sol(0.0, max)?;
    let fees = cli.config().fees;
    let transactions = fees.total_transaction_count(paths);
    let total = fees.estimated_total_cost(paths, range.max);
    let required = fees.required_deposit(paths, range.max);

    if cli.json {
        let value = serde_json::json!({
            "paths": paths,
            "transactions": transactions,
            "estimated_lamports": total,
            "required_lamports": required,
        });
        println!("{}", value);
    } else {
        println!("Transactions: {}", transactions);
        println!("Estimated total: {:.4} SOL", sol(total));
        println!("Covers every draw: {:.4} SOL", sol(required));
    }
    Ok(())
}

/// Render every snapshot the engine publishes until it goes away.
async fn print_status(mut rx: watch::Receiver<RunSnapshot>, json: bool) {
    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();
        if json {
            if let Ok(line) = serde_json::to_string(&snapshot) {
                println!("{}", line);
            }
            continue;
        }

        let mut line = format!("[{:?}] {}", snapshot.run_status, snapshot.last_message);
        for (i, path) in snapshot.paths.iter().enumerate() {
            let hops: String = path.hops.iter().map(|h| h.symbol()).collect();
            line.push_str(&format!(
                " | #{} {}{}{}",
                i + 1,
                path.seed.symbol(),
                hops,
                path.landing.symbol()
            ));
        }
        println!("{}", line);
    }
}

fn print_sweep(report: &SweepReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
        return Ok(());
    }

    for entry in &report.entries {
        match &entry.outcome {
            SweepOutcome::Withdrawn { amount, signature } => {
                println!("{}: withdrew {:.4} SOL ({})", entry.label, sol(*amount), signature)
            },
            SweepOutcome::Skipped { balance } => {
                println!("{}: skipped, balance {:.4} SOL", entry.label, sol(*balance))
            },
            SweepOutcome::Failed { reason } => println!("{}: failed, {}", entry.label, reason),
        }
    }
    println!(
        "Withdrawn {:.4} SOL to {}",
        sol(report.total_withdrawn()),
        report.destination
    );
    Ok(())
}
