//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use disperse_sdk::DisperseConfig;

/// Multi-hop SOL dispersal.
#[derive(Parser, Debug, Clone)]
#[command(name = "disperse")]
#[command(about = "Disperse a deposit through relay wallets to fresh landing wallets")]
#[command(version)]
pub struct Cli {
    /// Solana JSON-RPC endpoint.
    #[arg(long, global = true, env = "RPC_URL")]
    pub rpc_url: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Print status snapshots and reports as JSON lines.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Estimate the deposit needed for a run.
    Estimate {
        /// Number of landing wallets.
        #[arg(long, default_value = "1")]
        paths: usize,

        /// Maximum random amount per landing wallet, in SOL.
        #[arg(long, default_value = "0.5")]
        max: f64,
    },

    /// Generate wallets, wait for the deposit and disperse it.
    Run {
        /// Number of landing wallets.
        #[arg(long, default_value = "1")]
        paths: usize,

        /// Minimum random amount per landing wallet, in SOL.
        #[arg(long, default_value = "0.1")]
        min: f64,

        /// Maximum random amount per landing wallet, in SOL.
        #[arg(long, default_value = "0.5")]
        max: f64,

        /// Write landing wallet secret keys (hex, one per line) to this file.
        #[arg(long)]
        export: Option<PathBuf>,

        /// File receiving every wallet's secret key, written before the
        /// deposit is awaited.
        #[arg(long, default_value = "disperse_wallet_keys.txt")]
        keys_file: PathBuf,

        /// Sweep landing and funding wallets to this address afterwards.
        #[arg(long)]
        withdraw_to: Option<String>,

        /// Seconds between funding balance polls.
        #[arg(long, default_value = "3")]
        poll_secs: u64,

        /// Milliseconds to wait after each confirmed transfer.
        #[arg(long, default_value = "2000")]
        hop_delay_ms: u64,
    },
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Engine configuration: defaults, then `RPC_URL`/`--rpc-url`.
    pub fn config(&self) -> DisperseConfig {
        let config = DisperseConfig::from_env();
        match &self.rpc_url {
            Some(url) => config.with_rpc_url(url.clone()),
            None => config,
        }
    }
}
