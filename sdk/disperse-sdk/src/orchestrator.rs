//! Dispersal state machine.
//!
//! `AwaitingFunding -> Seeding -> Relaying -> Done`, or `Failed` when the
//! funding cannot cover the run. Every transfer is confirmed before the next
//! one starts. Hop failures are recorded per path and never abort the run.

use crate::allocator::{self, AmountRange};
use crate::config::DisperseConfig;
use crate::core::cancel::CancelToken;
use crate::core::connection::{SolConnection, TransferIntent};
use crate::core::constants::{INTERMEDIATE_COUNT, LAMPORTS_PER_SOL};
use crate::error::{DisperseError, Result};
use crate::hierarchy::{LandingPath, Run};
use crate::status::{HopStatus, RunSnapshot, RunStatus, Stage, StatusFeed};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub(crate) fn sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Final state of one path after a dispersal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PathOutcome {
    /// Funds reached the landing account
    Landed { amount: u64 },
    /// The path stopped at a failed hop; later hops never ran
    Abandoned {
        #[serde(serialize_with = "crate::status::serialize_display")]
        error: DisperseError,
    },
}

impl PathOutcome {
    /// Whether the seed transfer left the funding account
    pub fn seeded(&self) -> bool {
        !matches!(
            self,
            PathOutcome::Abandoned {
                error: DisperseError::TransferFailed {
                    stage: Stage::Seed,
                    ..
                }
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispersalReport {
    /// Balance detected in the funding account
    pub funded: u64,

    /// Seed amount allocated to each path
    pub amounts: Vec<u64>,

    pub paths: Vec<PathOutcome>,
}

impl DispersalReport {
    pub fn landed_count(&self) -> usize {
        self.paths
            .iter()
            .filter(|p| matches!(p, PathOutcome::Landed { .. }))
            .count()
    }

    pub fn abandoned(&self) -> impl Iterator<Item = (usize, &DisperseError)> {
        self.paths.iter().enumerate().filter_map(|(i, p)| match p {
            PathOutcome::Abandoned { error } => Some((i, error)),
            PathOutcome::Landed { .. } => None,
        })
    }

    /// Lamports allocated across all paths, failed seeds included
    pub fn total_allocated(&self) -> u64 {
        self.amounts.iter().sum()
    }

    /// Lamports that actually left the funding account in seed transfers
    pub fn total_seeded(&self) -> u64 {
        self.amounts
            .iter()
            .zip(&self.paths)
            .filter(|(_, outcome)| outcome.seeded())
            .map(|(amount, _)| amount)
            .sum()
    }
}

/// Drives a [`Run`] through dispersal and withdrawal against a ledger connection.
pub struct Disperser<C: SolConnection> {
    pub(crate) connection: C,
    pub(crate) config: DisperseConfig,
    pub(crate) feed: StatusFeed,
    cancel: Option<CancelToken>,
    rng: StdRng,
}

impl<C: SolConnection> Disperser<C> {
    pub fn new(connection: C, config: DisperseConfig) -> Self {
        Self {
            connection,
            config,
            feed: StatusFeed::new(0),
            cancel: None,
            rng: StdRng::from_entropy(),
        }
    }

    /// Abort waits and stop before the next transfer once `token` fires
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Replace the random source used for amount draws
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.feed.subscribe()
    }

    pub fn snapshot(&self) -> RunSnapshot {
        self.feed.snapshot()
    }

    /// Wait for the deposit, seed every path and relay each path to its landing account.
    ///
    /// Returns `Err` only when the whole run fails before any transfer
    /// (`InsufficientFunds`, `AllocationImpossible`) or on cancellation.
    pub async fn disperse(&mut self, run: &Run, range: AmountRange) -> Result<DispersalReport> {
        self.feed.reset(run.path_count());
        info!(
            funding = %run.funding_address(),
            paths = run.path_count(),
            "starting dispersal"
        );

        let funded = match self.await_funding(&run.funding_address()).await {
            Ok(balance) => balance,
            Err(e) => return Err(self.fail(e)),
        };

        let amounts = match self.plan(funded, run.path_count(), range) {
            Ok(amounts) => amounts,
            Err(e) => return Err(self.fail(e)),
        };

        let mut outcomes = match self.seed(run, &amounts).await {
            Ok(outcomes) => outcomes,
            Err(e) => return Err(self.fail(e)),
        };

        if let Err(e) = self.relay(run, &mut outcomes).await {
            return Err(self.fail(e));
        }

        // relay() settles every path
        let paths: Vec<PathOutcome> = outcomes.into_iter().flatten().collect();
        let report = DispersalReport {
            funded,
            amounts,
            paths,
        };

        info!(
            landed = report.landed_count(),
            paths = report.paths.len(),
            "dispersal complete"
        );
        self.feed.set_run_status(RunStatus::Done, "Dispersal complete!");
        Ok(report)
    }

    async fn await_funding(&mut self, funding: &Pubkey) -> Result<u64> {
        self.feed.set_run_status(
            RunStatus::AwaitingFunding,
            "Waiting for SOL to arrive in the funding wallet...",
        );
        self.feed.set_funding(HopStatus::InProgress);

        let interval = self.config.poll_interval;
        loop {
            self.check_cancelled()?;
            match self.connection.get_balance(funding).await {
                Ok(0) => debug!(%funding, "funding wallet still empty"),
                Ok(balance) => {
                    self.feed.set_funding(HopStatus::Completed);
                    info!(%funding, balance, "funding detected");
                    return Ok(balance);
                },
                Err(e) => warn!(%funding, "funding balance query failed: {}", e),
            }
            self.pause(interval).await?;
        }
    }

    fn plan(&mut self, funded: u64, paths: usize, range: AmountRange) -> Result<Vec<u64>> {
        let fees = self.config.fees;
        let overhead = fees.total_fees(paths).saturating_add(fees.total_reserve(paths));
        let available = fees.available_after_fees(funded, paths).ok_or(
            DisperseError::InsufficientFunds {
                required: overhead,
                available: funded,
            },
        )?;

        let amounts = allocator::allocate(available, paths, range, &fees, &mut self.rng)?;
        debug!(available, ?amounts, "allocated seed amounts");
        Ok(amounts)
    }

    /// Push each path's amount from the funding account to its first intermediate.
    /// A failed seed abandons that path only.
    async fn seed(&mut self, run: &Run, amounts: &[u64]) -> Result<Vec<Option<PathOutcome>>> {
        self.feed.set_run_status(
            RunStatus::Seeding,
            format!(
                "Detected funding. Dispersing {:.4} SOL to proxies...",
                sol(amounts.iter().sum())
            ),
        );

        let delay = self.config.hop_delay;
        let mut outcomes = vec![None; run.path_count()];

        for (i, (path, amount)) in run.paths.iter().zip(amounts).enumerate() {
            self.check_cancelled()?;
            self.feed.set_stage(i, Stage::Seed, HopStatus::InProgress);

            let intent = TransferIntent::new(run.funding_address(), path.entry(), *amount);
            match self.transfer(&intent, &run.funding).await {
                Ok(_) => {
                    self.feed.set_stage(i, Stage::Seed, HopStatus::Completed);
                    self.feed.message(format!(
                        "Sent {:.4} SOL to first proxy for Landing Wallet {}",
                        sol(*amount),
                        i + 1
                    ));
                    self.pause(delay).await?;
                },
                Err(reason) => {
                    let error = DisperseError::TransferFailed {
                        path: i,
                        stage: Stage::Seed,
                        reason,
                    };
                    outcomes[i] = Some(self.abandon(i, Stage::Seed, error));
                },
            }
        }

        Ok(outcomes)
    }

    async fn relay(&mut self, run: &Run, outcomes: &mut [Option<PathOutcome>]) -> Result<()> {
        self.feed.set_run_status(
            RunStatus::Relaying,
            "All initial transfers sent. Starting proxy chain transfers...",
        );
        let delay = self.config.hop_delay;
        self.pause(delay).await?;

        for (i, path) in run.paths.iter().enumerate() {
            if outcomes[i].is_some() {
                continue;
            }
            outcomes[i] = Some(self.relay_path(i, path).await?);
        }
        Ok(())
    }

    /// Walk one path hop by hop. Only cancellation escapes as `Err`.
    async fn relay_path(&mut self, index: usize, path: &LandingPath) -> Result<PathOutcome> {
        let fees = self.config.fees;
        let delay = self.config.hop_delay;
        let mut landed = 0;

        for (hop, signer, next) in path.hops() {
            self.check_cancelled()?;
            let stage = Stage::Relay(hop);
            let last = hop + 1 == INTERMEDIATE_COUNT;
            self.feed.set_stage(index, stage, HopStatus::InProgress);

            let balance = match self.connection.get_balance(&signer.pubkey()).await {
                Ok(balance) => balance,
                Err(e) => {
                    let error = DisperseError::TransferFailed {
                        path: index,
                        stage,
                        reason: format!("balance query failed: {}", e),
                    };
                    return Ok(self.abandon(index, stage, error));
                },
            };
            debug!(path = index, hop, balance, "hop balance");

            let Some(amount) = fees.forwardable(balance) else {
                let error = DisperseError::HopInsufficientBalance {
                    path: index,
                    stage,
                    balance,
                    required: fees.hop_cost(),
                };
                return Ok(self.abandon(index, stage, error));
            };

            let intent = TransferIntent::new(signer.pubkey(), next, amount);
            match self.transfer(&intent, signer).await {
                Ok(_) => {
                    self.feed.set_stage(index, stage, HopStatus::Completed);
                    let target = if last {
                        self.feed.set_landing(index, HopStatus::Completed);
                        "landing wallet".to_string()
                    } else {
                        format!("{}", Stage::Relay(hop + 1)).to_lowercase()
                    };
                    self.feed.message(format!(
                        "{} for Landing Wallet {} sent {:.4} SOL to {}",
                        stage,
                        index + 1,
                        sol(amount),
                        target
                    ));
                    landed = amount;
                    self.pause(delay).await?;
                },
                Err(reason) => {
                    let error = DisperseError::TransferFailed {
                        path: index,
                        stage,
                        reason,
                    };
                    return Ok(self.abandon(index, stage, error));
                },
            }
        }

        Ok(PathOutcome::Landed { amount: landed })
    }

    /// Mark `stage` as failed and leave the rest of the path pending. The landing
    /// slot is only touched when the final hop fails.
    fn abandon(&self, path: usize, stage: Stage, error: DisperseError) -> PathOutcome {
        self.feed.set_stage(path, stage, HopStatus::Error);
        if stage == Stage::Relay(INTERMEDIATE_COUNT - 1) {
            self.feed.set_landing(path, HopStatus::Error);
        }
        warn!(path, %stage, "path abandoned: {}", error);
        self.feed.message(format!("Error: {}", error));
        PathOutcome::Abandoned { error }
    }

    fn fail(&self, error: DisperseError) -> DisperseError {
        warn!("run failed: {}", error);
        self.feed.set_run_status(RunStatus::Failed, format!("Error: {}", error));
        error
    }

    pub(crate) async fn transfer(
        &self,
        intent: &TransferIntent,
        signer: &Keypair,
    ) -> std::result::Result<Signature, String> {
        debug!(from = %intent.from, to = %intent.to, lamports = intent.lamports, "submitting transfer");
        match self.connection.submit_transfer(intent, signer).await {
            Ok(signature) => {
                debug!(%signature, "transfer confirmed");
                Ok(signature)
            },
            Err(e) => Err(e.to_string()),
        }
    }

    pub(crate) fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(DisperseError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Sleep for `duration`, returning early with `Cancelled` if the token fires
    pub(crate) async fn pause(&mut self, duration: Duration) -> Result<()> {
        let Some(token) = self.cancel.as_mut() else {
            tokio::time::sleep(duration).await;
            return Ok(());
        };
        if token.is_cancelled() {
            return Err(DisperseError::Cancelled);
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = token.cancelled() => Err(DisperseError::Cancelled),
        }
    }
}
