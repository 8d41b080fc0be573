use crate::core::connection::{SolConnection, TransferIntent};
use crate::error::{DisperseError, Result};
use crate::hierarchy::{Run, WalletRole};
use crate::orchestrator::{sol, Disperser};
use crate::status::RunStatus;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use std::str::FromStr;
use tracing::{info, warn};

/// Parse a base58 withdrawal address
pub fn parse_address(address: &str) -> Result<Pubkey> {
    Pubkey::from_str(address.trim())
        .map_err(|e| DisperseError::InvalidAddress(format!("{}: {}", address, e)))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SweepOutcome {
    Withdrawn { amount: u64, signature: String },
    /// Balance does not cover fee + reserve
    Skipped { balance: u64 },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepEntry {
    pub label: String,
    #[serde(serialize_with = "crate::status::serialize_pubkey")]
    pub address: Pubkey,
    #[serde(flatten)]
    pub outcome: SweepOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    #[serde(serialize_with = "crate::status::serialize_pubkey")]
    pub destination: Pubkey,
    pub entries: Vec<SweepEntry>,
}

impl SweepReport {
    pub fn total_withdrawn(&self) -> u64 {
        self.entries
            .iter()
            .map(|e| match e.outcome {
                SweepOutcome::Withdrawn { amount, .. } => amount,
                _ => 0,
            })
            .sum()
    }

    pub fn all_skipped(&self) -> bool {
        self.entries
            .iter()
            .all(|e| matches!(e.outcome, SweepOutcome::Skipped { .. }))
    }

    pub fn failures(&self) -> impl Iterator<Item = &SweepEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, SweepOutcome::Failed { .. }))
    }
}

impl<C: SolConnection> Disperser<C> {
    /// Drain every landing account, then the funding account, into `destination`.
    ///
    /// Accounts that cannot cover fee + reserve are skipped. Per-account
    /// failures are recorded and the sweep moves on; only cancellation
    /// returns `Err`.
    pub async fn withdraw_all(&mut self, run: &Run, destination: &Pubkey) -> Result<SweepReport> {
        let mut accounts: Vec<_> = run
            .wallets()
            .into_iter()
            .filter(|(role, _)| matches!(role, WalletRole::Landing { .. }))
            .collect();
        accounts.push((WalletRole::Funding, &run.funding));

        self.sweep(
            run,
            accounts,
            destination,
            "Withdrawing SOL from landing wallets and funding wallet...",
        )
        .await
    }

    /// Drain the intermediates of every path into `destination`. Recovers
    /// funds stranded by an abandoned path; forwarded intermediates only
    /// hold their reserve and are skipped.
    pub async fn recover_intermediates(
        &mut self,
        run: &Run,
        destination: &Pubkey,
    ) -> Result<SweepReport> {
        let accounts = run
            .wallets()
            .into_iter()
            .filter(|(role, _)| matches!(role, WalletRole::Intermediate { .. }))
            .collect();

        self.sweep(
            run,
            accounts,
            destination,
            "Recovering SOL from proxy wallets...",
        )
        .await
    }

    async fn sweep(
        &mut self,
        run: &Run,
        accounts: Vec<(WalletRole, &Keypair)>,
        destination: &Pubkey,
        start: &str,
    ) -> Result<SweepReport> {
        if self.feed.snapshot().paths.len() != run.path_count() {
            self.feed.reset(run.path_count());
        }
        self.feed.set_run_status(RunStatus::Withdrawing, start);
        info!(%destination, accounts = accounts.len(), "starting withdrawal");

        let mut entries = Vec::with_capacity(accounts.len());
        for (role, keypair) in accounts {
            self.check_cancelled()?;
            let label = role.to_string();
            let outcome = self.withdraw_one(&label, keypair, destination).await?;
            entries.push(SweepEntry {
                label,
                address: keypair.pubkey(),
                outcome,
            });
        }

        let report = SweepReport {
            destination: *destination,
            entries,
        };
        info!(
            withdrawn = report.total_withdrawn(),
            failures = report.failures().count(),
            "withdrawal complete"
        );
        self.feed.set_run_status(RunStatus::Withdrawn, "Withdrawal complete!");
        Ok(report)
    }

    async fn withdraw_one(
        &mut self,
        label: &str,
        keypair: &Keypair,
        destination: &Pubkey,
    ) -> Result<SweepOutcome> {
        let address = keypair.pubkey();
        let balance = match self.connection.get_balance(&address).await {
            Ok(balance) => balance,
            Err(e) => {
                let reason =
                    DisperseError::Connection(format!("balance query failed: {}", e)).to_string();
                warn!(%address, "{}: {}", label, reason);
                self.feed
                    .message(format!("Error withdrawing from {}: {}", label, reason));
                return Ok(SweepOutcome::Failed { reason });
            },
        };

        let Some(amount) = self.config.fees.forwardable(balance) else {
            self.feed.message(format!(
                "Skipping {} - insufficient balance: {:.4} SOL",
                label,
                sol(balance)
            ));
            return Ok(SweepOutcome::Skipped { balance });
        };

        let intent = TransferIntent::new(address, *destination, amount);
        match self.transfer(&intent, keypair).await {
            Ok(signature) => {
                self.feed
                    .message(format!("Withdrawn {:.4} SOL from {}", sol(amount), label));
                let delay = self.config.hop_delay;
                self.pause(delay).await?;
                Ok(SweepOutcome::Withdrawn {
                    amount,
                    signature: signature.to_string(),
                })
            },
            Err(reason) => {
                warn!(%address, "{} withdrawal failed: {}", label, reason);
                self.feed
                    .message(format!("Error withdrawing from {}: {}", label, reason));
                Ok(SweepOutcome::Failed { reason })
            },
        }
    }
}
