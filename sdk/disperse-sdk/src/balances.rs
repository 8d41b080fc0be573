//! On-demand balance refresh for the funding and landing accounts.

use crate::core::connection::SolConnection;
use crate::hierarchy::Run;
use crate::orchestrator::{sol, Disperser};
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

/// Balances read by one refresh. `None` marks an account whose read failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceSheet {
    pub funding: Option<u64>,
    pub landing: Vec<Option<u64>>,
}

impl BalanceSheet {
    /// Sum of the landing balances that could be read
    pub fn total_landed(&self) -> u64 {
        self.landing.iter().flatten().sum()
    }

    pub fn unreadable_count(&self) -> usize {
        self.landing.iter().filter(|b| b.is_none()).count() + usize::from(self.funding.is_none())
    }
}

impl<C: SolConnection> Disperser<C> {
    /// Read the funding and every landing balance and cache them in the
    /// status feed. A failed read is logged and leaves that entry `None`;
    /// it never fails the refresh.
    pub async fn refresh_balances(&self, run: &Run) -> BalanceSheet {
        if self.feed.snapshot().paths.len() != run.path_count() {
            self.feed.reset(run.path_count());
        }

        let funding = self.read_balance(&run.funding_address()).await;
        let mut landing = Vec::with_capacity(run.path_count());
        for address in run.landing_addresses() {
            landing.push(self.read_balance(&address).await);
        }

        self.feed.set_balances(funding, &landing);
        let sheet = BalanceSheet { funding, landing };
        if sheet.unreadable_count() > 0 {
            self.feed.message(format!(
                "Error fetching balances for {} wallet(s)",
                sheet.unreadable_count()
            ));
        } else {
            self.feed.message(format!(
                "Balances refreshed: {:.4} SOL across landing wallets",
                sol(sheet.total_landed())
            ));
        }
        sheet
    }

    async fn read_balance(&self, address: &Pubkey) -> Option<u64> {
        match self.connection.get_balance(address).await {
            Ok(balance) => {
                debug!(%address, balance, "balance refreshed");
                Some(balance)
            },
            Err(e) => {
                warn!(%address, "balance query failed: {}", e);
                None
            },
        }
    }
}
