use async_trait::async_trait;
use disperse_sdk::core::connection::{SolConnection, TransferIntent};
use disperse_sdk::{DisperseConfig, Disperser, FeeSchedule};
use rand::rngs::StdRng;
use rand::SeedableRng;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
struct LedgerState {
    balances: HashMap<Pubkey, u64>,
    /// Every confirmed transfer, in order
    confirmed: Vec<TransferIntent>,
    submissions: usize,
    balance_queries: usize,
    /// Source accounts whose transfers are rejected
    reject_from: HashSet<Pubkey>,
    /// Destination accounts whose incoming transfers are rejected
    reject_to: HashSet<Pubkey>,
    /// Accounts whose incoming funds vanish, as if drained elsewhere
    sinks: HashSet<Pubkey>,
    /// Accounts whose balance query fails
    unreadable: HashSet<Pubkey>,
}

/// In-memory ledger. The base fee is charged to the sender on every
/// confirmed transfer, like the real network.
#[derive(Clone)]
pub struct MockLedger {
    state: Arc<Mutex<LedgerState>>,
    base_fee: u64,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState::default())),
            base_fee: FeeSchedule::default().base_fee,
        }
    }

    pub async fn fund(&self, account: &Pubkey, lamports: u64) {
        let mut state = self.state.lock().await;
        *state.balances.entry(*account).or_default() += lamports;
    }

    pub async fn balance(&self, account: &Pubkey) -> u64 {
        let state = self.state.lock().await;
        state.balances.get(account).copied().unwrap_or(0)
    }

    pub async fn reject_transfers_from(&self, account: &Pubkey) {
        self.state.lock().await.reject_from.insert(*account);
    }

    pub async fn allow_transfers_from(&self, account: &Pubkey) {
        self.state.lock().await.reject_from.remove(account);
    }

    pub async fn reject_transfers_to(&self, account: &Pubkey) {
        self.state.lock().await.reject_to.insert(*account);
    }

    pub async fn drain_incoming(&self, account: &Pubkey) {
        self.state.lock().await.sinks.insert(*account);
    }

    pub async fn make_unreadable(&self, account: &Pubkey) {
        self.state.lock().await.unreadable.insert(*account);
    }

    pub async fn submissions(&self) -> usize {
        self.state.lock().await.submissions
    }

    pub async fn balance_queries(&self) -> usize {
        self.state.lock().await.balance_queries
    }

    pub async fn confirmed(&self) -> Vec<TransferIntent> {
        self.state.lock().await.confirmed.clone()
    }
}

#[async_trait]
impl SolConnection for MockLedger {
    async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64, Box<dyn Error + Send + Sync>> {
        let mut state = self.state.lock().await;
        state.balance_queries += 1;
        if state.unreadable.contains(pubkey) {
            return Err(format!("account {} unavailable", pubkey).into());
        }
        Ok(state.balances.get(pubkey).copied().unwrap_or(0))
    }

    async fn submit_transfer(
        &self,
        intent: &TransferIntent,
        signer: &Keypair,
    ) -> Result<Signature, Box<dyn Error + Send + Sync>> {
        let mut state = self.state.lock().await;
        state.submissions += 1;

        if signer.pubkey() != intent.from {
            return Err("missing signature for source account".into());
        }
        if state.reject_from.contains(&intent.from) || state.reject_to.contains(&intent.to) {
            return Err("transaction rejected by cluster".into());
        }

        let from_balance = state.balances.get(&intent.from).copied().unwrap_or(0);
        let debit = intent.lamports + self.base_fee;
        if from_balance < debit {
            return Err(format!(
                "insufficient lamports {}, need {}",
                from_balance, debit
            )
            .into());
        }

        state.balances.insert(intent.from, from_balance - debit);
        if !state.sinks.contains(&intent.to) {
            *state.balances.entry(intent.to).or_default() += intent.lamports;
        }
        state.confirmed.push(*intent);

        Ok(Signature::new_unique())
    }
}

/// Config with no waiting between polls or hops
pub fn fast_config() -> DisperseConfig {
    DisperseConfig::default()
        .with_rpc_url("http://127.0.0.1:8899")
        .with_poll_interval(std::time::Duration::from_millis(5))
        .with_hop_delay(std::time::Duration::ZERO)
}

pub fn setup_disperser(ledger: &MockLedger) -> Disperser<MockLedger> {
    Disperser::new(ledger.clone(), fast_config()).with_rng(StdRng::seed_from_u64(2024))
}
