use async_trait::async_trait;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use std::error::Error;

/// A single lamport transfer between two accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransferIntent {
    #[serde(serialize_with = "crate::status::serialize_pubkey")]
    pub from: Pubkey,
    #[serde(serialize_with = "crate::status::serialize_pubkey")]
    pub to: Pubkey,
    pub lamports: u64,
}

impl TransferIntent {
    pub fn new(from: Pubkey, to: Pubkey, lamports: u64) -> Self {
        Self { from, to, lamports }
    }
}

/// Ledger access used by the engine.
///
/// Confirmation is all-or-nothing: `submit_transfer` returns only once the
/// transfer is confirmed, or fails with the reason reported by the ledger.
#[async_trait]
pub trait SolConnection: Send + Sync {
    async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64, Box<dyn Error + Send + Sync>>;

    async fn submit_transfer(
        &self,
        intent: &TransferIntent,
        signer: &Keypair,
    ) -> Result<Signature, Box<dyn Error + Send + Sync>>;
}
