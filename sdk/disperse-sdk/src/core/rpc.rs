use crate::config::DisperseConfig;
use crate::core::connection::{SolConnection, TransferIntent};
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use std::error::Error;

/// `SolConnection` backed by a Solana JSON-RPC endpoint at `confirmed` commitment.
pub struct RpcConnection {
    client: RpcClient,
}

impl RpcConnection {
    pub fn new(config: &DisperseConfig) -> Self {
        let client = RpcClient::new_with_timeouts_and_commitment(
            config.rpc_url.clone(),
            config.confirm_timeout,
            CommitmentConfig::confirmed(),
            config.confirm_timeout,
        );
        Self { client }
    }

    pub fn url(&self) -> String {
        self.client.url()
    }
}

#[async_trait]
impl SolConnection for RpcConnection {
    async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64, Box<dyn Error + Send + Sync>> {
        Ok(self.client.get_balance(pubkey).await?)
    }

    async fn submit_transfer(
        &self,
        intent: &TransferIntent,
        signer: &Keypair,
    ) -> Result<Signature, Box<dyn Error + Send + Sync>> {
        if signer.pubkey() != intent.from {
            return Err(format!(
                "signer {} does not own source account {}",
                signer.pubkey(),
                intent.from
            )
            .into());
        }

        let ix = system_instruction::transfer(&intent.from, &intent.to, intent.lamports);
        let latest_blockhash = self.client.get_latest_blockhash().await?;
        let tx = Transaction::new_signed_with_payer(
            &[ix],
            Some(&intent.from),
            &[signer],
            latest_blockhash,
        );
        Ok(self.client.send_and_confirm_transaction(&tx).await?)
    }
}
