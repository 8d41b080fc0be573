use std::time::Duration;

pub use solana_sdk::native_token::LAMPORTS_PER_SOL;

/// Base network fee charged per transaction signature
pub const BASE_FEE: u64 = 5_000;

/// Extra headroom added on top of the base fee
pub const SAFETY_BUFFER: u64 = 100_000;

/// Fee budgeted for every outgoing transfer
pub const FEE_PER_TRANSFER: u64 = BASE_FEE + SAFETY_BUFFER;

/// Minimum balance for rent exemption of a system account
pub const RENT_EXEMPT_RESERVE: u64 = 890_880;

/// Number of relay accounts between the funding and landing account of a path
pub const INTERMEDIATE_COUNT: usize = 3;

/// Interval between balance polls while waiting for the initial deposit
pub const FUNDING_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Pause after every confirmed transfer before the next balance read
pub const HOP_DELAY: Duration = Duration::from_secs(2);

/// How long the RPC client waits for a transaction to confirm
pub const CONFIRM_TIMEOUT: Duration = Duration::from_secs(60);

pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";
