use crate::status::Stage;
use thiserror::Error;

/// Error types produced by the dispersal engine
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DisperseError {
    /// Funding balance cannot cover fees, reserves and the drawn targets
    #[error("Insufficient balance: need {required} lamports but only {available} lamports available")]
    InsufficientFunds { required: u64, available: u64 },

    /// No allocation exists for the requested inputs
    #[error("Allocation impossible: {0}")]
    AllocationImpossible(String),

    /// A hop account does not clear fee + reserve
    #[error("{stage} for Landing Wallet {} has insufficient balance: {balance} lamports (needs more than {required})", .path + 1)]
    HopInsufficientBalance {
        path: usize,
        stage: Stage,
        balance: u64,
        required: u64,
    },

    /// The ledger rejected or timed out a transfer
    #[error("{stage} for Landing Wallet {} failed: {reason}", .path + 1)]
    TransferFailed {
        path: usize,
        stage: Stage,
        reason: String,
    },

    /// Connection or RPC error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Address could not be parsed
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The run was cancelled by the caller
    #[error("Run cancelled")]
    Cancelled,
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, DisperseError>;
