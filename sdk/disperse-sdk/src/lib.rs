pub mod allocator;
pub mod balances;
pub mod config;
pub mod core;
pub mod error;
pub mod fees;
pub mod hierarchy;
pub mod orchestrator;
pub mod status;
pub mod sweep;

pub use crate::allocator::{allocate, distribute, AmountRange};
pub use crate::balances::BalanceSheet;
pub use crate::config::DisperseConfig;
pub use crate::core::cancel::{cancel_pair, CancelHandle, CancelToken};
pub use crate::core::connection::{SolConnection, TransferIntent};
pub use crate::core::rpc::RpcConnection;
pub use crate::error::{DisperseError, Result};
pub use crate::fees::FeeSchedule;
pub use crate::hierarchy::{LandingPath, Run, WalletRole};
pub use crate::orchestrator::{DispersalReport, Disperser, PathOutcome};
pub use crate::status::{HopStatus, PathStatus, RunSnapshot, RunStatus, Stage, StatusFeed};
pub use crate::sweep::{parse_address, SweepEntry, SweepOutcome, SweepReport};
