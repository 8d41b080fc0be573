//! Engine configuration.

use crate::core::constants::{CONFIRM_TIMEOUT, DEFAULT_RPC_URL, FUNDING_POLL_INTERVAL, HOP_DELAY};
use crate::error::{DisperseError, Result};
use crate::fees::FeeSchedule;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisperseConfig {
    /// JSON-RPC endpoint
    pub rpc_url: String,

    /// Interval between funding balance polls
    pub poll_interval: Duration,

    /// Pause after each confirmed transfer
    pub hop_delay: Duration,

    /// RPC request and confirmation timeout
    pub confirm_timeout: Duration,

    pub fees: FeeSchedule,
}

impl Default for DisperseConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            poll_interval: FUNDING_POLL_INTERVAL,
            hop_delay: HOP_DELAY,
            confirm_timeout: CONFIRM_TIMEOUT,
            fees: FeeSchedule::default(),
        }
    }
}

impl DisperseConfig {
    /// Defaults, with the endpoint taken from `RPC_URL` when set
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = env::var("RPC_URL") {
            if !url.trim().is_empty() {
                config.rpc_url = url;
            }
        }
        config
    }

    pub fn with_rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = url.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_hop_delay(mut self, delay: Duration) -> Self {
        self.hop_delay = delay;
        self
    }

    pub fn with_confirm_timeout(mut self, timeout: Duration) -> Self {
        self.confirm_timeout = timeout;
        self
    }

    pub fn with_fees(mut self, fees: FeeSchedule) -> Self {
        self.fees = fees;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.rpc_url.starts_with("http://") || self.rpc_url.starts_with("https://")) {
            return Err(DisperseError::Config(format!(
                "rpc url must be http(s): {}",
                self.rpc_url
            )));
        }
        if self.confirm_timeout.is_zero() {
            return Err(DisperseError::Config(
                "confirmation timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DisperseConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.hop_delay, Duration::from_secs(2));
        assert_eq!(config.confirm_timeout, Duration::from_secs(60));
        assert_eq!(config.fees, FeeSchedule::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let config = DisperseConfig::default()
            .with_rpc_url("http://127.0.0.1:8899")
            .with_hop_delay(Duration::ZERO)
            .with_poll_interval(Duration::from_millis(10));
        assert_eq!(config.rpc_url, "http://127.0.0.1:8899");
        assert!(config.hop_delay.is_zero());
        assert_eq!(config.poll_interval, Duration::from_millis(10));
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = DisperseConfig::default().with_rpc_url("ws://localhost");
        assert!(matches!(config.validate(), Err(DisperseError::Config(_))));
    }
}
