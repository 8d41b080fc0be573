//! Fee and reserve arithmetic.
//!
//! Every account that forwards funds keeps `fee_per_transfer + reserve`
//! behind, so a hop moves `balance - hop_cost` lamports. All functions
//! saturate instead of going negative.

use crate::core::constants::{
    BASE_FEE, INTERMEDIATE_COUNT, RENT_EXEMPT_RESERVE, SAFETY_BUFFER,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Network fee per transaction
    pub base_fee: u64,

    /// Headroom added to every transfer's fee budget
    pub safety_buffer: u64,

    /// Minimum balance a usable account must retain
    pub reserve: u64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            base_fee: BASE_FEE,
            safety_buffer: SAFETY_BUFFER,
            reserve: RENT_EXEMPT_RESERVE,
        }
    }
}

impl FeeSchedule {
    pub fn fee_per_transfer(&self) -> u64 {
        self.base_fee.saturating_add(self.safety_buffer)
    }

    /// Amount an account keeps back when forwarding its balance
    pub fn hop_cost(&self) -> u64 {
        self.fee_per_transfer().saturating_add(self.reserve)
    }

    /// Cost of the forwarding hops on one path, added on top of each drawn amount
    pub fn path_overhead(&self) -> u64 {
        self.hop_cost().saturating_mul(INTERMEDIATE_COUNT as u64)
    }

    /// One seed transfer plus one transfer per intermediate on every path
    pub fn total_transaction_count(&self, paths: usize) -> u64 {
        (INTERMEDIATE_COUNT as u64)
            .saturating_mul(paths as u64)
            .saturating_add(1)
    }

    pub fn total_fees(&self, paths: usize) -> u64 {
        self.total_transaction_count(paths)
            .saturating_mul(self.fee_per_transfer())
    }

    /// Reserve held by the funding, landing and intermediate accounts of a run
    pub fn total_reserve(&self, paths: usize) -> u64 {
        let accounts = (paths as u64)
            .saturating_mul(1 + INTERMEDIATE_COUNT as u64)
            .saturating_add(1);
        self.reserve.saturating_mul(accounts)
    }

    /// Pre-flight estimate of the deposit needed for `paths` paths whose drawn
    /// amounts are at most `max_amount`. Advisory only.
    pub fn estimated_total_cost(&self, paths: usize, max_amount: u64) -> u64 {
        let rent = self.reserve.saturating_mul((paths as u64).saturating_add(1));
        self.total_fees(paths)
            .saturating_add(rent)
            .saturating_add((paths as u64).saturating_mul(max_amount))
    }

    /// Deposit that covers every fee and reserve plus `paths` draws of
    /// `amount` and their hop overhead. With `amount` set to the exclusive
    /// upper bound of the draw range, any draw fits.
    pub fn required_deposit(&self, paths: usize, amount: u64) -> u64 {
        let per_path = amount.saturating_add(self.path_overhead());
        self.total_fees(paths)
            .saturating_add(self.total_reserve(paths))
            .saturating_add((paths as u64).saturating_mul(per_path))
    }

    /// Funds left for distribution once fees and reserves are set aside.
    /// `None` when nothing is left.
    pub fn available_after_fees(&self, balance: u64, paths: usize) -> Option<u64> {
        let overhead = self
            .total_fees(paths)
            .saturating_add(self.total_reserve(paths));
        balance.checked_sub(overhead).filter(|available| *available > 0)
    }

    /// Amount an account holding `balance` can forward, if it clears the hop cost
    pub fn forwardable(&self, balance: u64) -> Option<u64> {
        if balance > self.hop_cost() {
            Some(balance - self.hop_cost())
        } else {
            None
        }
    }
}
