//! Per-path amount allocation.
//!
//! Each path gets a random base amount so the landing balances do not share
//! an obvious pattern, plus the cost of its three forwarding hops. Whatever is
//! left of the available funds is spread proportionally with integer floor
//! division; the remainder stays in the funding account.

use crate::error::{DisperseError, Result};
use crate::fees::FeeSchedule;
use rand::Rng;
use serde::{Deserialize, Serialize};
use solana_sdk::native_token::sol_to_lamports;

/// Bounds of the random base amount per path, in lamports. `max` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountRange {
    pub min: u64,
    pub max: u64,
}

impl AmountRange {
    pub fn new(min: u64, max: u64) -> Result<Self> {
        if min > max {
            return Err(DisperseError::AllocationImpossible(format!(
                "minimum amount {} exceeds maximum amount {}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    /// Build a range from amounts in SOL
    pub fn from_sol(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() || min < 0.0 || max < 0.0 {
            return Err(DisperseError::AllocationImpossible(format!(
                "amounts must be non-negative, got {} and {}",
                min, max
            )));
        }
        Self::new(sol_to_lamports(min), sol_to_lamports(max))
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        if self.min >= self.max {
            self.min
        } else {
            rng.gen_range(self.min..self.max)
        }
    }
}

/// Draw one target per path: a random base in `range` plus the path's hop overhead.
pub fn draw_targets<R: Rng + ?Sized>(
    paths: usize,
    range: AmountRange,
    fees: &FeeSchedule,
    rng: &mut R,
) -> Result<Vec<u64>> {
    if paths == 0 {
        return Err(DisperseError::AllocationImpossible(
            "at least one landing wallet is required".to_string(),
        ));
    }

    let overhead = fees.path_overhead();
    (0..paths)
        .map(|_| {
            range.draw(rng).checked_add(overhead).ok_or_else(|| {
                DisperseError::AllocationImpossible("target amount overflows".to_string())
            })
        })
        .collect()
}

/// Fit `targets` into `available`: fail when they do not fit, otherwise add the
/// surplus proportionally to each target.
pub fn distribute(available: u64, targets: &[u64]) -> Result<Vec<u64>> {
    let total: u128 = targets.iter().map(|t| *t as u128).sum();

    if total > available as u128 {
        return Err(DisperseError::InsufficientFunds {
            required: u64::try_from(total).unwrap_or(u64::MAX),
            available,
        });
    }
    if total == 0 || total == available as u128 {
        return Ok(targets.to_vec());
    }

    let surplus = available as u128 - total;
    Ok(targets
        .iter()
        .map(|t| {
            // share <= surplus <= u64::MAX, and t + share <= available
            let share = surplus * (*t as u128) / total;
            t + share as u64
        })
        .collect())
}

/// Compute the seed amount for every path out of `available` lamports.
pub fn allocate<R: Rng + ?Sized>(
    available: u64,
    paths: usize,
    range: AmountRange,
    fees: &FeeSchedule,
    rng: &mut R,
) -> Result<Vec<u64>> {
    let targets = draw_targets(paths, range, fees, rng)?;
    distribute(available, &targets)
}
