//! EIP-1559 fee parameter computation.

use crate::client::ChainClient;
use crate::error::ChainResult;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default minimum priority fee in gwei. The underlying network frequently
/// under-prices inclusion; validators drop tips below ~25 gwei, so 35 keeps
/// a margin.
pub const DEFAULT_MIN_PRIORITY_GWEI: u64 = 35;

const WEI_PER_GWEI: u128 = 1_000_000_000;

/// Fee parameters for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeParams {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

impl FeeParams {
    /// Pure fee computation over oracle inputs.
    ///
    /// Priority fee is floored at `min_priority`; max fee is
    /// `2 * base_fee + priority`, tolerating one base-fee doubling before
    /// the transaction stalls.
    pub fn compute(base_fee: u128, suggested_priority: u128, min_priority: u128) -> Self {
        let max_priority_fee_per_gas = suggested_priority.max(min_priority);
        Self {
            max_fee_per_gas: 2 * base_fee + max_priority_fee_per_gas,
            max_priority_fee_per_gas,
        }
    }
}

/// Quotes fee parameters from live chain state.
#[derive(Debug, Clone, Copy)]
pub struct GasOracle {
    min_priority_fee: u128,
}

impl Default for GasOracle {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_PRIORITY_GWEI)
    }
}

impl GasOracle {
    pub fn new(min_priority_gwei: u64) -> Self {
        Self {
            min_priority_fee: min_priority_gwei as u128 * WEI_PER_GWEI,
        }
    }

    /// Read base fee and suggested priority fee, then compute fee params.
    ///
    /// # Errors
    /// A failed oracle read propagates as `ChainError::FeeOracle` — fatal
    /// for the calling operation, no retry.
    pub async fn quote(&self, chain: &ChainClient) -> ChainResult<FeeParams> {
        let (base_fee, suggested_priority) = chain.fee_inputs().await?;
        let params = FeeParams::compute(base_fee, suggested_priority, self.min_priority_fee);
        debug!(
            base_fee,
            suggested_priority,
            max_fee = params.max_fee_per_gas,
            priority = params.max_priority_fee_per_gas,
            "Quoted fee params"
        );
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GWEI: u128 = WEI_PER_GWEI;

    #[test]
    fn test_priority_floor_applied() {
        // Suggested 5 gwei, floor 35 gwei: floor wins.
        let params = FeeParams::compute(30 * GWEI, 5 * GWEI, 35 * GWEI);
        assert_eq!(params.max_priority_fee_per_gas, 35 * GWEI);
        assert_eq!(params.max_fee_per_gas, 2 * 30 * GWEI + 35 * GWEI);
    }

    #[test]
    fn test_suggested_priority_above_floor_kept() {
        let params = FeeParams::compute(30 * GWEI, 50 * GWEI, 35 * GWEI);
        assert_eq!(params.max_priority_fee_per_gas, 50 * GWEI);
    }

    #[test]
    fn test_max_fee_tolerates_one_base_fee_doubling() {
        let params = FeeParams::compute(100 * GWEI, 40 * GWEI, 35 * GWEI);
        // After one doubling the base fee is 200 gwei; the cap still covers
        // base + priority.
        assert!(params.max_fee_per_gas >= 200 * GWEI + params.max_priority_fee_per_gas);
    }
}
