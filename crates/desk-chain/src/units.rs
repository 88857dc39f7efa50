//! Conversions between raw token units and human decimal amounts.

use crate::error::{ChainError, ChainResult};
use alloy::primitives::U256;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Convert a raw on-chain amount into a human decimal given token decimals.
pub fn to_decimal(raw: U256, decimals: u8) -> ChainResult<Decimal> {
    let value = Decimal::from_str(&raw.to_string())
        .map_err(|e| ChainError::Numeric(format!("amount {raw} exceeds decimal range: {e}")))?;
    let scale = Decimal::from(10u64.pow(decimals as u32));
    Ok(value / scale)
}

/// Convert a human decimal amount into raw on-chain units, truncating any
/// precision beyond the token's decimals.
pub fn to_base_units(amount: Decimal, decimals: u8) -> ChainResult<U256> {
    if amount.is_sign_negative() {
        return Err(ChainError::Numeric(format!("negative amount: {amount}")));
    }
    let scale = Decimal::from(10u64.pow(decimals as u32));
    let scaled = (amount * scale).trunc();
    U256::from_str(&scaled.to_string())
        .map_err(|e| ChainError::Numeric(format!("amount {amount} not representable: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_to_base_units_usdc() {
        assert_eq!(to_base_units(dec!(25), 6).unwrap(), U256::from(25_000_000u64));
        assert_eq!(to_base_units(dec!(0.5), 6).unwrap(), U256::from(500_000u64));
    }

    #[test]
    fn test_to_base_units_truncates_excess_precision() {
        assert_eq!(
            to_base_units(dec!(1.2345678), 6).unwrap(),
            U256::from(1_234_567u64)
        );
    }

    #[test]
    fn test_to_decimal_round_trip() {
        let raw = U256::from(12_345_678u64);
        assert_eq!(to_decimal(raw, 6).unwrap(), dec!(12.345678));
    }

    #[test]
    fn test_negative_amount_rejected() {
        assert!(to_base_units(dec!(-1), 6).is_err());
    }
}
