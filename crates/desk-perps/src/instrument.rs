//! Per-instrument precision rules.
//!
//! Metadata is fetched fresh per order (never cached) so orders never act
//! on stale precision rules. The venue constrains prices to 5 significant
//! figures and `6 - szDecimals` decimal places for perps; sizes carry at
//! most `szDecimals` decimals.

use desk_core::{Price, Size};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Maximum significant figures for price formatting.
pub const MAX_SIG_FIGS: u32 = 5;

/// Perp price decimal budget: price decimals = this minus szDecimals.
pub const MAX_PERP_PRICE_DECIMALS: u32 = 6;

/// Instrument metadata resolved from the venue universe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentSpec {
    /// Instrument symbol (e.g., "BTC").
    pub name: String,

    /// Position in the universe array; doubles as the wire asset id.
    pub asset_index: u32,

    /// Size decimal precision from the venue (szDecimals).
    pub sz_decimals: u32,
}

impl InstrumentSpec {
    pub fn max_price_decimals(&self) -> u32 {
        MAX_PERP_PRICE_DECIMALS.saturating_sub(self.sz_decimals)
    }

    /// Minimum price increment implied by the decimal budget.
    pub fn tick_size(&self) -> Price {
        Price::new(Decimal::new(1, self.max_price_decimals()))
    }

    /// Format a price for the wire: tick-aligned input truncated to the
    /// significant-figure and decimal budgets, trailing zeros stripped.
    pub fn format_price(&self, price: Price) -> String {
        format_with_constraints(price.inner(), MAX_SIG_FIGS, self.max_price_decimals())
    }

    /// Format a size for the wire. Input must already be floored to
    /// `sz_decimals`; this only applies the wire formatting rules.
    pub fn format_size(&self, size: Size) -> String {
        format_with_constraints(size.inner(), MAX_SIG_FIGS, self.sz_decimals)
    }
}

/// Truncate to `max_sig_figs` significant figures and `max_decimals`
/// decimal places (floor, never round up), then strip trailing zeros.
fn format_with_constraints(value: Decimal, max_sig_figs: u32, max_decimals: u32) -> String {
    if value.is_zero() {
        return "0".to_string();
    }

    let truncated = truncate_to_sig_figs(value.abs(), max_sig_figs).trunc_with_scale(max_decimals);
    let sign = if value.is_sign_negative() { "-" } else { "" };
    format!("{sign}{}", truncated.normalize())
}

fn truncate_to_sig_figs(value: Decimal, max_sig_figs: u32) -> Decimal {
    if value.is_zero() || max_sig_figs == 0 {
        return Decimal::ZERO;
    }

    let magnitude = order_of_magnitude(value);
    let scale = max_sig_figs as i32 - magnitude - 1;
    if scale >= 0 {
        value.trunc_with_scale(scale as u32)
    } else {
        let factor = Decimal::from(10i64.pow((-scale) as u32));
        (value / factor).trunc() * factor
    }
}

/// Order of magnitude: 12345 -> 4, 1.2 -> 0, 0.0012 -> -3.
fn order_of_magnitude(value: Decimal) -> i32 {
    let int_part = value.trunc();
    if !int_part.is_zero() {
        return int_part.to_string().len() as i32 - 1;
    }

    let mut magnitude = 0i32;
    let s = value.to_string();
    for c in s.chars().skip_while(|&c| c != '.').skip(1) {
        magnitude -= 1;
        if c != '0' {
            break;
        }
    }
    magnitude
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn spec(sz_decimals: u32) -> InstrumentSpec {
        InstrumentSpec {
            name: "BTC".to_string(),
            asset_index: 0,
            sz_decimals,
        }
    }

    #[test]
    fn test_tick_size_from_sz_decimals() {
        assert_eq!(spec(4).tick_size().inner(), dec!(0.01));
        assert_eq!(spec(5).tick_size().inner(), dec!(0.1));
        assert_eq!(spec(0).tick_size().inner(), dec!(0.000001));
    }

    #[test]
    fn test_format_price_sig_figs() {
        let s = spec(1); // 5 price decimals
        assert_eq!(s.format_price(Price::new(dec!(12345.6789))), "12345");
        assert_eq!(s.format_price(Price::new(dec!(1234.5678))), "1234.5");
        assert_eq!(s.format_price(Price::new(dec!(1.2345678))), "1.2345");
    }

    #[test]
    fn test_format_price_decimal_budget() {
        let s = spec(4); // 2 price decimals
        assert_eq!(s.format_price(Price::new(dec!(100.70))), "100.7");
        assert_eq!(s.format_price(Price::new(dec!(0.1234))), "0.12");
    }

    #[test]
    fn test_format_size_strips_trailing_zeros() {
        let s = spec(3);
        assert_eq!(s.format_size(Size::new(dec!(1.200))), "1.2");
        assert_eq!(s.format_size(Size::new(dec!(1.0))), "1");
    }

    #[test]
    fn test_format_small_values() {
        let s = spec(0); // 6 price decimals
        assert_eq!(s.format_price(Price::new(dec!(0.0000123456))), "0.000012");
        assert_eq!(s.format_price(Price::new(dec!(0.012345))), "0.012345");
    }

    #[test]
    fn test_format_zero() {
        let s = spec(3);
        assert_eq!(s.format_price(Price::ZERO), "0");
        assert_eq!(s.format_size(Size::ZERO), "0");
    }
}
