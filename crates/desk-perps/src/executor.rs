//! Market-order emulation for the perp venue.
//!
//! Pipeline: decrypt key, resolve instrument, read top of book, derive a
//! slippage-widened limit price on the venue's tick grid, submit IOC, then
//! classify the embedded order status.

use crate::exchange::{ExchangeClient, OrderStatus};
use crate::info::{AccountState, Bbo, InfoClient};
use crate::instrument::InstrumentSpec;
use crate::signing::{Action, OrderWire};
use desk_core::{ExecError, ExecResult, Fill, OrderSide, Price, Size};
use desk_vault::{KeyVault, SigningIdentity};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::{info, warn};

/// Slippage cushion applied to the top-of-book reference price so an IOC
/// limit order crosses the spread and fills like a market order.
pub const MARKET_SLIPPAGE: Decimal = dec!(0.005);

/// Limit price for market-order emulation: best opposing quote widened by
/// the slippage fraction in the crossing direction.
///
/// Errors with the instrument name when the needed book side is empty; a
/// market order against an empty side cannot price itself.
pub fn market_limit_price(
    bbo: &Bbo,
    side: OrderSide,
    slippage: Decimal,
    instrument: &str,
) -> ExecResult<Price> {
    let (reference, fraction) = match side {
        OrderSide::Buy => (bbo.ask, slippage),
        OrderSide::Sell => (bbo.bid, -slippage),
    };

    let reference = reference.ok_or_else(|| ExecError::MarketDataUnavailable {
        instrument: instrument.to_string(),
        reason: "order book side is empty".to_string(),
    })?;

    Ok(reference.with_slippage(fraction))
}

/// Executor for the centralized perp venue.
pub struct PerpsExecutor {
    vault: Arc<KeyVault>,
    info: InfoClient,
    exchange: ExchangeClient,
}

impl PerpsExecutor {
    pub fn new(vault: Arc<KeyVault>, info: InfoClient, exchange: ExchangeClient) -> Self {
        Self {
            vault,
            info,
            exchange,
        }
    }

    /// Place an emulated market order and report the realized fill.
    pub async fn place_market_order(
        &self,
        identity: &SigningIdentity,
        instrument: &str,
        side: OrderSide,
        quantity: Size,
    ) -> ExecResult<Fill> {
        // Key access is the first gate: no market traffic happens for a
        // caller whose key cannot be decrypted.
        let signer = identity
            .signer(&self.vault)
            .map_err(|e| ExecError::DecryptionFailure(e.to_string()))?;

        let spec = self.resolve_instrument(instrument).await?;
        let bbo = self.info.l2_book(instrument).await.map_err(|e| {
            ExecError::MarketDataUnavailable {
                instrument: instrument.to_string(),
                reason: e.to_string(),
            }
        })?;

        let raw_price = market_limit_price(&bbo, side, MARKET_SLIPPAGE, instrument)?;
        let price = raw_price.round_to_tick_nearest(spec.tick_size());
        let size = quantity.floor_to_decimals(spec.sz_decimals);
        if !size.is_positive() {
            return Err(ExecError::OrderFailed {
                reason: format!("quantity {quantity} rounds to zero at {} decimals", spec.sz_decimals),
            });
        }

        info!(
            %instrument,
            ?side,
            %price,
            %size,
            "Placing IOC market order"
        );

        let order = OrderWire::ioc_limit(&spec, side, price, size);
        let status = self
            .exchange
            .submit(&signer, Action::single_order(order))
            .await?;

        match status {
            OrderStatus::Filled {
                total_sz,
                avg_px,
                oid,
            } => {
                info!(%instrument, %total_sz, %avg_px, "Order filled");
                let mut fill = Fill::new(Size::new(total_sz)).with_avg_price(Price::new(avg_px));
                if let Some(oid) = oid {
                    fill = fill.with_order_id(oid.to_string());
                }
                Ok(fill)
            }
            OrderStatus::Resting { oid } => {
                // IOC should never rest; treat it as an unfilled order.
                warn!(%instrument, oid, "IOC order reported resting");
                Err(ExecError::OrderNotFilled)
            }
            OrderStatus::Error(reason) => {
                warn!(%instrument, %reason, "Order rejected");
                Err(ExecError::OrderFailed { reason })
            }
            OrderStatus::Ack(status) => {
                // An order action must report fill detail, not a bare
                // acknowledgement.
                warn!(%instrument, %status, "Order status carried no fill detail");
                Err(ExecError::OrderFailed {
                    reason: format!("unexpected order status: {status}"),
                })
            }
        }
    }

    /// Cancel a resting order by venue order id.
    pub async fn cancel_order(
        &self,
        identity: &SigningIdentity,
        instrument: &str,
        oid: u64,
    ) -> ExecResult<()> {
        let signer = identity
            .signer(&self.vault)
            .map_err(|e| ExecError::DecryptionFailure(e.to_string()))?;

        let spec = self.resolve_instrument(instrument).await?;
        let status = self
            .exchange
            .submit(&signer, Action::cancel(spec.asset_index, oid))
            .await?;

        match status {
            OrderStatus::Error(reason) => Err(ExecError::OrderFailed { reason }),
            _ => Ok(()),
        }
    }

    /// Names of all tradeable instruments.
    pub async fn available_coins(&self) -> ExecResult<Vec<String>> {
        Ok(self.info.available_coins().await?)
    }

    /// Margin summary and open positions for an identity.
    pub async fn account_state(&self, identity: &SigningIdentity) -> ExecResult<AccountState> {
        Ok(self
            .info
            .account_state(&identity.address.to_string())
            .await?)
    }

    /// Metadata lookup runs before any book query: an unknown symbol must
    /// surface as such, not as missing market data.
    async fn resolve_instrument(&self, instrument: &str) -> ExecResult<InstrumentSpec> {
        let found = self.info.find_instrument(instrument).await?;
        found.ok_or_else(|| ExecError::UnknownInstrument {
            name: instrument.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbo(bid: Option<Decimal>, ask: Option<Decimal>) -> Bbo {
        Bbo {
            bid: bid.map(Price::new),
            ask: ask.map(Price::new),
        }
    }

    #[test]
    fn test_buy_crosses_ask_with_cushion() {
        let book = bbo(Some(dec!(100.0)), Some(dec!(100.2)));
        let price = market_limit_price(&book, OrderSide::Buy, MARKET_SLIPPAGE, "SOL").unwrap();

        // 100.2 * 1.005 = 100.701, tick-rounded to the 0.01 grid -> 100.70
        assert_eq!(price.inner(), dec!(100.701));
        let tick = Price::new(dec!(0.01));
        assert_eq!(price.round_to_tick_nearest(tick).inner(), dec!(100.70));
    }

    #[test]
    fn test_sell_undercuts_bid() {
        let book = bbo(Some(dec!(100.0)), Some(dec!(100.2)));
        let price = market_limit_price(&book, OrderSide::Sell, MARKET_SLIPPAGE, "SOL").unwrap();

        // 100.0 * 0.995
        assert_eq!(price.inner(), dec!(99.5));
    }

    #[test]
    fn test_empty_book_side_is_market_data_error() {
        let book = bbo(Some(dec!(100.0)), None);
        let err = market_limit_price(&book, OrderSide::Buy, MARKET_SLIPPAGE, "SOL").unwrap_err();
        assert!(matches!(err, ExecError::MarketDataUnavailable { .. }));

        // Opposite side still works off the bid.
        assert!(market_limit_price(&book, OrderSide::Sell, MARKET_SLIPPAGE, "SOL").is_ok());
    }

    #[test]
    fn test_quantity_floors_to_sz_decimals() {
        let spec = InstrumentSpec {
            name: "SOL".to_string(),
            asset_index: 5,
            sz_decimals: 4,
        };
        let size = Size::new(dec!(1.23456)).floor_to_decimals(spec.sz_decimals);
        assert_eq!(size.inner(), dec!(1.2345));
    }

    #[test]
    fn test_full_price_pipeline_matches_wire_format() {
        // End-to-end arithmetic for the scenario the executor runs.
        let spec = InstrumentSpec {
            name: "SOL".to_string(),
            asset_index: 5,
            sz_decimals: 4, // 2 price decimals
        };
        let book = bbo(Some(dec!(100.0)), Some(dec!(100.2)));

        let raw = market_limit_price(&book, OrderSide::Buy, MARKET_SLIPPAGE, "SOL").unwrap();
        let price = raw.round_to_tick_nearest(spec.tick_size());
        let size = Size::new(dec!(1.23456)).floor_to_decimals(spec.sz_decimals);

        let wire = OrderWire::ioc_limit(&spec, OrderSide::Buy, price, size);
        assert_eq!(wire.limit_px, "100.7");
        assert_eq!(wire.sz, "1.2345");
        assert!(wire.is_buy);
        assert_eq!(wire.asset, 5);
    }
}
