//! Uniform success results for cross-venue execution.
//!
//! Failures travel as [`crate::ExecError`]; these types carry the success
//! half of the order/swap contract. Exactly one of the two is populated per
//! operation.

use crate::{Price, Size};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Result of a successfully executed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    /// Quantity actually filled.
    pub size: Size,

    /// Average execution price, when the venue reports one.
    /// The on-chain CLOB venue reports only an order id for FOK fills.
    pub avg_price: Option<Price>,

    /// Venue-assigned order identifier.
    pub order_id: Option<String>,

    /// Approval transaction hash, when an allowance had to be raised
    /// before this order could settle.
    pub approval_tx: Option<String>,
}

impl Fill {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            avg_price: None,
            order_id: None,
            approval_tx: None,
        }
    }

    pub fn with_avg_price(mut self, price: Price) -> Self {
        self.avg_price = Some(price);
        self
    }

    pub fn with_order_id(mut self, id: impl Into<String>) -> Self {
        self.order_id = Some(id.into());
        self
    }

    pub fn with_approval_tx(mut self, tx: impl Into<String>) -> Self {
        self.approval_tx = Some(tx.into());
        self
    }
}

/// Result of a completed token swap.
///
/// `estimated_out` is the aggregator's quoted output, not re-verified
/// against the post-trade balance delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapOutcome {
    /// Input amount actually spent, human units.
    pub amount_in: Decimal,

    /// Aggregator-estimated output amount, human units.
    pub estimated_out: Decimal,

    /// Settlement transaction hash.
    pub tx_hash: String,
}
