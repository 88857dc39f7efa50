//! Centralized perp venue executor.
//!
//! The venue has no native market-order primitive with deterministic
//! slippage bounds, so market orders are emulated: top-of-book price
//! discovery, a fixed slippage factor, tick rounding, then a limit order
//! with immediate-or-cancel time-in-force. Outcome is derived from the
//! embedded order status — the exchange reports transport-level success
//! even when the trade did not execute.
//!
//! # Key components
//!
//! - [`InfoClient`]: public info endpoint (universe metadata, order book,
//!   account state)
//! - [`InstrumentSpec`]: per-instrument precision rules, fetched fresh per
//!   order
//! - [`ExchangeClient`]: signed order submission (msgpack action hash +
//!   EIP-712 agent signature)
//! - [`PerpsExecutor`]: the market-order algorithm

pub mod error;
pub mod exchange;
pub mod executor;
pub mod info;
pub mod instrument;
pub mod signing;

pub use error::{PerpsError, PerpsResult};
pub use exchange::{ExchangeClient, OrderStatus};
pub use executor::{PerpsExecutor, MARKET_SLIPPAGE};
pub use info::{AccountState, Bbo, InfoClient, PerpPosition};
pub use instrument::InstrumentSpec;
pub use signing::{Action, OrderWire, PhantomAgent, SigningInput};
