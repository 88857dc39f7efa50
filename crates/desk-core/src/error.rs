//! Cross-venue error taxonomy.
//!
//! Every executor maps venue- and chain-level failures into this enum so
//! callers see one uniform contract. Variants carry enough context (amounts,
//! instrument, reason) to retry correctly without guessing.

use rust_decimal::Decimal;
use thiserror::Error;

/// Uniform execution error across venues and the swap router.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Key blob is corrupt or tampered. Fatal, no retry.
    #[error("failed to decrypt signing key: {0}")]
    DecryptionFailure(String),

    /// Order book is missing a side needed for price discovery.
    #[error("market data unavailable for {instrument}: {reason}")]
    MarketDataUnavailable { instrument: String, reason: String },

    /// Instrument name not present in the venue universe.
    #[error("unknown instrument: {name}")]
    UnknownInstrument { name: String },

    /// Market exists but cannot be traded (closed, order book disabled,
    /// or absent from the active-market listing).
    #[error("market not tradeable: {0}")]
    MarketNotTradeable(String),

    /// IOC order rested instead of filling; funds unaffected.
    #[error("order not filled immediately")]
    OrderNotFilled,

    /// Venue rejected or failed the order; funds and allowances unaffected.
    #[error("order failed: {reason}")]
    OrderFailed { reason: String },

    /// Local pre-check failure, reported before any network call.
    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Decimal, need: Decimal },

    /// Not enough native coin to pay transaction fees.
    #[error("insufficient native balance for gas fees")]
    InsufficientGas,

    /// Every configured swap aggregator was exhausted without a usable route.
    #[error("no swap route found on any aggregator")]
    NoRouteFound,

    /// Venue credential derivation failed. Not cached; retryable.
    #[error("credential derivation failed: {reason}")]
    CredentialDerivationFailed { reason: String },

    /// Chain RPC or transaction-level failure.
    #[error("chain error: {0}")]
    Chain(String),

    /// Venue transport or response-parse failure.
    #[error("venue error: {0}")]
    Venue(String),
}

/// Result type alias for executor operations.
pub type ExecResult<T> = std::result::Result<T, ExecError>;
