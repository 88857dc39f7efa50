//! Fee-market gas oracle and EVM chain access.
//!
//! [`GasOracle`] computes EIP-1559 fee parameters with a floored priority
//! fee; [`ChainClient`] wraps provider construction, ERC-20 reads, approvals
//! and raw transaction submission with confirmation waits. Allowances are
//! always read fresh — they can change out-of-band, so nothing here caches
//! them.

pub mod client;
pub mod error;
pub mod gas;
pub mod units;

pub use client::ChainClient;
pub use error::{ChainError, ChainResult};
pub use gas::{FeeParams, GasOracle, DEFAULT_MIN_PRIORITY_GWEI};
pub use units::{to_base_units, to_decimal};
