//! On-chain CLOB venue executor for binary outcome markets.
//!
//! Orders settle through an exchange contract that pulls the settlement
//! token from the maker, so a BUY is preceded by a mandatory allowance
//! check and, when needed, a confirmed max approval. Market resolution
//! goes through the public listing API with exact-match filtering done
//! client-side, because the API's own identifier filter returns fuzzy
//! partial matches.
//!
//! # Key components
//!
//! - [`GammaClient`]: market listing and resolution
//! - [`ClobApi`]: venue trading API boundary (mockable)
//! - [`SettlementChain`]: allowance and approval chain calls (mockable)
//! - [`CredentialCache`]: single-flight per-address API credential derivation
//! - [`ClobExecutor`]: the BUY/SELL execution algorithm

pub mod api;
pub mod credentials;
pub mod error;
pub mod executor;
pub mod gamma;
pub mod settlement;

pub use api::{ClobApi, HttpClobClient, MarketOrderArgs, OpenOrder, OrderResponse};
pub use credentials::{CredentialCache, VenueCredential};
pub use error::{ClobError, ClobResult};
pub use executor::ClobExecutor;
pub use gamma::{GammaClient, GammaMarket, ResolvedMarket};
pub use settlement::{OnChainSettlement, SettlementChain};
