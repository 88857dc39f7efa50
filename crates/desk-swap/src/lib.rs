//! Stablecoin swap routing with ordered aggregator fallback.
//!
//! Backends implement one capability — turn a swap request into an
//! executable transaction plan — and are tried in configuration order.
//! Only a backend that positively reports "no route" ends the search with
//! a liquidity failure; transport and server errors just advance to the
//! next backend. Adding a third aggregator is one more list entry.
//!
//! # Key components
//!
//! - [`SwapBackend`] / [`SwapPlan`]: the aggregator abstraction
//! - [`OneInchBackend`]: single-call quote+build aggregator
//! - [`KyberBackend`]: two-phase route-quote then route-build aggregator
//! - [`SwapRouter`]: balance pre-check, fallback, allowance, settlement

pub mod backend;
pub mod kyber;
pub mod oneinch;
pub mod progress;
pub mod router;

pub use backend::{BackendError, SwapBackend, SwapPlan, SwapRequest};
pub use kyber::KyberBackend;
pub use oneinch::OneInchBackend;
pub use progress::SwapProgress;
pub use router::{SwapRouter, GAS_LIMIT_MARGIN_NUM, GAS_LIMIT_MARGIN_DEN};
