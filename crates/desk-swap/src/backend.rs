//! Swap backend abstraction.

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

/// One swap to plan: fixed input amount, token pair, and the funding
/// address the aggregator builds the transaction for.
#[derive(Debug, Clone)]
pub struct SwapRequest {
    pub token_in: Address,
    pub token_out: Address,
    /// Input amount in the token's base units.
    pub amount_in: U256,
    pub from: Address,
}

/// Executable transaction plan produced by a backend.
#[derive(Debug, Clone)]
pub struct SwapPlan {
    /// Router contract that will pull `token_in`; allowance must be checked
    /// against this exact address, never a cached one from another backend.
    pub router: Address,
    pub calldata: Bytes,
    pub value: U256,
    /// Aggregator-estimated output in `token_out` base units.
    pub estimated_out: U256,
    /// Aggregator gas estimate, before the safety margin.
    pub gas_estimate: u64,
}

/// Backend-level failure split by what it means for the fallback chain.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The aggregator affirmatively found no route. Genuine liquidity
    /// failure; falling back will not help a same-pair request.
    #[error("no route for the requested pair")]
    NoRoute,

    /// Transport error, server error, or malformed response. The next
    /// backend in order gets a chance.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// A swap aggregator capable of turning a request into a plan.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SwapBackend: Send + Sync {
    /// Short name for logs and progress messages.
    fn name(&self) -> &'static str;

    async fn plan(&self, request: &SwapRequest) -> BackendResult<SwapPlan>;
}
