//! Chain-side settlement operations behind a mockable seam.
//!
//! The executor's allowance gate is an ordering property: the approval must
//! confirm before an order is posted. Keeping the chain calls behind
//! [`SettlementChain`] lets tests assert that ordering without a node.

use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use desk_chain::{ChainClient, ChainResult, GasOracle};

#[cfg(test)]
use mockall::automock;

/// Chain operations the allowance gate performs.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SettlementChain: Send + Sync {
    /// Current ERC-20 allowance granted by `owner` to `spender`.
    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> ChainResult<U256>;

    /// Approve `spender` for the maximum amount and wait for confirmation.
    /// Returns the transaction hash.
    async fn approve_max(
        &self,
        signer: &PrivateKeySigner,
        token: Address,
        spender: Address,
    ) -> ChainResult<String>;
}

/// Production implementation over the JSON-RPC client, quoting fresh fee
/// parameters per approval.
pub struct OnChainSettlement {
    chain: ChainClient,
    gas: GasOracle,
}

impl OnChainSettlement {
    pub fn new(chain: ChainClient, gas: GasOracle) -> Self {
        Self { chain, gas }
    }
}

#[async_trait]
impl SettlementChain for OnChainSettlement {
    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> ChainResult<U256> {
        self.chain.erc20_allowance(token, owner, spender).await
    }

    async fn approve_max(
        &self,
        signer: &PrivateKeySigner,
        token: Address,
        spender: Address,
    ) -> ChainResult<String> {
        let fees = self.gas.quote(&self.chain).await?;
        self.chain.approve_max(signer, token, spender, fees).await
    }
}
