//! EVM chain client: ERC-20 reads, approvals, raw transaction submission.
//!
//! Providers are built per operation from the configured RPC URL; write
//! operations take the caller's transient signer, so no key material lives
//! on this struct.

use crate::error::{ChainError, ChainResult};
use crate::gas::FeeParams;
use alloy::eips::BlockNumberOrTag;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{BlockTransactionsKind, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::transports::http::{Client, Http};
use reqwest::Url;
use tracing::{debug, info};

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function decimals() external view returns (uint8);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

/// Chain access over one JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct ChainClient {
    rpc_url: Url,
}

impl ChainClient {
    pub fn new(rpc_url: Url) -> Self {
        Self { rpc_url }
    }

    fn provider(&self) -> impl Provider<Http<Client>> + Clone {
        ProviderBuilder::new().on_http(self.rpc_url.clone())
    }

    fn signing_provider(&self, signer: &PrivateKeySigner) -> impl Provider<Http<Client>> + Clone {
        ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer.clone()))
            .on_http(self.rpc_url.clone())
    }

    /// Read (base fee, node-suggested priority fee) for the fee oracle.
    pub async fn fee_inputs(&self) -> ChainResult<(u128, u128)> {
        let provider = self.provider();

        let block = provider
            .get_block_by_number(BlockNumberOrTag::Latest, BlockTransactionsKind::Hashes)
            .await
            .map_err(|e| ChainError::FeeOracle(e.to_string()))?
            .ok_or_else(|| ChainError::FeeOracle("latest block unavailable".to_string()))?;
        let base_fee = block
            .header
            .base_fee_per_gas
            .ok_or_else(|| ChainError::FeeOracle("chain has no base fee".to_string()))?
            as u128;

        let suggested_priority = provider
            .get_max_priority_fee_per_gas()
            .await
            .map_err(|e| ChainError::FeeOracle(e.to_string()))?;

        Ok((base_fee, suggested_priority))
    }

    /// Native coin balance of an address.
    pub async fn native_balance(&self, owner: Address) -> ChainResult<U256> {
        self.provider()
            .get_balance(owner)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    pub async fn erc20_decimals(&self, token: Address) -> ChainResult<u8> {
        let provider = self.provider();
        let erc20 = IERC20::new(token, &provider);
        let result = erc20
            .decimals()
            .call()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        Ok(result._0)
    }

    pub async fn erc20_balance(&self, token: Address, owner: Address) -> ChainResult<U256> {
        let provider = self.provider();
        let erc20 = IERC20::new(token, &provider);
        let result = erc20
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        Ok(result._0)
    }

    /// Current allowance of (owner, spender) on a token. Never cached — it
    /// can change out-of-band between operations.
    pub async fn erc20_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> ChainResult<U256> {
        let provider = self.provider();
        let erc20 = IERC20::new(token, &provider);
        let result = erc20
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        Ok(result._0)
    }

    /// Approve the maximum spend cap for `spender` and wait for confirmation.
    ///
    /// The cap is `U256::MAX` so subsequent trades skip re-approval.
    pub async fn approve_max(
        &self,
        signer: &PrivateKeySigner,
        token: Address,
        spender: Address,
        fees: FeeParams,
    ) -> ChainResult<String> {
        let owner = signer.address();
        info!(%token, %spender, %owner, "Submitting max approval");

        let provider = self.signing_provider(signer);
        let erc20 = IERC20::new(token, &provider);

        let pending = erc20
            .approve(spender, U256::MAX)
            .max_fee_per_gas(fees.max_fee_per_gas)
            .max_priority_fee_per_gas(fees.max_priority_fee_per_gas)
            .send()
            .await
            .map_err(|e| ChainError::from_provider(e.to_string()))?;

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        let hash = receipt.transaction_hash.to_string();
        if !receipt.status() {
            return Err(ChainError::TxReverted { hash });
        }

        info!(tx = %hash, "Approval confirmed");
        Ok(hash)
    }

    /// Submit a prepared transaction and wait for its receipt.
    pub async fn send(
        &self,
        signer: &PrivateKeySigner,
        to: Address,
        calldata: Bytes,
        value: U256,
        gas_limit: u64,
        fees: FeeParams,
    ) -> ChainResult<String> {
        debug!(%to, gas_limit, "Submitting transaction");

        let provider = self.signing_provider(signer);
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(calldata)
            .with_value(value)
            .with_gas_limit(gas_limit)
            .with_max_fee_per_gas(fees.max_fee_per_gas)
            .with_max_priority_fee_per_gas(fees.max_priority_fee_per_gas);

        let pending = provider
            .send_transaction(tx)
            .await
            .map_err(|e| ChainError::from_provider(e.to_string()))?;

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        let hash = receipt.transaction_hash.to_string();
        if !receipt.status() {
            return Err(ChainError::TxReverted { hash });
        }

        info!(tx = %hash, "Transaction confirmed");
        Ok(hash)
    }
}
