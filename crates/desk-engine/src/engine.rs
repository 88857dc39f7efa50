//! Component wiring and the caller-facing operation surface.
//!
//! One [`Engine`] serves every identity; operations are independent and may
//! run concurrently. The only cross-identity shared state is the CLOB
//! credential cache, which handles its own coordination.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use alloy::primitives::Address;
use desk_chain::{to_decimal, ChainClient, ChainError, GasOracle};
use desk_clob::{
    ClobExecutor, GammaClient, GammaMarket, HttpClobClient, OnChainSettlement, OpenOrder,
};
use desk_core::{ExecError, ExecResult, Fill, OrderSide, OutcomeSide, Size, SwapOutcome};
use desk_perps::{AccountState, ExchangeClient, InfoClient, PerpsExecutor};
use desk_swap::{KyberBackend, OneInchBackend, SwapBackend, SwapProgress, SwapRouter};
use desk_vault::{KeyVault, SigningIdentity};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

const NATIVE_DECIMALS: u8 = 18;

/// Wallet balances relevant to the engine's operations, human units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletBalances {
    pub native: Decimal,
    pub usdc_native: Decimal,
    pub usdc_bridged: Decimal,
}

fn chain_err(err: ChainError) -> ExecError {
    match err {
        ChainError::InsufficientGas => ExecError::InsufficientGas,
        other => ExecError::Chain(other.to_string()),
    }
}

/// The assembled execution engine.
pub struct Engine {
    vault: Arc<KeyVault>,
    chain: ChainClient,
    perps: PerpsExecutor,
    clob: ClobExecutor<HttpClobClient, OnChainSettlement>,
    swap: SwapRouter,
    usdc_native: Address,
    usdc_bridged: Address,
}

impl Engine {
    /// Build every component from configuration.
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        let vault = Arc::new(KeyVault::new(&config.passphrase)?);

        let rpc_url = config.rpc_url_parsed()?;
        let chain = ChainClient::new(rpc_url);
        let gas = GasOracle::new(config.min_priority_gwei);

        let perps_url = config.network.perps_api_url();
        let info = InfoClient::new(perps_url).map_err(ExecError::from)?;
        let exchange = ExchangeClient::new(perps_url, config.network.is_mainnet())
            .map_err(ExecError::from)?;
        let perps = PerpsExecutor::new(vault.clone(), info, exchange);

        let ctf_exchange = config.ctf_exchange_address()?;
        let usdc_bridged = config.usdc_bridged_address()?;
        let usdc_native = config.usdc_native_address()?;
        let clob_api = HttpClobClient::new(&config.clob_api_url, ctf_exchange)
            .map_err(ExecError::from)?;
        let gamma = GammaClient::new(&config.gamma_api_url).map_err(ExecError::from)?;
        let clob = ClobExecutor::new(
            vault.clone(),
            clob_api,
            gamma,
            OnChainSettlement::new(chain.clone(), gas),
            usdc_bridged,
            ctf_exchange,
        );

        let backends: Vec<Box<dyn SwapBackend>> = vec![
            Box::new(
                OneInchBackend::new(&config.oneinch_url, config.oneinch_api_key.clone())
                    .map_err(|e| EngineError::Config(format!("swap backend init: {e}")))?,
            ),
            Box::new(
                KyberBackend::new(&config.kyber_url)
                    .map_err(|e| EngineError::Config(format!("swap backend init: {e}")))?,
            ),
        ];
        let swap = SwapRouter::new(
            vault.clone(),
            chain.clone(),
            gas,
            backends,
            usdc_native,
            usdc_bridged,
        );

        info!(network = ?config.network, "Engine assembled");

        Ok(Self {
            vault,
            chain,
            perps,
            clob,
            swap,
            usdc_native,
            usdc_bridged,
        })
    }

    /// Generate a fresh custodied identity.
    pub fn new_identity(&self) -> EngineResult<SigningIdentity> {
        Ok(SigningIdentity::generate(&self.vault)?)
    }

    // --- Perp venue ---

    pub async fn perp_market_order(
        &self,
        identity: &SigningIdentity,
        instrument: &str,
        side: OrderSide,
        quantity: Size,
    ) -> ExecResult<Fill> {
        self.perps
            .place_market_order(identity, instrument, side, quantity)
            .await
    }

    pub async fn perp_cancel_order(
        &self,
        identity: &SigningIdentity,
        instrument: &str,
        oid: u64,
    ) -> ExecResult<()> {
        self.perps.cancel_order(identity, instrument, oid).await
    }

    pub async fn perp_account_state(
        &self,
        identity: &SigningIdentity,
    ) -> ExecResult<AccountState> {
        self.perps.account_state(identity).await
    }

    pub async fn available_coins(&self) -> ExecResult<Vec<String>> {
        self.perps.available_coins().await
    }

    // --- CLOB venue ---

    pub async fn outcome_market_order(
        &self,
        identity: &SigningIdentity,
        condition_id: &str,
        outcome: OutcomeSide,
        side: OrderSide,
        amount: Decimal,
    ) -> ExecResult<Fill> {
        self.clob
            .place_market_order(identity, condition_id, outcome, side, amount)
            .await
    }

    pub async fn open_orders(&self, identity: &SigningIdentity) -> ExecResult<Vec<OpenOrder>> {
        self.clob.open_orders(identity).await
    }

    pub async fn cancel_outcome_order(
        &self,
        identity: &SigningIdentity,
        order_id: &str,
    ) -> ExecResult<()> {
        self.clob.cancel_order(identity, order_id).await
    }

    pub async fn trending_markets(&self, limit: usize) -> ExecResult<Vec<GammaMarket>> {
        self.clob.trending_markets(limit).await
    }

    // --- Swaps and balances ---

    pub async fn swap(
        &self,
        identity: &SigningIdentity,
        amount: Decimal,
        progress: Option<&UnboundedSender<SwapProgress>>,
    ) -> ExecResult<SwapOutcome> {
        self.swap.swap(identity, amount, progress).await
    }

    /// Native coin plus both stablecoin variants for one identity.
    pub async fn balances(&self, identity: &SigningIdentity) -> ExecResult<WalletBalances> {
        let owner = identity.address;

        let native = self.chain.native_balance(owner).await.map_err(chain_err)?;
        let native_dec = to_decimal(native, NATIVE_DECIMALS).map_err(chain_err)?;

        let mut stable = [Decimal::ZERO; 2];
        for (slot, token) in stable.iter_mut().zip([self.usdc_native, self.usdc_bridged]) {
            let decimals = self.chain.erc20_decimals(token).await.map_err(chain_err)?;
            let units = self
                .chain
                .erc20_balance(token, owner)
                .await
                .map_err(chain_err)?;
            *slot = to_decimal(units, decimals).map_err(chain_err)?;
        }

        Ok(WalletBalances {
            native: native_dec,
            usdc_native: stable[0],
            usdc_bridged: stable[1],
        })
    }
}
