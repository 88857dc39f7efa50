//! Execution algorithm for the CLOB venue.
//!
//! BUY orders settle through the exchange contract pulling the settlement
//! token from the maker, so the allowance check and (when needed) confirmed
//! max approval run strictly before order submission. A buy the exchange
//! cannot settle is the venue's most damaging failure mode.

use crate::api::{ClobApi, MarketOrderArgs, OpenOrder};
use crate::credentials::CredentialCache;
use crate::error::ClobError;
use crate::gamma::{GammaClient, GammaMarket, ResolvedMarket};
use crate::settlement::SettlementChain;
use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use desk_chain::ChainError;
use desk_core::{ExecError, ExecResult, Fill, OrderSide, OutcomeSide, Size};
use desk_vault::{KeyVault, SigningIdentity};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

/// Classification table for raw venue error strings.
///
/// The client layer conflates several causes into similar messages; this is
/// the single boundary where they are pattern-matched, never in business
/// logic.
fn classify_order_error(reason: &str) -> ExecError {
    let lower = reason.to_lowercase();
    if lower.contains("not found") || lower.contains("market is closed") {
        ExecError::MarketNotTradeable(reason.to_string())
    } else if lower.contains("insufficient funds") {
        ExecError::InsufficientGas
    } else if lower.contains("fok order not fully filled") || lower.contains("order killed") {
        ExecError::OrderNotFilled
    } else {
        ExecError::OrderFailed {
            reason: reason.to_string(),
        }
    }
}

fn chain_err(err: ChainError) -> ExecError {
    match err {
        ChainError::InsufficientGas => ExecError::InsufficientGas,
        other => ExecError::Chain(other.to_string()),
    }
}

/// Executor for the on-chain CLOB venue.
pub struct ClobExecutor<A: ClobApi, C: SettlementChain> {
    vault: Arc<KeyVault>,
    api: A,
    gamma: GammaClient,
    settlement: C,
    credentials: CredentialCache,
    /// Settlement token the exchange contract pulls on a BUY.
    settlement_token: Address,
    /// Exchange contract address, i.e. the allowance spender.
    exchange_spender: Address,
}

impl<A: ClobApi, C: SettlementChain> ClobExecutor<A, C> {
    pub fn new(
        vault: Arc<KeyVault>,
        api: A,
        gamma: GammaClient,
        settlement: C,
        settlement_token: Address,
        exchange_spender: Address,
    ) -> Self {
        Self {
            vault,
            api,
            gamma,
            settlement,
            credentials: CredentialCache::new(),
            settlement_token,
            exchange_spender,
        }
    }

    /// Place a fill-or-kill market order on one outcome of a market.
    ///
    /// `amount` is settlement-token notional for a BUY and share quantity
    /// for a SELL.
    pub async fn place_market_order(
        &self,
        identity: &SigningIdentity,
        condition_id: &str,
        outcome: OutcomeSide,
        side: OrderSide,
        amount: Decimal,
    ) -> ExecResult<Fill> {
        let signer = identity
            .signer(&self.vault)
            .map_err(|e| ExecError::DecryptionFailure(e.to_string()))?;

        let market = self.resolve_market(condition_id).await?;
        self.execute_resolved(&signer, &market, outcome, side, amount)
            .await
    }

    /// Order flow after resolution: allowance gate, credentials, submission.
    async fn execute_resolved(
        &self,
        signer: &PrivateKeySigner,
        market: &ResolvedMarket,
        outcome: OutcomeSide,
        side: OrderSide,
        amount: Decimal,
    ) -> ExecResult<Fill> {
        let condition_id = market.condition_id.as_str();
        let token_id = market
            .token_ids
            .get(outcome.index())
            .ok_or_else(|| {
                ExecError::MarketNotTradeable(format!(
                    "market {condition_id} has no outcome token at index {}",
                    outcome.index()
                ))
            })?
            .clone();

        // Allowance gate, BUY only: the exchange pulls settlement tokens
        // from the maker, and an unsettleable buy must never be submitted.
        let approval_tx = if matches!(side, OrderSide::Buy) {
            self.ensure_exchange_allowance(signer).await?
        } else {
            None
        };

        let credential = self
            .credentials
            .get_or_derive(signer.address(), || self.api.derive_credentials(signer))
            .await
            .map_err(|e| ExecError::CredentialDerivationFailed {
                reason: e.to_string(),
            })?;

        let args = MarketOrderArgs {
            token_id,
            side,
            amount,
        };
        let response = self
            .api
            .post_market_order(&credential, signer, &args)
            .await
            .map_err(|e| match e {
                ClobError::Response(msg) => classify_order_error(&msg),
                other => other.into(),
            })?;

        if let Some(reason) = response.error_msg.as_deref().filter(|m| !m.is_empty()) {
            warn!(%condition_id, %reason, "Order rejected");
            return Err(classify_order_error(reason));
        }
        if !response.success {
            return Err(ExecError::OrderFailed {
                reason: "venue reported unsuccessful order".to_string(),
            });
        }

        // FOK fills report amounts, not an average price. Shares received
        // on a BUY come back as the taking amount; shares sold on a SELL
        // are the making amount.
        let filled = match side {
            OrderSide::Buy => response.taking_amount.unwrap_or_default(),
            OrderSide::Sell => response.making_amount.unwrap_or(amount),
        };

        info!(%condition_id, ?outcome, ?side, %filled, "FOK order filled");

        let mut fill = Fill::new(Size::new(filled));
        if let Some(order_id) = response.order_id {
            fill = fill.with_order_id(order_id);
        }
        if let Some(tx) = approval_tx {
            fill = fill.with_approval_tx(tx);
        }
        Ok(fill)
    }

    /// Resting orders for an identity.
    pub async fn open_orders(&self, identity: &SigningIdentity) -> ExecResult<Vec<OpenOrder>> {
        let signer = identity
            .signer(&self.vault)
            .map_err(|e| ExecError::DecryptionFailure(e.to_string()))?;
        let credential = self
            .credentials
            .get_or_derive(signer.address(), || self.api.derive_credentials(&signer))
            .await
            .map_err(|e| ExecError::CredentialDerivationFailed {
                reason: e.to_string(),
            })?;
        Ok(self.api.open_orders(&credential, signer.address()).await?)
    }

    /// Cancel one resting order.
    pub async fn cancel_order(&self, identity: &SigningIdentity, order_id: &str) -> ExecResult<()> {
        let signer = identity
            .signer(&self.vault)
            .map_err(|e| ExecError::DecryptionFailure(e.to_string()))?;
        let credential = self
            .credentials
            .get_or_derive(signer.address(), || self.api.derive_credentials(&signer))
            .await
            .map_err(|e| ExecError::CredentialDerivationFailed {
                reason: e.to_string(),
            })?;
        Ok(self
            .api
            .cancel_order(&credential, signer.address(), order_id)
            .await?)
    }

    /// Highest-volume active markets.
    pub async fn trending_markets(&self, limit: usize) -> ExecResult<Vec<GammaMarket>> {
        Ok(self.gamma.trending_markets(limit).await?)
    }

    async fn resolve_market(&self, condition_id: &str) -> ExecResult<ResolvedMarket> {
        self.gamma
            .resolve_market(condition_id)
            .await?
            .ok_or_else(|| {
                ExecError::MarketNotTradeable(format!(
                    "no active order-book market with id {condition_id}"
                ))
            })
    }

    /// Check the exchange allowance and raise it to the maximum when below.
    /// Returns the confirmed approval transaction hash, if one was needed.
    async fn ensure_exchange_allowance(
        &self,
        signer: &PrivateKeySigner,
    ) -> ExecResult<Option<String>> {
        let allowance = self
            .settlement
            .allowance(self.settlement_token, signer.address(), self.exchange_spender)
            .await
            .map_err(chain_err)?;

        if allowance == U256::MAX {
            return Ok(None);
        }

        info!(
            owner = %signer.address(),
            spender = %self.exchange_spender,
            %allowance,
            "Raising exchange allowance to maximum"
        );
        let tx = self
            .settlement
            .approve_max(signer, self.settlement_token, self.exchange_spender)
            .await
            .map_err(chain_err)?;
        Ok(Some(tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockClobApi, OrderResponse};
    use crate::credentials::VenueCredential;
    use crate::settlement::MockSettlementChain;
    use rust_decimal_macros::dec;

    fn credential() -> VenueCredential {
        VenueCredential {
            api_key: "key".to_string(),
            secret: "c2VjcmV0".to_string(),
            passphrase: "phrase".to_string(),
        }
    }

    fn filled_response() -> OrderResponse {
        OrderResponse {
            success: true,
            error_msg: None,
            order_id: Some("0xorder".to_string()),
            status: Some("matched".to_string()),
            taking_amount: Some(dec!(50)),
            making_amount: Some(dec!(25)),
        }
    }

    fn market() -> ResolvedMarket {
        ResolvedMarket {
            question: "Will it rain?".to_string(),
            condition_id: "0xmarket".to_string(),
            token_ids: vec!["111".to_string(), "222".to_string()],
        }
    }

    fn executor(
        api: MockClobApi,
        settlement: MockSettlementChain,
    ) -> ClobExecutor<MockClobApi, MockSettlementChain> {
        ClobExecutor::new(
            Arc::new(KeyVault::new("executor-test-passphrase-long-enough!").unwrap()),
            api,
            GammaClient::new("http://localhost").unwrap(),
            settlement,
            Address::ZERO,
            Address::repeat_byte(0x11),
        )
    }

    #[test]
    fn test_market_not_found_shaped_errors() {
        let err = classify_order_error("market not found or not ready for trading");
        assert!(matches!(err, ExecError::MarketNotTradeable(_)));

        let err = classify_order_error("market is closed");
        assert!(matches!(err, ExecError::MarketNotTradeable(_)));
    }

    #[test]
    fn test_insufficient_funds_classified_as_gas() {
        let err = classify_order_error("insufficient funds to execute order");
        assert!(matches!(err, ExecError::InsufficientGas));
    }

    #[test]
    fn test_unfilled_fok_classified() {
        let err = classify_order_error("FOK order not fully filled");
        assert!(matches!(err, ExecError::OrderNotFilled));
    }

    #[test]
    fn test_unrecognized_messages_stay_order_failed() {
        let err = classify_order_error("something novel went wrong");
        match err {
            ExecError::OrderFailed { reason } => {
                assert_eq!(reason, "something novel went wrong")
            }
            other => panic!("expected OrderFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_chain_error_mapping() {
        assert!(matches!(
            chain_err(ChainError::InsufficientGas),
            ExecError::InsufficientGas
        ));
        assert!(matches!(
            chain_err(ChainError::Rpc("boom".to_string())),
            ExecError::Chain(_)
        ));
    }

    #[tokio::test]
    async fn test_credential_derivation_goes_through_cache_once() {
        let mut api = MockClobApi::new();
        api.expect_derive_credentials()
            .times(1)
            .returning(|_| Ok(credential()));

        let cache = CredentialCache::new();
        let signer = PrivateKeySigner::random();
        for _ in 0..3 {
            cache
                .get_or_derive(signer.address(), || api.derive_credentials(&signer))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_buy_approves_exchange_before_posting_order() {
        use mockall::Sequence;

        let mut seq = Sequence::new();

        // An insufficient allowance must trigger a confirmed max approval
        // strictly before the order reaches the venue.
        let mut settlement = MockSettlementChain::new();
        settlement
            .expect_allowance()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(U256::ZERO));
        settlement
            .expect_approve_max()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok("0xapproval".to_string()));

        let mut api = MockClobApi::new();
        api.expect_derive_credentials()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(credential()));
        api.expect_post_market_order()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(filled_response()));

        let executor = executor(api, settlement);
        let signer = PrivateKeySigner::random();
        let fill = executor
            .execute_resolved(&signer, &market(), OutcomeSide::Yes, OrderSide::Buy, dec!(25))
            .await
            .unwrap();

        assert_eq!(fill.approval_tx.as_deref(), Some("0xapproval"));
        assert_eq!(fill.order_id.as_deref(), Some("0xorder"));
    }

    #[tokio::test]
    async fn test_existing_max_allowance_skips_approval() {
        let mut settlement = MockSettlementChain::new();
        settlement
            .expect_allowance()
            .times(1)
            .returning(|_, _, _| Ok(U256::MAX));
        settlement.expect_approve_max().times(0);

        let mut api = MockClobApi::new();
        api.expect_derive_credentials().returning(|_| Ok(credential()));
        api.expect_post_market_order()
            .returning(|_, _, _| Ok(filled_response()));

        let executor = executor(api, settlement);
        let signer = PrivateKeySigner::random();
        let fill = executor
            .execute_resolved(&signer, &market(), OutcomeSide::Yes, OrderSide::Buy, dec!(25))
            .await
            .unwrap();

        assert!(fill.approval_tx.is_none());
    }

    #[tokio::test]
    async fn test_sell_never_touches_the_allowance() {
        // SELLs transfer outcome shares, not the settlement token.
        let mut settlement = MockSettlementChain::new();
        settlement.expect_allowance().times(0);
        settlement.expect_approve_max().times(0);

        let mut api = MockClobApi::new();
        api.expect_derive_credentials().returning(|_| Ok(credential()));
        api.expect_post_market_order()
            .returning(|_, _, _| Ok(filled_response()));

        let executor = executor(api, settlement);
        let signer = PrivateKeySigner::random();
        executor
            .execute_resolved(&signer, &market(), OutcomeSide::No, OrderSide::Sell, dec!(10))
            .await
            .unwrap();
    }

    #[test]
    fn test_outcome_token_selection_is_positional() {
        let market = ResolvedMarket {
            question: "Will it rain?".to_string(),
            condition_id: "0x1".to_string(),
            token_ids: vec!["111".to_string(), "222".to_string()],
        };
        assert_eq!(market.token_ids[OutcomeSide::Yes.index()], "111");
        assert_eq!(market.token_ids[OutcomeSide::No.index()], "222");
    }
}
