//! Swap orchestration: pre-checks, backend fallback, allowance, settlement.

use crate::backend::{BackendError, SwapBackend, SwapPlan, SwapRequest};
use crate::progress::SwapProgress;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use desk_chain::{to_base_units, to_decimal, ChainClient, ChainError, GasOracle};
use desk_core::{ExecError, ExecResult, SwapOutcome};
use desk_vault::{KeyVault, SigningIdentity};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

/// Gas limit safety margin over the aggregator's estimate, as a ratio.
/// Quoted estimates run hot on this chain; 1.3x absorbs the variance.
pub const GAS_LIMIT_MARGIN_NUM: u64 = 13;
pub const GAS_LIMIT_MARGIN_DEN: u64 = 10;

/// Inflate an aggregator gas estimate by the safety margin, rounding up.
fn inflate_gas_limit(estimate: u64) -> u64 {
    (estimate * GAS_LIMIT_MARGIN_NUM).div_ceil(GAS_LIMIT_MARGIN_DEN)
}

/// Balance pre-check. Runs before any quote request so an underfunded call
/// fails locally without network traffic.
fn check_balance(have: Decimal, need: Decimal) -> ExecResult<()> {
    if have < need || have.is_zero() {
        return Err(ExecError::InsufficientBalance { have, need });
    }
    Ok(())
}

fn chain_err(err: ChainError) -> ExecError {
    match err {
        ChainError::InsufficientGas => ExecError::InsufficientGas,
        other => ExecError::Chain(other.to_string()),
    }
}

fn emit(progress: Option<&UnboundedSender<SwapProgress>>, milestone: SwapProgress) {
    if let Some(sender) = progress {
        // A closed receiver is the caller's business, not ours.
        let _ = sender.send(milestone);
    }
}

/// Try each backend in order until one yields a plan.
///
/// `Unavailable` advances to the next backend; an affirmative `NoRoute` is
/// a genuine liquidity failure that fallback cannot fix, so it ends the
/// search immediately. An exhausted list is also `NoRouteFound`.
async fn select_plan(
    backends: &[Box<dyn SwapBackend>],
    request: &SwapRequest,
    progress: Option<&UnboundedSender<SwapProgress>>,
) -> ExecResult<SwapPlan> {
    for backend in backends {
        emit(
            progress,
            SwapProgress::SearchingRoute {
                backend: backend.name(),
            },
        );
        match backend.plan(request).await {
            Ok(plan) => {
                info!(backend = backend.name(), router = %plan.router, "Backend produced a plan");
                return Ok(plan);
            }
            Err(BackendError::NoRoute) => {
                warn!(backend = backend.name(), "Backend found no route");
                return Err(ExecError::NoRouteFound);
            }
            Err(BackendError::Unavailable(reason)) => {
                warn!(backend = backend.name(), %reason, "Backend unavailable, trying next");
            }
        }
    }
    Err(ExecError::NoRouteFound)
}

/// Swap router for one fixed token pair.
pub struct SwapRouter {
    vault: Arc<KeyVault>,
    chain: ChainClient,
    gas: GasOracle,
    backends: Vec<Box<dyn SwapBackend>>,
    token_in: Address,
    token_out: Address,
}

impl SwapRouter {
    pub fn new(
        vault: Arc<KeyVault>,
        chain: ChainClient,
        gas: GasOracle,
        backends: Vec<Box<dyn SwapBackend>>,
        token_in: Address,
        token_out: Address,
    ) -> Self {
        Self {
            vault,
            chain,
            gas,
            backends,
            token_in,
            token_out,
        }
    }

    /// Swap `amount` (human units of the input token) and report the
    /// settlement. `progress` is an optional milestone side-channel.
    pub async fn swap(
        &self,
        identity: &SigningIdentity,
        amount: Decimal,
        progress: Option<&UnboundedSender<SwapProgress>>,
    ) -> ExecResult<SwapOutcome> {
        let signer = identity
            .signer(&self.vault)
            .map_err(|e| ExecError::DecryptionFailure(e.to_string()))?;

        let decimals_in = self
            .chain
            .erc20_decimals(self.token_in)
            .await
            .map_err(chain_err)?;
        let balance_units = self
            .chain
            .erc20_balance(self.token_in, signer.address())
            .await
            .map_err(chain_err)?;
        let balance = to_decimal(balance_units, decimals_in).map_err(chain_err)?;
        check_balance(balance, amount)?;

        let amount_units = to_base_units(amount, decimals_in).map_err(chain_err)?;
        let request = SwapRequest {
            token_in: self.token_in,
            token_out: self.token_out,
            amount_in: amount_units,
            from: signer.address(),
        };

        let plan = select_plan(&self.backends, &request, progress).await?;

        self.ensure_router_allowance(&signer, &plan, amount_units, progress)
            .await?;

        let fees = self.gas.quote(&self.chain).await.map_err(chain_err)?;
        let gas_limit = inflate_gas_limit(plan.gas_estimate);
        emit(progress, SwapProgress::SwapPending);
        let tx_hash = self
            .chain
            .send(
                &signer,
                plan.router,
                plan.calldata.clone(),
                plan.value,
                gas_limit,
                fees,
            )
            .await
            .map_err(chain_err)?;

        let decimals_out = self
            .chain
            .erc20_decimals(self.token_out)
            .await
            .map_err(chain_err)?;
        let estimated_out = to_decimal(plan.estimated_out, decimals_out).map_err(chain_err)?;

        info!(%tx_hash, %amount, %estimated_out, "Swap settled");

        Ok(SwapOutcome {
            amount_in: amount,
            estimated_out,
            tx_hash,
        })
    }

    /// Allowance is checked against the plan's own router address — each
    /// backend has its own router, so checks never carry across backends.
    async fn ensure_router_allowance(
        &self,
        signer: &PrivateKeySigner,
        plan: &SwapPlan,
        amount_units: alloy::primitives::U256,
        progress: Option<&UnboundedSender<SwapProgress>>,
    ) -> ExecResult<()> {
        let allowance = self
            .chain
            .erc20_allowance(self.token_in, signer.address(), plan.router)
            .await
            .map_err(chain_err)?;
        if allowance >= amount_units {
            return Ok(());
        }

        let fees = self.gas.quote(&self.chain).await.map_err(chain_err)?;
        emit(progress, SwapProgress::ApprovalPending);
        self.chain
            .approve_max(signer, self.token_in, plan.router, fees)
            .await
            .map_err(chain_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockSwapBackend;
    use alloy::primitives::{Bytes, U256};
    use rust_decimal_macros::dec;

    fn request() -> SwapRequest {
        SwapRequest {
            token_in: Address::repeat_byte(0x01),
            token_out: Address::repeat_byte(0x02),
            amount_in: U256::from(25_000_000u64),
            from: Address::repeat_byte(0x03),
        }
    }

    fn plan(router_byte: u8) -> SwapPlan {
        SwapPlan {
            router: Address::repeat_byte(router_byte),
            calldata: Bytes::from(vec![0xde, 0xad]),
            value: U256::ZERO,
            estimated_out: U256::from(24_900_000u64),
            gas_estimate: 200_000,
        }
    }

    fn boxed(mock: MockSwapBackend) -> Box<dyn SwapBackend> {
        Box::new(mock)
    }

    #[tokio::test]
    async fn test_fallback_tries_backends_in_order() {
        let mut first = MockSwapBackend::new();
        first.expect_name().return_const("first");
        first
            .expect_plan()
            .times(1)
            .returning(|_| Err(BackendError::Unavailable("HTTP 500".to_string())));

        let mut second = MockSwapBackend::new();
        second.expect_name().return_const("second");
        second.expect_plan().times(1).returning(|_| Ok(plan(0xbb)));

        let backends = vec![boxed(first), boxed(second)];
        let selected = select_plan(&backends, &request(), None).await.unwrap();
        assert_eq!(selected.router, Address::repeat_byte(0xbb));
    }

    #[tokio::test]
    async fn test_all_backends_unavailable_is_no_route() {
        let mut first = MockSwapBackend::new();
        first.expect_name().return_const("first");
        first
            .expect_plan()
            .times(1)
            .returning(|_| Err(BackendError::Unavailable("timeout".to_string())));

        let mut second = MockSwapBackend::new();
        second.expect_name().return_const("second");
        second
            .expect_plan()
            .times(1)
            .returning(|_| Err(BackendError::Unavailable("HTTP 503".to_string())));

        let backends = vec![boxed(first), boxed(second)];
        let err = select_plan(&backends, &request(), None).await.unwrap_err();
        assert!(matches!(err, ExecError::NoRouteFound));
    }

    #[tokio::test]
    async fn test_affirmative_no_route_ends_search_immediately() {
        let mut first = MockSwapBackend::new();
        first.expect_name().return_const("first");
        first
            .expect_plan()
            .times(1)
            .returning(|_| Err(BackendError::NoRoute));

        let mut second = MockSwapBackend::new();
        second.expect_name().return_const("second");
        second.expect_plan().times(0);

        let backends = vec![boxed(first), boxed(second)];
        let err = select_plan(&backends, &request(), None).await.unwrap_err();
        assert!(matches!(err, ExecError::NoRouteFound));
    }

    #[tokio::test]
    async fn test_progress_milestones_are_optional() {
        let mut only = MockSwapBackend::new();
        only.expect_name().return_const("only");
        only.expect_plan().times(1).returning(|_| Ok(plan(0xaa)));

        // With a sender: the search milestone arrives.
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let backends = vec![boxed(only)];
        select_plan(&backends, &request(), Some(&tx)).await.unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            SwapProgress::SearchingRoute { backend: "only" }
        );
    }

    #[test]
    fn test_balance_precheck_reports_amounts() {
        // 0 native-variant balance with 50 of the other variant held
        // elsewhere: the check sees only the input token.
        let err = check_balance(dec!(0), dec!(25)).unwrap_err();
        match err {
            ExecError::InsufficientBalance { have, need } => {
                assert_eq!(have, dec!(0));
                assert_eq!(need, dec!(25));
            }
            other => panic!("expected InsufficientBalance, got {other:?}"),
        }

        assert!(check_balance(dec!(50), dec!(25)).is_ok());
        assert!(check_balance(dec!(24.9), dec!(25)).is_err());
    }

    #[test]
    fn test_gas_limit_margin_rounds_up() {
        assert_eq!(inflate_gas_limit(200_000), 260_000);
        assert_eq!(inflate_gas_limit(333_333), 433_333);
        assert_eq!(inflate_gas_limit(1), 2);
    }
}
