//! L1 action signing for the perp venue.
//!
//! Two-stage process:
//! 1. Compute `action_hash` from the msgpack-encoded action, the nonce, and
//!    an optional vault address.
//! 2. EIP-712-sign a phantom agent whose `connectionId` is that hash.
//!
//! The msgpack field order must match the venue's reference SDK exactly;
//! a different byte stream means a different hash and a rejected signature.

use crate::error::{PerpsError, PerpsResult};
use crate::instrument::InstrumentSpec;
use alloy::primitives::{keccak256, Address, PrimitiveSignature, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer as AlloySigner;
use alloy::sol;
use alloy::sol_types::{eip712_domain, SolStruct};
use desk_core::{OrderSide, Price, Size};
use serde::Serialize;

/// L1 action envelope.
///
/// `Option<T>` fields must use `skip_serializing_if`: the reference SDK
/// omits absent keys, while serde would otherwise encode `None` as nil and
/// change the action hash.
#[derive(Debug, Clone, Serialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub orders: Option<Vec<OrderWire>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancels: Option<Vec<CancelWire>>,

    /// "na" for ungrouped orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grouping: Option<String>,
}

impl Action {
    /// Single-order action with "na" grouping.
    pub fn single_order(order: OrderWire) -> Self {
        Self {
            action_type: "order".to_string(),
            orders: Some(vec![order]),
            cancels: None,
            grouping: Some("na".to_string()),
        }
    }

    /// Cancel action for one resting order.
    pub fn cancel(asset: u32, oid: u64) -> Self {
        Self {
            action_type: "cancel".to_string(),
            orders: None,
            cancels: Some(vec![CancelWire { asset, oid }]),
            grouping: None,
        }
    }
}

/// Order wire format: single-letter keys, string-encoded price and size.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWire {
    /// Asset index in the universe.
    #[serde(rename = "a")]
    pub asset: u32,

    #[serde(rename = "b")]
    pub is_buy: bool,

    #[serde(rename = "p")]
    pub limit_px: String,

    #[serde(rename = "s")]
    pub sz: String,

    #[serde(rename = "r")]
    pub reduce_only: bool,

    #[serde(rename = "t")]
    pub order_type: OrderTypeWire,
}

impl OrderWire {
    /// IOC limit order with the instrument's wire formatting applied.
    /// Price and size must already be rounded to the venue's grid.
    pub fn ioc_limit(spec: &InstrumentSpec, side: OrderSide, price: Price, size: Size) -> Self {
        Self {
            asset: spec.asset_index,
            is_buy: matches!(side, OrderSide::Buy),
            limit_px: spec.format_price(price),
            sz: spec.format_size(size),
            reduce_only: false,
            order_type: OrderTypeWire::ioc(),
        }
    }
}

/// Order type wire format: `{"limit": {"tif": "Ioc"|"Gtc"}}`.
#[derive(Debug, Clone, Serialize)]
pub struct OrderTypeWire {
    pub limit: LimitOrderType,
}

impl OrderTypeWire {
    pub fn ioc() -> Self {
        Self {
            limit: LimitOrderType {
                tif: "Ioc".to_string(),
            },
        }
    }

    pub fn gtc() -> Self {
        Self {
            limit: LimitOrderType {
                tif: "Gtc".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LimitOrderType {
    pub tif: String,
}

/// Cancel wire format: `{"a": asset, "o": oid}`.
#[derive(Debug, Clone, Serialize)]
pub struct CancelWire {
    #[serde(rename = "a")]
    pub asset: u32,

    #[serde(rename = "o")]
    pub oid: u64,
}

/// Everything that feeds the action hash.
#[derive(Debug, Clone)]
pub struct SigningInput {
    pub action: Action,
    pub nonce: u64,
    /// None for direct trading, Some when acting for a vault.
    pub vault_address: Option<Address>,
}

impl SigningInput {
    /// keccak256(msgpack(action) || nonce_be_8 || vault_tag).
    ///
    /// The vault tag is a single 0x00 byte when absent, or 0x01 followed by
    /// the 20-byte address when present.
    pub fn action_hash(&self) -> PerpsResult<B256> {
        let mut data = rmp_serde::to_vec_named(&self.action)
            .map_err(|e| PerpsError::Signing(format!("action serialization failed: {e}")))?;

        data.extend_from_slice(&self.nonce.to_be_bytes());

        match &self.vault_address {
            None => data.push(0x00),
            Some(addr) => {
                data.push(0x01);
                data.extend_from_slice(addr.as_slice());
            }
        }

        Ok(keccak256(&data))
    }
}

/// EIP-712 domain constants. The chain id is fixed by the venue and is not
/// the chain the venue settles on.
pub const EIP712_DOMAIN_NAME: &str = "Exchange";
pub const EIP712_DOMAIN_VERSION: &str = "1";
pub const EIP712_CHAIN_ID: u64 = 1337;
pub const EIP712_VERIFYING_CONTRACT: Address = Address::ZERO;

sol! {
    #[derive(Debug)]
    struct Agent {
        string source;
        bytes32 connectionId;
    }
}

/// EIP-712 signing target wrapping the action hash.
#[derive(Debug, Clone)]
pub struct PhantomAgent {
    /// "a" on mainnet, "b" on testnet.
    pub source: String,
    pub connection_id: B256,
}

impl PhantomAgent {
    pub fn new(action_hash: B256, is_mainnet: bool) -> Self {
        Self {
            source: if is_mainnet { "a" } else { "b" }.to_string(),
            connection_id: action_hash,
        }
    }

    pub async fn sign(&self, signer: &PrivateKeySigner) -> PerpsResult<PrimitiveSignature> {
        let domain = eip712_domain! {
            name: EIP712_DOMAIN_NAME,
            version: EIP712_DOMAIN_VERSION,
            chain_id: EIP712_CHAIN_ID,
            verifying_contract: EIP712_VERIFYING_CONTRACT,
        };

        let agent = Agent {
            source: self.source.clone(),
            connectionId: self.connection_id,
        };

        let signing_hash = agent.eip712_signing_hash(&domain);
        signer
            .sign_hash(&signing_hash)
            .await
            .map_err(|e| PerpsError::Signing(e.to_string()))
    }
}

/// Sign an action end-to-end: hash, wrap in a phantom agent, EIP-712 sign.
pub async fn sign_action(
    signer: &PrivateKeySigner,
    input: &SigningInput,
    is_mainnet: bool,
) -> PerpsResult<PrimitiveSignature> {
    let action_hash = input.action_hash()?;
    PhantomAgent::new(action_hash, is_mainnet).sign(signer).await
}
