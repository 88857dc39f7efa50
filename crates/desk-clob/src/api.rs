//! Venue trading API boundary.
//!
//! [`ClobApi`] is the seam the executor tests against; [`HttpClobClient`]
//! is the production implementation. Authentication is two-tier:
//!
//! - L1: an EIP-712 wallet signature proves address control, used once per
//!   address to derive API credentials.
//! - L2: HMAC-SHA256 over `timestamp + method + path + body` with the
//!   derived secret, attached to every trading request.
//!
//! Orders themselves are EIP-712-signed against the exchange contract and
//! submitted fill-or-kill.

use crate::credentials::VenueCredential;
use crate::error::{ClobError, ClobResult};
use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer as AlloySigner;
use alloy::sol;
use alloy::sol_types::{eip712_domain, SolStruct};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use chrono::Utc;
use desk_core::OrderSide;
use hmac::{Hmac, Mac};
use rand::Rng;
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settlement token and outcome shares both use 6 decimals on this venue.
const AMOUNT_DECIMALS: u32 = 6;

sol! {
    /// L1 authentication payload.
    struct ClobAuth {
        address address;
        string timestamp;
        uint256 nonce;
        string message;
    }

    /// Exchange-contract order struct.
    struct Order {
        uint256 salt;
        address maker;
        address signer;
        address taker;
        uint256 tokenId;
        uint256 makerAmount;
        uint256 takerAmount;
        uint256 expiration;
        uint256 nonce;
        uint256 feeRateBps;
        uint8 side;
        uint8 signatureType;
    }
}

const AUTH_DOMAIN_NAME: &str = "ClobAuthDomain";
const AUTH_MESSAGE: &str = "This message attests that I control the given wallet";
const EXCHANGE_DOMAIN_NAME: &str = "Polymarket CTF Exchange";
const DOMAIN_VERSION: &str = "1";
const CHAIN_ID: u64 = 137;

/// Market order request: `amount` is settlement-token notional for a BUY
/// and share quantity for a SELL.
#[derive(Debug, Clone)]
pub struct MarketOrderArgs {
    pub token_id: String,
    pub side: OrderSide,
    pub amount: Decimal,
}

/// Venue response to an order submission. `success` is transport-level
/// only; callers must inspect `error_msg` and `status`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderResponse {
    #[serde(default)]
    pub success: bool,

    #[serde(rename = "errorMsg", default)]
    pub error_msg: Option<String>,

    #[serde(rename = "orderID", default)]
    pub order_id: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(rename = "takingAmount", default)]
    pub taking_amount: Option<Decimal>,

    #[serde(rename = "makingAmount", default)]
    pub making_amount: Option<Decimal>,
}

/// Resting order record from the authenticated orders endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenOrder {
    pub id: String,
    #[serde(rename = "asset_id")]
    pub token_id: String,
    pub side: String,
    pub price: Decimal,
    #[serde(rename = "original_size")]
    pub original_size: Decimal,
    #[serde(rename = "size_matched", default)]
    pub size_matched: Decimal,
}

/// Trading API surface the executor depends on.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClobApi: Send + Sync {
    /// Derive API credentials via an L1 wallet signature.
    async fn derive_credentials(&self, signer: &PrivateKeySigner) -> ClobResult<VenueCredential>;

    /// Sign and submit a fill-or-kill market order.
    async fn post_market_order(
        &self,
        credential: &VenueCredential,
        signer: &PrivateKeySigner,
        args: &MarketOrderArgs,
    ) -> ClobResult<OrderResponse>;

    /// Resting orders for the credential's owner.
    async fn open_orders(
        &self,
        credential: &VenueCredential,
        owner: Address,
    ) -> ClobResult<Vec<OpenOrder>>;

    /// Cancel one resting order by id.
    async fn cancel_order(
        &self,
        credential: &VenueCredential,
        owner: Address,
        order_id: &str,
    ) -> ClobResult<()>;
}

/// Production HTTP implementation of [`ClobApi`].
pub struct HttpClobClient {
    client: Client,
    base_url: String,
    exchange_contract: Address,
}

impl HttpClobClient {
    pub fn new(base_url: impl Into<String>, exchange_contract: Address) -> ClobResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ClobError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            exchange_contract,
        })
    }

    /// L2 signature: HMAC-SHA256 over `timestamp + method + path + body`,
    /// both secret and signature in URL-safe base64.
    fn l2_signature(
        secret: &str,
        timestamp: &str,
        method: &str,
        path: &str,
        body: &str,
    ) -> ClobResult<String> {
        let key = URL_SAFE
            .decode(secret)
            .map_err(|e| ClobError::Auth(format!("malformed API secret: {e}")))?;
        let mut mac = Hmac::<Sha256>::new_from_slice(&key)
            .map_err(|e| ClobError::Auth(format!("HMAC init failed: {e}")))?;
        mac.update(format!("{timestamp}{method}{path}{body}").as_bytes());
        Ok(URL_SAFE.encode(mac.finalize().into_bytes()))
    }

    fn l2_request(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&serde_json::Value>,
        credential: &VenueCredential,
        owner: Address,
    ) -> ClobResult<reqwest::RequestBuilder> {
        let timestamp = Utc::now().timestamp().to_string();
        let body_str = body.map(|b| b.to_string()).unwrap_or_default();
        let signature = Self::l2_signature(
            &credential.secret,
            &timestamp,
            method.as_str(),
            path,
            &body_str,
        )?;

        let mut request = self
            .client
            .request(method, format!("{}{path}", self.base_url))
            .header("POLY_ADDRESS", owner.to_string())
            .header("POLY_SIGNATURE", signature)
            .header("POLY_TIMESTAMP", timestamp)
            .header("POLY_API_KEY", credential.api_key.clone())
            .header("POLY_PASSPHRASE", credential.passphrase.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request)
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> ClobResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClobError::Transport(format!("failed to read response: {e}")))?;
        if !status.is_success() {
            return Err(ClobError::Transport(format!("HTTP {status}: {body}")));
        }
        serde_json::from_str(&body)
            .map_err(|e| ClobError::Response(format!("failed to parse response: {e}")))
    }

    /// Best executable price for a token from the public price endpoint.
    async fn market_price(&self, token_id: &str, side: OrderSide) -> ClobResult<Decimal> {
        #[derive(Deserialize)]
        struct PriceResponse {
            price: Decimal,
        }

        let side = match side {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        };
        let response = self
            .client
            .get(format!("{}/price", self.base_url))
            .query(&[("token_id", token_id), ("side", side)])
            .send()
            .await
            .map_err(|e| ClobError::Transport(format!("HTTP request failed: {e}")))?;

        let parsed: PriceResponse = Self::read_json(response).await?;
        if parsed.price <= Decimal::ZERO || parsed.price >= Decimal::ONE {
            return Err(ClobError::Response(format!(
                "price {} outside (0, 1)",
                parsed.price
            )));
        }
        Ok(parsed.price)
    }

    fn auth_domain() -> alloy::sol_types::Eip712Domain {
        eip712_domain! {
            name: AUTH_DOMAIN_NAME,
            version: DOMAIN_VERSION,
            chain_id: CHAIN_ID,
        }
    }

    fn exchange_domain(&self) -> alloy::sol_types::Eip712Domain {
        eip712_domain! {
            name: EXCHANGE_DOMAIN_NAME,
            version: DOMAIN_VERSION,
            chain_id: CHAIN_ID,
            verifying_contract: self.exchange_contract,
        }
    }
}

/// Convert a human amount to 6-decimal base units, flooring.
fn to_amount_units(value: Decimal) -> ClobResult<U256> {
    let scaled = (value * Decimal::from(10u64.pow(AMOUNT_DECIMALS))).trunc();
    let as_u128 = scaled
        .to_u128()
        .ok_or_else(|| ClobError::Response(format!("amount {value} not representable")))?;
    Ok(U256::from(as_u128))
}

/// Maker/taker amounts for a marketable order at `price`.
///
/// BUY spends `amount` of settlement token for `amount / price` shares;
/// SELL offers `amount` shares for `amount * price` of settlement token.
fn order_amounts(side: OrderSide, amount: Decimal, price: Decimal) -> ClobResult<(U256, U256)> {
    let (maker, taker) = match side {
        OrderSide::Buy => (amount, amount / price),
        OrderSide::Sell => (amount, amount * price),
    };
    Ok((to_amount_units(maker)?, to_amount_units(taker)?))
}

#[async_trait]
impl ClobApi for HttpClobClient {
    async fn derive_credentials(&self, signer: &PrivateKeySigner) -> ClobResult<VenueCredential> {
        let timestamp = Utc::now().timestamp().to_string();
        let auth = ClobAuth {
            address: signer.address(),
            timestamp: timestamp.clone(),
            nonce: U256::ZERO,
            message: AUTH_MESSAGE.to_string(),
        };

        let signing_hash = auth.eip712_signing_hash(&Self::auth_domain());
        let signature = signer
            .sign_hash(&signing_hash)
            .await
            .map_err(|e| ClobError::Auth(e.to_string()))?;

        debug!(address = %signer.address(), "Requesting API credential derivation");

        let response = self
            .client
            .get(format!("{}/auth/derive-api-key", self.base_url))
            .header("POLY_ADDRESS", signer.address().to_string())
            .header(
                "POLY_SIGNATURE",
                format!("0x{}", hex::encode(signature.as_bytes())),
            )
            .header("POLY_TIMESTAMP", timestamp)
            .header("POLY_NONCE", "0")
            .send()
            .await
            .map_err(|e| ClobError::Transport(format!("HTTP request failed: {e}")))?;

        Self::read_json(response).await
    }

    async fn post_market_order(
        &self,
        credential: &VenueCredential,
        signer: &PrivateKeySigner,
        args: &MarketOrderArgs,
    ) -> ClobResult<OrderResponse> {
        let price = self.market_price(&args.token_id, args.side).await?;
        let (maker_amount, taker_amount) = order_amounts(args.side, args.amount, price)?;

        let token_id = U256::from_str_radix(&args.token_id, 10)
            .map_err(|e| ClobError::Response(format!("malformed token id: {e}")))?;
        let salt = U256::from(rand::thread_rng().gen::<u64>());
        let side_code: u8 = match args.side {
            OrderSide::Buy => 0,
            OrderSide::Sell => 1,
        };

        let order = Order {
            salt,
            maker: signer.address(),
            signer: signer.address(),
            taker: Address::ZERO,
            tokenId: token_id,
            makerAmount: maker_amount,
            takerAmount: taker_amount,
            expiration: U256::ZERO,
            nonce: U256::ZERO,
            feeRateBps: U256::ZERO,
            side: side_code,
            signatureType: 0, // EOA
        };

        let signing_hash = order.eip712_signing_hash(&self.exchange_domain());
        let signature = signer
            .sign_hash(&signing_hash)
            .await
            .map_err(|e| ClobError::Auth(e.to_string()))?;

        let body = json!({
            "order": {
                "salt": salt.to_string(),
                "maker": signer.address().to_string(),
                "signer": signer.address().to_string(),
                "taker": Address::ZERO.to_string(),
                "tokenId": args.token_id,
                "makerAmount": maker_amount.to_string(),
                "takerAmount": taker_amount.to_string(),
                "expiration": "0",
                "nonce": "0",
                "feeRateBps": "0",
                "side": args.side,
                "signatureType": 0,
                "signature": format!("0x{}", hex::encode(signature.as_bytes())),
            },
            "owner": credential.api_key,
            "orderType": "FOK",
        });

        info!(token_id = %args.token_id, side = ?args.side, amount = %args.amount, %price, "Posting FOK order");

        let request =
            self.l2_request(reqwest::Method::POST, "/order", Some(&body), credential, signer.address())?;
        let response = request
            .send()
            .await
            .map_err(|e| ClobError::Transport(format!("HTTP request failed: {e}")))?;

        Self::read_json(response).await
    }

    async fn open_orders(
        &self,
        credential: &VenueCredential,
        owner: Address,
    ) -> ClobResult<Vec<OpenOrder>> {
        let request =
            self.l2_request(reqwest::Method::GET, "/data/orders", None, credential, owner)?;
        let response = request
            .send()
            .await
            .map_err(|e| ClobError::Transport(format!("HTTP request failed: {e}")))?;
        Self::read_json(response).await
    }

    async fn cancel_order(
        &self,
        credential: &VenueCredential,
        owner: Address,
        order_id: &str,
    ) -> ClobResult<()> {
        #[derive(Deserialize)]
        struct CancelResponse {
            #[serde(default)]
            canceled: Vec<String>,
        }

        let body = json!({ "orderID": order_id });
        let request = self.l2_request(
            reqwest::Method::DELETE,
            "/order",
            Some(&body),
            credential,
            owner,
        )?;
        let response = request
            .send()
            .await
            .map_err(|e| ClobError::Transport(format!("HTTP request failed: {e}")))?;

        let parsed: CancelResponse = Self::read_json(response).await?;
        if parsed.canceled.iter().any(|id| id == order_id) {
            Ok(())
        } else {
            Err(ClobError::Response(format!(
                "order {order_id} was not canceled"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_amounts_buy() {
        // Spend 25 settlement tokens at 0.50: 50 shares expected.
        let (maker, taker) = order_amounts(OrderSide::Buy, dec!(25), dec!(0.50)).unwrap();
        assert_eq!(maker, U256::from(25_000_000u64));
        assert_eq!(taker, U256::from(50_000_000u64));
    }

    #[test]
    fn test_order_amounts_sell() {
        // Sell 40 shares at 0.25: 10 settlement tokens expected.
        let (maker, taker) = order_amounts(OrderSide::Sell, dec!(40), dec!(0.25)).unwrap();
        assert_eq!(maker, U256::from(40_000_000u64));
        assert_eq!(taker, U256::from(10_000_000u64));
    }

    #[test]
    fn test_amount_units_floor() {
        // Sub-unit dust truncates, never rounds up.
        assert_eq!(
            to_amount_units(dec!(1.2345678)).unwrap(),
            U256::from(1_234_567u64)
        );
    }

    #[test]
    fn test_l2_signature_is_deterministic() {
        let secret = URL_SAFE.encode(b"super-secret-hmac-key");
        let a = HttpClobClient::l2_signature(&secret, "1700000000", "POST", "/order", "{}")
            .unwrap();
        let b = HttpClobClient::l2_signature(&secret, "1700000000", "POST", "/order", "{}")
            .unwrap();
        assert_eq!(a, b);

        // Any component change produces a different MAC.
        let c = HttpClobClient::l2_signature(&secret, "1700000001", "POST", "/order", "{}")
            .unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_l2_signature_rejects_bad_secret() {
        let err = HttpClobClient::l2_signature("not-base64!!!", "1", "GET", "/", "");
        assert!(matches!(err, Err(ClobError::Auth(_))));
    }

    #[test]
    fn test_order_response_parsing() {
        let body = r#"{
            "success": true,
            "errorMsg": "",
            "orderID": "0xorder",
            "status": "matched",
            "takingAmount": "50.0",
            "makingAmount": "25.0"
        }"#;
        let parsed: OrderResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.order_id.as_deref(), Some("0xorder"));
        assert_eq!(parsed.taking_amount, Some(dec!(50.0)));
    }
}
