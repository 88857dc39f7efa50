//! Single-call aggregator backend: one GET returns quote and transaction
//! payload together.

use crate::backend::{BackendError, BackendResult, SwapBackend, SwapPlan, SwapRequest};
use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Slippage tolerance in percent, as the API expects it.
const SLIPPAGE_PERCENT: &str = "1";

#[derive(Debug, Deserialize)]
struct SwapResponse {
    #[serde(rename = "dstAmount")]
    dst_amount: String,
    tx: TxPayload,
}

#[derive(Debug, Deserialize)]
struct TxPayload {
    to: String,
    data: String,
    #[serde(default)]
    value: Option<String>,
    gas: u64,
}

/// Backend for the one-shot swap API.
pub struct OneInchBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OneInchBackend {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> BackendResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| BackendError::Unavailable(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

fn parse_address(s: &str) -> BackendResult<Address> {
    Address::from_str(s).map_err(|e| BackendError::Unavailable(format!("malformed address: {e}")))
}

fn parse_u256(s: &str) -> BackendResult<U256> {
    U256::from_str_radix(s, 10)
        .map_err(|e| BackendError::Unavailable(format!("malformed amount: {e}")))
}

#[async_trait]
impl SwapBackend for OneInchBackend {
    fn name(&self) -> &'static str {
        "1inch"
    }

    async fn plan(&self, request: &SwapRequest) -> BackendResult<SwapPlan> {
        let url = format!("{}/swap", self.base_url);
        debug!(backend = self.name(), %url, "Requesting swap plan");

        let mut http = self.client.get(&url).query(&[
            ("src", request.token_in.to_string()),
            ("dst", request.token_out.to_string()),
            ("amount", request.amount_in.to_string()),
            ("from", request.from.to_string()),
            ("slippage", SLIPPAGE_PERCENT.to_string()),
        ]);
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key);
        }

        let response = http
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(format!("HTTP request failed: {e}")))?;

        // Any non-success response triggers fallback to the next backend;
        // this API does not distinguish "no route" from other failures.
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Unavailable(format!("HTTP {status}: {body}")));
        }

        let parsed: SwapResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Unavailable(format!("failed to parse response: {e}")))?;

        let calldata = parsed
            .tx
            .data
            .parse::<Bytes>()
            .map_err(|e| BackendError::Unavailable(format!("malformed calldata: {e}")))?;

        Ok(SwapPlan {
            router: parse_address(&parsed.tx.to)?,
            calldata,
            value: parsed
                .tx
                .value
                .as_deref()
                .map(parse_u256)
                .transpose()?
                .unwrap_or(U256::ZERO),
            estimated_out: parse_u256(&parsed.dst_amount)?,
            gas_estimate: parsed.tx.gas,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_response_parsing() {
        let body = r#"{
            "dstAmount": "24987000",
            "tx": {
                "from": "0x1111111111111111111111111111111111111111",
                "to": "0x1111111254EEB25477B68fb85Ed929f73A960582",
                "data": "0xdeadbeef",
                "value": "0",
                "gas": 210000
            }
        }"#;
        let parsed: SwapResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.dst_amount, "24987000");
        assert_eq!(parsed.tx.gas, 210000);

        assert_eq!(parse_u256(&parsed.dst_amount).unwrap(), U256::from(24_987_000u64));
        let router = parse_address(&parsed.tx.to).unwrap();
        assert_ne!(router, Address::ZERO);
    }

    #[test]
    fn test_malformed_amount_is_unavailable() {
        assert!(matches!(
            parse_u256("not-a-number"),
            Err(BackendError::Unavailable(_))
        ));
    }
}
