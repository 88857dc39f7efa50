//! Two-phase aggregator backend: a route quote followed by a transaction
//! build, two round-trips per plan.

use crate::backend::{BackendError, BackendResult, SwapBackend, SwapPlan, SwapRequest};
use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Slippage tolerance in basis points.
const SLIPPAGE_BPS: u32 = 100;

#[derive(Debug, Deserialize)]
struct RouteResponse {
    data: RouteData,
}

#[derive(Debug, Deserialize)]
struct RouteData {
    /// Absent when the aggregator found no route for the pair.
    #[serde(rename = "routeSummary")]
    route_summary: Option<serde_json::Value>,

    #[serde(rename = "routerAddress")]
    router_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BuildResponse {
    data: BuildData,
}

#[derive(Debug, Deserialize)]
struct BuildData {
    #[serde(rename = "amountOut")]
    amount_out: String,
    data: String,
    #[serde(rename = "routerAddress")]
    router_address: String,
    #[serde(default)]
    gas: Option<String>,
}

/// Fallback gas limit when the build response omits an estimate.
const DEFAULT_GAS_ESTIMATE: u64 = 500_000;

/// Backend for the route-quote / route-build API.
pub struct KyberBackend {
    client: Client,
    base_url: String,
}

impl KyberBackend {
    pub fn new(base_url: impl Into<String>) -> BackendResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| BackendError::Unavailable(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SwapBackend for KyberBackend {
    fn name(&self) -> &'static str {
        "kyberswap"
    }

    async fn plan(&self, request: &SwapRequest) -> BackendResult<SwapPlan> {
        // Phase 1: route quote.
        let url = format!("{}/routes", self.base_url);
        debug!(backend = self.name(), %url, "Requesting route quote");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("tokenIn", request.token_in.to_string()),
                ("tokenOut", request.token_out.to_string()),
                ("amountIn", request.amount_in.to_string()),
            ])
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Unavailable(format!("HTTP {status}: {body}")));
        }

        let route: RouteResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Unavailable(format!("failed to parse route: {e}")))?;

        // A clean response with no route summary is the aggregator saying
        // "no liquidity", not an outage.
        let Some(route_summary) = route.data.route_summary else {
            return Err(BackendError::NoRoute);
        };

        // Phase 2: build the transaction for the quoted route.
        let url = format!("{}/route/build", self.base_url);
        debug!(backend = self.name(), %url, "Building route transaction");

        let body = json!({
            "routeSummary": route_summary,
            "sender": request.from.to_string(),
            "recipient": request.from.to_string(),
            "slippageTolerance": SLIPPAGE_BPS,
        });
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Unavailable(format!("HTTP {status}: {body}")));
        }

        let build: BuildResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Unavailable(format!("failed to parse build: {e}")))?;

        let router = build
            .data
            .router_address
            .parse::<Address>()
            .or_else(|_| {
                route
                    .data
                    .router_address
                    .as_deref()
                    .unwrap_or_default()
                    .parse::<Address>()
            })
            .map_err(|e| BackendError::Unavailable(format!("malformed router address: {e}")))?;

        let calldata = build
            .data
            .data
            .parse::<Bytes>()
            .map_err(|e| BackendError::Unavailable(format!("malformed calldata: {e}")))?;
        let estimated_out = U256::from_str_radix(&build.data.amount_out, 10)
            .map_err(|e| BackendError::Unavailable(format!("malformed amount: {e}")))?;
        let gas_estimate = build
            .data
            .gas
            .as_deref()
            .and_then(|g| u64::from_str(g).ok())
            .unwrap_or(DEFAULT_GAS_ESTIMATE);

        Ok(SwapPlan {
            router,
            calldata,
            value: U256::ZERO,
            estimated_out,
            gas_estimate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_route_summary_means_no_route() {
        let body = r#"{"data": {"routerAddress": "0x6131B5fae19EA4f9D964eAc0408E4408b66337b5"}}"#;
        let route: RouteResponse = serde_json::from_str(body).unwrap();
        assert!(route.data.route_summary.is_none());
    }

    #[test]
    fn test_route_summary_passes_through_opaquely() {
        let body = r#"{"data": {
            "routeSummary": {"tokenIn": "0xa", "route": [[{"pool": "0xb"}]]},
            "routerAddress": "0x6131B5fae19EA4f9D964eAc0408E4408b66337b5"
        }}"#;
        let route: RouteResponse = serde_json::from_str(body).unwrap();
        let summary = route.data.route_summary.unwrap();
        // The summary is echoed back verbatim in the build request.
        assert_eq!(summary["tokenIn"], "0xa");
    }

    #[test]
    fn test_build_response_parsing() {
        let body = r#"{"data": {
            "amountOut": "24950000",
            "data": "0xabcdef",
            "routerAddress": "0x6131B5fae19EA4f9D964eAc0408E4408b66337b5",
            "gas": "385000"
        }}"#;
        let build: BuildResponse = serde_json::from_str(body).unwrap();
        assert_eq!(build.data.amount_out, "24950000");
        assert_eq!(build.data.gas.as_deref(), Some("385000"));
    }
}
