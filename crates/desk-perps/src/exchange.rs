//! Signed order submission to the perp venue's exchange endpoint.
//!
//! A 200 response only means the request was accepted for processing. The
//! actual outcome lives in the embedded per-order status, which is what
//! callers must branch on.

use crate::error::{PerpsError, PerpsResult};
use crate::signing::{sign_action, Action, SigningInput};
use alloy::primitives::PrimitiveSignature;
use alloy::signers::local::PrivateKeySigner;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-order status embedded in the exchange response.
///
/// Order actions report externally tagged statuses: `{"filled": {...}}`,
/// `{"resting": {...}}`, or `{"error": "..."}`. Other actions, cancels in
/// particular, acknowledge with a bare string such as `"success"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "StatusWire")]
pub enum OrderStatus {
    Filled {
        total_sz: Decimal,
        avg_px: Decimal,
        oid: Option<u64>,
    },
    Resting {
        oid: u64,
    },
    Error(String),
    /// Bare acknowledgement string carrying no order detail.
    Ack(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StatusWire {
    Tagged(TaggedStatus),
    Plain(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
enum TaggedStatus {
    Filled {
        #[serde(rename = "totalSz")]
        total_sz: Decimal,
        #[serde(rename = "avgPx")]
        avg_px: Decimal,
        #[serde(default)]
        oid: Option<u64>,
    },
    Resting {
        oid: u64,
    },
    Error(String),
}

impl From<StatusWire> for OrderStatus {
    fn from(wire: StatusWire) -> Self {
        match wire {
            StatusWire::Tagged(TaggedStatus::Filled {
                total_sz,
                avg_px,
                oid,
            }) => OrderStatus::Filled {
                total_sz,
                avg_px,
                oid,
            },
            StatusWire::Tagged(TaggedStatus::Resting { oid }) => OrderStatus::Resting { oid },
            StatusWire::Tagged(TaggedStatus::Error(reason)) => OrderStatus::Error(reason),
            StatusWire::Plain(ack) => OrderStatus::Ack(ack),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExchangeResponse {
    status: String,
    /// Typed body on "ok"; a bare reason string on "err".
    #[serde(default)]
    response: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    #[serde(default)]
    data: Option<ResponseData>,
}

#[derive(Debug, Deserialize)]
struct ResponseData {
    #[serde(default)]
    statuses: Vec<OrderStatus>,
}

#[derive(Debug, Serialize)]
struct SignatureWire {
    r: String,
    s: String,
    v: u64,
}

impl SignatureWire {
    fn from_signature(sig: &PrimitiveSignature) -> Self {
        Self {
            r: format!("0x{}", hex::encode(sig.r().to_be_bytes::<32>())),
            s: format!("0x{}", hex::encode(sig.s().to_be_bytes::<32>())),
            v: 27 + sig.v() as u64,
        }
    }
}

/// Client for the signed exchange endpoint.
pub struct ExchangeClient {
    client: Client,
    exchange_url: String,
    is_mainnet: bool,
}

impl ExchangeClient {
    pub fn new(base_url: impl Into<String>, is_mainnet: bool) -> PerpsResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| PerpsError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            exchange_url: format!("{}/exchange", base_url.into().trim_end_matches('/')),
            is_mainnet,
        })
    }

    /// Sign and submit an action, returning the first embedded order status.
    pub async fn submit(
        &self,
        signer: &PrivateKeySigner,
        action: Action,
    ) -> PerpsResult<OrderStatus> {
        // Millisecond timestamps satisfy the venue's monotonic nonce rule
        // for sequential order flow.
        let nonce = Utc::now().timestamp_millis() as u64;

        let input = SigningInput {
            action,
            nonce,
            vault_address: None,
        };
        let signature = sign_action(signer, &input, self.is_mainnet).await?;

        let payload = json!({
            "action": input.action,
            "nonce": nonce,
            "signature": SignatureWire::from_signature(&signature),
        });

        debug!(url = %self.exchange_url, nonce, "Submitting signed action");

        let response = self
            .client
            .post(&self.exchange_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PerpsError::Transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PerpsError::Transport(format!("HTTP {status}: {body}")));
        }

        let body: ExchangeResponse = response
            .json()
            .await
            .map_err(|e| PerpsError::Response(format!("failed to parse response: {e}")))?;

        if body.status != "ok" {
            let reason = body.response.as_str().unwrap_or("unspecified").to_string();
            warn!(status = %body.status, %reason, "Exchange rejected action");
            return Err(PerpsError::Response(reason));
        }

        let parsed: ResponseBody = serde_json::from_value(body.response)
            .map_err(|e| PerpsError::Response(format!("failed to parse response body: {e}")))?;
        let order_status = parsed
            .data
            .and_then(|d| d.statuses.into_iter().next())
            .ok_or_else(|| PerpsError::Response("response carried no order status".to_string()))?;

        info!(nonce, "Action accepted");
        Ok(order_status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_filled_status_parsing() {
        let body = r#"{
            "status": "ok",
            "response": {
                "type": "order",
                "data": {"statuses": [{"filled": {"totalSz": "1.2345", "avgPx": "100.7", "oid": 77738308}}]}
            }
        }"#;
        let parsed: ExchangeResponse = serde_json::from_str(body).unwrap();

        assert_eq!(parsed.status, "ok");
        let body: ResponseBody = serde_json::from_value(parsed.response).unwrap();
        let statuses = body.data.unwrap().statuses;
        match &statuses[0] {
            OrderStatus::Filled {
                total_sz,
                avg_px,
                oid,
            } => {
                assert_eq!(*total_sz, dec!(1.2345));
                assert_eq!(*avg_px, dec!(100.7));
                assert_eq!(*oid, Some(77738308));
            }
            other => panic!("expected filled, got {other:?}"),
        }
    }

    #[test]
    fn test_resting_status_parsing() {
        let body = r#"{
            "status": "ok",
            "response": {"type": "order", "data": {"statuses": [{"resting": {"oid": 12345}}]}}
        }"#;
        let parsed: ExchangeResponse = serde_json::from_str(body).unwrap();
        let body: ResponseBody = serde_json::from_value(parsed.response).unwrap();
        let statuses = body.data.unwrap().statuses;
        assert!(matches!(statuses[0], OrderStatus::Resting { oid: 12345 }));
    }

    #[test]
    fn test_error_status_parsing() {
        // Transport-level "ok" with an embedded per-order error.
        let body = r#"{
            "status": "ok",
            "response": {"type": "order", "data": {"statuses": [{"error": "Insufficient margin"}]}}
        }"#;
        let parsed: ExchangeResponse = serde_json::from_str(body).unwrap();
        let body: ResponseBody = serde_json::from_value(parsed.response).unwrap();
        let statuses = body.data.unwrap().statuses;
        match &statuses[0] {
            OrderStatus::Error(reason) => assert_eq!(reason, "Insufficient margin"),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn test_cancel_acknowledgement_parsing() {
        // Cancels acknowledge with a bare string instead of a tagged status.
        let body = r#"{
            "status": "ok",
            "response": {"type": "cancel", "data": {"statuses": ["success"]}}
        }"#;
        let parsed: ExchangeResponse = serde_json::from_str(body).unwrap();
        let body: ResponseBody = serde_json::from_value(parsed.response).unwrap();
        let statuses = body.data.unwrap().statuses;
        match &statuses[0] {
            OrderStatus::Ack(status) => assert_eq!(status, "success"),
            other => panic!("expected acknowledgement, got {other:?}"),
        }
    }

    #[test]
    fn test_signature_wire_v_offset() {
        use alloy::primitives::U256;

        // Parity false -> v 27, true -> v 28.
        let r = U256::from_be_bytes([0x11; 32]);
        let s = U256::from_be_bytes([0x22; 32]);

        let wire = SignatureWire::from_signature(&PrimitiveSignature::new(r, s, false));
        assert_eq!(wire.v, 27);
        assert!(wire.r.starts_with("0x11"));

        let wire = SignatureWire::from_signature(&PrimitiveSignature::new(r, s, true));
        assert_eq!(wire.v, 28);
    }
}
