//! Market listing and resolution via the venue's public metadata API.
//!
//! The API's own identifier filter returns fuzzy partial matches, so
//! resolution fetches an unfiltered page of active markets and matches the
//! condition identifier exactly on the client.

use crate::error::{ClobError, ClobResult};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Page size for the active-market listing.
const RESOLUTION_PAGE_LIMIT: usize = 200;

/// Raw market record from the listing API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaMarket {
    pub question: String,

    #[serde(rename = "conditionId")]
    pub condition_id: String,

    /// JSON-encoded array of outcome token ids, as delivered by the API.
    #[serde(rename = "clobTokenIds", default)]
    pub clob_token_ids: Option<String>,

    #[serde(rename = "enableOrderBook", default)]
    pub enable_order_book: bool,

    #[serde(default)]
    pub volume: Option<String>,
}

impl GammaMarket {
    /// Decode the outcome token ids. The listing API double-encodes this
    /// field as a JSON string.
    pub fn token_ids(&self) -> ClobResult<Vec<String>> {
        let raw = self
            .clob_token_ids
            .as_deref()
            .ok_or_else(|| ClobError::Response("market carries no outcome tokens".to_string()))?;
        serde_json::from_str(raw)
            .map_err(|e| ClobError::Response(format!("malformed clobTokenIds: {e}")))
    }
}

/// A market resolved to its tradeable outcome tokens.
///
/// Index 0 is the affirmative outcome, index 1 the negative one; side
/// selection downstream is purely positional.
#[derive(Debug, Clone)]
pub struct ResolvedMarket {
    pub question: String,
    pub condition_id: String,
    pub token_ids: Vec<String>,
}

/// A listed market is tradeable when its order book is enabled and it
/// exposes at least two outcome tokens.
fn is_tradeable(market: &GammaMarket) -> bool {
    market.enable_order_book && market.token_ids().map(|ids| ids.len() >= 2).unwrap_or(false)
}

/// Exact-match lookup over one listing page. No match, or a match whose
/// order book is disabled, resolves to `None`.
pub fn find_exact<'a>(markets: &'a [GammaMarket], condition_id: &str) -> Option<&'a GammaMarket> {
    markets
        .iter()
        .find(|m| m.condition_id == condition_id && m.enable_order_book)
}

/// Client for the public market metadata API.
pub struct GammaClient {
    client: Client,
    base_url: String,
}

impl GammaClient {
    pub fn new(base_url: impl Into<String>) -> ClobResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ClobError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_markets(&self, query: &[(&str, String)]) -> ClobResult<Vec<GammaMarket>> {
        let url = format!("{}/markets", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| ClobError::Transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClobError::Transport(format!("HTTP {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| ClobError::Response(format!("failed to parse markets: {e}")))
    }

    /// Resolve a condition identifier to its outcome tokens.
    ///
    /// Returns `Ok(None)` when no exact, order-book-enabled match exists on
    /// the active page, or when the match exposes fewer than two outcome
    /// tokens.
    pub async fn resolve_market(&self, condition_id: &str) -> ClobResult<Option<ResolvedMarket>> {
        debug!(%condition_id, "Resolving market");

        let markets = self
            .fetch_markets(&[
                ("closed", "false".to_string()),
                ("active", "true".to_string()),
                ("order", "volume".to_string()),
                ("ascending", "false".to_string()),
                ("limit", RESOLUTION_PAGE_LIMIT.to_string()),
            ])
            .await?;

        let Some(market) = find_exact(&markets, condition_id) else {
            info!(%condition_id, page_size = markets.len(), "No exact market match");
            return Ok(None);
        };

        let token_ids = market.token_ids()?;
        if token_ids.len() < 2 {
            info!(%condition_id, tokens = token_ids.len(), "Market has too few outcome tokens");
            return Ok(None);
        }

        Ok(Some(ResolvedMarket {
            question: market.question.clone(),
            condition_id: market.condition_id.clone(),
            token_ids,
        }))
    }

    /// Highest-volume active markets with a live order book.
    ///
    /// Listings mix in markets whose order book is disabled or that expose
    /// fewer than two outcome tokens; those do not count toward `limit`.
    /// Pages until `limit` tradeable markets are found or the listing runs
    /// dry.
    pub async fn trending_markets(&self, limit: usize) -> ClobResult<Vec<GammaMarket>> {
        let mut tradeable = Vec::new();
        let mut offset = 0usize;

        while tradeable.len() < limit {
            let page = self
                .fetch_markets(&[
                    ("closed", "false".to_string()),
                    ("active", "true".to_string()),
                    ("order", "volume".to_string()),
                    ("ascending", "false".to_string()),
                    ("limit", RESOLUTION_PAGE_LIMIT.to_string()),
                    ("offset", offset.to_string()),
                ])
                .await?;

            if page.is_empty() {
                break;
            }
            let listing_exhausted = page.len() < RESOLUTION_PAGE_LIMIT;
            offset += page.len();
            tradeable.extend(page.into_iter().filter(is_tradeable));
            if listing_exhausted {
                break;
            }
        }

        tradeable.truncate(limit);
        debug!(requested = limit, found = tradeable.len(), "Listed tradeable markets");
        Ok(tradeable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market(condition_id: &str, order_book: bool) -> GammaMarket {
        GammaMarket {
            question: format!("Will {condition_id} happen?"),
            condition_id: condition_id.to_string(),
            clob_token_ids: Some(r#"["111","222"]"#.to_string()),
            enable_order_book: order_book,
            volume: None,
        }
    }

    #[test]
    fn test_find_exact_ignores_partial_matches() {
        let markets = vec![market("0xabc123", true), market("0xabc", true)];

        let found = find_exact(&markets, "0xabc").unwrap();
        assert_eq!(found.condition_id, "0xabc");

        // A prefix of a listed id is not a match.
        assert!(find_exact(&markets, "0xab").is_none());
    }

    #[test]
    fn test_find_exact_requires_order_book() {
        let markets = vec![market("0xdef", false)];
        assert!(find_exact(&markets, "0xdef").is_none());
    }

    #[test]
    fn test_tradeable_requires_order_book_and_two_tokens() {
        assert!(is_tradeable(&market("0x1", true)));
        assert!(!is_tradeable(&market("0x2", false)));

        let mut one_token = market("0x3", true);
        one_token.clob_token_ids = Some(r#"["only"]"#.to_string());
        assert!(!is_tradeable(&one_token));

        let mut no_tokens = market("0x4", true);
        no_tokens.clob_token_ids = None;
        assert!(!is_tradeable(&no_tokens));
    }

    #[test]
    fn test_tradeable_filter_drops_untradeable_listings() {
        // A trending page interleaves tradeable and untradeable records;
        // only the former survive.
        let mut disabled = market("0xdead", false);
        disabled.volume = Some("99999".to_string());
        let page = vec![disabled, market("0xlive", true)];

        let kept: Vec<_> = page.into_iter().filter(is_tradeable).collect();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].condition_id, "0xlive");
    }

    #[test]
    fn test_token_ids_decodes_nested_json() {
        let m = market("0x1", true);
        assert_eq!(m.token_ids().unwrap(), vec!["111", "222"]);
    }

    #[test]
    fn test_token_ids_missing_field_is_error() {
        let mut m = market("0x1", true);
        m.clob_token_ids = None;
        assert!(m.token_ids().is_err());
    }

    #[test]
    fn test_market_deserialization() {
        let body = r#"{
            "question": "Will it rain?",
            "conditionId": "0xfeed",
            "clobTokenIds": "[\"10\",\"20\"]",
            "enableOrderBook": true,
            "volume": "12345.6"
        }"#;
        let m: GammaMarket = serde_json::from_str(body).unwrap();
        assert_eq!(m.condition_id, "0xfeed");
        assert!(m.enable_order_book);
        assert_eq!(m.token_ids().unwrap(), vec!["10", "20"]);
    }
}
