//! HTTP client for the perp venue's public info endpoint.
//!
//! All requests are POSTs to `{base}/info` with a typed JSON body whose
//! `type` field selects the query. Responses are parsed into typed structs;
//! metadata is fetched fresh on every call so precision rules are never
//! stale.

use crate::error::{PerpsError, PerpsResult};
use crate::instrument::InstrumentSpec;
use desk_core::Price;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Request body for queries keyed by type alone.
#[derive(Debug, Serialize)]
struct InfoRequest {
    #[serde(rename = "type")]
    request_type: String,
}

/// Request body for queries scoped to a coin.
#[derive(Debug, Serialize)]
struct InfoRequestWithCoin {
    #[serde(rename = "type")]
    request_type: String,
    coin: String,
}

/// Request body for queries scoped to a user address.
#[derive(Debug, Serialize)]
struct InfoRequestWithUser {
    #[serde(rename = "type")]
    request_type: String,
    user: String,
}

#[derive(Debug, Deserialize)]
struct MetaResponse {
    universe: Vec<UniverseEntry>,
}

#[derive(Debug, Deserialize)]
struct UniverseEntry {
    name: String,
    #[serde(rename = "szDecimals")]
    sz_decimals: u32,
}

#[derive(Debug, Deserialize)]
struct L2BookResponse {
    levels: Vec<Vec<BookLevel>>,
}

#[derive(Debug, Deserialize)]
struct BookLevel {
    px: Decimal,
}

/// Best bid and offer from the top of the order book. Either side may be
/// empty on a thin market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bbo {
    pub bid: Option<Price>,
    pub ask: Option<Price>,
}

/// Open position on one instrument.
#[derive(Debug, Clone, Deserialize)]
pub struct PerpPosition {
    pub coin: String,
    /// Signed size: positive long, negative short.
    #[serde(rename = "szi")]
    pub size: Decimal,
    #[serde(rename = "entryPx")]
    pub entry_price: Option<Decimal>,
    #[serde(rename = "unrealizedPnl")]
    pub unrealized_pnl: Decimal,
}

/// Account margin summary plus open positions.
#[derive(Debug, Clone)]
pub struct AccountState {
    pub account_value: Decimal,
    pub withdrawable: Decimal,
    pub positions: Vec<PerpPosition>,
}

#[derive(Debug, Deserialize)]
struct ClearinghouseStateResponse {
    #[serde(rename = "marginSummary")]
    margin_summary: MarginSummary,
    withdrawable: Decimal,
    #[serde(rename = "assetPositions", default)]
    asset_positions: Vec<AssetPosition>,
}

#[derive(Debug, Deserialize)]
struct MarginSummary {
    #[serde(rename = "accountValue")]
    account_value: Decimal,
}

#[derive(Debug, Deserialize)]
struct AssetPosition {
    position: PerpPosition,
}

/// Client for the public info endpoint.
pub struct InfoClient {
    client: Client,
    info_url: String,
}

impl InfoClient {
    pub fn new(base_url: impl Into<String>) -> PerpsResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| PerpsError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            info_url: format!("{}/info", base_url.into().trim_end_matches('/')),
        })
    }

    async fn post<B: Serialize, T: for<'de> Deserialize<'de>>(&self, body: &B) -> PerpsResult<T> {
        let response = self
            .client
            .post(&self.info_url)
            .json(body)
            .send()
            .await
            .map_err(|e| PerpsError::Transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PerpsError::Transport(format!("HTTP {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| PerpsError::Response(format!("failed to parse response: {e}")))
    }

    /// Fetch the full instrument universe. The array position of each entry
    /// is its asset index on the wire.
    pub async fn meta(&self) -> PerpsResult<Vec<InstrumentSpec>> {
        debug!(url = %self.info_url, "Fetching instrument universe");

        let request = InfoRequest {
            request_type: "meta".to_string(),
        };
        let meta: MetaResponse = self.post(&request).await?;

        let specs = meta
            .universe
            .into_iter()
            .enumerate()
            .map(|(idx, entry)| InstrumentSpec {
                name: entry.name,
                asset_index: idx as u32,
                sz_decimals: entry.sz_decimals,
            })
            .collect::<Vec<_>>();

        info!(instrument_count = specs.len(), "Fetched instrument universe");
        Ok(specs)
    }

    /// Look up one instrument in the universe by exact symbol.
    pub async fn find_instrument(&self, name: &str) -> PerpsResult<Option<InstrumentSpec>> {
        let universe = self.meta().await?;
        Ok(universe.into_iter().find(|spec| spec.name == name))
    }

    /// Names of all tradeable instruments.
    pub async fn available_coins(&self) -> PerpsResult<Vec<String>> {
        let universe = self.meta().await?;
        Ok(universe.into_iter().map(|spec| spec.name).collect())
    }

    /// Top of book for a coin. `levels[0]` is the bid side, `levels[1]` the
    /// ask side; the first entry of each is the best price.
    pub async fn l2_book(&self, coin: &str) -> PerpsResult<Bbo> {
        debug!(%coin, "Fetching L2 book");

        let request = InfoRequestWithCoin {
            request_type: "l2Book".to_string(),
            coin: coin.to_string(),
        };
        let book: L2BookResponse = self.post(&request).await?;

        let best = |side: usize| {
            book.levels
                .get(side)
                .and_then(|levels| levels.first())
                .map(|level| Price::new(level.px))
        };

        Ok(Bbo {
            bid: best(0),
            ask: best(1),
        })
    }

    /// Margin summary and open positions for a user.
    pub async fn account_state(&self, user_address: &str) -> PerpsResult<AccountState> {
        debug!(user = %user_address, "Fetching clearinghouse state");

        let request = InfoRequestWithUser {
            request_type: "clearinghouseState".to_string(),
            user: user_address.to_string(),
        };
        let state: ClearinghouseStateResponse = self.post(&request).await?;

        Ok(AccountState {
            account_value: state.margin_summary.account_value,
            withdrawable: state.withdrawable,
            positions: state
                .asset_positions
                .into_iter()
                .map(|p| p.position)
                .collect(),
        })
    }
}
