//! Single-flight API credential cache.
//!
//! Credential derivation is a signed venue call, so concurrent orders for
//! the same address must not each derive their own key set. Entries are
//! keyed by lowercased address and written at most once; a failed
//! derivation leaves the cell empty so the next caller retries.

use crate::error::ClobResult;
use alloy::primitives::Address;
use dashmap::DashMap;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

/// API credential set for the venue's authenticated endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct VenueCredential {
    #[serde(rename = "apiKey")]
    pub api_key: String,
    pub secret: String,
    pub passphrase: String,
}

/// Per-address credential cache with single-flight derivation.
#[derive(Default)]
pub struct CredentialCache {
    cells: DashMap<String, Arc<OnceCell<VenueCredential>>>,
}

impl CredentialCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached credential for `address`, deriving it via `derive`
    /// on first use. Concurrent callers for the same address share one
    /// derivation; failures are not cached.
    pub async fn get_or_derive<F, Fut>(
        &self,
        address: Address,
        derive: F,
    ) -> ClobResult<VenueCredential>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClobResult<VenueCredential>>,
    {
        let key = address.to_string().to_lowercase();
        let cell = self
            .cells
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let credential = cell
            .get_or_try_init(|| async {
                debug!(address = %key, "Deriving venue API credentials");
                derive().await
            })
            .await?;

        Ok(credential.clone())
    }

    /// Number of addresses with cached credentials.
    pub fn len(&self) -> usize {
        self.cells.iter().filter(|e| e.value().get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
