//! DexScreener API Integration
//!
//! Snapshot source for the scanner, the category search and the peak
//! tracker.
//!
//! ## API Reference
//!
//! - Search: `https://api.dexscreener.com/latest/dex/search?q={query}`
//! - Pair:   `https://api.dexscreener.com/latest/dex/pairs/{chain}/{pair}`
//!
//! Both return `{"pairs": [...]}`. Only pairs on the configured chain are
//! kept. Pairs that fail normalization are skipped one by one.

use super::error::ScanError;
use super::types::{DexResponse, PairSnapshot};
use async_trait::async_trait;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.dexscreener.com";

/// External snapshot source
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Search pairs matching `query`
    async fn search(&self, query: &str) -> Result<Vec<PairSnapshot>, ScanError>;

    /// Current USD price for a pair, `Ok(None)` if the pair is no longer listed
    async fn current_price(&self, pair_address: &str) -> Result<Option<f64>, ScanError>;
}

/// HTTP client for the public DexScreener API
pub struct DexScreenerClient {
    client: reqwest::Client,
    base_url: String,
    chain_id: String,
}

impl DexScreenerClient {
    /// Create a client bound to one chain
    ///
    /// # Arguments
    /// * `chain_id` - DexScreener chain id, e.g. `solana`
    /// * `timeout` - HTTP timeout applied to every request
    pub fn new(chain_id: &str, timeout: Duration) -> Result<Self, ScanError> {
        Self::with_base_url(DEFAULT_BASE_URL, chain_id, timeout)
    }

    pub fn with_base_url(
        base_url: &str,
        chain_id: &str,
        timeout: Duration,
    ) -> Result<Self, ScanError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScanError::fetch("<client>", e))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            chain_id: chain_id.to_string(),
        })
    }

    async fn get_pairs(
        &self,
        request: reqwest::RequestBuilder,
        label: &str,
    ) -> Result<DexResponse, ScanError> {
        let response = request
            .send()
            .await
            .map_err(|e| ScanError::fetch(label, e))?;

        if !response.status().is_success() {
            return Err(ScanError::fetch(
                label,
                format!("DexScreener API error: {}", response.status()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ScanError::fetch(label, e))?;

        serde_json::from_str(&body).map_err(|e| ScanError::fetch(label, format!("bad body: {}", e)))
    }
}

/// Keep pairs on `chain_id` that normalize cleanly
pub fn normalize_pairs(response: DexResponse, chain_id: &str) -> Vec<PairSnapshot> {
    response
        .pairs
        .unwrap_or_default()
        .into_iter()
        .filter(|p| p.chain_id == chain_id)
        .filter_map(|p| match PairSnapshot::try_from(p) {
            Ok(snap) => Some(snap),
            Err(e) => {
                log::debug!("⚠️  Skipping pair: {}", e);
                None
            }
        })
        .collect()
}

#[async_trait]
impl SnapshotSource for DexScreenerClient {
    async fn search(&self, query: &str) -> Result<Vec<PairSnapshot>, ScanError> {
        let url = format!("{}/latest/dex/search", self.base_url);
        let request = self.client.get(&url).query(&[("q", query)]);
        let parsed = self.get_pairs(request, query).await?;

        Ok(normalize_pairs(parsed, &self.chain_id))
    }

    async fn current_price(&self, pair_address: &str) -> Result<Option<f64>, ScanError> {
        let url = format!(
            "{}/latest/dex/pairs/{}/{}",
            self.base_url, self.chain_id, pair_address
        );
        let parsed = self.get_pairs(self.client.get(&url), pair_address).await?;

        let price = parsed
            .pairs
            .unwrap_or_default()
            .into_iter()
            .find(|p| p.pair_address == pair_address)
            .and_then(|p| p.price_usd)
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|p| p.is_finite() && *p > 0.0);

        Ok(price)
    }
}
