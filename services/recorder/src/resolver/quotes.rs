//! ATM reference price seeding
//!
//! Option windows need an at-the-money price before the session opens.
//! When not overridden in config it comes from the quote REST endpoint,
//! rounded to the nearest strike increment.

use anyhow::{Context, Result};
use recorder_common::constants::KITE_API_URL;
use reqwest::Client;
use tracing::info;

/// Thin client for the quote REST endpoint
pub struct QuoteClient {
    client: Client,
    api_key: String,
    access_token: String,
}

impl QuoteClient {
    /// Create a quote client with the session credentials
    pub fn new(api_key: String, access_token: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key,
            access_token,
        })
    }

    /// Fetch the last traded price for one quote symbol
    /// (e.g. "NSE:NIFTY 50")
    pub async fn last_price(&self, quote_symbol: &str) -> Result<f64> {
        let response = self
            .client
            .get(format!("{KITE_API_URL}/quote"))
            .query(&[("i", quote_symbol)])
            .header(
                "Authorization",
                format!("token {}:{}", self.api_key, self.access_token),
            )
            .send()
            .await
            .context("quote request failed")?
            .error_for_status()
            .context("quote request rejected")?;

        let body: serde_json::Value = response.json().await.context("quote body not JSON")?;

        let ltp = body
            .get("data")
            .and_then(|d| d.get(quote_symbol))
            .and_then(|q| q.get("last_price"))
            .and_then(serde_json::Value::as_f64)
            .with_context(|| format!("no last_price in quote response for {quote_symbol}"))?;

        info!(quote_symbol, ltp, "index quote fetched");
        Ok(ltp)
    }
}

/// Round a last traded price to the nearest strike increment
#[must_use]
pub fn atm_from_ltp(ltp: f64, increment: i64) -> f64 {
    let increment = increment as f64;
    (ltp / increment).round() * increment
}
