//! Daily instrument dump download and parse
//!
//! The dump is fetched once per trading day and cached as
//! `{catalog_dir}/{EXCHANGE}/{date}_{EXCHANGE}.csv`; stale files for the
//! exchange are removed when a fresh dump lands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use recorder_common::constants::KITE_API_URL;
use recorder_common::{Instrument, KiteInstrumentCsv, ResolutionError};
use reqwest::Client;
use tracing::{info, warn};

use super::{Catalog, CatalogExchange};

const MAX_DOWNLOAD_ATTEMPTS: u32 = 3;

/// Fetches and parses the per-exchange instrument dump
pub struct CatalogLoader {
    client: Client,
    api_key: String,
    access_token: String,
    catalog_dir: PathBuf,
}

impl CatalogLoader {
    /// Create a loader writing cache files under `catalog_dir`
    pub fn new(api_key: String, access_token: String, catalog_dir: PathBuf) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key,
            access_token,
            catalog_dir,
        })
    }

    /// Load the catalog for `exchange` and `date`, downloading the dump
    /// if today's cache file is absent. An empty dump is fatal.
    pub async fn load(&self, exchange: CatalogExchange, date: NaiveDate) -> Result<Catalog> {
        let path = self.cache_path(exchange, date);

        if !path.exists() {
            self.download(exchange, &path).await?;
        }

        let data = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read catalog cache {}", path.display()))?;
        let instruments = parse_instrument_csv(&data)?;

        if instruments.is_empty() {
            return Err(ResolutionError::EmptyCatalog {
                exchange: exchange.as_str().to_string(),
            }
            .into());
        }

        info!(
            exchange = %exchange,
            count = instruments.len(),
            "instrument catalog loaded"
        );

        Ok(Catalog::from_instruments(exchange, instruments))
    }

    fn cache_path(&self, exchange: CatalogExchange, date: NaiveDate) -> PathBuf {
        self.catalog_dir
            .join(exchange.as_str())
            .join(format!("{date}_{exchange}.csv", exchange = exchange.as_str()))
    }

    /// Download the dump with bounded retries, rotate the exchange's
    /// cache folder, and write the new file.
    async fn download(&self, exchange: CatalogExchange, path: &Path) -> Result<()> {
        let url = format!("{KITE_API_URL}/instruments/{}", exchange.as_str());
        let mut last_error = None;

        for attempt in 1..=MAX_DOWNLOAD_ATTEMPTS {
            match self.fetch_dump(&url).await {
                Ok(body) if !body.trim().is_empty() => {
                    let dir = path
                        .parent()
                        .context("catalog cache path has no parent directory")?;
                    std::fs::create_dir_all(dir)?;
                    empty_the_folder(dir)?;
                    std::fs::write(path, body)?;
                    info!(exchange = %exchange, path = %path.display(), "catalog downloaded");
                    return Ok(());
                }
                Ok(_) => {
                    warn!(exchange = %exchange, attempt, "catalog download returned empty body");
                    last_error = Some(anyhow::anyhow!("empty instrument dump"));
                }
                Err(e) => {
                    warn!(exchange = %exchange, attempt, error = %e, "catalog download failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow::anyhow!("catalog download failed"))
            .context(format!(
                "failed to download {} instrument dump after {MAX_DOWNLOAD_ATTEMPTS} attempts",
                exchange.as_str()
            )))
    }

    async fn fetch_dump(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header(
                "Authorization",
                format!("token {}:{}", self.api_key, self.access_token),
            )
            .send()
            .await
            .context("instrument dump request failed")?
            .error_for_status()
            .context("instrument dump request rejected")?;

        response.text().await.context("failed to read dump body")
    }
}

/// Parse the dump CSV, skipping rows that fail to deserialize
pub fn parse_instrument_csv(data: &str) -> Result<Vec<Instrument>> {
    let mut reader = csv::Reader::from_reader(data.as_bytes());
    let mut instruments = Vec::new();
    let mut skipped = 0usize;

    for record in reader.deserialize::<KiteInstrumentCsv>() {
        match record {
            Ok(row) => instruments.push(Instrument::from(row)),
            Err(_) => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(skipped, "catalog rows failed to parse and were skipped");
    }

    Ok(instruments)
}

/// Remove every file in `dir` (stale dumps from previous days)
fn empty_the_folder(dir: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            std::fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use recorder_common::InstrumentKind;

    const SAMPLE_CSV: &str = "\
instrument_token,exchange_token,tradingsymbol,name,last_price,expiry,strike,tick_size,lot_size,instrument_type,segment,exchange
256265,1001,NIFTY 50,NIFTY 50,17500.25,,0.0,0.05,50,EQ,INDICES,NSE
11717634,45772,NIFTY24JANFUT,NIFTY,17510.0,2024-01-25,0.0,0.05,50,FUT,NFO-FUT,NFO
11720194,45782,NIFTY24JAN17500PE,NIFTY,120.5,2024-01-25,17500.0,0.05,50,PE,NFO-OPT,NFO
";

    #[test]
    fn parses_dump_rows() {
        let instruments = parse_instrument_csv(SAMPLE_CSV).unwrap();
        assert_eq!(instruments.len(), 3);

        let put = &instruments[2];
        assert_eq!(put.kind, InstrumentKind::Put);
        assert_eq!(put.strike, Some(17500.0));
        assert_eq!(put.name, "NIFTY");
    }

    #[test]
    fn bad_rows_are_skipped_not_fatal() {
        let data = format!("{SAMPLE_CSV}garbage,row\n");
        let instruments = parse_instrument_csv(&data).unwrap();
        assert_eq!(instruments.len(), 3);
    }
}
