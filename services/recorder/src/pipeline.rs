//! Pipeline assembly
//!
//! Three independent pipelines, one per exchange segment classification:
//! cash equities, derivatives (futures + options), and indices. Each
//! resolves its own subscription list up front, then gates on the
//! session clock, records its resolution manifest, provisions storage,
//! and hands the merged token list to a stream ingestor. A fatal error
//! in one pipeline never stops the others.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use recorder_common::{ExchangeSegment, ResolutionError, TickMode};
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::config::RecorderConfig;
use crate::ingestor::{IngestReport, IngestorPolicy, KiteTransport, StreamIngestor};
use crate::manifest::{ManifestEntry, ResolutionManifest};
use crate::registry::{TokenCategory, TokenRegistry};
use crate::relay::TickRelay;
use crate::resolver::{
    atm_from_ltp, load_membership, resolve_futures, resolve_index_members, resolve_indices,
    resolve_options, QuoteClient, StrikeWindow,
};
use crate::scheduler::SessionClock;
use crate::storage::StorageEngine;

use recorder_common::constants::KITE_WS_URL;

/// Cash pipeline universe: for each tracked index, the membership file's
/// symbols validated against the futures-tradable set, then matched to
/// NSE cash rows.
pub fn resolve_cash(
    config: &RecorderConfig,
    nse: &Catalog,
    nfo: &Catalog,
) -> Result<(TokenRegistry, ResolutionManifest), ResolutionError> {
    let exclude: Vec<String> = config.futures_underlyings.clone();
    let tradable = nfo.tradable_underlyings(&exclude);

    let mut registry = TokenRegistry::new();
    let mut manifest = ResolutionManifest::new();
    for index in &config.tracked_indices {
        let membership = load_membership(&config.membership_dir, index)?;
        let picks = resolve_index_members(nse, index, &membership, &tradable)?;
        registry.add(
            TokenCategory::Equities,
            picks.iter().map(|p| p.instrument.instrument_token),
        );
        for pick in &picks {
            manifest.push(ManifestEntry::equity(pick));
        }
    }

    registry.log_summary("cash");
    Ok((registry, manifest))
}

/// Derivatives pipeline universe: rollover-selected futures for each
/// configured underlying, plus the strike window for each option
/// underlying. The ATM reference comes from the configured override or
/// the quote endpoint.
pub async fn resolve_derivatives(
    config: &RecorderConfig,
    nfo: &Catalog,
    today: NaiveDate,
) -> Result<(TokenRegistry, ResolutionManifest)> {
    let mut registry = TokenRegistry::new();
    let mut manifest = ResolutionManifest::new();

    for underlying in &config.futures_underlyings {
        let contracts = resolve_futures(nfo, underlying, today, config.rollover_trigger_days)
            .with_context(|| format!("resolving futures for {underlying}"))?;
        registry.add(
            TokenCategory::Futures,
            contracts.iter().map(|i| i.instrument_token),
        );
        for contract in &contracts {
            manifest.push(ManifestEntry::plain(contract));
        }
    }

    let quotes = QuoteClient::new(
        config.credentials.api_key.clone(),
        config.credentials.access_token.clone(),
    )?;

    for window_config in &config.option_windows {
        let atm = match window_config.atm_override {
            Some(atm) => atm,
            None => {
                let ltp = quotes
                    .last_price(&window_config.quote_symbol)
                    .await
                    .with_context(|| {
                        format!("fetching ATM reference for {}", window_config.underlying)
                    })?;
                atm_from_ltp(ltp, window_config.increment)
            }
        };

        let window = StrikeWindow {
            underlying: window_config.underlying.clone(),
            atm,
            per_side: window_config.per_side,
            increment: window_config.increment,
            kind: window_config.kind,
        };
        let picks = resolve_options(nfo, &window)
            .with_context(|| format!("resolving options for {}", window_config.underlying))?;
        registry.add(
            TokenCategory::Options,
            picks.iter().map(|p| p.instrument.instrument_token),
        );
        for pick in &picks {
            manifest.push(ManifestEntry::option(pick));
        }
    }

    registry.log_summary("derivatives");
    Ok((registry, manifest))
}

/// Index pipeline universe: the configured index instruments
#[must_use]
pub fn resolve_index(config: &RecorderConfig, nse: &Catalog) -> (TokenRegistry, ResolutionManifest) {
    let instruments = resolve_indices(nse, &config.index_symbols);
    let mut registry = TokenRegistry::new();
    registry.add(
        TokenCategory::Indices,
        instruments.iter().map(|i| i.instrument_token),
    );
    let mut manifest = ResolutionManifest::new();
    for instrument in &instruments {
        manifest.push(ManifestEntry::plain(instrument));
    }
    registry.log_summary("index");
    (registry, manifest)
}

/// Run one pipeline for the day: wait for open, record the resolution
/// manifest, provision storage for the full subscription list, then
/// stream until close.
pub async fn run_pipeline(
    name: &'static str,
    config: &RecorderConfig,
    segment: ExchangeSegment,
    registry: TokenRegistry,
    manifest: ResolutionManifest,
    relay: Option<Box<dyn TickRelay>>,
) -> Result<IngestReport> {
    if registry.is_empty() {
        warn!(pipeline = name, "nothing resolved; pipeline idle today");
        return Ok(IngestReport::default());
    }

    let clock = SessionClock::new(config.session_open, config.session_close);
    clock.wait_for_open().await;

    // one directory per segment per trading day
    let day = chrono::Local::now().date_naive().to_string();
    let storage_dir = config.data_dir.join(segment.dir_name()).join(day);
    let mut storage = StorageEngine::open(storage_dir.clone(), segment)
        .with_context(|| format!("opening {name} storage"))?;
    manifest
        .write(&storage_dir)
        .with_context(|| format!("recording {name} manifest"))?;
    storage
        .provision(registry.tokens())
        .with_context(|| format!("provisioning {name} segments"))?;

    let transport = KiteTransport::new(
        KITE_WS_URL,
        &config.credentials.api_key,
        &config.credentials.access_token,
    )
    .with_context(|| format!("building {name} feed transport"))?;
    let policy = IngestorPolicy {
        max_attempts: config.max_reconnects,
        retry_delay: Duration::from_millis(config.reconnect_delay_ms),
        ..IngestorPolicy::default()
    };

    let mut ingestor = StreamIngestor::new(
        transport,
        storage,
        clock,
        registry.tokens().to_vec(),
        TickMode::Full,
        policy,
    );
    if let Some(relay) = relay {
        ingestor = ingestor.with_relay(relay);
    }

    let report = ingestor.run().await?;
    info!(pipeline = name, stored = report.stored, "pipeline finished");
    Ok(report)
}
