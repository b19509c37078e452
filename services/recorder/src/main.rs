//! Tick recorder entry point
//!
//! Loads the day's instrument catalogs, resolves the three subscription
//! universes, and runs one recording pipeline per exchange segment until
//! the session close. Pipelines are isolated: a fatal resolution or feed
//! error in one leaves the others running.

use anyhow::{Context, Result};
use chrono::Local;
use recorder_common::ExchangeSegment;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tick_recorder::catalog::{CatalogExchange, CatalogLoader};
use tick_recorder::config::RecorderConfig;
use tick_recorder::manifest::ResolutionManifest;
use tick_recorder::pipeline::{
    resolve_cash, resolve_derivatives, resolve_index, run_pipeline,
};
use tick_recorder::registry::TokenRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tick_recorder=info,recorder_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RecorderConfig::from_env().context("loading configuration")?;
    let today = Local::now().date_naive();
    info!(%today, "tick recorder starting");

    let loader = CatalogLoader::new(
        config.credentials.api_key.clone(),
        config.credentials.access_token.clone(),
        config.catalog_dir.clone(),
    )
    .context("building catalog loader")?;

    let nse = loader
        .load(CatalogExchange::Nse, today)
        .await
        .context("loading NSE catalog")?;
    let nfo = loader
        .load(CatalogExchange::Nfo, today)
        .await
        .context("loading NFO catalog")?;
    info!(nse = nse.len(), nfo = nfo.len(), "catalogs loaded");

    // resolve everything before the open gate so a bad membership file
    // or an empty chain surfaces immediately
    let cash = resolve_cash(&config, &nse, &nfo).context("cash resolution");
    let derivatives = resolve_derivatives(&config, &nfo, today).await;
    let index = resolve_index(&config, &nse);

    let mut tasks = Vec::new();
    tasks.push(spawn_pipeline("cash", &config, ExchangeSegment::Cash, cash));
    tasks.push(spawn_pipeline(
        "derivatives",
        &config,
        ExchangeSegment::Derivatives,
        derivatives,
    ));
    tasks.push(spawn_pipeline(
        "index",
        &config,
        ExchangeSegment::Index,
        Ok(index),
    ));

    for (name, task) in tasks {
        let Some(task) = task else { continue };
        match task.await {
            Ok(Ok(report)) => info!(
                pipeline = name,
                stored = report.stored,
                duplicates = report.duplicates,
                dropped = report.dropped,
                reconnects = report.reconnects,
                "pipeline complete"
            ),
            Ok(Err(e)) => error!(pipeline = name, error = %e, "pipeline failed"),
            Err(e) => error!(pipeline = name, error = %e, "pipeline task panicked"),
        }
    }

    info!("tick recorder done for the day");
    Ok(())
}

type PipelineHandle = tokio::task::JoinHandle<Result<tick_recorder::ingestor::IngestReport>>;

/// Spawn one pipeline if its resolution succeeded; a resolution failure
/// is logged here and only that pipeline is skipped.
fn spawn_pipeline(
    name: &'static str,
    config: &RecorderConfig,
    segment: ExchangeSegment,
    resolution: Result<(TokenRegistry, ResolutionManifest)>,
) -> (&'static str, Option<PipelineHandle>) {
    match resolution {
        Ok((registry, manifest)) => {
            let config = config.clone();
            let handle = tokio::spawn(async move {
                run_pipeline(name, &config, segment, registry, manifest, None).await
            });
            (name, Some(handle))
        }
        Err(e) => {
            error!(pipeline = name, error = %e, "resolution failed; pipeline skipped");
            (name, None)
        }
    }
}
