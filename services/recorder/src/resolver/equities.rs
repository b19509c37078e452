//! Index-membership rule for the cash universe
//!
//! Each tracked index has a `{index}.json` file mapping trading symbol
//! to weight. Every member must exist in the tradable-with-derivatives
//! set; a miss means the membership file is stale and resolution fails
//! before any subscription happens.

use std::path::Path;

use recorder_common::{Instrument, InstrumentFilter, ResolutionError};
use recorder_common::types::instrument::SEGMENT_CASH;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::Catalog;

/// One cash instrument tagged with its weight in the index being resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityPick {
    /// The selected cash instrument
    pub instrument: Instrument,
    /// Weight in the index; 0 when the symbol carries no weight entry
    pub weight: f64,
}

/// Load `{dir}/{index}.json` into a symbol -> weight map. A missing or
/// malformed file is fatal for the day's resolution.
pub fn load_membership(dir: &Path, index: &str) -> Result<FxHashMap<String, f64>, ResolutionError> {
    let path = dir.join(format!("{index}.json"));

    let data = std::fs::read_to_string(&path).map_err(|_| ResolutionError::MembershipFileMissing {
        index: index.to_string(),
        path: path.clone(),
    })?;

    serde_json::from_str(&data).map_err(|source| ResolutionError::MembershipFileInvalid {
        index: index.to_string(),
        source,
    })
}

/// Resolve the cash instruments for one index.
///
/// Validates every membership symbol against `tradable` (the underlyings
/// with listed futures), then selects NSE cash rows whose trading symbol
/// appears in the membership map, tagging each with its weight.
pub fn resolve_index_members(
    catalog: &Catalog,
    index: &str,
    membership: &FxHashMap<String, f64>,
    tradable: &[String],
) -> Result<Vec<EquityPick>, ResolutionError> {
    let missing: Vec<String> = membership
        .keys()
        .filter(|symbol| !tradable.contains(symbol))
        .cloned()
        .collect();

    if !missing.is_empty() {
        let mut symbols = missing;
        symbols.sort();
        return Err(ResolutionError::MissingSymbols {
            index: index.to_string(),
            symbols,
        });
    }

    let picks: Vec<EquityPick> = catalog
        .query(&InstrumentFilter {
            segment: Some(SEGMENT_CASH.to_string()),
            ..Default::default()
        })
        .into_iter()
        .filter(|i| membership.contains_key(&i.trading_symbol))
        .map(|i| EquityPick {
            instrument: i.clone(),
            weight: membership.get(&i.trading_symbol).copied().unwrap_or(0.0),
        })
        .collect();

    debug!(index, count = picks.len(), "index members resolved");
    Ok(picks)
}
