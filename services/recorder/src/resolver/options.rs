//! Option strike-window rule
//!
//! Select one side of the nearest-expiry chain inside a fixed window
//! around the at-the-money strike, and tag every pick with its integer
//! offset from ATM so downstream consumers can address relative strikes
//! without recomputation.

use recorder_common::{Instrument, OptionKind, ResolutionError};
use recorder_common::types::instrument::SEGMENT_OPTIONS;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::Catalog;

/// Strike-window selection request for one underlying
#[derive(Debug, Clone)]
pub struct StrikeWindow {
    /// Underlying name as it appears in the catalog
    pub underlying: String,
    /// At-the-money reference price, already rounded to the increment
    pub atm: f64,
    /// Strikes per side of ATM
    pub per_side: i64,
    /// Strike spacing
    pub increment: i64,
    /// Option side to record
    pub kind: OptionKind,
}

/// One selected option with its persisted position attribute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionPick {
    /// The selected contract
    pub instrument: Instrument,
    /// `(strike - atm) / increment`: 0 = ATM, negative below, positive above
    pub position: i32,
}

/// Resolve the option subscription for one strike window.
///
/// Filters the underlying's option chain to the nearest expiry, to
/// strikes divisible by the increment inside `[atm - k*m, atm + k*m]`,
/// and to the requested side. Picks come back sorted by descending
/// strike. An empty result is fatal.
pub fn resolve_options(
    catalog: &Catalog,
    window: &StrikeWindow,
) -> Result<Vec<OptionPick>, ResolutionError> {
    let increment = window.increment as f64;
    let span = (window.per_side * window.increment) as f64;
    let lower = window.atm - span;
    let upper = window.atm + span;

    let chain: Vec<&Instrument> = catalog
        .query(&recorder_common::InstrumentFilter {
            segment: Some(SEGMENT_OPTIONS.to_string()),
            underlying: Some(window.underlying.clone()),
            kind: Some(window.kind.instrument_kind()),
            ..Default::default()
        })
        .into_iter()
        .filter(|i| i.expiry.is_some())
        .collect();

    let nearest_expiry = chain.iter().filter_map(|i| i.expiry).min().ok_or_else(|| {
        ResolutionError::NoOptionChain {
            underlying: window.underlying.clone(),
        }
    })?;

    let mut picks: Vec<OptionPick> = chain
        .into_iter()
        .filter(|i| i.expiry == Some(nearest_expiry))
        .filter_map(|i| {
            let strike = i.strike?;
            if strike % increment != 0.0 || strike < lower || strike > upper {
                return None;
            }
            // strikes are increment-aligned here, so the division is exact
            let position = ((strike - window.atm) / increment).round() as i32;
            Some(OptionPick {
                instrument: i.clone(),
                position,
            })
        })
        .collect();

    if picks.is_empty() {
        return Err(ResolutionError::NoOptionChain {
            underlying: window.underlying.clone(),
        });
    }

    picks.sort_by(|a, b| {
        b.instrument
            .strike
            .partial_cmp(&a.instrument.strike)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    debug!(
        underlying = %window.underlying,
        atm = window.atm,
        %nearest_expiry,
        count = picks.len(),
        "strike window resolved"
    );

    Ok(picks)
}

/// Index picks by position for downstream relative-strike lookups
#[must_use]
pub fn by_position(picks: &[OptionPick]) -> FxHashMap<i32, &OptionPick> {
    picks.iter().map(|p| (p.position, p)).collect()
}
