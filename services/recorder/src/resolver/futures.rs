//! Futures rollover rule
//!
//! Track the nearest contract; from `trigger_days` before its expiry,
//! track the next contract as well so the roll is captured end to end.

use chrono::{Duration, NaiveDate};
use recorder_common::{Instrument, ResolutionError};
use tracing::debug;

use crate::catalog::Catalog;

/// Resolve the futures subscription for one underlying.
///
/// Contracts are sorted by ascending expiry. With
/// `trigger_date = nearest_expiry - trigger_days`, dates on or after the
/// trigger return the nearest two contracts, otherwise only the nearest.
/// An underlying with no listed contracts is a fatal resolution error.
pub fn resolve_futures(
    catalog: &Catalog,
    underlying: &str,
    today: NaiveDate,
    trigger_days: i64,
) -> Result<Vec<Instrument>, ResolutionError> {
    let chain = catalog.futures_chain(underlying);

    let nearest_expiry = chain
        .first()
        .and_then(|i| i.expiry)
        .ok_or_else(|| ResolutionError::NoContracts {
            underlying: underlying.to_string(),
        })?;

    let trigger_date = nearest_expiry - Duration::days(trigger_days);
    let rolling = today >= trigger_date;

    debug!(
        underlying,
        %nearest_expiry,
        %trigger_date,
        rolling,
        "futures rollover check"
    );

    let take = if rolling { 2 } else { 1 };
    Ok(chain.into_iter().take(take).cloned().collect())
}
