//! Symbol resolution rules
//!
//! Given the day's catalog, derive the instrument subsets to subscribe
//! to: futures by the rollover rule, options by the strike window, cash
//! equities by index membership, plus the tracked index instruments.
//! Resolution only reads the catalog; it returns new collections.

pub mod equities;
pub mod futures;
pub mod options;
pub mod quotes;

pub use equities::{load_membership, resolve_index_members, EquityPick};
pub use futures::resolve_futures;
pub use options::{by_position, resolve_options, OptionPick, StrikeWindow};
pub use quotes::{atm_from_ltp, QuoteClient};

use recorder_common::{Instrument, InstrumentFilter};

use crate::catalog::Catalog;

/// Index instruments whose values are recorded on the index pipeline:
/// INDICES-segment rows whose trading symbol is configured.
#[must_use]
pub fn resolve_indices(catalog: &Catalog, index_symbols: &[String]) -> Vec<Instrument> {
    catalog
        .query(&InstrumentFilter::indices())
        .into_iter()
        .filter(|i| index_symbols.contains(&i.trading_symbol))
        .cloned()
        .collect()
}
