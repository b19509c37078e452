//! In-memory instrument table with token and underlying indices

use chrono::NaiveDate;
use recorder_common::{Instrument, InstrumentFilter};
use recorder_common::types::instrument::SEGMENT_FUTURES;
use rustc_hash::FxHashMap;

use super::CatalogExchange;

/// The day's instrument table for one exchange. Built once by the
/// loader, then only queried; resolver calls never mutate it.
#[derive(Debug)]
pub struct Catalog {
    exchange: CatalogExchange,
    by_token: FxHashMap<u32, Instrument>,
    by_underlying: FxHashMap<String, Vec<u32>>,
    // insertion order, so query results are stable across runs
    order: Vec<u32>,
}

impl Catalog {
    /// Build the catalog and its indices from parsed instruments
    #[must_use]
    pub fn from_instruments(exchange: CatalogExchange, instruments: Vec<Instrument>) -> Self {
        let mut by_token =
            FxHashMap::with_capacity_and_hasher(instruments.len(), Default::default());
        let mut by_underlying: FxHashMap<String, Vec<u32>> = FxHashMap::default();
        let mut order = Vec::with_capacity(instruments.len());

        for instrument in instruments {
            let token = instrument.instrument_token;
            by_underlying
                .entry(instrument.name.clone())
                .or_default()
                .push(token);
            order.push(token);
            by_token.insert(token, instrument);
        }

        Self {
            exchange,
            by_token,
            by_underlying,
            order,
        }
    }

    /// Exchange this catalog was dumped from
    #[must_use]
    pub const fn exchange(&self) -> CatalogExchange {
        self.exchange
    }

    /// Number of instruments
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_token.len()
    }

    /// True when the dump parsed to nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }

    /// Lookup by token
    #[must_use]
    pub fn get(&self, token: u32) -> Option<&Instrument> {
        self.by_token.get(&token)
    }

    /// Snapshot query: every instrument matching the filter, in load order
    #[must_use]
    pub fn query(&self, filter: &InstrumentFilter) -> Vec<&Instrument> {
        self.order
            .iter()
            .filter_map(|token| self.by_token.get(token))
            .filter(|instrument| filter.matches(instrument))
            .collect()
    }

    /// Futures chain for one underlying, sorted by ascending expiry
    #[must_use]
    pub fn futures_chain(&self, underlying: &str) -> Vec<&Instrument> {
        let mut chain: Vec<&Instrument> = self
            .by_underlying
            .get(underlying)
            .map(|tokens| {
                tokens
                    .iter()
                    .filter_map(|token| self.by_token.get(token))
                    .filter(|i| i.segment == SEGMENT_FUTURES)
                    .collect()
            })
            .unwrap_or_default();

        chain.sort_by_key(|i| i.expiry.unwrap_or(NaiveDate::MAX));
        chain
    }

    /// Unique underlyings that have listed futures, minus the excluded
    /// index-derivative names, sorted ascending. This is the
    /// tradable-with-derivatives set the membership files are validated
    /// against.
    #[must_use]
    pub fn tradable_underlyings(&self, exclude: &[String]) -> Vec<String> {
        let mut names: Vec<String> = self
            .by_underlying
            .iter()
            .filter(|(name, tokens)| {
                !exclude.contains(name)
                    && tokens
                        .iter()
                        .filter_map(|token| self.by_token.get(token))
                        .any(|i| i.segment == SEGMENT_FUTURES)
            })
            .map(|(name, _)| name.clone())
            .collect();

        names.sort();
        names
    }
}
