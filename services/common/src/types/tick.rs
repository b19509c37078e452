//! Tick wire format and storage row schemas

use serde::{Deserialize, Serialize};

use crate::types::instrument::ExchangeSegment;

/// Tick payload richness requested at subscribe time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickMode {
    /// Full detail: quantities, volume, open interest, exchange timestamp
    Full,
    /// Last-traded-price only
    Ltp,
}

impl TickMode {
    /// Wire value for the mode-change frame
    #[must_use]
    pub const fn wire_value(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Ltp => "ltp",
        }
    }
}

/// One decoded tick as it comes off the feed. Fields beyond the last
/// price are optional because light packets (LTP, index) omit them;
/// the storage schema decides which ones are required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickData {
    /// Instrument token
    pub instrument_token: u32,
    /// Exchange timestamp, epoch seconds
    pub exchange_timestamp: Option<i64>,
    /// Last traded price
    pub last_price: f64,
    /// Average traded price for the day
    pub average_price: Option<f64>,
    /// Cumulative buy-side quantity
    pub total_buy_qty: Option<u32>,
    /// Cumulative sell-side quantity
    pub total_sell_qty: Option<u32>,
    /// Cumulative traded volume
    pub volume: Option<u32>,
    /// Open interest (derivatives only)
    pub open_interest: Option<u32>,
}

impl TickData {
    /// A price-only tick, as index packets deliver
    #[must_use]
    pub const fn price_only(token: u32, ts: i64, last_price: f64) -> Self {
        Self {
            instrument_token: token,
            exchange_timestamp: Some(ts),
            last_price,
            average_price: None,
            total_buy_qty: None,
            total_sell_qty: None,
            volume: None,
            open_interest: None,
        }
    }
}

/// Persisted row, keyed by exchange timestamp. One schema per exchange
/// segment classification, not per instrument: all cash segments share
/// one column set, all derivative segments another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TickRow {
    /// Cash equity row
    Cash {
        /// Exchange timestamp, epoch seconds
        ts: i64,
        /// Last traded price
        price: f64,
        /// Average traded price
        average_price: f64,
        /// Cumulative buy-side quantity
        total_buy_qty: u32,
        /// Cumulative sell-side quantity
        total_sell_qty: u32,
        /// Cumulative traded volume
        volume: u32,
    },
    /// Derivative row; cash columns plus open interest
    Derivative {
        /// Exchange timestamp, epoch seconds
        ts: i64,
        /// Last traded price
        price: f64,
        /// Average traded price
        average_price: f64,
        /// Cumulative buy-side quantity
        total_buy_qty: u32,
        /// Cumulative sell-side quantity
        total_sell_qty: u32,
        /// Cumulative traded volume
        volume: u32,
        /// Open interest
        open_interest: u32,
    },
    /// Index row; price only
    Index {
        /// Exchange timestamp, epoch seconds
        ts: i64,
        /// Index value
        price: f64,
    },
}

impl TickRow {
    /// The row key
    #[must_use]
    pub const fn timestamp(&self) -> i64 {
        match self {
            Self::Cash { ts, .. } | Self::Derivative { ts, .. } | Self::Index { ts, .. } => *ts,
        }
    }

    /// Last traded price carried by the row
    #[must_use]
    pub const fn price(&self) -> f64 {
        match self {
            Self::Cash { price, .. }
            | Self::Derivative { price, .. }
            | Self::Index { price, .. } => *price,
        }
    }

    /// Segment classification this row belongs to
    #[must_use]
    pub const fn segment(&self) -> ExchangeSegment {
        match self {
            Self::Cash { .. } => ExchangeSegment::Cash,
            Self::Derivative { .. } => ExchangeSegment::Derivatives,
            Self::Index { .. } => ExchangeSegment::Index,
        }
    }
}
