//! Instrument model and catalog query filter
//!
//! Instruments are parsed once a day from the exchange dump and are
//! immutable for the rest of the session.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Catalog segment string for cash equities
pub const SEGMENT_CASH: &str = "NSE";
/// Catalog segment string for futures contracts
pub const SEGMENT_FUTURES: &str = "NFO-FUT";
/// Catalog segment string for option contracts
pub const SEGMENT_OPTIONS: &str = "NFO-OPT";
/// Catalog segment string for indices
pub const SEGMENT_INDICES: &str = "INDICES";

/// Instrument kind classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentKind {
    /// Cash equity
    Equity,
    /// Index (not directly tradable)
    Index,
    /// Futures contract
    Future,
    /// Call option
    Call,
    /// Put option
    Put,
}

impl InstrumentKind {
    /// Parse the exchange's instrument_type column
    pub fn from_exchange_code(code: &str) -> Self {
        match code {
            "FUT" => Self::Future,
            "CE" => Self::Call,
            "PE" => Self::Put,
            "INDEX" => Self::Index,
            _ => Self::Equity,
        }
    }

    /// True for futures and options
    #[must_use]
    pub const fn is_derivative(&self) -> bool {
        matches!(self, Self::Future | Self::Call | Self::Put)
    }
}

/// Option side for strike-window selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionKind {
    /// Call side
    Call,
    /// Put side
    Put,
}

impl OptionKind {
    /// The instrument kind this side selects
    #[must_use]
    pub const fn instrument_kind(&self) -> InstrumentKind {
        match self {
            Self::Call => InstrumentKind::Call,
            Self::Put => InstrumentKind::Put,
        }
    }
}

/// Pipeline-level exchange segment. Each variant runs its own ingestion
/// pipeline with its own storage directory and tick row schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExchangeSegment {
    /// NSE cash equities
    Cash,
    /// NFO futures and options
    Derivatives,
    /// Index values
    Index,
}

impl ExchangeSegment {
    /// Directory name for this pipeline's storage
    #[must_use]
    pub const fn dir_name(&self) -> &'static str {
        match self {
            Self::Cash => "NSE",
            Self::Derivatives => "NFO",
            Self::Index => "INDEX",
        }
    }
}

impl std::fmt::Display for ExchangeSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// One catalog instrument, immutable once resolved for a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    /// Unique instrument identifier within the exchange
    pub instrument_token: u32,
    /// Trading symbol (e.g. "NIFTY24DEC24000PE")
    pub trading_symbol: String,
    /// Underlying name (e.g. "NIFTY")
    pub name: String,
    /// Catalog segment ("NSE", "NFO-FUT", "NFO-OPT", "INDICES")
    pub segment: String,
    /// Instrument kind
    pub kind: InstrumentKind,
    /// Expiry date for derivatives
    pub expiry: Option<NaiveDate>,
    /// Strike price for options
    pub strike: Option<f64>,
    /// Minimum tradable quantity
    pub lot_size: u32,
}

impl Instrument {
    /// True when the contract expires on or after `today`
    #[must_use]
    pub fn is_active(&self, today: NaiveDate) -> bool {
        match self.expiry {
            Some(expiry) => expiry >= today,
            None => true,
        }
    }
}

/// Exchange CSV row for the daily instrument dump.
/// Prices stay f64 here; this is the external format.
#[derive(Debug, Deserialize)]
pub struct KiteInstrumentCsv {
    pub instrument_token: u32,
    pub exchange_token: u32,
    pub tradingsymbol: String,
    pub name: Option<String>,
    pub last_price: f64,
    pub expiry: Option<String>,
    pub strike: f64,
    pub tick_size: f64,
    pub lot_size: u32,
    pub instrument_type: String,
    pub segment: String,
    pub exchange: String,
}

impl From<KiteInstrumentCsv> for Instrument {
    fn from(row: KiteInstrumentCsv) -> Self {
        let kind = InstrumentKind::from_exchange_code(&row.instrument_type);

        let expiry = row
            .expiry
            .as_deref()
            .filter(|e| !e.is_empty())
            .and_then(|e| NaiveDate::parse_from_str(e, "%Y-%m-%d").ok());

        Self {
            instrument_token: row.instrument_token,
            trading_symbol: row.tradingsymbol,
            name: row.name.unwrap_or_default(),
            segment: row.segment,
            kind,
            expiry,
            strike: (row.strike > 0.0).then_some(row.strike),
            lot_size: row.lot_size,
        }
    }
}

/// Catalog query filter with a fixed match semantics: every set field
/// must match; unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct InstrumentFilter {
    /// Catalog segment string
    pub segment: Option<String>,
    /// Underlying name
    pub underlying: Option<String>,
    /// Instrument kind
    pub kind: Option<InstrumentKind>,
    /// Exact expiry date
    pub expiry: Option<NaiveDate>,
    /// Inclusive strike range
    pub strike_range: Option<(f64, f64)>,
}

impl InstrumentFilter {
    /// Filter for futures of one underlying
    #[must_use]
    pub fn futures(underlying: &str) -> Self {
        Self {
            segment: Some(SEGMENT_FUTURES.to_string()),
            underlying: Some(underlying.to_string()),
            ..Default::default()
        }
    }

    /// Filter for options of one underlying
    #[must_use]
    pub fn options(underlying: &str) -> Self {
        Self {
            segment: Some(SEGMENT_OPTIONS.to_string()),
            underlying: Some(underlying.to_string()),
            ..Default::default()
        }
    }

    /// Filter for index rows
    #[must_use]
    pub fn indices() -> Self {
        Self {
            segment: Some(SEGMENT_INDICES.to_string()),
            ..Default::default()
        }
    }

    /// Check whether an instrument matches every set field
    #[must_use]
    pub fn matches(&self, instrument: &Instrument) -> bool {
        if let Some(ref segment) = self.segment {
            if instrument.segment != *segment {
                return false;
            }
        }

        if let Some(ref underlying) = self.underlying {
            if instrument.name != *underlying {
                return false;
            }
        }

        if let Some(kind) = self.kind {
            if instrument.kind != kind {
                return false;
            }
        }

        if let Some(expiry) = self.expiry {
            if instrument.expiry != Some(expiry) {
                return false;
            }
        }

        if let Some((lo, hi)) = self.strike_range {
            match instrument.strike {
                Some(strike) if strike >= lo && strike <= hi => {}
                _ => return false,
            }
        }

        true
    }
}
