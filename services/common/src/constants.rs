//! Market and protocol constants

/// NSE session gate for the recorder (ingestion starts here, not at 09:15)
pub const MARKET_OPEN_HOUR: u32 = 9;
/// Minute component of the session open gate
pub const MARKET_OPEN_MINUTE: u32 = 14;
/// Session close hour; one minute past the 15:30 cash close
pub const MARKET_CLOSE_HOUR: u32 = 15;
/// Minute component of the session close
pub const MARKET_CLOSE_MINUTE: u32 = 31;

/// Days before the nearest expiry at which the next contract is also tracked
pub const DEFAULT_TRIGGER_DAYS: i64 = 3;

/// Strike spacing for index option chains (rupees)
pub const DEFAULT_STRIKE_INCREMENT: i64 = 100;
/// Strikes tracked per side of ATM for NIFTY/FINNIFTY
pub const DEFAULT_PER_SIDE_STRIKES: i64 = 5;
/// BANKNIFTY moves faster; it gets a wider window
pub const BANKNIFTY_PER_SIDE_STRIKES: i64 = 12;

/// Underlyings whose derivatives are index-based, excluded from the stock universe
pub const INDEX_DERIVATIVES: [&str; 3] = ["NIFTY", "BANKNIFTY", "FINNIFTY"];

/// Index instruments recorded on the index pipeline
pub const INDEX_SYMBOLS: [&str; 3] = ["NIFTY 50", "NIFTY BANK", "NIFTY FIN SERVICE"];

/// Kite streaming endpoint
pub const KITE_WS_URL: &str = "wss://ws.kite.trade";
/// Kite REST endpoint (instrument dump, quotes)
pub const KITE_API_URL: &str = "https://api.kite.trade";

/// Kite binary packets carry prices in paise
pub const PRICE_DIVISOR: f64 = 100.0;
