//! Recorder configuration
//!
//! Everything empirically tuned per instrument family (rollover trigger
//! window, strikes per side) lives here rather than in code.

use std::path::PathBuf;

use chrono::NaiveTime;
use recorder_common::constants::{
    BANKNIFTY_PER_SIDE_STRIKES, DEFAULT_PER_SIDE_STRIKES, DEFAULT_STRIKE_INCREMENT,
    DEFAULT_TRIGGER_DAYS, INDEX_DERIVATIVES, INDEX_SYMBOLS, MARKET_CLOSE_HOUR,
    MARKET_CLOSE_MINUTE, MARKET_OPEN_HOUR, MARKET_OPEN_MINUTE,
};
use recorder_common::OptionKind;
use serde::{Deserialize, Serialize};

/// Kite API session credentials. Acquisition and renewal happen outside
/// this process; the recorder fails fast if they are absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KiteCredentials {
    /// API key of the registered app
    pub api_key: String,
    /// Access token for today's session
    pub access_token: String,
}

impl KiteCredentials {
    /// Read credentials from `KITE_API_KEY` / `KITE_ACCESS_TOKEN`
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("KITE_API_KEY")
            .map_err(|_| anyhow::anyhow!("KITE_API_KEY not set"))?;
        let access_token = std::env::var("KITE_ACCESS_TOKEN")
            .map_err(|_| anyhow::anyhow!("KITE_ACCESS_TOKEN not set"))?;
        Ok(Self { api_key, access_token })
    }
}

/// Strike-window selection parameters for one underlying
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrikeWindowConfig {
    /// Underlying name as it appears in the catalog
    pub underlying: String,
    /// Quote identifier used to fetch the ATM reference price
    pub quote_symbol: String,
    /// Strikes tracked per side of ATM
    pub per_side: i64,
    /// Strike spacing
    pub increment: i64,
    /// Which option side to record
    pub kind: OptionKind,
    /// Fixed ATM price; when unset the quote endpoint seeds it
    pub atm_override: Option<f64>,
}

/// Full recorder configuration for one trading day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// API credentials
    pub credentials: KiteCredentials,
    /// Directory holding the per-day instrument dump cache
    pub catalog_dir: PathBuf,
    /// Root directory for tick storage
    pub data_dir: PathBuf,
    /// Directory holding `{index}.json` membership weight files
    pub membership_dir: PathBuf,
    /// Session open gate
    pub session_open: NaiveTime,
    /// Session close
    pub session_close: NaiveTime,
    /// Days before nearest expiry at which the next contract joins
    pub rollover_trigger_days: i64,
    /// Underlyings whose futures are recorded
    pub futures_underlyings: Vec<String>,
    /// Strike windows, one per option underlying
    pub option_windows: Vec<StrikeWindowConfig>,
    /// Indices whose membership weights tag the cash universe
    pub tracked_indices: Vec<String>,
    /// Index instruments recorded on the index pipeline
    pub index_symbols: Vec<String>,
    /// Reconnect attempts before a pipeline gives up
    pub max_reconnects: u32,
    /// Delay between reconnect attempts
    pub reconnect_delay_ms: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        let windows = vec![
            StrikeWindowConfig {
                underlying: "NIFTY".to_string(),
                quote_symbol: "NSE:NIFTY 50".to_string(),
                per_side: DEFAULT_PER_SIDE_STRIKES,
                increment: DEFAULT_STRIKE_INCREMENT,
                kind: OptionKind::Put,
                atm_override: None,
            },
            StrikeWindowConfig {
                underlying: "BANKNIFTY".to_string(),
                quote_symbol: "NSE:NIFTY BANK".to_string(),
                per_side: BANKNIFTY_PER_SIDE_STRIKES,
                increment: DEFAULT_STRIKE_INCREMENT,
                kind: OptionKind::Put,
                atm_override: None,
            },
            StrikeWindowConfig {
                underlying: "FINNIFTY".to_string(),
                quote_symbol: "NSE:NIFTY FIN SERVICE".to_string(),
                per_side: DEFAULT_PER_SIDE_STRIKES,
                increment: DEFAULT_STRIKE_INCREMENT,
                kind: OptionKind::Put,
                atm_override: None,
            },
        ];

        Self {
            credentials: KiteCredentials {
                api_key: String::new(),
                access_token: String::new(),
            },
            catalog_dir: PathBuf::from("./data/catalog"),
            data_dir: PathBuf::from("./data/ticks"),
            membership_dir: PathBuf::from("./data/membership"),
            session_open: NaiveTime::from_hms_opt(MARKET_OPEN_HOUR, MARKET_OPEN_MINUTE, 0)
                .unwrap_or_default(),
            session_close: NaiveTime::from_hms_opt(MARKET_CLOSE_HOUR, MARKET_CLOSE_MINUTE, 0)
                .unwrap_or_default(),
            rollover_trigger_days: DEFAULT_TRIGGER_DAYS,
            futures_underlyings: INDEX_DERIVATIVES.iter().map(|s| s.to_string()).collect(),
            option_windows: windows,
            tracked_indices: INDEX_DERIVATIVES.iter().map(|s| s.to_string()).collect(),
            index_symbols: INDEX_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            max_reconnects: 5,
            reconnect_delay_ms: 1000,
        }
    }
}

impl RecorderConfig {
    /// Build a config from the environment on top of the defaults.
    /// Credentials are mandatory; paths and timings fall back.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self {
            credentials: KiteCredentials::from_env()?,
            ..Self::default()
        };

        if let Ok(dir) = std::env::var("RECORDER_CATALOG_DIR") {
            config.catalog_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("RECORDER_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("RECORDER_MEMBERSHIP_DIR") {
            config.membership_dir = PathBuf::from(dir);
        }
        if let Ok(open) = std::env::var("RECORDER_SESSION_OPEN") {
            config.session_open = NaiveTime::parse_from_str(&open, "%H:%M:%S")
                .map_err(|e| anyhow::anyhow!("bad RECORDER_SESSION_OPEN: {e}"))?;
        }
        if let Ok(close) = std::env::var("RECORDER_SESSION_CLOSE") {
            config.session_close = NaiveTime::parse_from_str(&close, "%H:%M:%S")
                .map_err(|e| anyhow::anyhow!("bad RECORDER_SESSION_CLOSE: {e}"))?;
        }
        if let Ok(days) = std::env::var("RECORDER_TRIGGER_DAYS") {
            config.rollover_trigger_days = days
                .parse()
                .map_err(|e| anyhow::anyhow!("bad RECORDER_TRIGGER_DAYS: {e}"))?;
        }
        if let Ok(attempts) = std::env::var("RECORDER_MAX_RECONNECTS") {
            config.max_reconnects = attempts
                .parse()
                .map_err(|e| anyhow::anyhow!("bad RECORDER_MAX_RECONNECTS: {e}"))?;
        }

        Ok(config)
    }
}
