//! Error taxonomy for the recording pipeline
//!
//! Three failure domains: resolution (fatal before subscription), feed
//! (retried, then fatal), storage (per-tick, never fatal).

use std::path::PathBuf;
use thiserror::Error;

/// Instrument resolution failures. All of these abort the day's pipeline
/// before any subscription is issued.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// Catalog has no contracts at all for a requested underlying
    #[error("no contracts in catalog for underlying {underlying}")]
    NoContracts {
        /// Underlying name as it appears in the catalog
        underlying: String,
    },

    /// Strike-window selection matched nothing
    #[error("no option chain for underlying {underlying} in the requested window")]
    NoOptionChain {
        /// Underlying name as it appears in the catalog
        underlying: String,
    },

    /// Membership file names symbols that are not tradable with derivatives.
    /// Guards against stale membership files.
    #[error("membership file for {index} lists symbols missing from the tradable set: {symbols:?}")]
    MissingSymbols {
        /// Index whose membership file failed validation
        index: String,
        /// The offending symbols
        symbols: Vec<String>,
    },

    /// Membership file for a configured index does not exist
    #[error("membership file for {index} not found at {path}")]
    MembershipFileMissing {
        /// Index whose file is absent
        index: String,
        /// Path that was probed
        path: PathBuf,
    },

    /// Membership file exists but is not a symbol -> weight mapping
    #[error("membership file for {index} is malformed: {source}")]
    MembershipFileInvalid {
        /// Index whose file failed to parse
        index: String,
        /// Underlying parse error
        source: serde_json::Error,
    },

    /// Catalog loaded but contained no usable rows
    #[error("instrument catalog for {exchange} is empty")]
    EmptyCatalog {
        /// Exchange whose dump was empty
        exchange: String,
    },
}

/// Streaming feed failures
#[derive(Debug, Error)]
pub enum FeedError {
    /// Handshake with the feed endpoint failed
    #[error("connect failed: {0}")]
    Connect(String),

    /// Subscribe or mode-change request was rejected
    #[error("subscribe failed: {0}")]
    Subscribe(String),

    /// Transport-level failure mid-stream
    #[error("transport error: {0}")]
    Transport(String),

    /// Server closed the stream
    #[error("feed closed by server")]
    ServerClosed,

    /// Reconnect budget exhausted; fatal for the owning pipeline
    #[error("gave up after {attempts} connection attempts")]
    RetriesExhausted {
        /// Attempts made before escalating
        attempts: u32,
    },
}

/// Storage failures. Per-tick errors are logged and the tick dropped;
/// they never halt the pipeline.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Tick is missing a field the segment schema requires
    #[error("tick for token {token} missing required field `{field}`")]
    IncompleteTick {
        /// Instrument token of the offending tick
        token: u32,
        /// Name of the absent field
        field: &'static str,
    },

    /// Tick arrived for a token that was never provisioned
    #[error("no storage segment provisioned for token {token}")]
    UnknownSegment {
        /// Instrument token of the offending tick
        token: u32,
    },

    /// Segment file failed header or CRC validation
    #[error("segment file {path} is corrupt: {reason}")]
    Corrupt {
        /// Offending file
        path: PathBuf,
        /// What failed
        reason: String,
    },

    /// Underlying filesystem error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Row serialization failed
    #[error("row codec error: {0}")]
    Codec(#[from] bincode::Error),
}
