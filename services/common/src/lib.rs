//! Shared domain types for the tick recording pipeline
//!
//! Instrument and tick models, the error taxonomy, and market constants
//! used by every recorder component.

pub mod constants;
pub mod errors;
pub mod types;

pub use errors::{FeedError, ResolutionError, StorageError};
pub use types::instrument::{
    ExchangeSegment, Instrument, InstrumentFilter, InstrumentKind, KiteInstrumentCsv, OptionKind,
};
pub use types::tick::{TickData, TickMode, TickRow};
