//! Per-instrument time-series storage
//!
//! One append-only segment file per instrument, keyed by exchange
//! timestamp, with idempotent inserts: a duplicate timestamp is a no-op,
//! not an error.

pub mod engine;
pub mod segment;

pub use engine::StorageEngine;
pub use segment::{SegmentReader, SegmentWriter};
