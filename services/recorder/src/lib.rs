//! Tick Recorder
//!
//! Resolves the day's tradable instrument set from the exchange catalog,
//! subscribes to the Kite tick stream for the trading session, and
//! persists every tick into per-instrument append-only storage. One
//! pipeline runs per exchange segment (cash, derivatives, index); the
//! pipelines share no mutable state.

pub mod catalog;
pub mod config;
pub mod ingestor;
pub mod manifest;
pub mod pipeline;
pub mod registry;
pub mod relay;
pub mod resolver;
pub mod scheduler;
pub mod storage;
