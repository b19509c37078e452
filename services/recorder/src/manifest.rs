//! Resolution manifest
//!
//! The resolver tags picks with attributes the tick stream itself never
//! carries: an option's position relative to ATM and an equity's index
//! weight. Those are recorded once per pipeline per day, next to the
//! tick segments, so downstream consumers can locate relative strikes
//! and weight constituents without re-running resolution.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use recorder_common::Instrument;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::resolver::{EquityPick, OptionPick};

const MANIFEST_FILE: &str = "manifest.json";

/// One subscribed instrument with its resolution-time attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Instrument token, the storage segment key
    pub instrument_token: u32,
    /// Trading symbol for human consumption
    pub trading_symbol: String,
    /// `(strike - atm) / increment` for options; absent otherwise
    pub position: Option<i32>,
    /// Index weight for cash constituents; absent otherwise
    pub weight: Option<f64>,
}

impl ManifestEntry {
    /// Entry for an option pick, carrying its window position
    #[must_use]
    pub fn option(pick: &OptionPick) -> Self {
        Self {
            instrument_token: pick.instrument.instrument_token,
            trading_symbol: pick.instrument.trading_symbol.clone(),
            position: Some(pick.position),
            weight: None,
        }
    }

    /// Entry for a cash pick, carrying its index weight
    #[must_use]
    pub fn equity(pick: &EquityPick) -> Self {
        Self {
            instrument_token: pick.instrument.instrument_token,
            trading_symbol: pick.instrument.trading_symbol.clone(),
            position: None,
            weight: Some(pick.weight),
        }
    }

    /// Entry for an instrument with no derived attributes (futures,
    /// indices)
    #[must_use]
    pub fn plain(instrument: &Instrument) -> Self {
        Self {
            instrument_token: instrument.instrument_token,
            trading_symbol: instrument.trading_symbol.clone(),
            position: None,
            weight: None,
        }
    }
}

/// The day's resolved picks for one pipeline
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionManifest {
    entries: Vec<ManifestEntry>,
}

impl ResolutionManifest {
    /// Empty manifest
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry
    pub fn push(&mut self, entry: ManifestEntry) {
        self.entries.push(entry);
    }

    /// The recorded entries, resolution order
    #[must_use]
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Entry for one token, if it was resolved
    #[must_use]
    pub fn get(&self, token: u32) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.instrument_token == token)
    }

    /// Write `manifest.json` into the pipeline's day directory
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(MANIFEST_FILE);
        let data = serde_json::to_string_pretty(self).context("serializing manifest")?;
        std::fs::write(&path, data)
            .with_context(|| format!("writing manifest {}", path.display()))?;

        info!(path = %path.display(), entries = self.entries.len(), "manifest recorded");
        Ok(path)
    }

    /// Read a previously written manifest
    pub fn read(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading manifest {}", path.display()))?;
        serde_json::from_str(&data).context("parsing manifest")
    }
}
