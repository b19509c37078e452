//! Storage engine: segment lifecycle and idempotent inserts
//!
//! Each pipeline owns one engine over its own directory; nothing else
//! writes there. Segments are provisioned for the full subscription
//! list before streaming starts, and reopening an existing directory
//! rebuilds the per-token timestamp sets so duplicate ticks stay no-ops
//! across process restarts.

use std::path::PathBuf;

use recorder_common::{ExchangeSegment, StorageError, TickData, TickRow};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info};

use super::segment::{SegmentReader, SegmentWriter};

/// Per-instrument append-only tick store for one exchange segment
pub struct StorageEngine {
    dir: PathBuf,
    segment: ExchangeSegment,
    writers: FxHashMap<u32, SegmentWriter>,
    seen: FxHashMap<u32, FxHashSet<i64>>,
}

impl StorageEngine {
    /// Open (creating if needed) the engine's directory
    pub fn open(dir: PathBuf, segment: ExchangeSegment) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            segment,
            writers: FxHashMap::default(),
            seen: FxHashMap::default(),
        })
    }

    /// Exchange segment classification, which fixes the row schema
    #[must_use]
    pub const fn segment(&self) -> ExchangeSegment {
        self.segment
    }

    /// Ensure a segment exists for every token, idempotently. Existing
    /// files are scanned to rebuild their seen-timestamp sets.
    pub fn provision(&mut self, tokens: &[u32]) -> Result<(), StorageError> {
        for &token in tokens {
            self.ensure_segment(token)?;
        }
        info!(
            segment = %self.segment,
            count = tokens.len(),
            dir = %self.dir.display(),
            "storage segments provisioned"
        );
        Ok(())
    }

    fn ensure_segment(&mut self, token: u32) -> Result<(), StorageError> {
        if self.writers.contains_key(&token) {
            return Ok(());
        }

        let path = self.segment_path(token);
        let mut timestamps = FxHashSet::default();

        let writer = if path.exists() {
            let mut reader = SegmentReader::open(&path, token, self.segment)?;
            while let Some(row) = reader.read_next()? {
                timestamps.insert(row.timestamp());
            }
            debug!(token, existing = timestamps.len(), "segment reopened");
            SegmentWriter::open_for_append(&path, token, self.segment)?
        } else {
            SegmentWriter::create(&path, token, self.segment)?
        };

        self.writers.insert(token, writer);
        self.seen.insert(token, timestamps);
        Ok(())
    }

    /// Insert one tick. Returns `Ok(true)` when a row was written,
    /// `Ok(false)` for a duplicate timestamp (a no-op by design: a
    /// colliding exchange timestamp always carries the same data).
    /// A tick missing a field the schema requires is an error the
    /// caller logs and drops; it must not halt the pipeline.
    pub fn insert(&mut self, tick: &TickData) -> Result<bool, StorageError> {
        let token = tick.instrument_token;
        if !self.writers.contains_key(&token) {
            return Err(StorageError::UnknownSegment { token });
        }

        let row = self.row_from_tick(tick)?;
        let ts = row.timestamp();

        let timestamps = self.seen.entry(token).or_default();
        if !timestamps.insert(ts) {
            return Ok(false);
        }

        // unwrap-free: presence checked above, entry not removed since
        let Some(writer) = self.writers.get_mut(&token) else {
            return Err(StorageError::UnknownSegment { token });
        };
        writer.append(&row)?;
        Ok(true)
    }

    /// Rows for one instrument within `[from_ts, to_ts]`, ascending by
    /// timestamp
    pub fn query(&self, token: u32, from_ts: i64, to_ts: i64) -> Result<Vec<TickRow>, StorageError> {
        let path = self.segment_path(token);
        if !path.exists() {
            return Err(StorageError::UnknownSegment { token });
        }

        let mut reader = SegmentReader::open(&path, token, self.segment)?;
        let mut rows: Vec<TickRow> = reader
            .read_all()?
            .into_iter()
            .filter(|row| {
                let ts = row.timestamp();
                ts >= from_ts && ts <= to_ts
            })
            .collect();

        rows.sort_by_key(TickRow::timestamp);
        Ok(rows)
    }

    fn segment_path(&self, token: u32) -> PathBuf {
        self.dir.join(format!("token_{token}.tks"))
    }

    /// Assemble the schema-specific row, rejecting ticks that lack a
    /// required field
    fn row_from_tick(&self, tick: &TickData) -> Result<TickRow, StorageError> {
        let token = tick.instrument_token;
        let require_ts = || {
            tick.exchange_timestamp
                .ok_or(StorageError::IncompleteTick {
                    token,
                    field: "exchange_timestamp",
                })
        };

        match self.segment {
            ExchangeSegment::Index => Ok(TickRow::Index {
                ts: require_ts()?,
                price: tick.last_price,
            }),
            ExchangeSegment::Cash => Ok(TickRow::Cash {
                ts: require_ts()?,
                price: tick.last_price,
                average_price: tick.average_price.ok_or(StorageError::IncompleteTick {
                    token,
                    field: "average_price",
                })?,
                total_buy_qty: tick.total_buy_qty.ok_or(StorageError::IncompleteTick {
                    token,
                    field: "total_buy_qty",
                })?,
                total_sell_qty: tick.total_sell_qty.ok_or(StorageError::IncompleteTick {
                    token,
                    field: "total_sell_qty",
                })?,
                volume: tick.volume.ok_or(StorageError::IncompleteTick {
                    token,
                    field: "volume",
                })?,
            }),
            ExchangeSegment::Derivatives => Ok(TickRow::Derivative {
                ts: require_ts()?,
                price: tick.last_price,
                average_price: tick.average_price.ok_or(StorageError::IncompleteTick {
                    token,
                    field: "average_price",
                })?,
                total_buy_qty: tick.total_buy_qty.ok_or(StorageError::IncompleteTick {
                    token,
                    field: "total_buy_qty",
                })?,
                total_sell_qty: tick.total_sell_qty.ok_or(StorageError::IncompleteTick {
                    token,
                    field: "total_sell_qty",
                })?,
                volume: tick.volume.ok_or(StorageError::IncompleteTick {
                    token,
                    field: "volume",
                })?,
                open_interest: tick.open_interest.ok_or(StorageError::IncompleteTick {
                    token,
                    field: "open_interest",
                })?,
            }),
        }
    }
}
