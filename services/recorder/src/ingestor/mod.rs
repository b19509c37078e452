//! Stream ingestor
//!
//! An explicit state machine that drives one feed transport for one
//! trading session: establish with a bounded retry budget, subscribe the
//! resolved token set, then store every tick synchronously before
//! relaying it. Transport failures re-enter establishment; an exhausted
//! retry budget is fatal for the owning pipeline. The session close is a
//! sampled predicate, so the machine polls it between feed events.

pub mod protocol;
pub mod transport;

use std::time::Duration;

use chrono::Local;
use recorder_common::{FeedError, TickMode};
use tracing::{error, info, warn};

use crate::relay::TickRelay;
use crate::scheduler::SessionClock;
use crate::storage::StorageEngine;

pub use transport::{FeedEvent, FeedTransport, KiteTransport};

/// Where the ingestor is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestorState {
    /// No connection yet
    Disconnected,
    /// Connection attempt in flight
    Connecting,
    /// Connected, subscription issued
    Subscribed,
    /// Receiving and storing ticks
    Streaming,
    /// Connection lost, re-entering establishment
    Reconnecting,
    /// Session close observed, shutting down
    Closing,
    /// Terminal
    Closed,
}

/// Retry and polling knobs
#[derive(Debug, Clone, Copy)]
pub struct IngestorPolicy {
    /// Connection attempts per establishment cycle before giving up
    pub max_attempts: u32,
    /// Pause between failed connection attempts
    pub retry_delay: Duration,
    /// How long to wait on the feed before re-sampling the close gate
    pub close_poll_interval: Duration,
}

impl Default for IngestorPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay: Duration::from_secs(1),
            close_poll_interval: Duration::from_secs(5),
        }
    }
}

/// Counters for one session run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    /// Rows written to storage
    pub stored: u64,
    /// Duplicate-timestamp ticks skipped
    pub duplicates: u64,
    /// Ticks dropped for storage errors (incomplete, unknown token)
    pub dropped: u64,
    /// Reconnect cycles entered mid-session
    pub reconnects: u32,
}

/// Session-scoped ingestion driver over one transport
pub struct StreamIngestor<T: FeedTransport> {
    transport: T,
    storage: StorageEngine,
    relay: Option<Box<dyn TickRelay>>,
    clock: SessionClock,
    tokens: Vec<u32>,
    mode: TickMode,
    policy: IngestorPolicy,
    state: IngestorState,
    report: IngestReport,
}

impl<T: FeedTransport> StreamIngestor<T> {
    /// Wire up an ingestor; it owns its transport and storage for the
    /// session
    #[must_use]
    pub fn new(
        transport: T,
        storage: StorageEngine,
        clock: SessionClock,
        tokens: Vec<u32>,
        mode: TickMode,
        policy: IngestorPolicy,
    ) -> Self {
        Self {
            transport,
            storage,
            relay: None,
            clock,
            tokens,
            mode,
            policy,
            state: IngestorState::Disconnected,
            report: IngestReport::default(),
        }
    }

    /// Attach a downstream tick relay
    #[must_use]
    pub fn with_relay(mut self, relay: Box<dyn TickRelay>) -> Self {
        self.relay = Some(relay);
        self
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> IngestorState {
        self.state
    }

    /// Drive the session to completion. Returns the run counters once
    /// the close gate is observed; errors only when the reconnect
    /// budget is exhausted.
    pub async fn run(&mut self) -> Result<IngestReport, FeedError> {
        self.establish().await?;

        loop {
            if self.clock.is_past_close(Local::now().time()) {
                self.shutdown().await;
                return Ok(self.report);
            }

            let event = tokio::time::timeout(
                self.policy.close_poll_interval,
                self.transport.next_event(),
            )
            .await;

            match event {
                // quiet feed; loop back to re-sample the close gate
                Err(_elapsed) => {}
                Ok(Ok(FeedEvent::Heartbeat)) => {}
                Ok(Ok(FeedEvent::Ticks(ticks))) => self.ingest(&ticks),
                Ok(Ok(FeedEvent::ServerClosed)) => {
                    warn!("feed closed by server; reconnecting");
                    self.reconnect().await?;
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "feed transport error; reconnecting");
                    self.reconnect().await?;
                }
            }
        }
    }

    /// Connect and subscribe with the bounded retry budget
    async fn establish(&mut self) -> Result<(), FeedError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            self.state = IngestorState::Connecting;

            match self.try_establish().await {
                Ok(()) => {
                    self.state = IngestorState::Streaming;
                    info!(tokens = self.tokens.len(), attempts, "streaming");
                    return Ok(());
                }
                Err(e) if attempts < self.policy.max_attempts => {
                    warn!(error = %e, attempts, "connection attempt failed");
                    tokio::time::sleep(self.policy.retry_delay).await;
                }
                Err(e) => {
                    error!(error = %e, attempts, "connection attempts exhausted");
                    self.state = IngestorState::Closed;
                    return Err(FeedError::RetriesExhausted { attempts });
                }
            }
        }
    }

    async fn try_establish(&mut self) -> Result<(), FeedError> {
        self.transport.connect().await?;
        self.state = IngestorState::Subscribed;
        self.transport.subscribe(&self.tokens, self.mode).await
    }

    async fn reconnect(&mut self) -> Result<(), FeedError> {
        self.state = IngestorState::Reconnecting;
        self.report.reconnects += 1;
        self.transport.close().await;
        self.establish().await
    }

    /// Store each tick, then relay the ones that produced a new row.
    /// Storage failures are per-tick: log, count, move on.
    fn ingest(&mut self, ticks: &[recorder_common::TickData]) {
        for tick in ticks {
            match self.storage.insert(tick) {
                Ok(true) => {
                    self.report.stored += 1;
                    if let Some(relay) = &self.relay {
                        relay.forward(tick);
                    }
                }
                Ok(false) => self.report.duplicates += 1,
                Err(e) => {
                    self.report.dropped += 1;
                    warn!(token = tick.instrument_token, error = %e, "tick dropped");
                }
            }
        }
    }

    async fn shutdown(&mut self) {
        self.state = IngestorState::Closing;
        self.transport.close().await;
        self.state = IngestorState::Closed;
        info!(
            stored = self.report.stored,
            duplicates = self.report.duplicates,
            dropped = self.report.dropped,
            reconnects = self.report.reconnects,
            "session closed"
        );
    }
}
