//! Best-effort tick relay
//!
//! After a successful storage insert the raw tick may be forwarded to an
//! external consumer. Forwarding is a side channel: a full or closed
//! sink drops the tick with a warning and never blocks the insert path.

use recorder_common::TickData;
use tokio::sync::mpsc;
use tracing::warn;

/// Downstream sink for raw ticks
pub trait TickRelay: Send + Sync {
    /// Forward one tick, best effort
    fn forward(&self, tick: &TickData);
}

/// Relay over a bounded channel; the receiver belongs to the external
/// consumer
pub struct ChannelRelay {
    tx: mpsc::Sender<TickData>,
}

impl ChannelRelay {
    /// Create the relay and hand back the consumer end
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<TickData>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl TickRelay for ChannelRelay {
    fn forward(&self, tick: &TickData) {
        if let Err(e) = self.tx.try_send(tick.clone()) {
            warn!(token = tick.instrument_token, error = %e, "relay dropped tick");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(token: u32) -> TickData {
        TickData::price_only(token, 1_700_000_000, 100.0)
    }

    #[tokio::test]
    async fn forwards_while_capacity_allows() {
        let (relay, mut rx) = ChannelRelay::new(2);
        relay.forward(&tick(1));
        relay.forward(&tick(2));

        assert_eq!(rx.recv().await.unwrap().instrument_token, 1);
        assert_eq!(rx.recv().await.unwrap().instrument_token, 2);
    }

    #[tokio::test]
    async fn full_channel_drops_without_blocking() {
        let (relay, mut rx) = ChannelRelay::new(1);
        relay.forward(&tick(1));
        relay.forward(&tick(2)); // dropped, not an error

        assert_eq!(rx.recv().await.unwrap().instrument_token, 1);
        assert!(rx.try_recv().is_err());
    }
}
