//! Feed transport abstraction and the Kite WebSocket implementation
//!
//! The ingestor state machine drives a [`FeedTransport`]; production
//! uses [`KiteTransport`] over tokio-tungstenite, tests substitute a
//! scripted transport.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use recorder_common::{FeedError, TickData, TickMode};
use serde_json::json;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, warn};
use url::Url;

use super::protocol::parse_binary_ticks;

/// One observation from the feed
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Decoded market ticks
    Ticks(Vec<TickData>),
    /// Keepalive or non-data frame; nothing to store
    Heartbeat,
    /// Server closed the stream; caller decides whether to reconnect
    ServerClosed,
}

/// Transport the ingestor drives. Implementations own the socket and
/// the wire protocol; the state machine owns retries and shutdown.
#[async_trait]
pub trait FeedTransport: Send {
    /// Establish the connection
    async fn connect(&mut self) -> Result<(), FeedError>;

    /// Subscribe the token set and switch it to the given mode
    async fn subscribe(&mut self, tokens: &[u32], mode: TickMode) -> Result<(), FeedError>;

    /// Next event from the feed; blocks until one arrives
    async fn next_event(&mut self) -> Result<FeedEvent, FeedError>;

    /// Close the connection, best effort
    async fn close(&mut self);
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Kite ticker WebSocket transport
pub struct KiteTransport {
    url: String,
    stream: Option<WsStream>,
}

impl KiteTransport {
    /// Build a transport for the given API credentials
    pub fn new(ws_url: &str, api_key: &str, access_token: &str) -> Result<Self, FeedError> {
        let mut url = Url::parse(ws_url).map_err(|e| FeedError::Connect(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("api_key", api_key)
            .append_pair("access_token", access_token);

        Ok(Self {
            url: url.into(),
            stream: None,
        })
    }

    fn stream_mut(&mut self) -> Result<&mut WsStream, FeedError> {
        self.stream
            .as_mut()
            .ok_or_else(|| FeedError::Transport("not connected".to_string()))
    }
}

#[async_trait]
impl FeedTransport for KiteTransport {
    async fn connect(&mut self) -> Result<(), FeedError> {
        let (stream, response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| FeedError::Connect(e.to_string()))?;
        debug!(status = %response.status(), "feed connected");
        self.stream = Some(stream);
        Ok(())
    }

    async fn subscribe(&mut self, tokens: &[u32], mode: TickMode) -> Result<(), FeedError> {
        let subscribe = json!({ "a": "subscribe", "v": tokens }).to_string();
        let set_mode = json!({ "a": "mode", "v": [mode.wire_value(), tokens] }).to_string();

        let stream = self.stream_mut()?;
        stream
            .send(Message::Text(subscribe))
            .await
            .map_err(|e| FeedError::Subscribe(e.to_string()))?;
        stream
            .send(Message::Text(set_mode))
            .await
            .map_err(|e| FeedError::Subscribe(e.to_string()))?;

        debug!(count = tokens.len(), mode = mode.wire_value(), "subscribed");
        Ok(())
    }

    async fn next_event(&mut self) -> Result<FeedEvent, FeedError> {
        loop {
            let stream = self.stream_mut()?;
            let message = match stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => return Err(FeedError::Transport(e.to_string())),
                None => return Ok(FeedEvent::ServerClosed),
            };

            match message {
                // a one-byte binary frame is the server heartbeat
                Message::Binary(data) if data.len() <= 1 => return Ok(FeedEvent::Heartbeat),
                Message::Binary(data) => {
                    let ticks = parse_binary_ticks(&data);
                    if ticks.is_empty() {
                        return Ok(FeedEvent::Heartbeat);
                    }
                    trace!(count = ticks.len(), "ticks decoded");
                    return Ok(FeedEvent::Ticks(ticks));
                }
                Message::Ping(payload) => {
                    stream
                        .send(Message::Pong(payload))
                        .await
                        .map_err(|e| FeedError::Transport(e.to_string()))?;
                }
                Message::Text(text) => {
                    // postbacks and error notices arrive as JSON text
                    debug!(%text, "feed text message");
                    return Ok(FeedEvent::Heartbeat);
                }
                Message::Close(_) => return Ok(FeedEvent::ServerClosed),
                Message::Pong(_) | Message::Frame(_) => return Ok(FeedEvent::Heartbeat),
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.close(None).await {
                warn!(error = %e, "feed close failed");
            }
        }
    }
}
