use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Signal delivered by a transport instance.
///
/// Signals for one transport arrive in the order the underlying channel
/// delivers them; `Error` does not change connection state by itself, the
/// state change is driven by the `Closed` that follows it.
#[derive(Debug, Clone)]
pub enum TransportSignal {
    /// The channel to the remote peer is established
    Opened,
    /// The transport hit an error; a close typically follows
    Error(String),
    /// One raw text frame arrived from the remote peer
    Message(String),
    /// The channel is closed (remote close, local close or failure)
    Closed,
}

/// One outbound payload part.
///
/// A `Value` is serialized to JSON text before transmission; a `Text` is
/// transmitted unchanged.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    Text(String),
    Value(Value),
}

impl OutboundMessage {
    /// Render the part to the wire text form
    pub fn into_text(self) -> Result<String> {
        match self {
            OutboundMessage::Text(text) => Ok(text),
            OutboundMessage::Value(value) => serde_json::to_string(&value)
                .map_err(|e| crate::error::ServiceWsError::Parse(e.to_string())),
        }
    }

    /// Check if the part is already wire text
    pub fn is_text(&self) -> bool {
        matches!(self, OutboundMessage::Text(_))
    }
}

impl From<String> for OutboundMessage {
    fn from(text: String) -> Self {
        OutboundMessage::Text(text)
    }
}

impl From<&str> for OutboundMessage {
    fn from(text: &str) -> Self {
        OutboundMessage::Text(text.to_string())
    }
}

impl From<Value> for OutboundMessage {
    fn from(value: Value) -> Self {
        OutboundMessage::Value(value)
    }
}

/// The bidirectional message channel consumed by the connection manager.
///
/// Exactly one transport is live per client at any time and it is polled
/// exclusively by the manager task, so a superseded instance can never feed
/// a signal into current state.
#[async_trait]
pub trait Transport: Send {
    /// Wait for the next signal from this transport
    ///
    /// Returns `None` once the transport is finished and will produce no
    /// further signals (treated like `Closed`).
    async fn next_signal(&mut self) -> Option<TransportSignal>;

    /// Transmit one or more wire-text parts to the remote peer
    async fn send(&mut self, parts: Vec<String>) -> Result<()>;

    /// Request closure; the `Closed` signal must eventually follow
    async fn close(&mut self) -> Result<()>;
}

/// Factory opening transports bound to an endpoint.
///
/// `open` mirrors a socket constructor: it returns immediately with a
/// transport whose `Opened`/`Error`/`Closed` outcome arrives asynchronously
/// through the signal stream.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport + 'static;

    /// Open a new transport bound to `endpoint`
    async fn open(&self, endpoint: &str) -> Result<Self::Transport>;
}
