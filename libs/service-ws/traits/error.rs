use thiserror::Error;

/// Main error type for service-ws
#[derive(Error, Debug)]
pub enum ServiceWsError {
    /// Structured frame violated the wire protocol (no usable `name` field)
    #[error("invalid service response: {0}")]
    InvalidResponse(String),

    /// Frame parsing failed for a reason other than plain invalid syntax
    #[error("parse error: {0}")]
    Parse(String),

    /// Send attempted without a live transport
    #[error("not connected: {0}")]
    NotConnected(String),

    /// Transport-level failure (open, send or close)
    #[error("transport error: {0}")]
    Transport(String),

    /// Channel send error
    #[error("channel send error: {0}")]
    ChannelSend(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type for service-ws operations
pub type Result<T> = std::result::Result<T, ServiceWsError>;
