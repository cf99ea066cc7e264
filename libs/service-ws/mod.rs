//! # service-ws
//!
//! A client-side wrapper around one persistent socket connection to a remote
//! service: automatic reconnection plus a named-event dispatch model on top
//! of raw framed messages.
//!
//! ## Features
//!
//! - **Single logical connection**: one live transport at a time, owned by a
//!   dedicated manager task
//! - **Transparent reconnection**: fixed-delay retry cycle with a logged
//!   countdown, no errors surfaced for connectivity loss
//! - **Named-event dispatch**: structured frames become dynamically-named
//!   events, anything else becomes a raw `command`
//! - **Abstract transport**: the socket primitive is a capability
//!   (`Connector` + `Transport`), so tests can script it in memory
//! - **Type-state builder**: compile-time guarantees for required
//!   configuration

pub mod core;
pub mod traits;
pub mod ws;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use core::{
    builder, client, config, connection_state, countdown, dispatch, emitter,
    builder::{states, ServiceClientBuilder},
    client::ServiceClient,
    config::ClientConfig,
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState, Metrics},
    countdown::{RetryCountdown, DEFAULT_RETRY_DELAY, RETRY_SCHEDULE_SLACK},
    dispatch::{EventDispatcher, COMMAND_EVENT, CONNECTION_EVENT},
    emitter::{EventEmitter, ListenerId},
};

// Re-export the tungstenite-backed transport
pub use ws::{WsConnector, WsTransport};

// Convenience function
pub use core::builder as client_builder;

/// Type alias for Result with ServiceWsError
pub type Result<T> = std::result::Result<T, traits::ServiceWsError>;
