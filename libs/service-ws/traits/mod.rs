//! Core traits and types for the service-ws client.
//!
//! This module provides the fundamental abstractions consumed by the
//! connection manager:
//!
//! - **Connector**: open a transport bound to an endpoint
//! - **Transport**: the bidirectional message channel (signals + send/close)
//! - **ServiceWsError**: the crate error type

pub mod error;
pub mod transport;

// Re-export commonly used types
pub use error::{Result, ServiceWsError};
pub use transport::{Connector, OutboundMessage, Transport, TransportSignal};
