//! Core client: connection manager, dispatch and the event surface.
//!
//! ## Example
//!
//! ```rust,ignore
//! use service_ws::{builder, WsConnector};
//!
//! #[tokio::main]
//! async fn main() -> service_ws::Result<()> {
//!     let client = builder()
//!         .endpoint("ws://service.example:8080")
//!         .connector(WsConnector::new())
//!         .build()?;
//!
//!     client.on("connection", |_| println!("connected"));
//!     client.on("command", |raw| println!("command: {}", raw));
//!     client.connect();
//!
//!     // ... later
//!     client.send(r#"{"name":"ping"}"#)?;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;
pub mod countdown;
pub mod dispatch;
pub mod emitter;

// Re-export main types
pub use builder::{states, ServiceClientBuilder};
pub use client::ServiceClient;
pub use config::ClientConfig;
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState, Metrics};
pub use countdown::{RetryCountdown, DEFAULT_RETRY_DELAY, RETRY_SCHEDULE_SLACK};
pub use dispatch::{EventDispatcher, COMMAND_EVENT, CONNECTION_EVENT};
pub use emitter::{EventEmitter, ListenerId};

// Re-export traits for convenience
pub use crate::traits::*;

/// Create a new service client builder
///
/// This is a convenience function for starting the builder pattern.
///
/// # Example
/// ```ignore
/// let client = service_ws::builder()
///     .endpoint("ws://service.example:8080")
///     .connector(WsConnector::new())
///     .retry_delay(Duration::from_secs(5))
///     .build()?;
/// ```
pub fn builder() -> ServiceClientBuilder<states::NoEndpoint, states::NoConnector, ()> {
    ServiceClientBuilder::new()
}
