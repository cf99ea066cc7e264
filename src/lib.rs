//! Service Event Monitor - Main Library
//!
//! Thin top-level crate: re-exports the `service-ws` client library and
//! hosts the `service_events` monitor binary.
//!
//! ## Usage in Binaries
//!
//! ```rust,ignore
//! use service_event_monitor::service_ws::{builder, WsConnector};
//! ```

// Re-export the workspace library for convenience
pub use service_ws;
