use crate::traits::Connector;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for one [`ServiceClient`](crate::client::ServiceClient)
///
/// Built by the type-state builder. The endpoint is an explicit parameter
/// resolved by the caller; the core never reads an ambient default.
pub struct ClientConfig<C>
where
    C: Connector,
{
    /// Endpoint address the connector binds transports to
    pub(crate) endpoint: String,

    /// Transport factory
    pub(crate) connector: C,

    /// Fixed delay between a close and the next reconnection attempt
    pub(crate) retry_delay: Duration,

    /// Shutdown flag - when false, the manager task exits instead of
    /// reconnecting
    pub(crate) shutdown_flag: Arc<AtomicBool>,
}

impl<C> ClientConfig<C>
where
    C: Connector,
{
    /// Get a reference to the endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Get the configured retry delay
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }
}
