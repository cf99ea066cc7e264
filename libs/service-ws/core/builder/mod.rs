pub mod states;

use crate::client::ServiceClient;
use crate::config::ClientConfig;
use crate::countdown::DEFAULT_RETRY_DELAY;
use crate::traits::*;
use states::*;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Type-state builder for [`ServiceClient`]
///
/// This builder uses Rust's type system to enforce that required fields
/// (endpoint and connector) are set before the client can be built.
pub struct ServiceClientBuilder<E, Co, C>
where
    E: EndpointState,
    Co: ConnectorState,
{
    _state: TypeState<E, Co>,
    endpoint: Option<String>,
    connector: Option<C>,
    retry_delay: Duration,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl ServiceClientBuilder<NoEndpoint, NoConnector, ()> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: TypeState::new(),
            endpoint: None,
            connector: None,
            retry_delay: DEFAULT_RETRY_DELAY,
            shutdown_flag: None,
        }
    }
}

impl Default for ServiceClientBuilder<NoEndpoint, NoConnector, ()> {
    fn default() -> Self {
        Self::new()
    }
}

// Endpoint setting
impl<Co, C> ServiceClientBuilder<NoEndpoint, Co, C>
where
    Co: ConnectorState,
{
    /// Set the endpoint address transports are bound to
    ///
    /// The address is immutable for the lifetime of the client. Resolving a
    /// default (e.g. from the host environment) is the caller's job.
    pub fn endpoint(self, endpoint: impl Into<String>) -> ServiceClientBuilder<HasEndpoint, Co, C> {
        ServiceClientBuilder {
            _state: TypeState::new(),
            endpoint: Some(endpoint.into()),
            connector: self.connector,
            retry_delay: self.retry_delay,
            shutdown_flag: self.shutdown_flag,
        }
    }
}

// Connector setting
impl<E> ServiceClientBuilder<E, NoConnector, ()>
where
    E: EndpointState,
{
    /// Set the transport factory
    pub fn connector<NewC>(self, connector: NewC) -> ServiceClientBuilder<E, HasConnector, NewC>
    where
        NewC: Connector,
    {
        ServiceClientBuilder {
            _state: TypeState::new(),
            endpoint: self.endpoint,
            connector: Some(connector),
            retry_delay: self.retry_delay,
            shutdown_flag: self.shutdown_flag,
        }
    }
}

// Optional configuration methods
impl<E, C> ServiceClientBuilder<E, HasConnector, C>
where
    E: EndpointState,
    C: Connector,
{
    /// Override the fixed delay between disconnect and reconnection attempt
    ///
    /// Defaults to 5 seconds. The retry cycle stays fixed-interval and
    /// unbounded regardless of the value.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set a custom shutdown flag for coordinated shutdown across components
    ///
    /// When the flag is set to `false`, the manager task will not attempt
    /// reconnection and will gracefully shut down.
    pub fn shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }
}

// Build method - only available when all required fields are set
impl<C> ServiceClientBuilder<HasEndpoint, HasConnector, C>
where
    C: Connector,
{
    /// Assemble the configuration and spawn the connection manager task
    pub fn build(self) -> Result<ServiceClient> {
        let endpoint = self
            .endpoint
            .ok_or_else(|| ServiceWsError::Configuration("endpoint must be set".into()))?;
        let connector = self
            .connector
            .ok_or_else(|| ServiceWsError::Configuration("connector must be set".into()))?;

        let shutdown_flag = self
            .shutdown_flag
            .unwrap_or_else(|| Arc::new(AtomicBool::new(true)));

        let config = ClientConfig {
            endpoint,
            connector,
            retry_delay: self.retry_delay,
            shutdown_flag,
        };

        Ok(ServiceClient::spawn(config))
    }
}
