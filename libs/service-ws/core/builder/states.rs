//! Marker types recording builder progress.
//!
//! `build()` only exists once both required inputs are present, so a
//! half-configured client is unrepresentable rather than a runtime error.

use std::marker::PhantomData;

/// Tracks whether the endpoint was supplied
pub trait EndpointState {}

/// No endpoint yet
pub struct NoEndpoint;
impl EndpointState for NoEndpoint {}

/// Endpoint supplied
pub struct HasEndpoint;
impl EndpointState for HasEndpoint {}

/// Tracks whether the connector was supplied
pub trait ConnectorState {}

/// No connector yet
pub struct NoConnector;
impl ConnectorState for NoConnector {}

/// Connector supplied
pub struct HasConnector;
impl ConnectorState for HasConnector {}

/// Zero-sized carrier for the two marker parameters
#[derive(Debug, Clone, Copy)]
pub struct TypeState<E, C> {
    _endpoint: PhantomData<E>,
    _connector: PhantomData<C>,
}

impl<E, C> TypeState<E, C> {
    pub(crate) fn new() -> Self {
        Self {
            _endpoint: PhantomData,
            _connector: PhantomData,
        }
    }
}

impl<E, C> Default for TypeState<E, C> {
    fn default() -> Self {
        Self::new()
    }
}
