//! Common test utilities for service-ws integration tests.
//!
//! Provides a scripted in-memory transport: tests inject open/error/close/
//! message signals and observe everything the client transmitted.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use service_ws::{Connector, Result, Transport, TransportSignal};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

#[derive(Default)]
struct MockShared {
    sent: Mutex<Vec<Vec<String>>>,
    close_calls: AtomicUsize,
}

/// Script handle for one mock transport instance
///
/// Cloneable; signals pushed here arrive on the client's signal stream in
/// order.
#[derive(Clone)]
pub struct MockHandle {
    signal_tx: UnboundedSender<TransportSignal>,
    shared: Arc<MockShared>,
}

impl MockHandle {
    /// Deliver the open signal
    pub fn open(&self) {
        let _ = self.signal_tx.send(TransportSignal::Opened);
    }

    /// Deliver an error signal (state change comes from the close after it)
    pub fn error(&self, reason: &str) {
        let _ = self.signal_tx.send(TransportSignal::Error(reason.to_string()));
    }

    /// Deliver one raw message frame
    pub fn message(&self, payload: &str) {
        let _ = self
            .signal_tx
            .send(TransportSignal::Message(payload.to_string()));
    }

    /// Deliver the close signal
    pub fn close(&self) {
        let _ = self.signal_tx.send(TransportSignal::Closed);
    }

    /// Everything the client transmitted through this transport
    pub fn sent(&self) -> Vec<Vec<String>> {
        self.shared.sent.lock().clone()
    }

    /// How many times the client requested closure
    pub fn close_calls(&self) -> usize {
        self.shared.close_calls.load(Ordering::Acquire)
    }
}

/// Transport instance handed to the client by [`MockConnector`]
pub struct MockTransport {
    signal_rx: UnboundedReceiver<TransportSignal>,
    signal_tx: UnboundedSender<TransportSignal>,
    shared: Arc<MockShared>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn next_signal(&mut self) -> Option<TransportSignal> {
        self.signal_rx.recv().await
    }

    async fn send(&mut self, parts: Vec<String>) -> Result<()> {
        self.shared.sent.lock().push(parts);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        // a well-behaved transport always follows a close request with the
        // close signal
        self.shared.close_calls.fetch_add(1, Ordering::AcqRel);
        let _ = self.signal_tx.send(TransportSignal::Closed);
        Ok(())
    }
}

/// Scripted connector: records every transport it opens
pub struct MockConnector {
    auto_open: bool,
    handles: Arc<Mutex<Vec<MockHandle>>>,
}

/// Test-side view of the connector's activity
#[derive(Clone)]
pub struct MockScript {
    handles: Arc<Mutex<Vec<MockHandle>>>,
}

impl MockConnector {
    /// `auto_open`: emit the open signal as soon as a transport is opened
    pub fn new(auto_open: bool) -> (Self, MockScript) {
        let handles = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                auto_open,
                handles: Arc::clone(&handles),
            },
            MockScript { handles },
        )
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn open(&self, _endpoint: &str) -> Result<MockTransport> {
        let (signal_tx, signal_rx) = unbounded_channel();
        let shared = Arc::new(MockShared::default());
        let handle = MockHandle {
            signal_tx: signal_tx.clone(),
            shared: Arc::clone(&shared),
        };
        if self.auto_open {
            handle.open();
        }
        self.handles.lock().push(handle);
        Ok(MockTransport {
            signal_rx,
            signal_tx,
            shared,
        })
    }
}

impl MockScript {
    /// Number of transports opened so far
    pub fn open_count(&self) -> usize {
        self.handles.lock().len()
    }

    /// Script handle for the `index`-th opened transport
    pub fn handle(&self, index: usize) -> MockHandle {
        self.handles.lock()[index].clone()
    }

    /// Wait until at least `count` transports were opened
    pub async fn wait_for_opens(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.open_count() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.open_count() >= count
    }
}

/// Wait until `predicate` holds or `timeout` elapses
pub async fn wait_until<F>(mut predicate: F, timeout: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    predicate()
}

/// Test fixture for connection states
pub mod fixtures {
    use service_ws::{AtomicConnectionState, ConnectionState};

    pub fn idle_state() -> AtomicConnectionState {
        AtomicConnectionState::new(ConnectionState::Idle)
    }

    pub fn connected_state() -> AtomicConnectionState {
        AtomicConnectionState::new(ConnectionState::Connected)
    }

    pub fn disconnected_state() -> AtomicConnectionState {
        AtomicConnectionState::new(ConnectionState::Disconnected)
    }
}
