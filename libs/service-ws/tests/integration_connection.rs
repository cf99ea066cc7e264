//! Integration tests for connection lifecycle management.
//!
//! These tests verify connection state transitions, the send guard, and the
//! connect/dispatch behavior of a full client against a scripted transport.

mod common;

use common::{wait_until, MockConnector};
use parking_lot::Mutex;
use serde_json::{json, Value};
use service_ws::{builder, AtomicConnectionState, AtomicMetrics, ConnectionState, ServiceWsError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Macro for verbose test output
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

#[test]
fn test_connection_state_full_lifecycle() {
    verbose_println!("Testing full connection lifecycle...");

    let state = AtomicConnectionState::new(ConnectionState::Idle);

    assert!(state.is_idle());
    verbose_println!("  Initial state: Idle");

    state.set(ConnectionState::Connecting);
    assert!(state.is_connecting());

    state.set(ConnectionState::Connected);
    assert!(state.is_connected());

    state.set(ConnectionState::Disconnected);
    assert!(state.is_disconnected());

    // the retry cycle goes back through Connecting
    state.set(ConnectionState::Connecting);
    assert!(state.is_connecting());
    verbose_println!("  Lifecycle complete");
}

#[test]
fn test_compare_exchange_race_safety() {
    verbose_println!("Testing compare_exchange race safety...");

    let state = Arc::new(AtomicConnectionState::new(ConnectionState::Idle));
    let success_count = Arc::new(std::sync::atomic::AtomicUsize::new(0));

    let mut handles = vec![];

    // Multiple threads try to be the first to transition
    for _ in 0..10 {
        let state_clone = Arc::clone(&state);
        let success_clone = Arc::clone(&success_count);

        handles.push(thread::spawn(move || {
            if state_clone
                .compare_exchange(ConnectionState::Idle, ConnectionState::Connecting)
                .is_ok()
            {
                success_clone.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(
        success_count.load(std::sync::atomic::Ordering::Relaxed),
        1,
        "Only one thread should win the race"
    );
}

#[test]
fn test_concurrent_state_and_metrics_access() {
    verbose_println!("Testing concurrent state access...");

    let state = Arc::new(AtomicConnectionState::new(ConnectionState::Idle));
    let metrics = Arc::new(AtomicMetrics::new());

    let mut handles = vec![];

    for _ in 0..5 {
        let state_clone = Arc::clone(&state);
        handles.push(thread::spawn(move || {
            for _ in 0..1000 {
                let _ = state_clone.get();
                let _ = state_clone.is_connected();
            }
        }));
    }

    for _ in 0..3 {
        let state_clone = Arc::clone(&state);
        handles.push(thread::spawn(move || {
            for _ in 0..100 {
                state_clone.set(ConnectionState::Connected);
                state_clone.set(ConnectionState::Disconnected);
            }
        }));
    }

    for _ in 0..5 {
        let metrics_clone = Arc::clone(&metrics);
        handles.push(thread::spawn(move || {
            for _ in 0..1000 {
                metrics_clone.increment_sent();
                metrics_clone.increment_received();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(metrics.messages_sent(), 5000);
    assert_eq!(metrics.messages_received(), 5000);
}

#[tokio::test(start_paused = true)]
async fn test_connect_emits_connection_event() {
    let (connector, script) = MockConnector::new(true);
    let client = builder()
        .endpoint("ws://test.local")
        .connector(connector)
        .build()
        .unwrap();

    let connections = Arc::new(Mutex::new(0u32));
    let sink = Arc::clone(&connections);
    client.on("connection", move |payload| {
        assert_eq!(payload, &Value::Null);
        *sink.lock() += 1;
    });

    assert!(client.connection_state() == ConnectionState::Idle);
    client.connect();

    assert!(wait_until(|| client.is_connected(), Duration::from_secs(2)).await);
    assert_eq!(*connections.lock(), 1);
    assert_eq!(script.open_count(), 1);

    client.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_send_without_transport_fails() {
    let (connector, _script) = MockConnector::new(true);
    let client = builder()
        .endpoint("ws://test.local")
        .connector(connector)
        .build()
        .unwrap();

    // never connected
    let err = client.send("anything").unwrap_err();
    assert!(
        matches!(err, ServiceWsError::NotConnected(_)),
        "expected NotConnected, got {err}"
    );

    client.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_send_string_passes_unchanged() {
    let (connector, script) = MockConnector::new(true);
    let client = builder()
        .endpoint("ws://test.local")
        .connector(connector)
        .build()
        .unwrap();

    client.connect();
    assert!(wait_until(|| client.is_connected(), Duration::from_secs(2)).await);

    client.send("raw command").unwrap();

    let handle = script.handle(0);
    assert!(wait_until(|| !handle.sent().is_empty(), Duration::from_secs(2)).await);
    assert_eq!(handle.sent(), vec![vec!["raw command".to_string()]]);
    assert_eq!(client.metrics().messages_sent, 1);

    client.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_send_value_is_serialized() {
    let (connector, script) = MockConnector::new(true);
    let client = builder()
        .endpoint("ws://test.local")
        .connector(connector)
        .build()
        .unwrap();

    client.connect();
    assert!(wait_until(|| client.is_connected(), Duration::from_secs(2)).await);

    client.send(json!({"name": "subscribe", "data": [1, 2]})).unwrap();

    let handle = script.handle(0);
    assert!(wait_until(|| !handle.sent().is_empty(), Duration::from_secs(2)).await);

    let sent = handle.sent();
    assert_eq!(sent.len(), 1);
    let round_trip: Value = serde_json::from_str(&sent[0][0]).unwrap();
    assert_eq!(round_trip, json!({"name": "subscribe", "data": [1, 2]}));

    client.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_inbound_named_event_reaches_listener() {
    let (connector, script) = MockConnector::new(true);
    let client = builder()
        .endpoint("ws://test.local")
        .connector(connector)
        .build()
        .unwrap();

    let pings = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&pings);
    client.on("ping", move |payload| sink.lock().push(payload.clone()));

    client.connect();
    assert!(wait_until(|| client.is_connected(), Duration::from_secs(2)).await);

    script.handle(0).message(r#"{"name":"ping","data":1}"#);

    assert!(wait_until(|| !pings.lock().is_empty(), Duration::from_secs(2)).await);
    assert_eq!(pings.lock().as_slice(), &[json!(1)]);
    assert_eq!(client.metrics().messages_received, 1);

    client.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_inbound_raw_frame_reaches_command_listener() {
    let (connector, script) = MockConnector::new(true);
    let client = builder()
        .endpoint("ws://test.local")
        .connector(connector)
        .build()
        .unwrap();

    let commands = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&commands);
    client.on("command", move |payload| sink.lock().push(payload.clone()));

    client.connect();
    assert!(wait_until(|| client.is_connected(), Duration::from_secs(2)).await);

    script.handle(0).message("hello");

    assert!(wait_until(|| !commands.lock().is_empty(), Duration::from_secs(2)).await);
    assert_eq!(commands.lock().as_slice(), &[json!("hello")]);

    client.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_protocol_violation_stops_client() {
    let (connector, script) = MockConnector::new(true);
    let client = builder()
        .endpoint("ws://test.local")
        .connector(connector)
        .build()
        .unwrap();

    client.connect();
    assert!(wait_until(|| client.is_connected(), Duration::from_secs(2)).await);

    // structured frame without a name: fatal, nothing emitted, no retry
    script.handle(0).message(r#"{"data": 42}"#);

    assert!(
        wait_until(
            || client.connection_state() == ConnectionState::Idle,
            Duration::from_secs(2)
        )
        .await
    );

    let err = client.shutdown().await.unwrap_err();
    assert!(
        matches!(err, ServiceWsError::InvalidResponse(_)),
        "expected InvalidResponse, got {err}"
    );
    assert_eq!(script.open_count(), 1, "a violation must not trigger retry");
}

#[tokio::test(start_paused = true)]
async fn test_connect_twice_closes_existing_transport() {
    let (connector, script) = MockConnector::new(true);
    let client = builder()
        .endpoint("ws://test.local")
        .connector(connector)
        .build()
        .unwrap();

    client.connect();
    assert!(wait_until(|| client.is_connected(), Duration::from_secs(2)).await);
    assert_eq!(script.open_count(), 1);

    // second connect: warn + close, the reopen comes from the close path
    client.connect();

    let handle = script.handle(0);
    assert!(wait_until(|| handle.close_calls() == 1, Duration::from_secs(2)).await);
    assert!(
        wait_until(
            || client.connection_state() == ConnectionState::Disconnected,
            Duration::from_secs(2)
        )
        .await
    );
    assert_eq!(
        script.open_count(),
        1,
        "no second transport may be opened synchronously"
    );

    // the countdown eventually reopens
    assert!(script.wait_for_opens(2, Duration::from_secs(10)).await);

    client.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_while_connected() {
    let (connector, script) = MockConnector::new(true);
    let client = builder()
        .endpoint("ws://test.local")
        .connector(connector)
        .build()
        .unwrap();

    client.connect();
    assert!(wait_until(|| client.is_connected(), Duration::from_secs(2)).await);

    client.shutdown().await.unwrap();
    assert_eq!(script.handle(0).close_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_endpoint_accessor() {
    let (connector, _script) = MockConnector::new(true);
    let client = builder()
        .endpoint("ws://service.example:9000")
        .connector(connector)
        .build()
        .unwrap();

    assert_eq!(client.endpoint(), "ws://service.example:9000");
    client.shutdown().await.unwrap();
}
