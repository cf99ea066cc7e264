//! Event monitor for a remote service socket
//!
//! Connects to the service endpoint, subscribes to a set of named events,
//! and prints every frame the service pushes. Reconnection is automatic;
//! run with RUST_LOG=service_ws=trace to see the retry countdown.
//!
//! Usage:
//!   cargo run --bin service_events -- [event-name ...]
//!
//! Required environment variables (or first positional argument):
//!   SERVICE_WS_URL - WebSocket endpoint of the service

use anyhow::{Context, Result};
use service_ws::{builder, WsConnector};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();

    // ws:// or wss:// as the first argument overrides the environment
    let endpoint = if args.first().is_some_and(|a| a.starts_with("ws")) {
        args.remove(0)
    } else {
        std::env::var("SERVICE_WS_URL")
            .context("SERVICE_WS_URL not set and no endpoint argument given")?
    };

    let client = builder()
        .endpoint(&endpoint)
        .connector(WsConnector::new())
        .build()?;

    client.on("connection", |_| {
        info!("connection established");
    });
    client.on("command", |raw| {
        info!("command frame: {}", raw);
    });
    for name in &args {
        let event = name.clone();
        client.on(name, move |data| {
            info!("{}: {}", event, data);
        });
    }

    print_banner(&endpoint, &args);
    client.connect();

    tokio::signal::ctrl_c().await?;
    info!("interrupt received, shutting down");
    client.shutdown().await?;

    Ok(())
}

fn print_banner(endpoint: &str, events: &[String]) {
    info!("========================================");
    info!("Service Event Monitor");
    info!("Endpoint: {}", endpoint);
    if events.is_empty() {
        info!("Watching: connection, command");
    } else {
        info!("Watching: connection, command, {}", events.join(", "));
    }
    info!("Press Ctrl+C to stop");
    info!("========================================");
}
