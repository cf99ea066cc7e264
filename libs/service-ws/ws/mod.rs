//! WebSocket-backed transport.
//!
//! Implements the [`Connector`]/[`Transport`] capability over
//! `tokio-tungstenite`. `open` mirrors a socket constructor: it returns
//! immediately and the handshake outcome arrives through the signal stream
//! (`Opened`, or `Error` followed by `Closed`).

use crate::traits::*;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error};

/// Commands from the transport handle to the socket task
#[derive(Debug)]
enum SocketCommand {
    Send(Vec<String>),
    Close,
}

/// Connector opening [`WsTransport`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    type Transport = WsTransport;

    async fn open(&self, endpoint: &str) -> Result<WsTransport> {
        Ok(WsTransport::open(endpoint))
    }
}

/// One WebSocket connection, driven by a background socket task
pub struct WsTransport {
    signal_rx: UnboundedReceiver<TransportSignal>,
    command_tx: UnboundedSender<SocketCommand>,
    task: tokio::task::JoinHandle<()>,
}

impl WsTransport {
    fn open(endpoint: &str) -> Self {
        let (signal_tx, signal_rx) = unbounded_channel();
        let (command_tx, command_rx) = unbounded_channel();

        let endpoint = endpoint.to_string();
        let task = tokio::spawn(async move {
            socket_task(endpoint, signal_tx, command_rx).await;
        });

        Self {
            signal_rx,
            command_tx,
            task,
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn next_signal(&mut self) -> Option<TransportSignal> {
        self.signal_rx.recv().await
    }

    async fn send(&mut self, parts: Vec<String>) -> Result<()> {
        self.command_tx
            .send(SocketCommand::Send(parts))
            .map_err(|_| ServiceWsError::Transport("socket task is gone".into()))
    }

    async fn close(&mut self) -> Result<()> {
        self.command_tx
            .send(SocketCommand::Close)
            .map_err(|_| ServiceWsError::Transport("socket task is gone".into()))
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Socket task: handshake, then pump frames and commands until closed
async fn socket_task(
    endpoint: String,
    signal_tx: UnboundedSender<TransportSignal>,
    mut command_rx: UnboundedReceiver<SocketCommand>,
) {
    let ws_stream = match connect_async(&endpoint).await {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            let _ = signal_tx.send(TransportSignal::Error(e.to_string()));
            let _ = signal_tx.send(TransportSignal::Closed);
            return;
        }
    };

    let _ = signal_tx.send(TransportSignal::Opened);
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let _ = signal_tx.send(TransportSignal::Message(text));
                    }
                    Some(Ok(Message::Binary(data))) => {
                        // service frames are text; recover what we can
                        let text = String::from_utf8_lossy(&data).into_owned();
                        let _ = signal_tx.send(TransportSignal::Message(text));
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        let _ = signal_tx.send(TransportSignal::Closed);
                        break;
                    }
                    Some(Ok(_)) => {
                        // ping/pong handled by tungstenite
                    }
                    Some(Err(e)) => {
                        let _ = signal_tx.send(TransportSignal::Error(e.to_string()));
                        let _ = signal_tx.send(TransportSignal::Closed);
                        break;
                    }
                }
            }

            cmd = command_rx.recv() => {
                match cmd {
                    Some(SocketCommand::Send(parts)) => {
                        for part in parts {
                            if let Err(e) = write.send(Message::Text(part)).await {
                                error!("websocket send failed: {}", e);
                                let _ = signal_tx.send(TransportSignal::Error(e.to_string()));
                                let _ = signal_tx.send(TransportSignal::Closed);
                                return;
                            }
                        }
                    }
                    Some(SocketCommand::Close) => {
                        debug!("closing websocket to {}", endpoint);
                        // the close signal is emitted when the stream ends
                        if write.close().await.is_err() {
                            let _ = signal_tx.send(TransportSignal::Closed);
                            return;
                        }
                    }
                    None => {
                        let _ = write.close().await;
                        return;
                    }
                }
            }
        }
    }
}
