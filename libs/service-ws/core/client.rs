use crate::config::ClientConfig;
use crate::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState, Metrics};
use crate::countdown::RetryCountdown;
use crate::dispatch::EventDispatcher;
use crate::emitter::{EventEmitter, ListenerId};
use crate::traits::*;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, trace, warn};

/// Internal command messages for client control
#[derive(Debug)]
enum ClientCommand {
    /// Request a (re)connection
    Connect,
    /// Transmit encoded wire-text parts over the live transport
    Send(Vec<String>),
    /// Shut the client down
    Shutdown,
}

/// Result of one bounded poll on the command channel
enum CommandPoll {
    Command(ClientCommand),
    Timeout,
    Closed,
}

/// How polling one transport instance ended
enum TransportOutcome {
    /// The transport closed; the retry cycle takes over
    Closed,
    /// Shutdown was requested while the transport was live
    Shutdown,
    /// A protocol violation surfaced from dispatch
    Fatal(ServiceWsError),
}

/// Client for one persistent connection to a remote service
///
/// The handle talks to a dedicated manager task over a command channel. The
/// manager task exclusively owns the live transport and the connection
/// state; the handle only reads state (for the `send` guard) and mutates the
/// shared listener registry.
///
/// Connectivity loss is invisible to callers except through logs and the
/// automatic retry cycle: after a reconnection the `connection` event fires
/// again, and no explicit disconnected event is exposed.
pub struct ServiceClient {
    endpoint: String,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    emitter: Arc<Mutex<EventEmitter>>,
    dispatcher: EventDispatcher,
    command_tx: UnboundedSender<ClientCommand>,
    task_handle: Option<tokio::task::JoinHandle<Result<()>>>,
    shutdown_flag: Arc<AtomicBool>,
}

impl std::fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl ServiceClient {
    /// Spawn the manager task for `config` and return the handle
    ///
    /// This is called by the builder's `build()` method. Use
    /// `service_ws::builder()` to create a client.
    pub(crate) fn spawn<C>(config: ClientConfig<C>) -> Self
    where
        C: Connector,
    {
        let state = Arc::new(AtomicConnectionState::new(ConnectionState::Idle));
        let metrics = Arc::new(AtomicMetrics::new());
        let emitter = Arc::new(Mutex::new(EventEmitter::new()));
        let dispatcher = EventDispatcher::new(Arc::clone(&emitter));
        let shutdown_flag = Arc::clone(&config.shutdown_flag);
        let endpoint = config.endpoint.clone();

        let (command_tx, command_rx) = unbounded_channel();

        let task_handle = {
            let state = Arc::clone(&state);
            let metrics = Arc::clone(&metrics);
            let dispatcher = dispatcher.clone();

            tokio::spawn(async move {
                run_client(config, state, metrics, dispatcher, command_rx).await
            })
        };

        Self {
            endpoint,
            state,
            metrics,
            emitter,
            dispatcher,
            command_tx,
            task_handle: Some(task_handle),
            shutdown_flag,
        }
    }

    /// Request a connection to the configured endpoint
    ///
    /// Non-blocking; the outcome surfaces through logs and emitted events.
    /// When a transport is already live this is NOT a no-op: the manager
    /// logs a warning, closes the existing transport, and reconnects through
    /// the normal close-signal path. No new transport is opened
    /// synchronously in that case.
    pub fn connect(&self) -> &Self {
        if self.command_tx.send(ClientCommand::Connect).is_err() {
            error!("connect request dropped, client task is gone");
        }
        self
    }

    /// Send one message to the remote peer
    ///
    /// A non-string message is serialized to JSON text before transmission.
    /// Fails with [`ServiceWsError::NotConnected`] when no transport is
    /// live.
    pub fn send<M>(&self, message: M) -> Result<&Self>
    where
        M: Into<OutboundMessage>,
    {
        self.send_parts(message.into(), Vec::new())
    }

    /// Send a message plus extra positional parts
    ///
    /// The first part is serialized when it is not already a string; the
    /// extras are forwarded unchanged alongside it to the transport's send
    /// primitive.
    pub fn send_parts(
        &self,
        message: OutboundMessage,
        extras: Vec<OutboundMessage>,
    ) -> Result<&Self> {
        if !self.state.is_connected() {
            return Err(ServiceWsError::NotConnected(format!(
                "cannot send, no live transport to {}",
                self.endpoint
            )));
        }

        let parts = self.dispatcher.encode_parts(message, extras)?;
        self.command_tx
            .send(ClientCommand::Send(parts))
            .map_err(|e| ServiceWsError::ChannelSend(e.to_string()))?;
        Ok(self)
    }

    /// Subscribe to an event by name
    ///
    /// Names are the wire-level event names (`connection`, `command`, or any
    /// `name` field carried by a structured frame).
    pub fn on<F>(&self, name: &str, callback: F) -> ListenerId
    where
        F: FnMut(&Value) + Send + 'static,
    {
        self.emitter.lock().on(name, callback)
    }

    /// Subscribe to the next emission of an event only
    pub fn once<F>(&self, name: &str, callback: F) -> ListenerId
    where
        F: FnMut(&Value) + Send + 'static,
    {
        self.emitter.lock().once(name, callback)
    }

    /// Remove a subscription; returns whether it was found
    pub fn off(&self, name: &str, id: ListenerId) -> bool {
        self.emitter.lock().off(name, id)
    }

    /// The endpoint this client is bound to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Get current connection state
    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Check if connected
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Get current metrics
    pub fn metrics(&self) -> Metrics {
        Metrics {
            messages_sent: self.metrics.messages_sent(),
            messages_received: self.metrics.messages_received(),
            reconnect_count: self.metrics.reconnect_count(),
            connection_state: self.state.get(),
        }
    }

    /// Get a reference to the shutdown flag
    ///
    /// External code can trigger graceful shutdown by setting the flag to
    /// false; the manager task will not reconnect afterwards.
    pub fn shutdown_flag(&self) -> &Arc<AtomicBool> {
        &self.shutdown_flag
    }

    /// Shut the client down
    ///
    /// Cancels any pending retry countdown, closes the live transport, and
    /// waits for the manager task to exit. Returns the task's terminal
    /// result, which carries a fatal dispatch error when one occurred.
    pub async fn shutdown(mut self) -> Result<()> {
        info!("shutting down service client for {}", self.endpoint);

        self.shutdown_flag.store(false, Ordering::Release);
        let _ = self.command_tx.send(ClientCommand::Shutdown);

        if let Some(handle) = self.task_handle.take() {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(ServiceWsError::ChannelSend(format!(
                    "client task panicked: {}",
                    e
                ))),
            }
        } else {
            Ok(())
        }
    }
}

/// One bounded poll on the command channel
///
/// The timeout keeps the loops responsive to an externally flipped shutdown
/// flag; `recv` on a tokio channel is cancel safe, so a command is never
/// lost when another select arm wins.
async fn next_command(command_rx: &mut UnboundedReceiver<ClientCommand>) -> CommandPoll {
    match tokio::time::timeout(Duration::from_millis(100), command_rx.recv()).await {
        Ok(Some(command)) => CommandPoll::Command(command),
        Ok(None) => CommandPoll::Closed,
        Err(_) => CommandPoll::Timeout,
    }
}

/// Main client task loop: Idle -> Connecting -> Connected -> Disconnected ->
/// countdown -> retry
async fn run_client<C>(
    config: ClientConfig<C>,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    dispatcher: EventDispatcher,
    mut command_rx: UnboundedReceiver<ClientCommand>,
) -> Result<()>
where
    C: Connector,
{
    let shutdown_flag = Arc::clone(&config.shutdown_flag);
    let mut generation: u64 = 0;

    // Idle: nothing happens until the first connect request
    loop {
        if !shutdown_flag.load(Ordering::Acquire) {
            debug!("shutdown flag is false, exiting before first connect");
            return Ok(());
        }
        match next_command(&mut command_rx).await {
            CommandPoll::Command(ClientCommand::Connect) => break,
            CommandPoll::Command(ClientCommand::Send(_)) => {
                warn!("dropping send, no connection was requested yet");
            }
            CommandPoll::Command(ClientCommand::Shutdown) | CommandPoll::Closed => return Ok(()),
            CommandPoll::Timeout => continue,
        }
    }

    loop {
        if !shutdown_flag.load(Ordering::Acquire) {
            debug!("shutdown flag is false, exiting main loop");
            return Ok(());
        }

        state.set(ConnectionState::Connecting);
        generation += 1;
        info!("connecting to {}...", config.endpoint);

        let transport = match config.connector.open(&config.endpoint).await {
            Ok(transport) => transport,
            Err(e) => {
                // open failures follow the same path as a close signal
                error!("could not open transport: {}", e);
                state.set(ConnectionState::Disconnected);
                match wait_retry(&mut command_rx, config.retry_delay, &shutdown_flag).await {
                    RetryOutcome::Retry => {
                        metrics.increment_reconnects();
                        continue;
                    }
                    RetryOutcome::Shutdown => return Ok(()),
                }
            }
        };

        let outcome = drive_transport(
            transport,
            generation,
            &config.endpoint,
            &state,
            &metrics,
            &dispatcher,
            &mut command_rx,
            &shutdown_flag,
        )
        .await;

        match outcome {
            TransportOutcome::Closed => {
                state.set(ConnectionState::Disconnected);
                warn!("transport disconnected (generation {})", generation);
                match wait_retry(&mut command_rx, config.retry_delay, &shutdown_flag).await {
                    RetryOutcome::Retry => {
                        metrics.increment_reconnects();
                        continue;
                    }
                    RetryOutcome::Shutdown => return Ok(()),
                }
            }
            TransportOutcome::Shutdown => {
                state.set(ConnectionState::Idle);
                info!("client task exiting");
                return Ok(());
            }
            TransportOutcome::Fatal(e) => {
                state.set(ConnectionState::Idle);
                error!("fatal dispatch error, stopping client: {}", e);
                return Err(e);
            }
        }
    }
}

/// Poll one transport instance until it closes or the client stops
///
/// The manager polls only the current generation, so a superseded
/// transport's signals can never reach shared state.
#[allow(clippy::too_many_arguments)]
async fn drive_transport<T>(
    mut transport: T,
    generation: u64,
    endpoint: &str,
    state: &AtomicConnectionState,
    metrics: &AtomicMetrics,
    dispatcher: &EventDispatcher,
    command_rx: &mut UnboundedReceiver<ClientCommand>,
    shutdown_flag: &AtomicBool,
) -> TransportOutcome
where
    T: Transport,
{
    loop {
        if !shutdown_flag.load(Ordering::Acquire) {
            debug!("shutdown flag detected, closing transport");
            let _ = transport.close().await;
            return TransportOutcome::Shutdown;
        }

        tokio::select! {
            sig = transport.next_signal() => {
                match sig {
                    Some(TransportSignal::Opened) => {
                        state.set(ConnectionState::Connected);
                        info!("connected to {}", endpoint);
                        dispatcher.emit_connection();
                    }
                    Some(TransportSignal::Error(e)) => {
                        // state is driven by the close that follows
                        error!("transport error (generation {}): {}", generation, e);
                    }
                    Some(TransportSignal::Message(payload)) => {
                        metrics.increment_received();
                        if let Err(e) = dispatcher.dispatch(&payload) {
                            let _ = transport.close().await;
                            return TransportOutcome::Fatal(e);
                        }
                    }
                    Some(TransportSignal::Closed) | None => {
                        return TransportOutcome::Closed;
                    }
                }
            }

            cmd = next_command(command_rx) => {
                match cmd {
                    CommandPoll::Command(ClientCommand::Connect) => {
                        // re-entrant connect: close and let the close signal
                        // drive the reconnection
                        warn!("already connected, closing to reconnect...");
                        if let Err(e) = transport.close().await {
                            error!("close failed, dropping transport: {}", e);
                            return TransportOutcome::Closed;
                        }
                    }
                    CommandPoll::Command(ClientCommand::Send(parts)) => {
                        if state.is_connected() {
                            match transport.send(parts).await {
                                Ok(()) => metrics.increment_sent(),
                                Err(e) => error!("send failed: {}", e),
                            }
                        } else {
                            // the handle guard raced a state change
                            warn!("dropping send, transport is not open");
                        }
                    }
                    CommandPoll::Command(ClientCommand::Shutdown) | CommandPoll::Closed => {
                        let _ = transport.close().await;
                        return TransportOutcome::Shutdown;
                    }
                    CommandPoll::Timeout => {}
                }
            }
        }
    }
}

/// What ended a retry countdown
enum RetryOutcome {
    /// Open the next transport (deadline reached or connect superseded it)
    Retry,
    /// Stop without reconnecting
    Shutdown,
}

/// Run the retry countdown after a disconnect
///
/// Schedules exactly one reconnection attempt at `delay + 1ms` and a
/// progress tick every second, logged here at `trace!`. A fresh connect
/// request cancels both timers and retries immediately; shutdown cancels
/// both and stops the cycle.
async fn wait_retry(
    command_rx: &mut UnboundedReceiver<ClientCommand>,
    delay: Duration,
    shutdown_flag: &AtomicBool,
) -> RetryOutcome {
    let countdown = RetryCountdown::start(delay);
    let deadline = tokio::time::sleep(countdown.deadline());
    tokio::pin!(deadline);

    loop {
        if !shutdown_flag.load(Ordering::Acquire) {
            countdown.cancel();
            return RetryOutcome::Shutdown;
        }

        tokio::select! {
            _ = &mut deadline => {
                // the tick task already self-cancelled at zero
                return RetryOutcome::Retry;
            }

            cmd = next_command(command_rx) => {
                match cmd {
                    CommandPoll::Command(ClientCommand::Connect) => {
                        debug!("connect request supersedes the countdown");
                        countdown.cancel();
                        return RetryOutcome::Retry;
                    }
                    CommandPoll::Command(ClientCommand::Send(_)) => {
                        warn!("dropping send, transport is disconnected");
                    }
                    CommandPoll::Command(ClientCommand::Shutdown) | CommandPoll::Closed => {
                        countdown.cancel();
                        return RetryOutcome::Shutdown;
                    }
                    CommandPoll::Timeout => {
                        for remaining in countdown.ticks().try_iter() {
                            trace!("reconnecting in {}", remaining);
                        }
                    }
                }
            }
        }
    }
}
