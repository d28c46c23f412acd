//! Transport manager for the real-time channel.
//!
//! Owns at most one live connection per session and keeps it alive:
//!
//! - **Connect:** `connect()` spawns a connection task. Connect failures never
//!   reach the caller; they become a scheduled retry.
//! - **Receive:** inbound frames are decoded and handed to the registered
//!   handler one at a time, in arrival order. Malformed frames are dropped.
//! - **Reconnect:** when the connection closes or fails, the task sleeps for
//!   the fixed reconnect delay and reconnects, unboundedly, as long as the
//!   session is still `Active` *when the delay fires*.
//! - **Send:** a write that does not complete within the write timeout counts
//!   as failed, so a socket that stopped draining still falls back to HTTP.
//! - **Close:** `cancel()` stops the task at once, without waiting on a write
//!   in progress; `close()` additionally tears the socket down. No reconnect
//!   follows either.
//!
//! Connection state: `Idle -> Connecting -> Open -> Closed`, published on a
//! `watch` channel. Every connection task carries a generation number; a task
//! whose generation is stale (because `close()` or a later `connect()` ran)
//! never touches shared state again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use shopchat_types::chat::{ChatMessage, ConnectionState, SessionState};
use shopchat_types::wire::{decode_inbound_frame, encode_outbound_frame, OutboundFrame};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::connector::{ChannelConnector, FrameSink, FrameStream};

/// Bound on a single frame write or socket close.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Callback invoked once per decoded inbound frame.
pub type MessageHandler = Arc<dyn Fn(ChatMessage) + Send + Sync>;

/// State shared between the manager and its connection task.
struct Shared {
    connection: watch::Sender<ConnectionState>,
    /// Writer half of the open connection, tagged with the owning generation.
    writer: tokio::sync::Mutex<Option<(u64, FrameSink)>>,
    handler: RwLock<Option<MessageHandler>>,
    generation: AtomicU64,
    connect_attempts: AtomicU64,
    reconnects: AtomicU64,
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Publish a connection state on behalf of `generation`, if still current.
    fn publish(&self, generation: u64, next: ConnectionState) {
        self.connection.send_if_modified(|state| {
            if self.is_current(generation) && *state != next {
                *state = next;
                true
            } else {
                false
            }
        });
    }
}

struct Worker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Close a writer half, giving up after `limit`.
async fn close_sink(mut sink: FrameSink, limit: Duration) {
    match tokio::time::timeout(limit, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => debug!(error = %err, "Error closing real-time channel"),
        Err(_) => debug!("Timed out closing real-time channel"),
    }
}

/// Manages the real-time channel for the current session.
pub struct TransportManager<T: ChannelConnector> {
    connector: Arc<T>,
    reconnect_delay: Duration,
    write_timeout: Duration,
    session_state: watch::Receiver<SessionState>,
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
    /// Handles of cancelled tasks, awaited by `shutdown()`.
    retired: Mutex<Vec<JoinHandle<()>>>,
}

impl<T: ChannelConnector> TransportManager<T> {
    /// Create a manager that reconnects after `reconnect_delay` while
    /// `session_state` reports `Active`.
    pub fn new(
        connector: Arc<T>,
        reconnect_delay: Duration,
        session_state: watch::Receiver<SessionState>,
    ) -> Self {
        let (connection, _) = watch::channel(ConnectionState::Idle);
        Self {
            connector,
            reconnect_delay,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            session_state,
            shared: Arc::new(Shared {
                connection,
                writer: tokio::sync::Mutex::new(None),
                handler: RwLock::new(None),
                generation: AtomicU64::new(0),
                connect_attempts: AtomicU64::new(0),
                reconnects: AtomicU64::new(0),
            }),
            worker: Mutex::new(None),
            retired: Mutex::new(Vec::new()),
        }
    }

    /// Bound each frame write (and socket close) by `timeout`.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Register the callback for inbound messages, replacing any previous one.
    pub fn on_message<F>(&self, handler: F)
    where
        F: Fn(ChatMessage) + Send + Sync + 'static,
    {
        *self.shared.handler.write().expect("handler lock poisoned") = Some(Arc::new(handler));
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.shared.connection.borrow()
    }

    /// Observe connection state transitions.
    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.shared.connection.subscribe()
    }

    /// Total connection attempts, including the first one.
    pub fn connect_attempts(&self) -> u64 {
        self.shared.connect_attempts.load(Ordering::SeqCst)
    }

    /// Reconnect attempts fired after a delay.
    pub fn reconnects(&self) -> u64 {
        self.shared.reconnects.load(Ordering::SeqCst)
    }

    /// Whether a connection task is alive (connecting, open, or waiting to reconnect).
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .expect("transport lock poisoned")
            .as_ref()
            .is_some_and(|w| !w.token.is_cancelled() && !w.handle.is_finished())
    }

    /// Start maintaining a connection for `session_key`.
    ///
    /// No-op if a connection task is already running.
    pub fn connect(&self, session_key: &str) {
        let mut worker = self.worker.lock().expect("transport lock poisoned");
        if worker
            .as_ref()
            .is_some_and(|w| !w.token.is_cancelled() && !w.handle.is_finished())
        {
            debug!(session_key, "Transport already running, ignoring connect");
            return;
        }

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        let task = ConnectionTask {
            connector: Arc::clone(&self.connector),
            shared: Arc::clone(&self.shared),
            session_key: session_key.to_string(),
            reconnect_delay: self.reconnect_delay,
            write_timeout: self.write_timeout,
            session_state: self.session_state.clone(),
            token: token.clone(),
            generation,
        };
        let handle = tokio::spawn(task.run());
        if let Some(previous) = worker.replace(Worker { token, handle }) {
            self.retire(previous.handle);
        }
    }

    /// Keep a cancelled task's handle for `shutdown()`, dropping finished ones.
    fn retire(&self, handle: JoinHandle<()>) {
        let mut retired = self.retired.lock().expect("transport lock poisoned");
        retired.retain(|h| !h.is_finished());
        retired.push(handle);
    }

    /// Write a customer message to the open connection.
    ///
    /// Returns `true` only when the frame was written on an open connection
    /// within the write timeout. This is not a delivery guarantee. A failed or
    /// timed-out write drops the writer so that later sends fall back
    /// immediately; so does a write that outlived its connection.
    pub async fn send(&self, body: &str) -> bool {
        let text = match encode_outbound_frame(&OutboundFrame::from_user(body)) {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "Failed to encode outbound frame");
                return false;
            }
        };

        let mut writer = self.shared.writer.lock().await;
        let Some((owner, sink)) = writer.as_mut() else {
            debug!("No open real-time channel");
            return false;
        };
        let owner = *owner;

        let written = match tokio::time::timeout(self.write_timeout, sink.send(text)).await {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                warn!(error = %err, "Real-time send failed");
                false
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.write_timeout.as_millis() as u64,
                    "Real-time send timed out"
                );
                false
            }
        };
        if !written || !self.shared.is_current(owner) {
            writer.take();
        }
        written
    }

    /// Stop the connection task and publish `Closed` without waiting on the socket.
    ///
    /// A write in progress keeps the writer until it finishes or times out,
    /// then drops it.
    pub fn cancel(&self) {
        // Invalidate the running task before touching shared state.
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(worker) = self.worker.lock().expect("transport lock poisoned").take() {
            worker.token.cancel();
            self.retire(worker.handle);
        }
        self.shared.connection.send_replace(ConnectionState::Closed);
    }

    /// Tear down the connection and stop reconnecting.
    pub async fn close(&self) {
        self.cancel();

        let writer = match self.shared.writer.try_lock() {
            Ok(mut writer) => writer.take(),
            Err(_) => {
                debug!("Write in progress, writer is dropped when it finishes");
                None
            }
        };
        if let Some((_, sink)) = writer {
            close_sink(sink, self.write_timeout).await;
        }
        debug!("Transport closed");
    }

    /// Close and wait for every connection task to exit.
    pub async fn shutdown(&self) {
        self.close().await;
        let handles: Vec<_> = self
            .retired
            .lock()
            .expect("transport lock poisoned")
            .drain(..)
            .collect();
        for handle in handles {
            let _ = handle.await;
        }
    }
}

/// The background task that owns one connect/read/reconnect cycle.
struct ConnectionTask<T: ChannelConnector> {
    connector: Arc<T>,
    shared: Arc<Shared>,
    session_key: String,
    reconnect_delay: Duration,
    write_timeout: Duration,
    session_state: watch::Receiver<SessionState>,
    token: CancellationToken,
    generation: u64,
}

impl<T: ChannelConnector> ConnectionTask<T> {
    fn session_active(&self) -> bool {
        self.session_state.borrow().is_active()
    }

    fn publish(&self, state: ConnectionState) {
        self.shared.publish(self.generation, state);
    }

    async fn run(self) {
        if !self.session_active() {
            debug!(session_key = %self.session_key, "Session not active, transport stays idle");
            return;
        }

        loop {
            self.publish(ConnectionState::Connecting);
            self.shared.connect_attempts.fetch_add(1, Ordering::SeqCst);

            let connected = tokio::select! {
                biased;
                _ = self.token.cancelled() => return,
                result = self.connector.connect(&self.session_key) => result,
            };

            match connected {
                Ok(link) => {
                    if !self.install_writer(link.sink).await {
                        return;
                    }
                    self.publish(ConnectionState::Open);
                    info!(session_key = %self.session_key, "Real-time channel open");

                    let cancelled = self.read_frames(link.stream).await;
                    self.release_writer().await;
                    if cancelled {
                        return;
                    }
                    self.publish(ConnectionState::Closed);
                    info!(session_key = %self.session_key, "Real-time channel closed");
                }
                Err(err) => {
                    warn!(session_key = %self.session_key, error = %err, "Real-time channel connect failed");
                    self.publish(ConnectionState::Closed);
                }
            }

            debug!(
                session_key = %self.session_key,
                delay_ms = self.reconnect_delay.as_millis() as u64,
                "Scheduling reconnect"
            );
            tokio::select! {
                biased;
                _ = self.token.cancelled() => return,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }

            // The session may have closed while we were waiting.
            if !self.session_active() || !self.shared.is_current(self.generation) {
                debug!(session_key = %self.session_key, "Session no longer active, not reconnecting");
                return;
            }
            self.shared.reconnects.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Store the writer half. Returns `false` if this task went stale meanwhile.
    async fn install_writer(&self, sink: FrameSink) -> bool {
        let mut writer = self.shared.writer.lock().await;
        if self.token.is_cancelled() || !self.shared.is_current(self.generation) {
            drop(writer);
            close_sink(sink, self.write_timeout).await;
            return false;
        }
        *writer = Some((self.generation, sink));
        true
    }

    async fn release_writer(&self) {
        let released = {
            let mut writer = self.shared.writer.lock().await;
            if writer.as_ref().is_some_and(|(owner, _)| *owner == self.generation) {
                writer.take()
            } else {
                None
            }
        };
        if let Some((_, sink)) = released {
            close_sink(sink, self.write_timeout).await;
        }
    }

    /// Pump inbound frames until the stream ends or the task is cancelled.
    ///
    /// Returns `true` if it stopped because of cancellation.
    async fn read_frames(&self, mut stream: FrameStream) -> bool {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.token.cancelled() => return true,
                next = stream.next() => next,
            };
            match next {
                Some(Ok(text)) => self.dispatch(&text),
                Some(Err(err)) => {
                    debug!(error = %err, "Real-time channel receive error");
                    return false;
                }
                None => return false,
            }
        }
    }

    fn dispatch(&self, text: &str) {
        let message = match decode_inbound_frame(text) {
            Ok(message) => message,
            Err(err) => {
                warn!(raw = %text, error = %err, "Dropping malformed frame");
                return;
            }
        };
        let handler = self
            .shared
            .handler
            .read()
            .expect("handler lock poisoned")
            .clone();
        match handler {
            Some(handler) => handler(message),
            None => debug!("No message handler registered, dropping frame"),
        }
    }
}
