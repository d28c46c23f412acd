//! The chat client: one per process (or page load).
//!
//! `ChatClient` owns the session lifecycle and wires the other components
//! together:
//!
//! ```text
//! SessionStore --resume--> SessionLifecycle --attach--> TransportManager
//!                                  |                   ReconciliationPoller
//! user input --> DeliveryCoordinator --> TransportManager | ChatApi (fallback)
//! inbound frames / poll results --> RenderSurface
//! ```
//!
//! Closure is server-driven: the poller reports it, and `close()` fans it out
//! exactly once. Poller and transport are cancelled, the store is cleared,
//! input is disabled and the closure notice rendered; only then is the socket
//! torn down, so a stuck connection cannot hold the closure back.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use shopchat_types::chat::{
    ChatMessage, ConnectionState, Origin, SessionState, StoredSession,
};
use shopchat_types::config::ChatConfig;
use shopchat_types::error::ChatError;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::chat::api::ChatApi;
use crate::chat::delivery::{DeliveryCoordinator, Dispatch, RejectReason};
use crate::chat::poller::{ClosureListener, ReconciliationPoller};
use crate::chat::render::{RenderSink, RenderSurface};
use crate::session::lifecycle::SessionLifecycle;
use crate::session::store::SessionStore;
use crate::transport::connector::ChannelConnector;
use crate::transport::manager::TransportManager;

/// Input placeholder shown once support has closed the session.
pub const CLOSED_INPUT_PLACEHOLDER: &str = "Chat session has been closed by support";

/// Notice shown when name or email is missing.
pub const MISSING_FIELDS_NOTICE: &str = "Please fill in all fields";

/// Notice shown when the server refuses to create a session.
pub const START_FAILED_NOTICE: &str = "Failed to start chat. Please try again.";

/// Timing and text settings for a [`ChatClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub poll_interval: Duration,
    pub reconnect_delay: Duration,
    /// Bound on one real-time write before falling back to HTTP.
    pub write_timeout: Duration,
    pub closure_notice: String,
}

impl From<&ChatConfig> for ClientSettings {
    fn from(config: &ChatConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            reconnect_delay: config.reconnect_delay(),
            write_timeout: config.request_timeout(),
            closure_notice: config.closure_notice.clone(),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::from(&ChatConfig::default())
    }
}

struct ClientInner<C: ChatApi, T: ChannelConnector, S, R: RenderSink> {
    settings: ClientSettings,
    api: Arc<C>,
    store: S,
    surface: RenderSurface<R>,
    lifecycle: SessionLifecycle,
    transport: Arc<TransportManager<T>>,
    delivery: DeliveryCoordinator<C, T, R>,
    poller: ReconciliationPoller<C, R>,
    /// Transport and poller are running for the active session.
    attached: AtomicBool,
}

impl<C, T, S, R> ClientInner<C, T, S, R>
where
    C: ChatApi,
    T: ChannelConnector,
    S: SessionStore + 'static,
    R: RenderSink,
{
    fn attach(self: &Arc<Self>, session_key: &str) {
        self.transport.connect(session_key);
        self.poller.start(
            session_key,
            CloseOnNotice {
                client: Arc::downgrade(self),
            },
        );
        self.attached.store(true, Ordering::SeqCst);
    }

    /// Show the conversation, replay history, and attach. Returns whether the
    /// session is still active afterwards.
    async fn reattach(self: &Arc<Self>, session: &StoredSession) -> bool {
        self.surface.show_conversation();

        match self.api.fetch_messages(&session.session_key).await {
            Ok(snapshot) => {
                if let Some(messages) = snapshot.messages.as_deref() {
                    self.surface.replace_all(messages);
                }
                if snapshot.is_active == Some(false) {
                    self.close().await;
                    return false;
                }
            }
            Err(err) => {
                warn!(session_key = %session.session_key, error = %err, "Failed to load chat history");
            }
        }

        if !self.lifecycle.state().is_active() {
            return false;
        }
        self.attach(&session.session_key);
        true
    }

    async fn close(&self) {
        let Some(session) = self.lifecycle.mark_closed() else {
            debug!("Session not active, ignoring close");
            return;
        };
        info!(session_key = %session.session_key, "Chat session closed by support");

        self.attached.store(false, Ordering::SeqCst);
        self.poller.stop();
        self.transport.cancel();
        if let Err(err) = self.store.clear().await {
            warn!(error = %err, "Failed to clear stored session");
        }
        self.surface.disable_input(CLOSED_INPUT_PLACEHOLDER);
        self.surface.append(&ChatMessage::new(
            self.settings.closure_notice.clone(),
            Origin::Counterparty,
            Utc::now(),
        ));
        self.transport.close().await;
    }

    async fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
        self.poller.stop();
        self.transport.close().await;
    }
}

/// Routes the poller's closure signal back into the client.
///
/// Holds a weak reference so the poll task does not keep the client alive.
struct CloseOnNotice<C: ChatApi, T: ChannelConnector, S, R: RenderSink> {
    client: Weak<ClientInner<C, T, S, R>>,
}

impl<C, T, S, R> ClosureListener for CloseOnNotice<C, T, S, R>
where
    C: ChatApi,
    T: ChannelConnector,
    S: SessionStore + 'static,
    R: RenderSink,
{
    async fn session_closed(&self) {
        if let Some(client) = self.client.upgrade() {
            client.close().await;
        }
    }
}

/// Chat session client.
///
/// Cheap to clone; clones share one session.
pub struct ChatClient<C: ChatApi, T: ChannelConnector, S, R: RenderSink> {
    inner: Arc<ClientInner<C, T, S, R>>,
}

impl<C: ChatApi, T: ChannelConnector, S, R: RenderSink> Clone for ChatClient<C, T, S, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C, T, S, R> ChatClient<C, T, S, R>
where
    C: ChatApi,
    T: ChannelConnector,
    S: SessionStore + 'static,
    R: RenderSink,
{
    pub fn new(api: Arc<C>, connector: Arc<T>, store: S, sink: R, settings: ClientSettings) -> Self {
        let surface = RenderSurface::new(sink);
        let lifecycle = SessionLifecycle::new();

        let transport = Arc::new(
            TransportManager::new(connector, settings.reconnect_delay, lifecycle.subscribe())
                .with_write_timeout(settings.write_timeout),
        );
        let inbound = surface.clone();
        transport.on_message(move |message| inbound.append(&message));

        let delivery =
            DeliveryCoordinator::new(Arc::clone(&api), Arc::clone(&transport), surface.clone());
        let poller =
            ReconciliationPoller::new(Arc::clone(&api), surface.clone(), settings.poll_interval);

        Self {
            inner: Arc::new(ClientInner {
                settings,
                api,
                store,
                surface,
                lifecycle,
                transport,
                delivery,
                poller,
                attached: AtomicBool::new(false),
            }),
        }
    }

    /// Create a session on the server and attach to it.
    pub async fn start(&self, name: &str, email: &str) -> Result<StoredSession, ChatError> {
        let inner = &self.inner;
        let (name, email) = (name.trim(), email.trim());
        if name.is_empty() || email.is_empty() {
            inner.surface.notify_failure(MISSING_FIELDS_NOTICE);
            return Err(ChatError::MissingIdentity);
        }

        let state = inner.lifecycle.state();
        if state != SessionState::Unstarted {
            return Err(ChatError::InvalidState(state.to_string()));
        }

        let session_key = match inner.api.start_session(name, email).await {
            Ok(key) => key,
            Err(err) => {
                warn!(error = %err, "Failed to start chat session");
                inner.surface.notify_failure(START_FAILED_NOTICE);
                return Err(ChatError::SessionCreation(err.to_string()));
            }
        };

        let session = StoredSession::new(session_key, name, email);
        inner.lifecycle.activate(session.clone())?;
        if let Err(err) = inner.store.save(&session).await {
            warn!(error = %err, "Failed to persist chat session");
        }
        info!(session_key = %session.session_key, "Chat session started");

        inner.surface.show_conversation();
        inner.attach(&session.session_key);
        Ok(session)
    }

    /// Re-attach to the current or stored session without creating a new one.
    ///
    /// Returns `true` if a session is active and attached afterwards.
    pub async fn resume(&self) -> bool {
        let inner = &self.inner;
        match inner.lifecycle.state() {
            SessionState::Closed => false,
            SessionState::Active => {
                if inner.attached.load(Ordering::SeqCst) {
                    return true;
                }
                match inner.lifecycle.session() {
                    Some(session) => inner.reattach(&session).await,
                    None => false,
                }
            }
            SessionState::Unstarted => {
                let session = match inner.store.load().await {
                    Ok(Some(session)) => session,
                    Ok(None) => {
                        debug!("No stored chat session to resume");
                        return false;
                    }
                    Err(err) => {
                        warn!(error = %err, "Failed to load stored chat session");
                        return false;
                    }
                };
                if let Err(err) = inner.lifecycle.activate(session.clone()) {
                    debug!(error = %err, "Session changed while resuming");
                    return inner.lifecycle.state().is_active();
                }
                info!(session_key = %session.session_key, "Resuming stored chat session");
                inner.reattach(&session).await
            }
        }
    }

    /// Send a customer message.
    pub async fn send_message(&self, body: &str) -> Dispatch {
        if self.inner.lifecycle.state() == SessionState::Closed {
            debug!("Ignoring message for closed session");
            return Dispatch::Rejected(RejectReason::SessionClosed);
        }
        let session_key = self.inner.lifecycle.active_key();
        self.inner
            .delivery
            .send_message(session_key.as_deref(), body)
            .await
    }

    /// Apply a server-driven closure. Idempotent.
    pub async fn close(&self) {
        self.inner.close().await;
    }

    /// Stop transport and polling but keep the session and the stored
    /// identity, so a later [`resume`](Self::resume) re-attaches.
    pub async fn detach(&self) {
        self.inner.detach().await;
        debug!("Chat client detached");
    }

    /// Detach and wait for all background tasks to exit.
    pub async fn shutdown(&self) {
        self.inner.detach().await;
        self.inner.poller.shutdown().await;
        self.inner.transport.shutdown().await;
    }

    pub fn state(&self) -> SessionState {
        self.inner.lifecycle.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.inner.lifecycle.subscribe()
    }

    pub fn session(&self) -> Option<StoredSession> {
        self.inner.lifecycle.session()
    }

    pub fn is_attached(&self) -> bool {
        self.inner.attached.load(Ordering::SeqCst)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.transport.connection_state()
    }

    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.inner.transport.watch_connection()
    }

    /// Reconnect attempts made by the transport so far.
    pub fn reconnects(&self) -> u64 {
        self.inner.transport.reconnects()
    }

    pub fn surface(&self) -> &RenderSurface<R> {
        &self.inner.surface
    }

    pub fn api(&self) -> &Arc<C> {
        &self.inner.api
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }
}
