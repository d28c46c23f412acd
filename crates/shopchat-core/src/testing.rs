//! Scripted fakes for the core's ports, shared by the unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use shopchat_types::chat::{ChatMessage, Origin};
use shopchat_types::error::{ApiError, TransportError};
use shopchat_types::wire::{MessageSnapshot, SendMessageRequest, SendMessageResponse};
use tokio::sync::{mpsc, Semaphore};

use crate::chat::api::ChatApi;
use crate::transport::connector::{ChannelConnector, ChannelLink};

/// A staff message with a fixed timestamp.
pub fn staff(body: &str) -> ChatMessage {
    ChatMessage::new(body, Origin::Counterparty, fixed_time())
}

/// A customer message with a fixed timestamp.
pub fn user(body: &str) -> ChatMessage {
    ChatMessage::new(body, Origin::User, fixed_time())
}

fn fixed_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap()
}

/// Holds calls until released, when closed.
struct Gate {
    closed: AtomicBool,
    permits: Semaphore,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            closed: AtomicBool::new(false),
            permits: Semaphore::new(0),
        }
    }
}

impl Gate {
    async fn pass(&self) {
        if self.closed.load(Ordering::SeqCst) {
            if let Ok(permit) = self.permits.acquire().await {
                permit.forget();
            }
        }
    }
}

struct ApiState {
    start_result: Result<String, String>,
    messages: Vec<ChatMessage>,
    listing_active: Option<bool>,
    status_active: bool,
    fail_fetches: bool,
    send_status: String,
    start_calls: Vec<(String, String)>,
    sends: Vec<SendMessageRequest>,
    fetch_calls: usize,
    status_calls: usize,
}

/// Scripted [`ChatApi`].
pub struct FakeApi {
    state: Mutex<ApiState>,
    send_gate: Gate,
    fetch_gate: Gate,
}

impl FakeApi {
    /// Accepts sessions as `sk1`, reports an active session with no messages.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ApiState {
                start_result: Ok("sk1".to_string()),
                messages: Vec::new(),
                listing_active: Some(true),
                status_active: true,
                fail_fetches: false,
                send_status: "success".to_string(),
                start_calls: Vec::new(),
                sends: Vec::new(),
                fetch_calls: 0,
                status_calls: 0,
            }),
            send_gate: Gate::default(),
            fetch_gate: Gate::default(),
        }
    }

    pub fn fail_start(&self, error: &str) {
        self.state.lock().unwrap().start_result = Err(error.to_string());
    }

    pub fn set_messages(&self, messages: Vec<ChatMessage>) {
        self.state.lock().unwrap().messages = messages;
    }

    pub fn push_message(&self, message: ChatMessage) {
        self.state.lock().unwrap().messages.push(message);
    }

    /// Report the session as closed on both endpoints.
    pub fn close_session(&self) {
        let mut state = self.state.lock().unwrap();
        state.listing_active = Some(false);
        state.status_active = false;
    }

    pub fn set_listing_active(&self, active: Option<bool>) {
        self.state.lock().unwrap().listing_active = active;
    }

    pub fn set_status_active(&self, active: bool) {
        self.state.lock().unwrap().status_active = active;
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.state.lock().unwrap().fail_fetches = fail;
    }

    pub fn set_send_status(&self, status: &str) {
        self.state.lock().unwrap().send_status = status.to_string();
    }

    /// Hold every `send_message` call until [`release_sends`](Self::release_sends).
    pub fn gate_sends(&self) {
        self.send_gate.closed.store(true, Ordering::SeqCst);
    }

    pub fn release_sends(&self, n: usize) {
        self.send_gate.permits.add_permits(n);
    }

    /// Hold every fetch (messages and status) until released.
    pub fn gate_fetches(&self) {
        self.fetch_gate.closed.store(true, Ordering::SeqCst);
    }

    pub fn release_fetches(&self, n: usize) {
        self.fetch_gate.permits.add_permits(n);
    }

    pub fn start_calls(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().start_calls.clone()
    }

    pub fn sends(&self) -> Vec<SendMessageRequest> {
        self.state.lock().unwrap().sends.clone()
    }

    pub fn fetch_calls(&self) -> usize {
        self.state.lock().unwrap().fetch_calls
    }

    pub fn status_calls(&self) -> usize {
        self.state.lock().unwrap().status_calls
    }
}

impl ChatApi for FakeApi {
    async fn start_session(&self, name: &str, email: &str) -> Result<String, ApiError> {
        let mut state = self.state.lock().unwrap();
        state
            .start_calls
            .push((name.to_string(), email.to_string()));
        state.start_result.clone().map_err(ApiError::Rejected)
    }

    async fn send_message(
        &self,
        session_key: &str,
        body: &str,
    ) -> Result<SendMessageResponse, ApiError> {
        let (status, message_id) = {
            let mut state = self.state.lock().unwrap();
            state.sends.push(SendMessageRequest {
                session_key: session_key.to_string(),
                message: body.to_string(),
            });
            (state.send_status.clone(), state.sends.len() as i64)
        };
        self.send_gate.pass().await;
        Ok(SendMessageResponse {
            status: Some(status),
            message_id: Some(message_id),
            ..SendMessageResponse::default()
        })
    }

    async fn fetch_messages(&self, _session_key: &str) -> Result<MessageSnapshot, ApiError> {
        self.fetch_gate.pass().await;
        let mut state = self.state.lock().unwrap();
        state.fetch_calls += 1;
        if state.fail_fetches {
            return Err(ApiError::Http("connection refused".to_string()));
        }
        Ok(MessageSnapshot {
            messages: Some(state.messages.clone()),
            is_active: state.listing_active,
        })
    }

    async fn fetch_status(&self, _session_key: &str) -> Result<bool, ApiError> {
        self.fetch_gate.pass().await;
        let mut state = self.state.lock().unwrap();
        state.status_calls += 1;
        if state.fail_fetches {
            return Err(ApiError::Http("connection refused".to_string()));
        }
        Ok(state.status_active)
    }
}

type Inbound = mpsc::UnboundedSender<Result<String, TransportError>>;

#[derive(Default)]
struct ConnectorState {
    refuse_remaining: usize,
    attempted_keys: Vec<String>,
    inbound: Option<Inbound>,
}

/// Scripted [`ChannelConnector`].
///
/// Each accepted connection gets a fresh inbound queue; the test pushes
/// frames into the most recent one and can drop it to simulate the server
/// closing the channel. Written frames land in a shared list.
#[derive(Default)]
pub struct FakeConnector {
    state: Mutex<ConnectorState>,
    sent: Arc<Mutex<Vec<String>>>,
    fail_writes: Arc<AtomicBool>,
    stall_writes: Arc<AtomicBool>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse the next `n` connection attempts.
    pub fn refuse_next(&self, n: usize) {
        self.state.lock().unwrap().refuse_remaining = n;
    }

    pub fn attempts(&self) -> usize {
        self.state.lock().unwrap().attempted_keys.len()
    }

    pub fn attempted_keys(&self) -> Vec<String> {
        self.state.lock().unwrap().attempted_keys.clone()
    }

    /// Deliver a raw text frame on the latest connection.
    pub fn push_frame(&self, text: &str) {
        if let Some(inbound) = self.state.lock().unwrap().inbound.as_ref() {
            let _ = inbound.send(Ok(text.to_string()));
        }
    }

    /// End the latest connection's inbound stream.
    pub fn drop_connection(&self) {
        self.state.lock().unwrap().inbound.take();
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make writes hang forever, as on a socket that stopped draining.
    pub fn stall_writes(&self, stall: bool) {
        self.stall_writes.store(stall, Ordering::SeqCst);
    }

    pub fn sent_frames(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

impl ChannelConnector for FakeConnector {
    async fn connect(&self, session_key: &str) -> Result<ChannelLink, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.attempted_keys.push(session_key.to_string());
        if state.refuse_remaining > 0 {
            state.refuse_remaining -= 1;
            return Err(TransportError::Connect("connection refused".to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        state.inbound = Some(tx);

        let sink = futures_util::sink::unfold(
            (
                Arc::clone(&self.sent),
                Arc::clone(&self.fail_writes),
                Arc::clone(&self.stall_writes),
            ),
            |(sent, fail, stall), frame: String| async move {
                if stall.load(Ordering::SeqCst) {
                    std::future::pending::<()>().await;
                }
                if fail.load(Ordering::SeqCst) {
                    return Err(TransportError::Send("broken pipe".to_string()));
                }
                sent.lock().unwrap().push(frame);
                Ok((sent, fail, stall))
            },
        );
        let stream = futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(ChannelLink::new(sink, stream))
    }
}
